//! UDP transport for the client
//!
//! The render loop must never block on the network, so the socket lives on a
//! dedicated thread running its own tokio runtime. The two sides exchange
//! packets over unbounded channels; the render loop drains its side with
//! `try_recv` once per frame.
//!
//! ## Sessions
//!
//! Every call to [`NetworkClient::connect`] starts a new session with a higher
//! generation number and its own liveness flag:
//! - Inbound packets are tagged with the generation of the session that
//!   received them, and packets from older sessions are dropped on poll
//! - Clearing the liveness flag stops the transport thread at its next
//!   heartbeat, even if the render loop never sends another packet
//!
//! ## Keep-alive and registration
//!
//! The server forgets clients that stay silent, so the transport sends a
//! heartbeat every second. Registration is retried on the same timer until
//! the server answers with `myPlayer`.

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::constants::MAX_DATAGRAM_SIZE;
use shared::Packet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// A packet received by one particular session.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEvent {
    pub generation: u64,
    pub packet: Packet,
}

struct Session {
    outgoing: mpsc::UnboundedSender<Packet>,
    alive: Arc<AtomicBool>,
}

pub struct NetworkClient {
    server_addr: SocketAddr,
    fake_ping_ms: u64,
    generation: u64,
    session: Option<Session>,
    // Shared by all sessions so late packets from old ones can be recognized
    events_tx: mpsc::UnboundedSender<NetworkEvent>,
    events_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl NetworkClient {
    pub fn new(server_addr: SocketAddr, fake_ping_ms: u64) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            server_addr,
            fake_ping_ms,
            generation: 0,
            session: None,
            events_tx,
            events_rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.alive.load(Ordering::SeqCst))
    }

    /// Starts a new session and registers under `name`
    ///
    /// Any previous session is torn down first. Returns the new generation.
    pub fn connect(&mut self, name: &str) -> Result<u64, Box<dyn std::error::Error>> {
        self.disconnect();

        let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;

        self.generation += 1;
        let generation = self.generation;
        let alive = Arc::new(AtomicBool::new(true));
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        let transport = Transport {
            server_addr: self.server_addr,
            fake_ping: Duration::from_millis(self.fake_ping_ms / 2),
            generation,
            alive: Arc::clone(&alive),
            name: name.to_string(),
            events_tx: self.events_tx.clone(),
        };

        // Detached: the thread exits once its session is closed.
        std::thread::Builder::new()
            .name(format!("transport-{}", generation))
            .spawn(move || transport.run(socket, outgoing_rx))?;

        info!("Session {} connecting to {}", generation, self.server_addr);
        self.session = Some(Session {
            outgoing: outgoing_tx,
            alive,
        });
        Ok(generation)
    }

    /// Says goodbye to the server and stops the current session.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.outgoing.send(Packet::Disconnect);
            session.alive.store(false, Ordering::SeqCst);
            info!("Session {} closed", self.generation);
        }
    }

    /// Queues a packet for the current session. Returns false without one.
    pub fn send(&self, packet: Packet) -> bool {
        match &self.session {
            Some(session) if session.alive.load(Ordering::SeqCst) => session.outgoing.send(packet).is_ok(),
            _ => false,
        }
    }

    /// Drains received packets of the current session, oldest first.
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if event.generation == self.generation && self.is_connected() {
                packets.push(event.packet);
            } else {
                debug!(
                    "Dropping {} from session {} (current {})",
                    event.packet.event_name(),
                    event.generation,
                    self.generation
                );
            }
        }
        packets
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// State moved onto the transport thread.
struct Transport {
    server_addr: SocketAddr,
    /// Added to each direction.
    fake_ping: Duration,
    generation: u64,
    alive: Arc<AtomicBool>,
    name: String,
    events_tx: mpsc::UnboundedSender<NetworkEvent>,
}

impl Transport {
    fn run(self, socket: std::net::UdpSocket, outgoing_rx: mpsc::UnboundedReceiver<Packet>) {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to start transport runtime: {}", e);
                self.alive.store(false, Ordering::SeqCst);
                return;
            }
        };

        let alive = Arc::clone(&self.alive);
        runtime.block_on(async move {
            match UdpSocket::from_std(socket) {
                Ok(socket) => self.serve(Arc::new(socket), outgoing_rx).await,
                Err(e) => error!("Failed to register transport socket: {}", e),
            }
        });
        alive.store(false, Ordering::SeqCst);
    }

    async fn serve(&self, socket: Arc<UdpSocket>, mut outgoing_rx: mpsc::UnboundedReceiver<Packet>) {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut registered = false;
        let mut heartbeat = interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) if addr == self.server_addr => match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) => {
                                registered |= matches!(packet, Packet::MyPlayer { .. });
                                self.deliver(packet);
                            }
                            Err(e) => warn!("Malformed packet from server: {}", e),
                        },
                        Ok((_, addr)) => debug!("Ignoring datagram from {}", addr),
                        Err(e) => warn!("Error receiving packet: {}", e),
                    }
                },

                packet = outgoing_rx.recv() => {
                    match packet {
                        Some(packet) => self.send(&socket, packet).await,
                        None => break,
                    }
                },

                _ = heartbeat.tick() => {
                    if !self.alive.load(Ordering::SeqCst) {
                        while let Ok(packet) = outgoing_rx.try_recv() {
                            self.send(&socket, packet).await;
                        }
                        break;
                    }
                    let packet = if registered {
                        Packet::Heartbeat
                    } else {
                        Packet::RegisterPlayer { name: self.name.clone() }
                    };
                    self.send(&socket, packet).await;
                },
            }
        }

        debug!("Transport for session {} stopped", self.generation);
    }

    fn deliver(&self, packet: Packet) {
        let event = NetworkEvent {
            generation: self.generation,
            packet,
        };
        if self.fake_ping.is_zero() {
            let _ = self.events_tx.send(event);
            return;
        }
        let events_tx = self.events_tx.clone();
        let delay = self.fake_ping;
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = events_tx.send(event);
        });
    }

    async fn send(&self, socket: &Arc<UdpSocket>, packet: Packet) {
        let data = match serialize(&packet) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize {}: {}", packet.event_name(), e);
                return;
            }
        };

        // Goodbyes skip the artificial delay so they are not lost on shutdown.
        if self.fake_ping.is_zero() || matches!(packet, Packet::Disconnect) {
            if let Err(e) = socket.send_to(&data, self.server_addr).await {
                error!("Failed to send {}: {}", packet.event_name(), e);
            }
            return;
        }

        let socket = Arc::clone(socket);
        let server_addr = self.server_addr;
        let delay = self.fake_ping;
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = socket.send_to(&data, server_addr).await {
                error!("Failed to send delayed packet: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BodyId;

    async fn fake_server() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    async fn recv_packet(socket: &UdpSocket) -> (Packet, SocketAddr) {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, addr) = tokio::time::timeout(Duration::from_secs(3), socket.recv_from(&mut buffer))
            .await
            .expect("timed out waiting for packet")
            .unwrap();
        (deserialize(&buffer[..len]).unwrap(), addr)
    }

    /// Receives until something other than keep-alive traffic shows up.
    async fn recv_skipping_keepalive(socket: &UdpSocket) -> Packet {
        loop {
            let (packet, _) = recv_packet(socket).await;
            if !matches!(packet, Packet::Heartbeat | Packet::RegisterPlayer { .. }) {
                return packet;
            }
        }
    }

    async fn poll_until(client: &mut NetworkClient) -> Vec<Packet> {
        for _ in 0..100 {
            let packets = client.poll();
            if !packets.is_empty() {
                return packets;
            }
            sleep(Duration::from_millis(20)).await;
        }
        Vec::new()
    }

    #[test]
    fn test_send_without_session_fails() {
        let client = NetworkClient::new("127.0.0.1:9".parse().unwrap(), 0);
        assert!(!client.is_connected());
        assert!(!client.send(Packet::Heartbeat));
    }

    #[tokio::test]
    async fn test_connect_registers_and_receives() {
        let (server, server_addr) = fake_server().await;
        let mut client = NetworkClient::new(server_addr, 0);

        assert_eq!(client.connect("alice").unwrap(), 1);
        assert!(client.is_connected());

        let (packet, client_addr) = recv_packet(&server).await;
        assert_eq!(packet, Packet::RegisterPlayer { name: "alice".to_string() });

        let reply = Packet::MyPlayer { id: 4, body_id: BodyId(9) };
        server.send_to(&serialize(&reply).unwrap(), client_addr).await.unwrap();

        assert_eq!(poll_until(&mut client).await, vec![reply]);

        assert!(client.send(Packet::Event("hi".to_string())));
        assert_eq!(recv_skipping_keepalive(&server).await, Packet::Event("hi".to_string()));
    }

    #[tokio::test]
    async fn test_disconnect_says_goodbye() {
        let (server, server_addr) = fake_server().await;
        let mut client = NetworkClient::new(server_addr, 0);
        client.connect("bob").unwrap();
        recv_packet(&server).await;

        client.disconnect();
        assert!(!client.is_connected());
        assert!(!client.send(Packet::Heartbeat));

        assert_eq!(recv_skipping_keepalive(&server).await, Packet::Disconnect);
    }

    #[tokio::test]
    async fn test_stale_generation_is_dropped() {
        let (_server, server_addr) = fake_server().await;
        let mut client = NetworkClient::new(server_addr, 0);
        client.connect("carol").unwrap();
        assert_eq!(client.connect("carol").unwrap(), 2);

        client
            .events_tx
            .send(NetworkEvent {
                generation: 1,
                packet: Packet::RemoveBodies(vec![BodyId(1)]),
            })
            .unwrap();
        client
            .events_tx
            .send(NetworkEvent {
                generation: 2,
                packet: Packet::Event("fresh".to_string()),
            })
            .unwrap();

        assert_eq!(client.poll(), vec![Packet::Event("fresh".to_string())]);
    }
}
