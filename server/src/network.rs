//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::{ClientManager, CLIENT_TIMEOUT};
use crate::simulation::{Outbound, Simulation};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::constants::MAX_DATAGRAM_SIZE;
use shared::{get_timestamp, Channel, Packet, PlayerId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::Instant;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: PlayerId },
    #[allow(dead_code)]
    Shutdown,
}

/// Reliable messages sent from the game loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    simulation: Simulation,
    tick_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
    // Volatile broadcasts: only the newest unsent value survives.
    volatile_tx: watch::Sender<Option<Packet>>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
        simulation: Simulation,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let (volatile_tx, _) = watch::channel(None);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            simulation,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
            volatile_tx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) = server_tx.send(ServerMessage::PacketReceived { packet, addr }) {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping malformed datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the reliable outgoing queue in order
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send {} to {}: {}", packet.event_name(), addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        Self::broadcast_impl(&socket, &clients, &packet).await;
                    }
                }
            }
        });
    }

    /// Spawns task that pushes the latest volatile packet to every client
    ///
    /// A packet that is replaced before this task gets to it is never sent.
    fn spawn_volatile_sender(&self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut volatile_rx = self.volatile_tx.subscribe();

        tokio::spawn(async move {
            while volatile_rx.changed().await.is_ok() {
                let packet = volatile_rx.borrow_and_update().clone();
                if let Some(packet) = packet {
                    Self::broadcast_impl(&socket, &clients, &packet).await;
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(CLIENT_TIMEOUT)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    async fn broadcast_impl(socket: &UdpSocket, clients: &RwLock<ClientManager>, packet: &Packet) {
        let client_addrs = {
            let clients_guard = clients.read().await;
            clients_guard.get_client_addrs()
        };

        for (client_id, addr) in client_addrs {
            if let Err(e) = Self::send_packet_impl(socket, packet, addr).await {
                error!("Failed to send {} to client {}: {}", packet.event_name(), client_id, e);
            }
        }
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        match packet.channel() {
            Channel::Volatile => {
                self.volatile_tx.send_replace(Some(packet));
            }
            Channel::Reliable => {
                if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
                    error!("Failed to queue broadcast packet: {}", e);
                }
            }
        }
    }

    /// Routes simulation output to the right queues
    async fn dispatch(&self, outbound: Vec<Outbound>) {
        for message in outbound {
            match message {
                Outbound::To { player, packet } => {
                    let addr = {
                        let clients = self.clients.read().await;
                        clients.addr_of(player)
                    };
                    match addr {
                        Some(addr) => self.send_packet(packet, addr),
                        None => debug!("Dropping {} for departed player {}", packet.event_name(), player),
                    }
                }
                Outbound::Broadcast(packet) => self.broadcast_packet(packet),
            }
        }
    }

    async fn drop_client(&mut self, client_id: PlayerId) {
        {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id);
        }
        if let Some(outbound) = self.simulation.remove_player(client_id) {
            self.dispatch(vec![outbound]).await;
        }
    }

    /// Processes incoming packets and feeds them to the simulation
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        let client_id = {
            let mut clients = self.clients.write().await;
            let client_id = clients.find_client_by_addr(addr);
            if let Some(client_id) = client_id {
                clients.touch(client_id);
            }
            client_id
        };
        let pressed = matches!(packet, Packet::KeyDown(_));

        match packet {
            Packet::RegisterPlayer { name } => {
                if let Some(existing_id) = client_id {
                    // Retries arrive while our answer is still in flight.
                    if self.simulation.player(existing_id).map_or(false, |player| player.name == name) {
                        debug!("Repeated registration from {}, resending identity", addr);
                        let outbound = self.simulation.welcome(existing_id);
                        self.dispatch(outbound).await;
                        return;
                    }
                    info!("Replacing existing session {} from {}", existing_id, addr);
                    self.drop_client(existing_id).await;
                }

                info!("Player {:?} registering from {}", name, addr);

                let new_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                match new_id {
                    Some(new_id) => {
                        let outbound = self.simulation.add_player(new_id, name);
                        self.dispatch(outbound).await;
                    }
                    None => {
                        warn!("Rejecting {}: server full", addr);
                        self.send_packet(
                            Packet::Rejected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::KeyDown(event) | Packet::KeyUp(event) => {
                match client_id {
                    Some(client_id) => {
                        self.simulation.handle_key(client_id, &event, pressed);
                    }
                    None => debug!("Dropping key {:?} from unregistered {}", event.key, addr),
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = client_id {
                    self.drop_client(client_id).await;
                }
            }

            Packet::Heartbeat => {}

            Packet::Event(message) => {
                debug!("Echoing event from {}: {}", addr, message);
                self.broadcast_packet(Packet::Event(message));
            }

            other => {
                warn!("Unexpected {} packet from client at {}", other.event_name(), addr);
            }
        }
    }

    /// Runs one simulation tick and ships its output
    async fn tick(&mut self) {
        let outbound = self.simulation.tick(get_timestamp());
        self.dispatch(outbound).await;

        let frame = self.simulation.frame_number();
        if frame % 600 == 0 {
            let client_count = {
                let clients = self.clients.read().await;
                clients.len()
            };
            debug!(
                "Frame {}: {} clients, mode {}",
                frame,
                client_count,
                self.simulation.game_mode().as_str()
            );
        }
    }

    /// Main server loop coordinating all operations
    ///
    /// Ticks are scheduled with a fixed delay: the next tick is armed only
    /// after the current one finished, so a slow tick postpones the next one
    /// instead of piling up.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_volatile_sender();
        self.spawn_timeout_checker();

        let next_tick = tokio::time::sleep(self.tick_duration);
        tokio::pin!(next_tick);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            if let Some(outbound) = self.simulation.remove_player(client_id) {
                                self.dispatch(vec![outbound]).await;
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = &mut next_tick => {
                    self.tick().await;
                    next_tick.as_mut().reset(Instant::now() + self.tick_duration);
                },
            }
        }

        Ok(())
    }
}
