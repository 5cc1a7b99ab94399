use crate::game::{ClientGameState, Hud};
use macroquad::prelude::*;
use shared::constants::PLAYER_RADIUS;
use shared::{BodyShape, SimpleBody, Vector2D};

/// Parses the CSS-style color strings carried by bodies.
///
/// Accepts a few color names, `#rrggbb`, `rgb(r, g, b)` and
/// `rgba(r, g, b, a)` with alpha in 0..=1. Anything else is gray.
pub fn parse_color(value: &str) -> Color {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).unwrap_or(GRAY);
    }
    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_components(args).unwrap_or(GRAY);
    }
    match value {
        "black" => BLACK,
        "white" => WHITE,
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "yellow" => YELLOW,
        "purple" => PURPLE,
        "orange" => ORANGE,
        "magenta" => MAGENTA,
        "cyan" => Color::from_rgba(0, 255, 255, 255),
        _ => GRAY,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::from_rgba(channel(0)?, channel(2)?, channel(4)?, 255))
}

fn parse_components(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |i: usize| parts.get(i)?.parse::<u8>().ok();
    let alpha = match parts.len() {
        3 => 1.0,
        4 => parts[3].parse::<f32>().ok()?.clamp(0.0, 1.0),
        _ => return None,
    };
    let mut color = Color::from_rgba(channel(0)?, channel(1)?, channel(2)?, 255);
    color.a = alpha;
    Some(color)
}

/// Text lines of the heads-up display.
pub fn hud_lines(hud: &Hud, connected: bool) -> Vec<String> {
    if !connected {
        return vec!["Disconnected - press R to reconnect".to_string()];
    }
    let mut lines = vec![format!("Mode: {}", hud.game_mode.as_str())];
    if hud.round_limit > 0 && hud.current_round > 0 {
        lines.push(format!("Round {}/{}", hud.current_round, hud.round_limit));
    }
    if hud.time_left_ms > 0 {
        lines.push(format!("Time left: {:.1}s", hud.time_left_ms as f32 / 1000.0));
    }
    lines.push(format!("Ping: {}ms", hud.ping_ms));
    lines
}

pub struct Renderer {
    background: Color,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            background: Color::from_rgba(26, 26, 26, 255),
        }
    }

    pub fn render(&mut self, game: &ClientGameState, show_debug: bool, connected: bool) {
        clear_background(self.background);

        let world = game.world();
        let my_body = game.my_body();
        for id in world.ids() {
            let Some(body) = world.simple_body(id) else {
                continue;
            };
            let center = self.to_screen(game, body.position);
            self.draw_body(&body, center);

            if body.is_player() {
                if let Some(name) = game.player_name(id) {
                    self.draw_name(name, center, Some(id) == my_body);
                }
                if show_debug && Some(id) == my_body {
                    self.draw_velocity_vector(center, body.velocity);
                }
            }
        }

        if show_debug {
            if let Some(ghost) = game.ghost() {
                let ghost = self.to_screen(game, ghost);
                draw_circle_lines(ghost.x, ghost.y, PLAYER_RADIUS, 1.0, Color::new(1.0, 1.0, 1.0, 0.5));
            }
        }

        self.draw_hud(game.hud(), connected);
        if show_debug {
            self.draw_debug(game);
        }
    }

    fn to_screen(&self, game: &ClientGameState, position: Vector2D) -> Vector2D {
        game.camera().world_to_screen(position, screen_width(), screen_height())
    }

    fn draw_body(&mut self, body: &SimpleBody, center: Vector2D) {
        let fill = parse_color(&body.fill_color);
        let stroke = parse_color(&body.stroke_color);

        match body.shape {
            BodyShape::Circle => {
                let radius = body.radius.unwrap_or(PLAYER_RADIUS);
                draw_circle(center.x, center.y, radius, fill);
                draw_circle_lines(center.x, center.y, radius, 2.0, stroke);
            }
            BodyShape::Rectangle => {
                let (width, height) = (body.width.unwrap_or(0.0), body.height.unwrap_or(0.0));
                let params = |color| DrawRectangleParams {
                    offset: vec2(0.5, 0.5),
                    rotation: body.angle,
                    color,
                };
                draw_rectangle_ex(center.x, center.y, width, height, params(fill));
                if !body.is_sensor {
                    draw_rectangle_lines_ex(center.x, center.y, width, height, 2.0, params(stroke));
                }
            }
        }
    }

    fn draw_name(&mut self, name: &str, center: Vector2D, is_local_player: bool) {
        let color = if is_local_player { GREEN } else { WHITE };
        let size = measure_text(name, None, 16, 1.0);
        draw_text(
            name,
            center.x - size.width / 2.0,
            center.y - PLAYER_RADIUS - 8.0,
            16.0,
            color,
        );
    }

    fn draw_velocity_vector(&mut self, center: Vector2D, velocity: Vector2D) {
        let vel_scale = 0.15;
        let end = center + velocity * vel_scale;

        if velocity.x.abs() > 10.0 || velocity.y.abs() > 10.0 {
            draw_line(center.x, center.y, end.x, end.y, 2.0, YELLOW);
            self.draw_arrow_head(center, end);
        }
    }

    fn draw_arrow_head(&mut self, from: Vector2D, to: Vector2D) {
        let delta = to - from;
        if delta.length() < 5.0 {
            return;
        }

        let arrow_size = 5.0;
        let direction = delta.normalize();
        let perpendicular = Vector2D::new(-direction.y, direction.x);

        let base = to - direction * arrow_size;
        let left = base + perpendicular * (arrow_size / 2.0);
        let right = base - perpendicular * (arrow_size / 2.0);

        draw_line(to.x, to.y, left.x, left.y, 1.0, YELLOW);
        draw_line(to.x, to.y, right.x, right.y, 1.0, YELLOW);
    }

    fn draw_hud(&mut self, hud: &Hud, connected: bool) {
        let connection_color = if connected { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);

        for (i, line) in hud_lines(hud, connected).iter().enumerate() {
            draw_text(line, 24.0, 18.0 + i as f32 * 16.0, 16.0, WHITE);
        }
    }

    fn draw_debug(&mut self, game: &ClientGameState) {
        let lines = [
            format!("Frame: {}", game.last_frame().unwrap_or(0)),
            format!("Bodies: {}", game.world().len()),
            format!("Discarded snapshots: {}", game.hud().discarded_snapshots),
        ];
        let x = screen_width() - 220.0;
        for (i, line) in lines.iter().enumerate() {
            draw_text(line, x, 18.0 + i as f32 * 16.0, 16.0, YELLOW);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::GameMode;

    #[test]
    fn test_parse_named_and_hex_colors() {
        assert_eq!(parse_color("blue"), BLUE);
        assert_eq!(parse_color("#ff8000"), Color::from_rgba(255, 128, 0, 255));
        assert_eq!(parse_color("#zz0000"), GRAY);
        assert_eq!(parse_color("chartreuse"), GRAY);
    }

    #[test]
    fn test_parse_rgba_colors() {
        let color = parse_color("rgba(255, 0, 0, 0.5)");
        assert_approx_eq!(color.r, 1.0);
        assert_approx_eq!(color.g, 0.0);
        assert_approx_eq!(color.a, 0.5);

        assert_eq!(parse_color("rgb(0, 255, 0)"), Color::from_rgba(0, 255, 0, 255));
        assert_eq!(parse_color("rgba(1, 2)"), GRAY);
    }

    #[test]
    fn test_hud_lines() {
        let hud = Hud {
            game_mode: GameMode::Playing,
            time_left_ms: 12_500,
            current_round: 2,
            round_limit: 3,
            ping_ms: 40,
            discarded_snapshots: 0,
        };
        assert_eq!(
            hud_lines(&hud, true),
            vec!["Mode: playing", "Round 2/3", "Time left: 12.5s", "Ping: 40ms"]
        );

        let lobby = Hud::default();
        assert_eq!(hud_lines(&lobby, true), vec!["Mode: lobby", "Ping: 0ms"]);
        assert_eq!(hud_lines(&lobby, false).len(), 1);
    }
}
