use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// World coordinates are y-down with the origin at the top-left corner of
/// the level, matching how level layouts are authored.
const PLAYER_HALF_EXTENT: f32 = 16.0;
const MAX_STEP_SECS: f32 = 1.0 / 20.0;

/// Movement tuning shared by every level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    pub move_speed: f32,
    pub jump_velocity: f32,
    pub gravity: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 160.0,
            jump_velocity: 330.0,
            gravity: 300.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// A solid slab the player can stand on. Landing is resolved from above only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Platform {
    pub center: Vec2,
    pub size: Vec2,
}

impl Platform {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    fn top(&self) -> f32 {
        self.center.y - self.size.y / 2.0
    }

    fn spans_x(&self, x: f32) -> bool {
        let half = self.size.x / 2.0 + PLAYER_HALF_EXTENT;
        (x - self.center.x).abs() < half
    }
}

/// Directional intent for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveIntent {
    pub horizontal: f32,
    pub jump: bool,
}

/// The controlled entity's kinematic state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub grounded: bool,
}

impl Body {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            grounded: false,
        }
    }

    /// Teleport back to `spawn` and drop all momentum.
    pub fn reset_to(&mut self, spawn: Vec2) {
        self.position = spawn;
        self.velocity = Vec2::ZERO;
        self.grounded = false;
    }
}

/// Advance `body` by `dt` seconds. Large steps are clamped so a stalled
/// frame cannot tunnel through a platform.
pub fn step(
    body: &mut Body,
    intent: MoveIntent,
    platforms: &[Platform],
    bounds: WorldBounds,
    config: &MovementConfig,
    dt: f32,
) {
    let dt = dt.clamp(0.0, MAX_STEP_SECS);

    body.velocity.x = intent.horizontal.clamp(-1.0, 1.0) * config.move_speed;
    if intent.jump && body.grounded {
        body.velocity.y = -config.jump_velocity;
        body.grounded = false;
    }
    if !body.grounded {
        body.velocity.y += config.gravity * dt;
    }

    let previous_bottom = body.position.y + PLAYER_HALF_EXTENT;
    body.position += body.velocity * dt;

    body.position.x = body
        .position
        .x
        .clamp(PLAYER_HALF_EXTENT, bounds.width - PLAYER_HALF_EXTENT);
    if body.position.y < PLAYER_HALF_EXTENT {
        body.position.y = PLAYER_HALF_EXTENT;
        body.velocity.y = body.velocity.y.max(0.0);
    }

    body.grounded = false;
    if body.velocity.y >= 0.0 {
        let bottom = body.position.y + PLAYER_HALF_EXTENT;
        let landing = platforms
            .iter()
            .filter(|p| p.spans_x(body.position.x))
            .map(Platform::top)
            .filter(|top| previous_bottom <= *top + 0.5 && bottom >= *top)
            .fold(None, |best: Option<f32>, top| {
                Some(best.map_or(top, |b| b.min(top)))
            });
        if let Some(top) = landing {
            body.position.y = top - PLAYER_HALF_EXTENT;
            body.velocity.y = 0.0;
            body.grounded = true;
        }
    }

    let floor = bounds.height - PLAYER_HALF_EXTENT;
    if body.position.y >= floor {
        body.position.y = floor;
        body.velocity.y = 0.0;
        body.grounded = true;
    }
}
