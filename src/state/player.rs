use std::sync::Arc;

use parking_lot::Mutex;

/// Position and orientation of the local player
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Eye height; normally y + 1.62
    pub stance: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl PlayerState {
    pub const EYE_HEIGHT: f64 = 1.62;

    pub fn set_position(&mut self, x: f64, y: f64, z: f64) {
        self.x = x;
        self.y = y;
        self.z = z;
        self.stance = y + Self::EYE_HEIGHT;
    }

    pub fn set_look(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
    }
}

/// Player record shared between the receive loop, the position sender and
/// the caller
pub type SharedPlayer = Arc<Mutex<PlayerState>>;

/// What the server told us at login
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginInfo {
    pub entity_id: i32,
    pub level_type: String,
    pub game_mode: i8,
    pub dimension: i8,
    pub difficulty: i8,
    pub max_players: u8,
}

/// Miscellaneous server-driven values kept for the caller
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerStatus {
    pub world_age: i64,
    pub health: i16,
    pub food: i16,
    pub food_saturation: f32,
    pub experience_bar: f32,
    pub level: i16,
    pub total_experience: i16,
    pub spawn: Option<(i32, i32, i32)>,
    pub raining: bool,
    pub invulnerable: bool,
    pub flying: bool,
    pub can_fly: bool,
    pub instant_destroy: bool,
}
