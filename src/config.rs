use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Per-entity defaults
// ---------------------------------------------------------------------------

/// Default downward acceleration per tick (Z in top-down rooms, Y in side-scroll).
pub const DEFAULT_GRAVITY: f32 = 0.125;
/// Default terminal fall speed per tick.
pub const DEFAULT_MAX_FALL_SPEED: f32 = 4.0;
/// Grid cell size in pixels.
pub const DEFAULT_CELL_SIZE: f32 = 16.0;

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Room-wide tuning for the resolver. Handed to a `Room` at construction;
/// nothing in the physics core reads global state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Tolerance for seam, edge and touching comparisons.
    pub epsilon: f32,
    /// Size of one grid cell in pixels.
    pub cell_size: f32,
    /// Fraction of the impact Z speed kept when an entity bounces.
    pub bounce_factor: f32,
    /// Lateral velocity multiplier applied on every bounce.
    pub bounce_lateral_damping: f32,
    /// Rebounds slower than this become a landing instead.
    pub min_bounce_speed: f32,
    /// Highest step (pixels) a grounded side-scroll entity may snap up onto.
    pub snap_height: f32,
    /// How far past a corner the dodge probe looks along the blocked axis.
    pub dodge_probe_distance: f32,
    /// Extra margin around the swept box when gathering potential collisions.
    pub collision_margin: f32,
    /// Depth of the solid band placed outside each room edge.
    pub room_edge_depth: f32,
    /// Distance an entity is nudged into a ladder when climbing down onto it.
    pub ladder_entry_offset: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            cell_size: DEFAULT_CELL_SIZE,
            bounce_factor: 0.5,
            bounce_lateral_damping: 0.5,
            min_bounce_speed: 1.0,
            snap_height: 3.0,
            dodge_probe_distance: 1.0,
            collision_margin: 1.0,
            room_edge_depth: 64.0,
            ladder_entry_offset: 1.0,
        }
    }
}

impl PhysicsConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PhysicsConfig = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "epsilon must be in (0, 1), got {}",
                self.epsilon
            )));
        }
        if !(self.cell_size >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cell_size must be at least 1 pixel, got {}",
                self.cell_size
            )));
        }
        if !(0.0..=1.0).contains(&self.bounce_factor) {
            return Err(ConfigError::Invalid(format!(
                "bounce_factor must be in [0, 1], got {}",
                self.bounce_factor
            )));
        }
        let non_negative = [
            ("min_bounce_speed", self.min_bounce_speed),
            ("snap_height", self.snap_height),
            ("dodge_probe_distance", self.dodge_probe_distance),
            ("collision_margin", self.collision_margin),
            ("room_edge_depth", self.room_edge_depth),
            ("ladder_entry_offset", self.ladder_entry_offset),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read physics config: {e}"),
            ConfigError::Parse(e) => write!(f, "malformed physics config: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid physics config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}
