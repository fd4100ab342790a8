//! Room physics core for a top-down action-adventure game: a layered tile
//! grid, per-entity collision resolution and an action/reaction
//! interaction system, driven one room tick at a time.

pub mod config;
pub mod debug;
pub mod ecs;
pub mod events;
pub mod geometry;
pub mod interaction;
pub mod physics;
pub mod room;
pub mod spatial;
pub mod util;

pub use config::{ConfigError, PhysicsConfig};
pub use events::{EventLog, PhysicsEvent, PhysicsHooks};
pub use room::{Room, RoomMode, RoomTransition, TickReport};
