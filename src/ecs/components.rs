use glam::Vec2;

use crate::config::{DEFAULT_GRAVITY, DEFAULT_MAX_FALL_SPEED};
use crate::geometry::{Direction, Rect};
use crate::physics::collision::Collision;
use crate::spatial::TileId;
use crate::util::ring::RingBuffer;

/// World position in pixels. The collision box is relative to it.
#[derive(Debug, Clone, Copy)]
pub struct Position(pub Vec2);

/// Velocity in pixels per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity(pub Vec2);

/// Height above the ground in top-down rooms.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZMotion {
    pub z: f32,
    /// Positive is upward.
    pub velocity: f32,
}

impl ZMotion {
    pub fn is_airborne(&self) -> bool {
        self.z > 0.0 || self.velocity > 0.0
    }
}

/// Spawn order within the room. Lower indices win collision ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityIndex(pub u32);

/// Marks the entity the resolver processes last each tick.
#[derive(Debug, Clone, Copy)]
pub struct Player;

/// Ladder intent written by whatever drives the entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClimbInput {
    pub up: bool,
    pub down: bool,
}

/// Physics flags and tuning for one entity.
#[derive(Debug, Clone)]
pub struct Physics {
    pub enabled: bool,
    /// Entity-local collision box.
    pub collision_box: Rect,
    /// Collide with tiles and solid entities.
    pub collide_with_world: bool,
    pub collide_with_room_edge: bool,
    /// Other entities collide against this one.
    pub is_solid: bool,
    pub has_gravity: bool,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub bounces: bool,
    /// Velocity is reflected instead of zeroed when blocked.
    pub reboundable: bool,
    pub is_crushable: bool,
    /// Crushed when the gap between a pushing solid and the solid behind
    /// the entity drops below this.
    pub crush_max_gap: f32,
    /// Zero disables corner dodging.
    pub auto_dodge_distance: f32,
    pub auto_dodge_speed: f32,
    /// Overlap tolerated against static tiles and entities.
    pub edge_clip_amount: f32,
    pub pass_over_ledges: bool,
    pub pass_over_half_solids: bool,
    pub moves_with_platforms: bool,
    pub moves_with_conveyors: bool,
    pub check_hazards: bool,
    pub destroy_outside_room: bool,
    pub can_climb: bool,
}

impl Physics {
    pub fn new(collision_box: Rect) -> Self {
        Self {
            enabled: true,
            collision_box,
            collide_with_world: true,
            collide_with_room_edge: false,
            is_solid: false,
            has_gravity: false,
            gravity: DEFAULT_GRAVITY,
            max_fall_speed: DEFAULT_MAX_FALL_SPEED,
            bounces: false,
            reboundable: false,
            is_crushable: false,
            crush_max_gap: collision_box.size.min_element(),
            auto_dodge_distance: 0.0,
            auto_dodge_speed: 0.0,
            edge_clip_amount: 0.0,
            pass_over_ledges: false,
            pass_over_half_solids: false,
            moves_with_platforms: false,
            moves_with_conveyors: false,
            check_hazards: false,
            destroy_outside_room: false,
            can_climb: false,
        }
    }
}

/// Resolver output and cross-tick bookkeeping.
#[derive(Debug, Default)]
pub struct PhysicsState {
    /// Slot 0 is this tick, slot 1 the previous one.
    pub(crate) collisions: RingBuffer<Vec<Collision>, 2>,
    pub surface_tile: Option<TileId>,
    /// Platform or conveyor velocity applied this tick.
    pub surface_velocity: Vec2,
    pub is_on_ground: bool,
    pub was_on_ground: bool,
    pub is_climbing: bool,
    pub is_crushed: bool,
    /// Ledges crossed downward and not yet climbed back over.
    pub ledge_altitude: i32,
    pub(crate) ledge_tile: Option<TileId>,
}

impl PhysicsState {
    pub fn collisions(&self) -> &[Collision] {
        self.collisions.current()
    }

    pub fn previous_collisions(&self) -> &[Collision] {
        self.collisions.back(1)
    }

    pub fn collision_in(&self, dir: Direction) -> Option<&Collision> {
        self.collisions()
            .iter()
            .find(|c| c.is_colliding && c.direction == Some(dir))
    }

    pub fn is_colliding_in(&self, dir: Direction) -> bool {
        self.collision_in(dir).is_some()
    }

    pub fn was_colliding_in(&self, dir: Direction) -> bool {
        self.previous_collisions()
            .iter()
            .any(|c| c.is_colliding && c.direction == Some(dir))
    }

    /// Contact in `dir` this tick but not the one before.
    pub fn began_colliding_in(&self, dir: Direction) -> bool {
        self.is_colliding_in(dir) && !self.was_colliding_in(dir)
    }

    pub fn is_colliding(&self) -> bool {
        self.collisions().iter().any(|c| c.is_colliding)
    }
}
