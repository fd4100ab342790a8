use glam::Vec2;
use hecs::{Entity, World};

use crate::ecs::components::{
    ClimbInput, EntityIndex, Physics, PhysicsState, Position, Velocity, ZMotion,
};
use crate::geometry::Rect;

/// An entity's physics components, copied out of the world while the
/// resolver works on it and written back before any hook runs.
pub(crate) struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub z: ZMotion,
    pub physics: Physics,
    pub state: PhysicsState,
    pub input: ClimbInput,
    pub index: u32,
}

impl Body {
    /// `None` if the entity is gone or is not a physics body.
    pub fn load(world: &World, entity: Entity) -> Option<Self> {
        let position = world.get::<&Position>(entity).ok()?.0;
        let physics = (*world.get::<&Physics>(entity).ok()?).clone();
        let velocity = world
            .get::<&Velocity>(entity)
            .map(|v| v.0)
            .unwrap_or_default();
        let z = world.get::<&ZMotion>(entity).map(|z| *z).unwrap_or_default();
        let input = world
            .get::<&ClimbInput>(entity)
            .map(|c| *c)
            .unwrap_or_default();
        let index = world
            .get::<&EntityIndex>(entity)
            .map(|i| i.0)
            .unwrap_or(u32::MAX);
        // Taken last so a failed lookup above never drops the buffers.
        let state = std::mem::take(&mut *world.get::<&mut PhysicsState>(entity).ok()?);
        Some(Self {
            position,
            velocity,
            z,
            physics,
            state,
            input,
            index,
        })
    }

    pub fn store(self, world: &World, entity: Entity) {
        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            pos.0 = self.position;
        }
        if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
            vel.0 = self.velocity;
        }
        if let Ok(mut z) = world.get::<&mut ZMotion>(entity) {
            *z = self.z;
        }
        if let Ok(mut state) = world.get::<&mut PhysicsState>(entity) {
            *state = self.state;
        }
    }

    pub fn collision_box(&self) -> Rect {
        self.physics.collision_box.translated(self.position)
    }

    /// Displacement this tick: own velocity plus whatever the surface adds.
    pub fn motion(&self) -> Vec2 {
        self.velocity + self.state.surface_velocity
    }
}
