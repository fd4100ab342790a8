use hecs::{Entity, World};

use crate::geometry::Axis;
use crate::spatial::Hazard;

/// Callbacks the resolver fires while processing an entity.
///
/// The entity's components are written back to the world before every
/// hook, so a hook sees up-to-date state and may despawn the entity; the
/// resolver stops processing an entity that no longer exists.
pub trait PhysicsHooks {
    fn on_land(&mut self, _world: &mut World, _entity: Entity) {}

    fn on_bounce(&mut self, _world: &mut World, _entity: Entity) {}

    /// `axis` is the axis the entity was squeezed along.
    fn on_crush(&mut self, _world: &mut World, _entity: Entity, _axis: Axis) {}

    fn on_fall_in_hazard(&mut self, _world: &mut World, _entity: Entity, _hazard: Hazard) {}

    fn on_begin_falling(&mut self, _world: &mut World, _entity: Entity) {}

    fn on_ladder_transition(&mut self, _world: &mut World, _entity: Entity, _climbing: bool) {}

    /// Called right before an entity that left the room is despawned.
    fn on_leave_room(&mut self, _world: &mut World, _entity: Entity) {}
}

impl PhysicsHooks for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsEvent {
    Landed(Entity),
    Bounced(Entity),
    Crushed { entity: Entity, axis: Axis },
    FellInHazard { entity: Entity, hazard: Hazard },
    BeganFalling(Entity),
    LadderChanged { entity: Entity, climbing: bool },
    LeftRoom(Entity),
}

/// Hooks that only record what happened.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<PhysicsEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, PhysicsEvent> {
        self.events.drain(..)
    }

    pub fn count(&self, pred: impl Fn(&PhysicsEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl PhysicsHooks for EventLog {
    fn on_land(&mut self, _world: &mut World, entity: Entity) {
        self.events.push(PhysicsEvent::Landed(entity));
    }

    fn on_bounce(&mut self, _world: &mut World, entity: Entity) {
        self.events.push(PhysicsEvent::Bounced(entity));
    }

    fn on_crush(&mut self, _world: &mut World, entity: Entity, axis: Axis) {
        self.events.push(PhysicsEvent::Crushed { entity, axis });
    }

    fn on_fall_in_hazard(&mut self, _world: &mut World, entity: Entity, hazard: Hazard) {
        self.events.push(PhysicsEvent::FellInHazard { entity, hazard });
    }

    fn on_begin_falling(&mut self, _world: &mut World, entity: Entity) {
        self.events.push(PhysicsEvent::BeganFalling(entity));
    }

    fn on_ladder_transition(&mut self, _world: &mut World, entity: Entity, climbing: bool) {
        self.events.push(PhysicsEvent::LadderChanged { entity, climbing });
    }

    fn on_leave_room(&mut self, _world: &mut World, entity: Entity) {
        self.events.push(PhysicsEvent::LeftRoom(entity));
    }
}
