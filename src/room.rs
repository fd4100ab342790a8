use glam::{IVec2, Vec2};
use hecs::{DynamicBundle, Entity, World};
use log::{debug, info};

use crate::config::PhysicsConfig;
use crate::debug::timer::{SystemPhase, SystemTimers};
use crate::ecs::components::{EntityIndex, Physics, PhysicsState, Player, Position, Velocity, ZMotion};
use crate::events::PhysicsHooks;
use crate::geometry::{Direction, Rect};
use crate::interaction::{
    self, InteractionArgs, InteractionBox, InteractionKey, InteractionLinks, InteractionManager,
    InteractionType, Reactions,
};
use crate::physics::{PhysicsContext, RoomPhysics};
use crate::spatial::{TileGrid, TileId};

pub use crate::physics::RoomMode;

/// A request to leave the room, reported at the end of the tick it was
/// made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomTransition {
    /// Destination room, if the requester knows it.
    pub target: Option<IVec2>,
    /// Side of this room the exit is on.
    pub direction: Option<Direction>,
}

impl RoomTransition {
    pub fn toward(direction: Direction) -> Self {
        Self {
            target: None,
            direction: Some(direction),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub transition: Option<RoomTransition>,
}

/// One room: its entities, tiles, resolver and interactions.
pub struct Room {
    pub world: World,
    pub tiles: TileGrid,
    mode: RoomMode,
    physics: RoomPhysics,
    interactions: InteractionManager,
    /// Spawn order. The resolver and interactions walk entities in it.
    order: Vec<Entity>,
    player: Option<Entity>,
    next_index: u32,
    pending_transition: Option<RoomTransition>,
    moving: Vec<TileId>,
    timers: SystemTimers,
    tick_count: u64,
}

impl Room {
    /// Panics on an invalid config or an empty grid.
    pub fn new(config: PhysicsConfig, width: u32, height: u32, layers: usize, mode: RoomMode) -> Self {
        if let Err(e) = config.validate() {
            panic!("{e}");
        }
        let tiles = TileGrid::new(width, height, layers, config.cell_size);
        info!(
            "room {}x{} cells, {} layers, {:?}",
            width, height, layers, mode
        );
        Self {
            world: World::new(),
            tiles,
            mode,
            physics: RoomPhysics::new(config),
            interactions: InteractionManager::new(),
            order: Vec::new(),
            player: None,
            next_index: 0,
            pending_transition: None,
            moving: Vec::new(),
            timers: SystemTimers::new(),
            tick_count: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Spawn an entity at the end of the room order. Physics bodies get
    /// any missing `Velocity`, `ZMotion` and `PhysicsState`.
    pub fn spawn(&mut self, bundle: impl DynamicBundle) -> Entity {
        let entity = self.world.spawn(bundle);
        let _ = self.world.insert_one(entity, EntityIndex(self.next_index));
        self.next_index += 1;

        if self.world.get::<&Physics>(entity).is_ok() {
            if self.world.get::<&Velocity>(entity).is_err() {
                let _ = self.world.insert_one(entity, Velocity::default());
            }
            if self.world.get::<&ZMotion>(entity).is_err() {
                let _ = self.world.insert_one(entity, ZMotion::default());
            }
            if self.world.get::<&PhysicsState>(entity).is_err() {
                let _ = self.world.insert_one(entity, PhysicsState::default());
            }
        }
        let interacts = self.world.get::<&InteractionBox>(entity).is_ok()
            || self.world.get::<&Reactions>(entity).is_ok();
        if interacts && self.world.get::<&InteractionLinks>(entity).is_err() {
            let _ = self.world.insert_one(entity, InteractionLinks::default());
        }

        self.order.push(entity);
        entity
    }

    /// Spawn the entity the resolver runs last and whose exit through the
    /// room bounds requests a transition.
    pub fn spawn_player(&mut self, bundle: impl DynamicBundle) -> Entity {
        let entity = self.spawn(bundle);
        let _ = self.world.insert_one(entity, Player);
        self.player = Some(entity);
        entity
    }

    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.order.retain(|&e| e != entity);
        if self.player == Some(entity) {
            self.player = None;
        }
        self.world.despawn(entity).is_ok()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.order
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    pub fn bounds(&self) -> Rect {
        self.tiles.bounds()
    }

    pub fn mode(&self) -> RoomMode {
        self.mode
    }

    pub fn config(&self) -> &PhysicsConfig {
        self.physics.config()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn timers(&self) -> &SystemTimers {
        &self.timers
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    pub fn interactions(&self) -> &InteractionManager {
        &self.interactions
    }

    /// Drop every live interaction and unlink its participants.
    pub fn clear_interactions(&mut self) {
        self.interactions.clear(&mut self.world, &mut self.tiles);
    }

    /// Queue a reaction for the next trigger pass without overlap detection.
    pub fn trigger_reaction(&mut self, key: InteractionKey, args: InteractionArgs) {
        self.interactions
            .trigger_reaction(&mut self.world, &mut self.tiles, key, args);
    }

    /// Fire `kind` from `actor` at everything its box overlaps right now.
    pub fn trigger_instant_reaction(&mut self, actor: Entity, kind: InteractionType) -> usize {
        interaction::trigger_instant_reaction(
            &mut self.world,
            &mut self.tiles,
            &mut self.pending_transition,
            &self.order,
            actor,
            kind,
        )
    }

    /// Reported at the end of the current (or next) tick.
    pub fn request_transition(&mut self, transition: RoomTransition) {
        self.pending_transition = Some(transition);
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    pub fn tick<H: PhysicsHooks>(&mut self, hooks: &mut H) -> TickReport {
        self.tick_count += 1;

        self.timers.begin();
        self.update_tile_motion();
        self.timers.end(SystemPhase::TileMotion);

        self.timers.begin();
        let bounds = self.tiles.bounds();
        let mut ctx = PhysicsContext {
            world: &mut self.world,
            tiles: &self.tiles,
            bounds,
            mode: self.mode,
        };
        self.physics.update(&mut ctx, &self.order, self.player, hooks);
        self.retain_live();
        self.check_player_exit(bounds);
        self.timers.end(SystemPhase::Physics);

        self.timers.begin();
        self.interactions
            .detect(&mut self.world, &mut self.tiles, &self.order);
        self.interactions.prune(&mut self.world, &mut self.tiles);
        self.interactions
            .trigger(&mut self.world, &mut self.tiles, &mut self.pending_transition);
        self.retain_live();
        self.timers.end(SystemPhase::Interaction);

        let transition = self.pending_transition.take();
        if let Some(t) = &transition {
            debug!("tick {}: room transition {:?}", self.tick_count, t);
        }
        TickReport {
            tick: self.tick_count,
            transition,
        }
    }

    /// Advance moving tiles. A tile whose travel is used up stops and
    /// snaps to its nearest cell.
    fn update_tile_motion(&mut self) {
        self.moving.clear();
        self.moving
            .extend(self.tiles.tiles().filter(|t| t.is_moving()).map(|t| t.id()));

        for i in 0..self.moving.len() {
            let id = self.moving[i];
            let Some(tile) = self.tiles.tile_mut(id) else {
                continue;
            };
            if tile.motion.remaining <= 0.0 {
                tile.motion.velocity = Vec2::ZERO;
                tile.motion.remaining = 0.0;
                self.tiles.refresh_tile(id);
                if let Some((location, layer)) = self.tiles.tile(id).map(|t| (t.location(), t.layer())) {
                    self.tiles.place_tile(id, location, layer);
                }
                continue;
            }
            let speed = tile.motion.velocity.length();
            let step = speed.min(tile.motion.remaining);
            tile.position += tile.motion.velocity / speed * step;
            tile.motion.remaining -= step;
            self.tiles.refresh_tile(id);
        }
    }

    fn retain_live(&mut self) {
        let world = &self.world;
        self.order.retain(|&e| world.contains(e));
        if self.player.is_some_and(|p| !world.contains(p)) {
            self.player = None;
        }
    }

    fn check_player_exit(&mut self, bounds: Rect) {
        if self.pending_transition.is_some() {
            return;
        }
        let Some(player) = self.player else {
            return;
        };
        let Ok(pos) = self.world.get::<&Position>(player).map(|p| p.0) else {
            return;
        };
        let side = if pos.x < bounds.left() {
            Direction::Left
        } else if pos.x >= bounds.right() {
            Direction::Right
        } else if pos.y < bounds.top() {
            Direction::Up
        } else if pos.y >= bounds.bottom() {
            Direction::Down
        } else {
            return;
        };
        debug!("player left the room {:?}", side);
        self.pending_transition = Some(RoomTransition::toward(side));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::spatial::{CollisionModel, Tile, TileMotion};

    fn room() -> Room {
        Room::new(PhysicsConfig::default(), 10, 8, 2, RoomMode::TopDown)
    }

    #[test]
    fn spawn_fills_in_physics_components() {
        let mut room = room();
        let a = room.spawn((
            Position(Vec2::new(20.0, 20.0)),
            Physics::new(Rect::centered(Vec2::splat(8.0))),
        ));
        let b = room.spawn((Position(Vec2::ZERO),));
        assert!(room.world.get::<&PhysicsState>(a).is_ok());
        assert!(room.world.get::<&Velocity>(a).is_ok());
        assert!(room.world.get::<&PhysicsState>(b).is_err());
        assert_eq!(*room.world.get::<&EntityIndex>(b).unwrap(), EntityIndex(1));
        assert_eq!(room.entities(), &[a, b]);
    }

    #[test]
    fn moving_tile_stops_and_rehomes() {
        let mut room = room();
        let id = room.tiles.add_tile(
            Tile::solid(CollisionModel::block(16.0)),
            IVec2::new(1, 1),
            0,
        );
        if let Some(tile) = room.tiles.tile_mut(id) {
            tile.start_move(Direction::Right, 32.0, 3.0);
        }
        for _ in 0..12 {
            room.tick(&mut ());
        }
        let tile = room.tiles.tile(id).unwrap();
        assert!(!tile.is_moving());
        assert_eq!(tile.position, Vec2::new(48.0, 16.0));
        assert_eq!(tile.location(), IVec2::new(3, 1));
        assert_eq!(room.tiles.tile_at(IVec2::new(3, 1), 0).map(|t| t.id()), Some(id));
        assert!(room.tiles.tile_at(IVec2::new(1, 1), 0).is_none());
        assert_eq!(tile.motion, TileMotion::default());
    }

    #[test]
    fn transition_is_reported_at_end_of_tick() {
        let mut room = room();
        room.request_transition(RoomTransition {
            target: Some(IVec2::new(2, 0)),
            direction: None,
        });
        let report = room.tick(&mut ());
        assert_eq!(report.tick, 1);
        assert_eq!(report.transition.and_then(|t| t.target), Some(IVec2::new(2, 0)));
        assert_eq!(room.tick(&mut ()).transition, None);
    }

    #[test]
    fn player_leaving_requests_transition() {
        let mut room = room();
        let player = room.spawn_player((
            Position(Vec2::new(4.0, 40.0)),
            Velocity(Vec2::new(-6.0, 0.0)),
            Physics::new(Rect::centered(Vec2::splat(8.0))),
        ));
        let mut log = EventLog::new();
        let report = room.tick(&mut log);
        assert_eq!(report.transition, Some(RoomTransition::toward(Direction::Left)));
        assert!(room.world.contains(player));
        assert_eq!(room.player(), Some(player));
    }

    #[test]
    #[should_panic(expected = "invalid physics config")]
    fn invalid_config_panics() {
        let config = PhysicsConfig {
            cell_size: 0.0,
            ..PhysicsConfig::default()
        };
        Room::new(config, 4, 4, 1, RoomMode::TopDown);
    }
}
