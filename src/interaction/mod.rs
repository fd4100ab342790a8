//! Action/reaction interactions between entities, with tiles standing in
//! as participants for pushes and moving platforms.
//!
//! Each tick runs mark and sweep: `detect` confirms every record whose
//! boxes still overlap, `prune` drops the ones nobody confirmed, and
//! `trigger` runs the reaction handler of every surviving record.

pub mod types;

use std::collections::{HashMap, HashSet};

use hecs::{Entity, World};
use log::{debug, trace};

use crate::ecs::components::{Physics, PhysicsState, Position, Velocity};
use crate::geometry::Rect;
use crate::room::RoomTransition;
use crate::spatial::TileGrid;

pub use types::{
    ActionBox, InteractionArgs, InteractionBox, InteractionCollision, InteractionKey,
    InteractionLinks, InteractionType, Participant, ReactionContext, ReactionFn, Reactions,
};

/// World-space copy of an entity's interaction geometry.
struct Snapshot {
    entity: Entity,
    rect: Rect,
    enabled: bool,
    actions: smallvec::SmallVec<[ActionBox; 2]>,
}

#[derive(Default)]
pub struct InteractionManager {
    records: Vec<InteractionCollision>,
    lookup: HashMap<InteractionKey, usize>,
    snapshots: Vec<Snapshot>,
    confirmed: HashSet<InteractionKey>,
    batch: Vec<InteractionCollision>,
}

impl InteractionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &InteractionKey) -> Option<&InteractionCollision> {
        self.lookup.get(key).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionCollision> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record and the participants' links to them.
    pub fn clear(&mut self, world: &mut World, tiles: &mut TileGrid) {
        for rec in std::mem::take(&mut self.records) {
            unlink(world, tiles, &rec.key);
        }
        self.lookup.clear();
    }

    // -----------------------------------------------------------------------
    // Detect
    // -----------------------------------------------------------------------

    /// Confirm every interaction whose boxes overlap this tick. `order`
    /// is the room's entity order.
    pub fn detect(&mut self, world: &mut World, tiles: &mut TileGrid, order: &[Entity]) {
        self.confirmed.clear();
        self.snapshot(world, order);

        let snapshots = std::mem::take(&mut self.snapshots);
        for actor in snapshots.iter().filter(|s| s.enabled) {
            for action in &actor.actions {
                for target in &snapshots {
                    if target.entity == actor.entity
                        || !target.enabled
                        || !action.rect.intersects(&target.rect)
                        || !reacts_to(world, Participant::Entity(target.entity), action.kind, tiles)
                    {
                        continue;
                    }
                    let key = InteractionKey {
                        action: Participant::Entity(actor.entity),
                        reaction: Participant::Entity(target.entity),
                        kind: action.kind,
                    };
                    self.confirm(world, tiles, key, action.rect, target.rect);
                }
            }
        }
        self.snapshots = snapshots;

        self.detect_tile_contacts(world, tiles, order);
    }

    fn snapshot(&mut self, world: &World, order: &[Entity]) {
        self.snapshots.clear();
        for &entity in order {
            let Ok(pos) = world.get::<&Position>(entity) else {
                continue;
            };
            let Ok(ibox) = world.get::<&InteractionBox>(entity) else {
                continue;
            };
            self.snapshots.push(Snapshot {
                entity,
                rect: ibox.rect.translated(pos.0),
                enabled: ibox.enabled,
                actions: ibox
                    .actions
                    .iter()
                    .map(|a| ActionBox {
                        kind: a.kind,
                        rect: a.rect.translated(pos.0),
                    })
                    .collect(),
            });
        }
    }

    /// Tiles take part through the resolver's contacts: an entity leaning
    /// into a movable tile pushes it, and a moving tile acts on whatever
    /// it runs into.
    fn detect_tile_contacts(&mut self, world: &mut World, tiles: &mut TileGrid, order: &[Entity]) {
        let mut contacts: Vec<(InteractionKey, Rect, Rect)> = Vec::new();
        for &entity in order {
            let Ok(pos) = world.get::<&Position>(entity) else {
                continue;
            };
            let Ok(physics) = world.get::<&Physics>(entity) else {
                continue;
            };
            let Ok(state) = world.get::<&PhysicsState>(entity) else {
                continue;
            };
            let velocity = world
                .get::<&Velocity>(entity)
                .map(|v| v.0)
                .unwrap_or_default();
            let entity_box = physics.collision_box.translated(pos.0);

            for c in state.collisions().iter().filter(|c| c.is_colliding) {
                let (Some(id), Some(dir)) = (c.tile(), c.direction) else {
                    continue;
                };
                let Some(tile) = tiles.tile(id) else {
                    continue;
                };
                if !tile.enabled {
                    continue;
                }
                if tile.is_movable
                    && tile.reactions.reacts_to(InteractionType::Push)
                    && (c.is_resolved || velocity.dot(dir.to_vec2()) > 0.0)
                {
                    contacts.push((
                        InteractionKey {
                            action: Participant::Entity(entity),
                            reaction: Participant::Tile(id),
                            kind: InteractionType::Push,
                        },
                        entity_box,
                        tile.bounds(),
                    ));
                }
                if tile.is_moving()
                    && reacts_to(world, Participant::Entity(entity), InteractionType::MovingTile, tiles)
                {
                    contacts.push((
                        InteractionKey {
                            action: Participant::Tile(id),
                            reaction: Participant::Entity(entity),
                            kind: InteractionType::MovingTile,
                        },
                        tile.bounds(),
                        entity_box,
                    ));
                }
            }
        }
        for (key, action_box, reaction_box) in contacts {
            self.confirm(world, tiles, key, action_box, reaction_box);
        }
    }

    /// Fetch or create the record for `key` and mark it alive.
    fn confirm(
        &mut self,
        world: &mut World,
        tiles: &mut TileGrid,
        key: InteractionKey,
        action_box: Rect,
        reaction_box: Rect,
    ) {
        let first_this_tick = self.confirmed.insert(key);
        let args = InteractionArgs::between(&action_box, &reaction_box);
        if let Some(&i) = self.lookup.get(&key) {
            let rec = &mut self.records[i];
            if first_this_tick {
                rec.duration += 1;
            }
            rec.action_box = action_box;
            rec.reaction_box = reaction_box;
            rec.args = args;
            rec.auto_detected = true;
            rec.stay_alive = true;
            return;
        }

        trace!("new interaction {:?}", key);
        self.insert(
            world,
            tiles,
            InteractionCollision {
                key,
                action_box,
                reaction_box,
                args,
                auto_detected: true,
                stay_alive: true,
                duration: 1,
            },
        );
    }

    fn insert(&mut self, world: &mut World, tiles: &mut TileGrid, rec: InteractionCollision) {
        let key = rec.key;
        self.lookup.insert(key, self.records.len());
        self.records.push(rec);
        with_links(world, tiles, key.action, |links| links.actions.push(key));
        with_links(world, tiles, key.reaction, |links| links.reactions.push(key));
    }

    // -----------------------------------------------------------------------
    // Prune
    // -----------------------------------------------------------------------

    /// Remove every record not confirmed since the last prune, then reset
    /// the survivors so the next detect has to confirm them again.
    pub fn prune(&mut self, world: &mut World, tiles: &mut TileGrid) -> usize {
        let before = self.records.len();
        let mut kept = Vec::with_capacity(before);
        for rec in std::mem::take(&mut self.records) {
            if rec.stay_alive {
                kept.push(rec);
            } else {
                trace!("interaction ended {:?}", rec.key);
                unlink(world, tiles, &rec.key);
            }
        }
        self.records = kept;

        self.lookup.clear();
        for (i, rec) in self.records.iter_mut().enumerate() {
            rec.stay_alive = false;
            self.lookup.insert(rec.key, i);
        }
        before - self.records.len()
    }

    // -----------------------------------------------------------------------
    // Trigger
    // -----------------------------------------------------------------------

    /// Run the reaction handler of every record whose participants still
    /// exist and are enabled. Returns how many handlers ran.
    pub fn trigger(
        &mut self,
        world: &mut World,
        tiles: &mut TileGrid,
        transition: &mut Option<RoomTransition>,
    ) -> usize {
        // Handlers may despawn participants; work from a copy.
        let mut batch = std::mem::take(&mut self.batch);
        batch.clear();
        batch.extend(self.records.iter().cloned());

        let mut fired = 0;
        for rec in &batch {
            if !is_active(world, tiles, rec.key.action) || !is_active(world, tiles, rec.key.reaction) {
                continue;
            }
            let Some(handler) = handler_for(world, tiles, rec.key.reaction, rec.key.kind) else {
                continue;
            };
            let mut ctx = ReactionContext {
                world: &mut *world,
                tiles: &mut *tiles,
                transition: &mut *transition,
            };
            handler(&mut ctx, rec);
            fired += 1;
        }
        self.batch = batch;
        if fired > 0 {
            debug!("triggered {} reactions", fired);
        }
        fired
    }

    /// Inject a record without overlap detection. It is triggered on the
    /// next `trigger` and pruned once nothing keeps it alive.
    pub fn trigger_reaction(
        &mut self,
        world: &mut World,
        tiles: &mut TileGrid,
        key: InteractionKey,
        args: InteractionArgs,
    ) {
        if let Some(&i) = self.lookup.get(&key) {
            let rec = &mut self.records[i];
            rec.stay_alive = true;
            rec.args = args;
            return;
        }
        let action_box = participant_box(world, tiles, key.action).unwrap_or_default();
        let reaction_box = participant_box(world, tiles, key.reaction).unwrap_or_default();
        self.insert(
            world,
            tiles,
            InteractionCollision {
                key,
                action_box,
                reaction_box,
                args,
                auto_detected: false,
                stay_alive: true,
                duration: 1,
            },
        );
    }
}

/// Fire `kind` from `actor` at every entity in `order` its box overlaps,
/// right now and without keeping a record. Stops early if a handler
/// removes or disables the actor. Returns how many handlers ran.
pub fn trigger_instant_reaction(
    world: &mut World,
    tiles: &mut TileGrid,
    transition: &mut Option<RoomTransition>,
    order: &[Entity],
    actor: Entity,
    kind: InteractionType,
) -> usize {
    let Some(action_box) = action_box_for(world, actor, kind) else {
        return 0;
    };
    let mut fired = 0;
    for &target in order {
        if !is_active(world, tiles, Participant::Entity(actor)) {
            break;
        }
        if target == actor || !is_active(world, tiles, Participant::Entity(target)) {
            continue;
        }
        let Some(reaction_box) = participant_box(world, tiles, Participant::Entity(target)) else {
            continue;
        };
        if !action_box.intersects(&reaction_box) {
            continue;
        }
        let Some(handler) = handler_for(world, tiles, Participant::Entity(target), kind) else {
            continue;
        };
        let rec = InteractionCollision {
            key: InteractionKey {
                action: Participant::Entity(actor),
                reaction: Participant::Entity(target),
                kind,
            },
            action_box,
            reaction_box,
            args: InteractionArgs::between(&action_box, &reaction_box),
            auto_detected: false,
            stay_alive: false,
            duration: 1,
        };
        let mut ctx = ReactionContext {
            world: &mut *world,
            tiles: &mut *tiles,
            transition: &mut *transition,
        };
        handler(&mut ctx, &rec);
        fired += 1;
    }
    fired
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

fn is_active(world: &World, tiles: &TileGrid, p: Participant) -> bool {
    match p {
        Participant::Entity(e) => {
            world.contains(e)
                && world
                    .get::<&InteractionBox>(e)
                    .map(|b| b.enabled)
                    .unwrap_or(true)
        }
        Participant::Tile(id) => tiles.tile(id).is_some_and(|t| t.enabled),
    }
}

fn handler_for(world: &World, tiles: &TileGrid, p: Participant, kind: InteractionType) -> Option<ReactionFn> {
    match p {
        Participant::Entity(e) => world.get::<&Reactions>(e).ok()?.handler(kind),
        Participant::Tile(id) => tiles.tile(id)?.reactions.handler(kind),
    }
}

fn reacts_to(world: &World, p: Participant, kind: InteractionType, tiles: &TileGrid) -> bool {
    handler_for(world, tiles, p, kind).is_some()
}

/// World-space interaction box of an entity, or the bounds of a tile.
fn participant_box(world: &World, tiles: &TileGrid, p: Participant) -> Option<Rect> {
    match p {
        Participant::Entity(e) => {
            let pos = world.get::<&Position>(e).ok()?.0;
            let rect = world.get::<&InteractionBox>(e).ok()?.rect;
            Some(rect.translated(pos))
        }
        Participant::Tile(id) => tiles.tile(id).map(|t| t.bounds()),
    }
}

/// The actor's box for `kind`, falling back to its whole interaction box.
fn action_box_for(world: &World, actor: Entity, kind: InteractionType) -> Option<Rect> {
    let pos = world.get::<&Position>(actor).ok()?.0;
    let ibox = world.get::<&InteractionBox>(actor).ok()?;
    let local = ibox
        .actions
        .iter()
        .find(|a| a.kind == kind)
        .map_or(ibox.rect, |a| a.rect);
    Some(local.translated(pos))
}

fn with_links(world: &mut World, tiles: &mut TileGrid, p: Participant, f: impl FnOnce(&mut InteractionLinks)) {
    match p {
        Participant::Entity(e) => {
            if let Ok(mut links) = world.get::<&mut InteractionLinks>(e) {
                f(&mut links);
                return;
            }
            if world.contains(e) {
                let mut links = InteractionLinks::default();
                f(&mut links);
                let _ = world.insert_one(e, links);
            }
        }
        Participant::Tile(id) => {
            if let Some(tile) = tiles.tile_mut(id) {
                f(&mut tile.links);
            }
        }
    }
}

fn unlink(world: &mut World, tiles: &mut TileGrid, key: &InteractionKey) {
    with_links(world, tiles, key.action, |links| links.unlink(key));
    with_links(world, tiles, key.reaction, |links| links.unlink(key));
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[derive(Debug, Default)]
    struct Hits(u32);

    fn count_hit(ctx: &mut ReactionContext<'_>, rec: &InteractionCollision) {
        if let Participant::Entity(e) = rec.key.reaction {
            if let Ok(mut hits) = ctx.world.get::<&mut Hits>(e) {
                hits.0 += 1;
            }
        }
    }

    fn despawn_actor(ctx: &mut ReactionContext<'_>, rec: &InteractionCollision) {
        count_hit(ctx, rec);
        if let Participant::Entity(e) = rec.key.action {
            let _ = ctx.world.despawn(e);
        }
    }

    fn square() -> Rect {
        Rect::centered(Vec2::splat(8.0))
    }

    fn sword_at(world: &mut World, x: f32) -> Entity {
        world.spawn((
            Position(Vec2::new(x, 0.0)),
            InteractionBox::new(square()).with_action(InteractionType::Sword),
        ))
    }

    fn target_at(world: &mut World, x: f32) -> Entity {
        world.spawn((
            Position(Vec2::new(x, 0.0)),
            InteractionBox::new(square()),
            Reactions::new().on(InteractionType::Sword, count_hit),
            Hits::default(),
        ))
    }

    fn run_tick(
        manager: &mut InteractionManager,
        world: &mut World,
        tiles: &mut TileGrid,
        order: &[Entity],
    ) -> usize {
        manager.detect(world, tiles, order);
        manager.prune(world, tiles);
        manager.trigger(world, tiles, &mut None)
    }

    #[test]
    fn duration_counts_confirmed_ticks() {
        let mut world = World::new();
        let mut tiles = TileGrid::new(4, 4, 1, 16.0);
        let sword = sword_at(&mut world, 0.0);
        let target = target_at(&mut world, 6.0);
        let order = [sword, target];
        let mut manager = InteractionManager::new();

        for _ in 0..3 {
            assert_eq!(run_tick(&mut manager, &mut world, &mut tiles, &order), 1);
        }
        let key = InteractionKey {
            action: Participant::Entity(sword),
            reaction: Participant::Entity(target),
            kind: InteractionType::Sword,
        };
        assert_eq!(manager.get(&key).map(|r| r.duration), Some(3));
        assert_eq!(world.get::<&Hits>(target).unwrap().0, 3);
        assert_eq!(world.get::<&InteractionLinks>(target).unwrap().reactions, vec![key]);

        world.get::<&mut Position>(target).unwrap().0.x = 40.0;
        assert_eq!(run_tick(&mut manager, &mut world, &mut tiles, &order), 0);
        assert!(manager.is_empty());
        assert!(world.get::<&InteractionLinks>(target).unwrap().is_empty());
        assert!(world.get::<&InteractionLinks>(sword).unwrap().is_empty());
    }

    #[test]
    fn disabled_target_is_not_triggered() {
        let mut world = World::new();
        let mut tiles = TileGrid::new(4, 4, 1, 16.0);
        let sword = sword_at(&mut world, 0.0);
        let target = target_at(&mut world, 6.0);
        world.get::<&mut InteractionBox>(target).unwrap().enabled = false;
        let mut manager = InteractionManager::new();
        assert_eq!(run_tick(&mut manager, &mut world, &mut tiles, &[sword, target]), 0);
        assert_eq!(world.get::<&Hits>(target).unwrap().0, 0);
    }

    #[test]
    fn injected_reaction_fires_once() {
        let mut world = World::new();
        let mut tiles = TileGrid::new(4, 4, 1, 16.0);
        let sword = sword_at(&mut world, 0.0);
        let target = target_at(&mut world, 100.0);
        let order = [sword, target];
        let mut manager = InteractionManager::new();
        let key = InteractionKey {
            action: Participant::Entity(sword),
            reaction: Participant::Entity(target),
            kind: InteractionType::Sword,
        };
        manager.trigger_reaction(&mut world, &mut tiles, key, InteractionArgs::default());
        assert_eq!(manager.get(&key).map(|r| r.auto_detected), Some(false));

        assert_eq!(run_tick(&mut manager, &mut world, &mut tiles, &order), 1);
        assert_eq!(run_tick(&mut manager, &mut world, &mut tiles, &order), 0);
        assert_eq!(world.get::<&Hits>(target).unwrap().0, 1);
    }

    #[test]
    fn instant_reaction_stops_when_actor_is_gone() {
        let mut world = World::new();
        let mut tiles = TileGrid::new(4, 4, 1, 16.0);
        let bomb = world.spawn((
            Position(Vec2::ZERO),
            InteractionBox::new(square()).with_action_box(InteractionType::Bomb, Rect::centered(Vec2::splat(64.0))),
        ));
        let mut targets = Vec::new();
        for x in [10.0, 20.0] {
            targets.push(world.spawn((
                Position(Vec2::new(x, 0.0)),
                InteractionBox::new(square()),
                Reactions::new().on(InteractionType::Bomb, despawn_actor),
                Hits::default(),
            )));
        }
        let order = [bomb, targets[0], targets[1]];
        let fired = trigger_instant_reaction(
            &mut world,
            &mut tiles,
            &mut None,
            &order,
            bomb,
            InteractionType::Bomb,
        );
        assert_eq!(fired, 1);
        assert_eq!(world.get::<&Hits>(targets[1]).unwrap().0, 0);
    }
}
