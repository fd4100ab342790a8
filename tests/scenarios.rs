use std::sync::Arc;

use glam::{IVec2, Vec2};
use hecs::Entity;

use roomphys::ecs::components::{ClimbInput, Physics, PhysicsState, Position, Velocity, ZMotion};
use roomphys::geometry::{Axis, Direction, Rect};
use roomphys::interaction::{
    InteractionBox, InteractionCollision, InteractionKey, InteractionLinks, InteractionType,
    Participant, ReactionContext, Reactions,
};
use roomphys::spatial::{CollisionModel, CollisionStyle, Hazard, Solidity, Tile, TileMotion};
use roomphys::{EventLog, PhysicsConfig, PhysicsEvent, Room, RoomMode};

const EPS: f32 = 0.001;

fn room(mode: RoomMode) -> Room {
    Room::new(PhysicsConfig::default(), 10, 8, 1, mode)
}

fn body(size: f32) -> Physics {
    Physics::new(Rect::centered(Vec2::splat(size)))
}

fn block(room: &mut Room, x: i32, y: i32) {
    room.tiles
        .add_tile(Tile::solid(CollisionModel::block(16.0)), IVec2::new(x, y), 0);
}

fn position(room: &Room, e: Entity) -> Vec2 {
    room.world.get::<&Position>(e).unwrap().0
}

fn velocity(room: &Room, e: Entity) -> Vec2 {
    room.world.get::<&Velocity>(e).unwrap().0
}

fn set_velocity(room: &mut Room, e: Entity, v: Vec2) {
    room.world.get::<&mut Velocity>(e).unwrap().0 = v;
}

#[test]
fn walks_into_a_partial_wall() {
    let mut room = room(RoomMode::TopDown);
    let model = CollisionModel::new(CollisionStyle::Rectangular).with_box(Rect::new(4.0, 0.0, 12.0, 16.0));
    room.tiles
        .add_tile(Tile::solid(Arc::new(model)), IVec2::new(1, 0), 0);
    let e = room.spawn((Position(Vec2::new(10.0, 8.0)), Velocity(Vec2::new(5.0, 0.0)), body(4.0)));

    let mut log = EventLog::new();
    for _ in 0..3 {
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e).x, 18.0);
    assert_eq!(velocity(&room, e), Vec2::ZERO);
    let state = room.world.get::<&PhysicsState>(e).unwrap();
    assert!(state.is_colliding_in(Direction::Right));
}

#[test]
fn bounce_halves_speeds() {
    let mut room = room(RoomMode::TopDown);
    let mut physics = body(8.0);
    physics.has_gravity = true;
    physics.gravity = 1.0;
    physics.max_fall_speed = 10.0;
    physics.bounces = true;
    let e = room.spawn((
        Position(Vec2::new(40.0, 40.0)),
        Velocity(Vec2::new(2.0, 0.0)),
        ZMotion { z: 10.0, velocity: -2.0 },
        physics,
    ));

    let mut log = EventLog::new();
    for _ in 0..3 {
        room.tick(&mut log);
    }
    let z = *room.world.get::<&ZMotion>(e).unwrap();
    assert_eq!(z.z, 0.0);
    assert_eq!(z.velocity, 2.5);
    assert_eq!(velocity(&room, e), Vec2::new(1.0, 0.0));
    assert_eq!(log.events, vec![PhysicsEvent::Bounced(e)]);
}

#[test]
fn seam_between_floor_tiles_never_blocks() {
    let mut room = room(RoomMode::TopDown);
    block(&mut room, 2, 4);
    block(&mut room, 3, 4);
    let e = room.spawn((Position(Vec2::new(48.0, 60.0)), Velocity(Vec2::new(1.0, 0.5)), body(8.0)));

    let mut log = EventLog::new();
    for _ in 0..3 {
        room.tick(&mut log);
        let state = room.world.get::<&PhysicsState>(e).unwrap();
        assert!(state
            .collisions()
            .iter()
            .all(|c| c.direction.map(Direction::axis) != Some(Axis::X)));
    }
    assert_eq!(position(&room, e), Vec2::new(51.0, 60.0));
}

#[test]
fn edge_clip_slides_past_wall_seams() {
    let mut room = room(RoomMode::TopDown);
    for y in 0..8 {
        block(&mut room, 3, y);
    }
    let mut physics = body(8.0);
    physics.edge_clip_amount = 1.0;
    let e = room.spawn((Position(Vec2::new(44.5, 20.0)), Velocity(Vec2::new(0.0, 2.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..5 {
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e), Vec2::new(44.5, 30.0));
    assert_eq!(velocity(&room, e), Vec2::new(0.0, 2.0));
}

#[test]
fn diagonal_approach_to_a_lone_corner() {
    let mut room = room(RoomMode::TopDown);
    block(&mut room, 3, 3);
    let e = room.spawn((Position(Vec2::new(42.0, 43.5)), Velocity(Vec2::new(3.0, 1.5)), body(8.0)));
    let tile_box = Rect::new(48.0, 48.0, 16.0, 16.0);

    let mut log = EventLog::new();
    room.tick(&mut log);
    // Slid onto the top face instead of into the block.
    assert_eq!(position(&room, e), Vec2::new(45.0, 44.0));
    assert_eq!(velocity(&room, e), Vec2::new(3.0, 0.0));

    for _ in 0..10 {
        let v = velocity(&room, e);
        set_velocity(&mut room, e, Vec2::new(v.x, 1.5));
        room.tick(&mut log);
        let entity_box = Rect::centered(Vec2::splat(8.0)).translated(position(&room, e));
        assert!(!entity_box.overlaps_by(&tile_box, EPS));
    }
}

#[test]
fn resting_contact_is_stable() {
    let mut room = room(RoomMode::TopDown);
    block(&mut room, 3, 2);
    let e = room.spawn((Position(Vec2::new(44.0, 40.0)), body(8.0)));

    let mut log = EventLog::new();
    for _ in 0..10 {
        room.tick(&mut log);
        assert_eq!(position(&room, e), Vec2::new(44.0, 40.0));
    }
    let state = room.world.get::<&PhysicsState>(e).unwrap();
    let contact = state.collision_in(Direction::Right).unwrap();
    assert!(contact.penetration.abs() <= EPS);
}

#[test]
fn room_edges_contain_fast_entities() {
    let mut room = room(RoomMode::TopDown);
    let mut physics = body(8.0);
    physics.collide_with_room_edge = true;
    let e = room.spawn((Position(Vec2::new(10.0, 20.0)), Velocity(Vec2::new(-7.0, -9.0)), physics));

    let bounds = room.bounds();
    let mut log = EventLog::new();
    for _ in 0..10 {
        room.tick(&mut log);
        let p = position(&room, e);
        assert!(p.x - 4.0 >= bounds.left() - EPS);
        assert!(p.y - 4.0 >= bounds.top() - EPS);
    }
    assert_eq!(position(&room, e), Vec2::new(4.0, 4.0));
}

#[test]
fn rebounding_entity_never_sinks_into_walls() {
    let mut room = room(RoomMode::TopDown);
    for x in 0..10 {
        block(&mut room, x, 0);
        block(&mut room, x, 7);
    }
    for y in 1..7 {
        block(&mut room, 0, y);
        block(&mut room, 9, y);
    }
    let mut physics = body(8.0);
    physics.reboundable = true;
    let e = room.spawn((Position(Vec2::new(70.0, 50.0)), Velocity(Vec2::new(3.3, 2.7)), physics));

    let mut log = EventLog::new();
    for _ in 0..200 {
        room.tick(&mut log);
        let entity_box = Rect::centered(Vec2::splat(8.0)).translated(position(&room, e));
        for tile in room.tiles.tiles() {
            assert!(!entity_box.overlaps_by(&tile.bounds(), EPS));
        }
    }
}

#[test]
fn crush_needs_a_gap_below_the_limit() {
    let mut room = Room::new(PhysicsConfig::default(), 10, 4, 1, RoomMode::TopDown);
    block(&mut room, 4, 1);
    room.tiles.add_tile(
        Tile::solid(CollisionModel::block(16.0)).with_motion(TileMotion::endless(Vec2::new(2.0, 0.0))),
        IVec2::new(2, 1),
        0,
    );
    let mut physics = body(8.0);
    physics.is_crushable = true;
    physics.crush_max_gap = 6.0;
    let e = room.spawn((Position(Vec2::new(56.0, 24.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..5 {
        room.tick(&mut log);
    }
    // Squeezed to exactly the limit: still fine.
    assert_eq!(position(&room, e).x, 60.0);
    assert!(log.events.is_empty());

    room.tick(&mut log);
    assert_eq!(log.events, vec![PhysicsEvent::Crushed { entity: e, axis: Axis::X }]);
    assert!(room.world.get::<&PhysicsState>(e).unwrap().is_crushed);
}

#[test]
fn dodges_around_a_corner() {
    let mut room = room(RoomMode::TopDown);
    block(&mut room, 4, 2);
    let mut physics = body(8.0);
    physics.auto_dodge_distance = 4.0;
    physics.auto_dodge_speed = 1.0;
    let e = room.spawn((Position(Vec2::new(60.0, 30.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..3 {
        set_velocity(&mut room, e, Vec2::new(1.0, 0.0));
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e), Vec2::new(61.0, 28.0));
}

#[test]
fn ledge_blocks_only_from_below() {
    let mut room = room(RoomMode::TopDown);
    room.tiles.add_tile(
        Tile::new(Some(CollisionModel::block(16.0))).with_solidity(Solidity::Ledge(Direction::Down)),
        IVec2::new(3, 2),
        0,
    );
    let e = room.spawn((Position(Vec2::new(56.0, 20.0)), Velocity(Vec2::new(0.0, 2.0)), body(8.0)));

    let mut log = EventLog::new();
    for _ in 0..20 {
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e), Vec2::new(56.0, 60.0));

    for _ in 0..10 {
        set_velocity(&mut room, e, Vec2::new(0.0, -2.0));
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e), Vec2::new(56.0, 52.0));
}

#[test]
fn snaps_up_a_low_step() {
    let mut room = room(RoomMode::SideScroll);
    for x in 0..10 {
        block(&mut room, x, 5);
    }
    let step = CollisionModel::new(CollisionStyle::Rectangular).with_box(Rect::new(0.0, 14.0, 16.0, 2.0));
    room.tiles
        .add_tile(Tile::solid(Arc::new(step)), IVec2::new(4, 4), 0);
    let mut physics = body(8.0);
    physics.has_gravity = true;
    let e = room.spawn((Position(Vec2::new(58.0, 76.0)), physics));

    let mut log = EventLog::new();
    room.tick(&mut log);
    assert!(room.world.get::<&PhysicsState>(e).unwrap().is_on_ground);

    for _ in 0..6 {
        let vy = velocity(&room, e).y;
        set_velocity(&mut room, e, Vec2::new(1.0, vy));
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e), Vec2::new(64.0, 74.0));
    assert!(room.world.get::<&PhysicsState>(e).unwrap().is_on_ground);
}

#[test]
fn walking_off_a_platform_begins_falling() {
    let mut room = room(RoomMode::SideScroll);
    for x in 0..3 {
        block(&mut room, x, 5);
    }
    let mut physics = body(8.0);
    physics.has_gravity = true;
    let e = room.spawn((Position(Vec2::new(40.0, 76.0)), physics));

    let mut log = EventLog::new();
    room.tick(&mut log);
    for _ in 0..16 {
        let vy = velocity(&room, e).y;
        set_velocity(&mut room, e, Vec2::new(1.0, vy));
        room.tick(&mut log);
    }
    assert_eq!(log.count(|ev| matches!(ev, PhysicsEvent::BeganFalling(_))), 1);
    assert!(position(&room, e).y > 76.0);
}

#[test]
fn ladder_top_holds_until_climbing_down() {
    let mut room = room(RoomMode::SideScroll);
    for y in 3..6 {
        room.tiles.add_tile(Tile::new(None).ladder(), IVec2::new(3, y), 0);
    }
    let mut physics = body(8.0);
    physics.has_gravity = true;
    physics.can_climb = true;
    let e = room.spawn((Position(Vec2::new(56.0, 40.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..20 {
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e).y, 44.0);
    assert!(room.world.get::<&PhysicsState>(e).unwrap().is_on_ground);

    room.world
        .insert_one(e, ClimbInput { up: false, down: true })
        .unwrap();
    room.tick(&mut log);
    assert!(room.world.get::<&PhysicsState>(e).unwrap().is_climbing);
    assert_eq!(
        log.count(|ev| matches!(ev, PhysicsEvent::LadderChanged { climbing: true, .. })),
        1
    );
    assert_eq!(log.count(|ev| matches!(ev, PhysicsEvent::BeganFalling(_))), 0);
}

#[test]
fn stepping_off_onto_a_ladder_climbs_instead_of_falling() {
    let mut room = room(RoomMode::SideScroll);
    for x in 0..3 {
        block(&mut room, x, 3);
    }
    for y in 2..5 {
        room.tiles.add_tile(Tile::new(None).ladder(), IVec2::new(3, y), 0);
    }
    let mut physics = body(8.0);
    physics.has_gravity = true;
    physics.can_climb = true;
    let e = room.spawn((Position(Vec2::new(40.0, 44.0)), physics));

    let mut log = EventLog::new();
    room.tick(&mut log);
    for _ in 0..16 {
        let vy = velocity(&room, e).y;
        set_velocity(&mut room, e, Vec2::new(1.0, vy));
        room.tick(&mut log);
    }
    assert!(room.world.get::<&PhysicsState>(e).unwrap().is_climbing);
    assert_eq!(
        log.count(|ev| matches!(ev, PhysicsEvent::LadderChanged { climbing: true, .. })),
        1
    );
    assert_eq!(log.count(|ev| matches!(ev, PhysicsEvent::BeganFalling(_))), 0);
}

#[test]
fn conveyor_carries_without_changing_velocity() {
    let mut room = room(RoomMode::TopDown);
    room.tiles.add_tile(
        Tile::new(None).with_conveyor(Vec2::new(0.5, 0.0)),
        IVec2::new(2, 2),
        0,
    );
    let mut physics = body(8.0);
    physics.moves_with_conveyors = true;
    let e = room.spawn((Position(Vec2::new(40.0, 40.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..4 {
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e).x, 42.0);
    assert_eq!(velocity(&room, e), Vec2::ZERO);
}

#[test]
fn rides_a_moving_floor_tile() {
    let mut room = Room::new(PhysicsConfig::default(), 10, 8, 2, RoomMode::TopDown);
    let id = room.tiles.add_tile(
        Tile::new(None).with_motion(TileMotion::endless(Vec2::new(1.0, 0.0))),
        IVec2::new(2, 2),
        1,
    );
    let mut physics = body(8.0);
    physics.moves_with_platforms = true;
    let e = room.spawn((Position(Vec2::new(40.0, 40.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..5 {
        room.tick(&mut log);
    }
    assert_eq!(position(&room, e).x, 45.0);
    assert_eq!(room.world.get::<&PhysicsState>(e).unwrap().surface_tile, Some(id));
}

#[test]
fn rides_a_moving_platform_entity() {
    let mut room = room(RoomMode::SideScroll);
    let mut platform = Physics::new(Rect::centered(Vec2::new(32.0, 8.0)));
    platform.is_solid = true;
    room.spawn((Position(Vec2::new(48.0, 60.0)), Velocity(Vec2::new(1.0, 0.0)), platform));

    let mut physics = body(8.0);
    physics.has_gravity = true;
    physics.moves_with_platforms = true;
    let rider = room.spawn((Position(Vec2::new(48.0, 52.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..5 {
        room.tick(&mut log);
    }
    // Carried from the second tick on, once it has stood on the platform.
    assert_eq!(position(&room, rider), Vec2::new(52.0, 52.0));
    assert!(room.world.get::<&PhysicsState>(rider).unwrap().is_on_ground);
}

#[test]
fn walking_into_water_reports_once() {
    let mut room = room(RoomMode::TopDown);
    room.tiles.add_tile(
        Tile::new(None).with_hazard(Hazard::Water),
        IVec2::new(3, 2),
        0,
    );
    let mut physics = body(8.0);
    physics.check_hazards = true;
    let e = room.spawn((Position(Vec2::new(40.0, 40.0)), Velocity(Vec2::new(2.0, 0.0)), physics));

    let mut log = EventLog::new();
    for _ in 0..5 {
        room.tick(&mut log);
    }
    let fell = PhysicsEvent::FellInHazard {
        entity: e,
        hazard: Hazard::Water,
    };
    assert_eq!(log.events, vec![fell]);

    room.tick(&mut log);
    assert_eq!(log.events, vec![fell]);
}

#[test]
fn solid_entity_blocks_a_mover() {
    let mut room = room(RoomMode::TopDown);
    let mut wall = body(16.0);
    wall.is_solid = true;
    let wall = room.spawn((Position(Vec2::new(64.0, 40.0)), wall));
    let e = room.spawn((Position(Vec2::new(50.0, 40.0)), Velocity(Vec2::new(3.0, 0.0)), body(8.0)));

    let mut log = EventLog::new();
    room.tick(&mut log);
    assert_eq!(position(&room, e).x, 52.0);
    assert_eq!(velocity(&room, e), Vec2::ZERO);
    let state = room.world.get::<&PhysicsState>(e).unwrap();
    assert_eq!(state.collision_in(Direction::Right).and_then(|c| c.entity()), Some(wall));
}

#[test]
fn player_moves_after_every_other_entity() {
    let mut room = room(RoomMode::TopDown);
    let player = room.spawn_player((Position(Vec2::new(48.0, 40.0)), body(8.0)));
    let mut pusher = body(8.0);
    pusher.is_solid = true;
    pusher.collide_with_world = false;
    room.spawn((Position(Vec2::new(60.0, 40.0)), Velocity(Vec2::new(-6.0, 0.0)), pusher));

    let mut log = EventLog::new();
    room.tick(&mut log);
    // Meets the pusher where it already is this tick.
    assert_eq!(position(&room, player).x, 46.0);
}

#[test]
fn circular_tile_keeps_entities_out() {
    let mut room = room(RoomMode::TopDown);
    room.tiles
        .add_tile(Tile::solid(CollisionModel::circle(16.0)), IVec2::new(3, 2), 0);
    let e = room.spawn((Position(Vec2::new(44.0, 40.0)), Velocity(Vec2::new(2.0, 0.0)), body(8.0)));

    let center = Vec2::new(56.0, 40.0);
    let mut log = EventLog::new();
    for _ in 0..5 {
        room.tick(&mut log);
        let entity_box = Rect::centered(Vec2::splat(8.0)).translated(position(&room, e));
        let nearest = center.clamp(entity_box.min, entity_box.max());
        assert!(nearest.distance(center) >= 8.0 - EPS);
    }
    assert_eq!(position(&room, e).x, 44.0);
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Hits(u32);

fn count_hit(ctx: &mut ReactionContext<'_>, rec: &InteractionCollision) {
    if let Participant::Entity(e) = rec.key.reaction {
        if let Ok(mut hits) = ctx.world.get::<&mut Hits>(e) {
            hits.0 += 1;
        }
    }
}

#[test]
fn interaction_lives_while_boxes_overlap() {
    let mut room = room(RoomMode::TopDown);
    let sword = room.spawn((
        Position(Vec2::new(40.0, 40.0)),
        InteractionBox::new(Rect::centered(Vec2::splat(8.0))).with_action(InteractionType::Sword),
    ));
    let target = room.spawn((
        Position(Vec2::new(46.0, 40.0)),
        InteractionBox::new(Rect::centered(Vec2::splat(8.0))),
        Reactions::new().on(InteractionType::Sword, count_hit),
        Hits::default(),
    ));
    let key = InteractionKey {
        action: Participant::Entity(sword),
        reaction: Participant::Entity(target),
        kind: InteractionType::Sword,
    };

    for _ in 0..3 {
        room.tick(&mut ());
    }
    let rec = room.interactions().get(&key).unwrap();
    assert_eq!(rec.duration, 3);
    assert_eq!(rec.args.direction, Some(Direction::Right));
    assert_eq!(room.world.get::<&Hits>(target).unwrap().0, 3);
    assert_eq!(room.world.get::<&InteractionLinks>(sword).unwrap().actions, vec![key]);

    room.world.get::<&mut Position>(target).unwrap().0 = Vec2::new(100.0, 40.0);
    room.tick(&mut ());
    assert!(room.interactions().get(&key).is_none());
    assert!(room.world.get::<&InteractionLinks>(sword).unwrap().is_empty());
    assert!(room.world.get::<&InteractionLinks>(target).unwrap().is_empty());
    assert_eq!(room.world.get::<&Hits>(target).unwrap().0, 3);
}

fn nudge_block(ctx: &mut ReactionContext<'_>, rec: &InteractionCollision) {
    if let (Participant::Tile(id), Some(dir)) = (rec.key.reaction, rec.args.direction) {
        if let Some(tile) = ctx.tiles.tile_mut(id) {
            if !tile.is_moving() {
                tile.start_move(dir, 16.0, 2.0);
            }
        }
    }
}

#[test]
fn pushing_a_movable_tile() {
    let mut room = room(RoomMode::TopDown);
    let id = room.tiles.add_tile(
        Tile::solid(CollisionModel::block(16.0))
            .movable()
            .with_reaction(InteractionType::Push, nudge_block),
        IVec2::new(4, 2),
        0,
    );
    let e = room.spawn((Position(Vec2::new(58.0, 40.0)), body(8.0)));

    // Second tick brings the entity flush against the block.
    for _ in 0..2 {
        set_velocity(&mut room, e, Vec2::new(1.0, 0.0));
        room.tick(&mut ());
    }
    let tile = room.tiles.tile(id).unwrap();
    assert!(tile.is_moving());
    assert_eq!(tile.links.reactions.len(), 1);
    assert_eq!(tile.links.reactions[0].action, Participant::Entity(e));

    for _ in 0..10 {
        room.tick(&mut ());
    }
    let tile = room.tiles.tile(id).unwrap();
    assert!(!tile.is_moving());
    assert_eq!(tile.location(), IVec2::new(5, 2));
    assert!(tile.links.is_empty());
}

#[test]
fn moving_tile_acts_on_what_it_runs_into() {
    let mut room = room(RoomMode::TopDown);
    let id = room.tiles.add_tile(
        Tile::solid(CollisionModel::block(16.0)).with_motion(TileMotion::endless(Vec2::new(2.0, 0.0))),
        IVec2::new(1, 2),
        0,
    );
    let e = room.spawn((
        Position(Vec2::new(44.0, 40.0)),
        body(8.0),
        Reactions::new().on(InteractionType::MovingTile, count_hit),
        Hits::default(),
    ));
    let key = InteractionKey {
        action: Participant::Tile(id),
        reaction: Participant::Entity(e),
        kind: InteractionType::MovingTile,
    };

    // Flush on the fourth tick, shoved on the next two.
    for _ in 0..6 {
        room.tick(&mut ());
    }
    assert_eq!(room.world.get::<&Hits>(e).unwrap().0, 3);
    assert_eq!(room.interactions().get(&key).unwrap().duration, 3);
    assert_eq!(position(&room, e).x, 48.0);
}
