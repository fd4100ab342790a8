use glam::{IVec2, Vec2};
use hecs::{Entity, World};
use instant::Instant;

use roomphys::debug::timer::SystemPhase;
use roomphys::ecs::components::{Physics, PhysicsState, Position, Velocity, ZMotion};
use roomphys::geometry::{Direction, Rect};
use roomphys::interaction::{
    InteractionBox, InteractionCollision, InteractionType, Participant, ReactionContext, Reactions,
};
use roomphys::spatial::{CollisionModel, Hazard, Solidity, Tile, TileMotion};
use roomphys::util::ring::RingBuffer;
use roomphys::{PhysicsConfig, PhysicsHooks, Room, RoomMode, RoomTransition};

/// Ticks to simulate.
const DEMO_TICKS: u64 = 1200;
/// How often to log stats (ticks).
const STATS_LOG_INTERVAL: u64 = 300;
/// Number of tick durations kept for the min/avg/max window.
const TICK_HISTORY_LEN: usize = 120;
const ROOM_WIDTH: u32 = 20;
const ROOM_HEIGHT: u32 = 12;
const POT_COUNT: usize = 24;
/// Environment variable naming an optional JSON physics config.
const CONFIG_ENV: &str = "ROOMPHYS_CONFIG";

// ---------------------------------------------------------------------------
// Tick timing
// ---------------------------------------------------------------------------

struct TickStats {
    history: RingBuffer<f64, TICK_HISTORY_LEN>,
}

impl TickStats {
    fn new() -> Self {
        Self {
            history: RingBuffer::new(),
        }
    }

    fn record(&mut self, dt: f64) {
        self.history.push(dt);
    }

    fn log(&self, room: &Room) {
        let n = self.history.len().max(1) as f64;
        let sum: f64 = self.history.iter().sum();
        let min = self.history.iter().copied().fold(f64::MAX, f64::min);
        let max = self.history.iter().copied().fold(0.0, f64::max);
        log::info!(
            "tick {} | entities: {} | interactions: {} | avg: {:.1}us | min: {:.1}us | max: {:.1}us",
            room.tick_count(),
            room.entities().len(),
            room.interactions().len(),
            sum / n * 1e6,
            min * 1e6,
            max * 1e6,
        );
        log::info!("phases: {}", room.timers().summary());
    }
}

// ---------------------------------------------------------------------------
// Hooks and reactions
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DemoHooks {
    bounces: u32,
    landings: u32,
    crushed: u32,
    drowned: u32,
}

impl PhysicsHooks for DemoHooks {
    fn on_land(&mut self, _world: &mut World, _entity: Entity) {
        self.landings += 1;
    }

    fn on_bounce(&mut self, _world: &mut World, _entity: Entity) {
        self.bounces += 1;
    }

    fn on_crush(&mut self, world: &mut World, entity: Entity, axis: roomphys::geometry::Axis) {
        log::debug!("{:?} crushed along {:?}", entity, axis);
        self.crushed += 1;
        let _ = world.despawn(entity);
    }

    fn on_fall_in_hazard(&mut self, world: &mut World, entity: Entity, hazard: Hazard) {
        log::debug!("{:?} fell into {:?}", entity, hazard);
        self.drowned += 1;
        let _ = world.despawn(entity);
    }
}

/// Pots shatter when struck.
fn shatter(ctx: &mut ReactionContext<'_>, rec: &InteractionCollision) {
    if let Participant::Entity(pot) = rec.key.reaction {
        let _ = ctx.world.despawn(pot);
    }
}

/// Blocks slide one cell away from whoever pushes them.
fn slide_block(ctx: &mut ReactionContext<'_>, rec: &InteractionCollision) {
    let (Participant::Tile(id), Some(dir)) = (rec.key.reaction, rec.args.direction) else {
        return;
    };
    let cell = ctx.tiles.cell_size();
    if let Some(tile) = ctx.tiles.tile_mut(id) {
        if !tile.is_moving() {
            tile.start_move(dir, cell, 1.0);
        }
    }
}

/// The east door leads to the next room.
fn open_door(ctx: &mut ReactionContext<'_>, _rec: &InteractionCollision) {
    *ctx.transition = Some(RoomTransition {
        target: Some(IVec2::new(1, 0)),
        direction: Some(Direction::Right),
    });
}

// ---------------------------------------------------------------------------
// Room setup
// ---------------------------------------------------------------------------

fn load_config() -> Result<PhysicsConfig, Box<dyn std::error::Error>> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            log::info!("loading physics config from {path}");
            Ok(PhysicsConfig::load(path)?)
        }
        Err(_) => Ok(PhysicsConfig::default()),
    }
}

fn build_room(config: PhysicsConfig, rng: &mut fastrand::Rng) -> Room {
    let cell = config.cell_size;
    let mut room = Room::new(config, ROOM_WIDTH, ROOM_HEIGHT, 2, RoomMode::TopDown);
    let block = CollisionModel::block(cell);
    let pillar = CollisionModel::circle(cell);
    let (w, h) = (ROOM_WIDTH as i32, ROOM_HEIGHT as i32);

    // Outer walls with a gap for the east door.
    for x in 0..w {
        room.tiles.add_tile(Tile::solid(block.clone()), IVec2::new(x, 0), 0);
        room.tiles.add_tile(Tile::solid(block.clone()), IVec2::new(x, h - 1), 0);
    }
    for y in 1..h - 1 {
        room.tiles.add_tile(Tile::solid(block.clone()), IVec2::new(0, y), 0);
        if y != h / 2 {
            room.tiles.add_tile(Tile::solid(block.clone()), IVec2::new(w - 1, y), 0);
        }
    }

    room.tiles.add_tile(
        Tile::solid(block.clone())
            .movable()
            .with_reaction(InteractionType::Push, slide_block),
        IVec2::new(5, 5),
        0,
    );
    room.tiles.add_tile(
        Tile::new(Some(block.clone())).with_solidity(Solidity::Ledge(Direction::Down)),
        IVec2::new(8, 3),
        0,
    );
    room.tiles
        .add_tile(Tile::new(None).with_hazard(Hazard::Water), IVec2::new(14, 8), 0);
    room.tiles.add_tile(
        Tile::solid(block).with_motion(TileMotion::endless(Vec2::new(0.0, 0.5))),
        IVec2::new(12, 2),
        1,
    );

    for _ in 0..6 {
        let at = IVec2::new(rng.i32(3..w - 3), rng.i32(2..h - 2));
        if room.tiles.tile_at(at, 0).is_none() {
            room.tiles.add_tile(Tile::solid(pillar.clone()), at, 0);
        }
    }

    let mut player_physics = Physics::new(Rect::centered(Vec2::splat(10.0)));
    player_physics.collide_with_room_edge = true;
    player_physics.auto_dodge_distance = 4.0;
    player_physics.auto_dodge_speed = 1.0;
    player_physics.is_crushable = true;
    room.spawn_player((
        Position(Vec2::new(3.0, 3.0) * cell),
        player_physics,
        InteractionBox::new(Rect::centered(Vec2::splat(12.0)))
            .with_action(InteractionType::Sword)
            .with_action(InteractionType::Touch),
    ));

    room.spawn((
        Position(Vec2::new(w as f32 - 0.5, h as f32 / 2.0 + 0.5) * cell),
        InteractionBox::new(Rect::centered(Vec2::splat(cell))),
        Reactions::new().on(InteractionType::Touch, open_door),
    ));

    for _ in 0..POT_COUNT {
        spawn_pot(&mut room, rng);
    }
    room
}

fn spawn_pot(room: &mut Room, rng: &mut fastrand::Rng) {
    let cell = room.config().cell_size;
    let mut physics = Physics::new(Rect::centered(Vec2::splat(8.0)));
    physics.has_gravity = true;
    physics.bounces = true;
    physics.check_hazards = true;
    physics.is_solid = true;
    physics.destroy_outside_room = true;
    let at = Vec2::new(
        rng.f32() * (ROOM_WIDTH as f32 - 4.0) + 2.0,
        rng.f32() * (ROOM_HEIGHT as f32 - 4.0) + 2.0,
    ) * cell;
    let launch = Vec2::new(rng.f32() - 0.5, rng.f32() - 0.5) * 3.0;
    room.spawn((
        Position(at),
        Velocity(launch),
        ZMotion {
            z: rng.f32() * 12.0,
            velocity: rng.f32() * 2.0,
        },
        physics,
        InteractionBox::new(Rect::centered(Vec2::splat(8.0))),
        Reactions::new().on(InteractionType::Sword, shatter),
    ));
}

/// Steer the player toward a wandering waypoint.
fn drive_player(room: &mut Room, waypoint: &mut Vec2, rng: &mut fastrand::Rng) {
    let Some(player) = room.player() else {
        return;
    };
    let Ok(pos) = room.world.get::<&Position>(player).map(|p| p.0) else {
        return;
    };
    let blocked = room
        .world
        .get::<&PhysicsState>(player)
        .map(|s| s.is_colliding())
        .unwrap_or(false);
    if pos.distance(*waypoint) < 4.0 || (blocked && rng.u8(..) < 8) {
        let bounds = room.bounds();
        *waypoint = Vec2::new(
            rng.f32() * bounds.size.x,
            rng.f32() * bounds.size.y,
        );
    }
    if let Ok(mut vel) = room.world.get::<&mut Velocity>(player) {
        vel.0 = (*waypoint - pos).clamp_length_max(1.5);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let mut rng = fastrand::Rng::new();
    let mut room = build_room(config, &mut rng);
    log::info!(
        "room ready: {} tiles, {} entities",
        room.tiles.tile_count(),
        room.entities().len()
    );

    let mut hooks = DemoHooks::default();
    let mut stats = TickStats::new();
    let mut waypoint = room.bounds().center();

    for _ in 0..DEMO_TICKS {
        drive_player(&mut room, &mut waypoint, &mut rng);

        let start = Instant::now();
        let report = room.tick(&mut hooks);
        stats.record(start.elapsed().as_secs_f64());

        if let Some(transition) = report.transition {
            log::info!("tick {}: transition {:?}", report.tick, transition);
            if let Some(player) = room.player() {
                let center = room.bounds().center();
                if let Ok(mut pos) = room.world.get::<&mut Position>(player) {
                    pos.0 = center;
                }
            }
        }
        if report.tick % STATS_LOG_INTERVAL == 0 {
            stats.log(&room);
        }
    }

    log::info!(
        "done: {} bounces, {} landings, {} crushed, {} drowned, physics {:.1}us/tick",
        hooks.bounces,
        hooks.landings,
        hooks.crushed,
        hooks.drowned,
        room.timers().duration_us(SystemPhase::Physics),
    );
    Ok(())
}
