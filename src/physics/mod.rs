//! Per-entity collision resolution against tiles, solid entities and the
//! room edges.

pub mod collision;

mod body;
mod detect;
mod resolve;
mod surface;
mod transitions;
mod z_motion;

use glam::Vec2;
use hecs::{Entity, World};
use log::debug;

use crate::config::PhysicsConfig;
use crate::events::PhysicsHooks;
use crate::geometry::{Direction, Rect};
use crate::spatial::TileGrid;

use self::body::Body;
use self::collision::{Collision, CollisionCheck};
use self::z_motion::Settle;

/// Which way gravity points in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomMode {
    /// Gravity acts on a separate height axis.
    #[default]
    TopDown,
    /// Gravity acts on Y; ladders and step snapping apply.
    SideScroll,
}

/// What the resolver needs from the room for one pass.
pub struct PhysicsContext<'a> {
    pub world: &'a mut World,
    pub tiles: &'a TileGrid,
    pub bounds: Rect,
    pub mode: RoomMode,
}

/// The resolver. Owns the room's tuning and scratch buffers reused for
/// every entity.
pub struct RoomPhysics {
    config: PhysicsConfig,
    checks: Vec<CollisionCheck>,
    circles: Vec<Rect>,
    collisions: Vec<Collision>,
}

impl RoomPhysics {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            checks: Vec::with_capacity(32),
            circles: Vec::new(),
            collisions: Vec::with_capacity(32),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Run every entity in `order` once, the player last.
    pub fn update<H: PhysicsHooks>(
        &mut self,
        ctx: &mut PhysicsContext<'_>,
        order: &[Entity],
        player: Option<Entity>,
        hooks: &mut H,
    ) {
        for &entity in order {
            if Some(entity) != player {
                self.process_entity(ctx, entity, hooks);
            }
        }
        if let Some(player) = player {
            self.process_entity(ctx, player, hooks);
        }
    }

    /// Advance one entity by one tick. Entities without physics, disabled
    /// ones, and ones despawned by an earlier hook are skipped.
    pub fn process_entity<H: PhysicsHooks>(
        &mut self,
        ctx: &mut PhysicsContext<'_>,
        entity: Entity,
        hooks: &mut H,
    ) {
        let _ = self.step(ctx, entity, hooks);
    }

    /// `None` means the entity went away partway through.
    fn step<H: PhysicsHooks>(
        &mut self,
        ctx: &mut PhysicsContext<'_>,
        entity: Entity,
        hooks: &mut H,
    ) -> Option<()> {
        let mut body = Body::load(ctx.world, entity)?;
        if !body.physics.enabled {
            body.store(ctx.world, entity);
            return Some(());
        }
        let eps = self.config.epsilon;
        let start = body.position;

        body.state.collisions.advance().clear();
        body.state.was_on_ground = body.state.is_on_ground;
        body.state.is_crushed = false;

        // Height.
        let landed = match z_motion::integrate(&mut body, ctx.mode) {
            Some(impact) => {
                if let Some(hazard) = surface::hazard_under(&body, ctx.tiles) {
                    debug!("entity {}: fell into {:?}", body.index, hazard);
                    body = notify(ctx.world, entity, body, |w| {
                        hooks.on_fall_in_hazard(w, entity, hazard)
                    })?;
                }
                let settled = z_motion::settle(&mut body, impact, &self.config);
                body = match settled {
                    Settle::Bounced => notify(ctx.world, entity, body, |w| hooks.on_bounce(w, entity))?,
                    Settle::Landed => notify(ctx.world, entity, body, |w| hooks.on_land(w, entity))?,
                };
                true
            }
            None => false,
        };

        // Surface.
        if let Some(hazard) = surface::detect(&mut body, ctx, landed) {
            debug!("entity {}: walked into {:?}", body.index, hazard);
            body = notify(ctx.world, entity, body, |w| {
                hooks.on_fall_in_hazard(w, entity, hazard)
            })?;
        }

        // Collisions.
        self.gather(&mut body, ctx, entity);
        self.integrate_axes(&mut body, ctx.mode);
        self.push_out_of_circles(&mut body);
        let crushed = self.detect_crush(&body);

        for c in &mut self.collisions {
            c.is_colliding = c.is_touching(eps);
        }
        body.state.is_on_ground = match ctx.mode {
            RoomMode::SideScroll => self
                .collisions
                .iter()
                .any(|c| c.is_colliding && c.direction == Some(Direction::Down)),
            RoomMode::TopDown => !body.z.is_airborne(),
        };
        let stored = body.state.collisions.current_mut();
        stored.clear();
        stored.extend(self.collisions.iter().filter(|c| c.direction.is_some()).cloned());

        if let Some(axis) = crushed {
            body.state.is_crushed = true;
            debug!("entity {}: crushed along {:?}", body.index, axis);
            body = notify(ctx.world, entity, body, |w| hooks.on_crush(w, entity, axis))?;
        }

        // Ladders and ledges.
        if ctx.mode == RoomMode::SideScroll {
            if let Some(climbing) = transitions::update_ladder(&mut body, ctx.tiles, &self.config) {
                body = notify(ctx.world, entity, body, |w| {
                    hooks.on_ladder_transition(w, entity, climbing)
                })?;
            }
            let grounded = (body.state.was_on_ground, body.state.is_on_ground);
            if !body.state.is_climbing {
                match grounded {
                    (true, false) => {
                        body = notify(ctx.world, entity, body, |w| hooks.on_begin_falling(w, entity))?;
                    }
                    (false, true) => {
                        debug!("entity {}: landed", body.index);
                        body = notify(ctx.world, entity, body, |w| hooks.on_land(w, entity))?;
                    }
                    _ => {}
                }
            }
        }
        let displacement: Vec2 = body.position - start;
        transitions::update_ledge_altitude(&mut body, ctx.tiles, displacement);

        // Room bounds.
        let outside = body.physics.destroy_outside_room && !ctx.bounds.contains_point(body.position);
        body.store(ctx.world, entity);
        if outside {
            debug!("entity {:?} left the room", entity);
            hooks.on_leave_room(ctx.world, entity);
            let _ = ctx.world.despawn(entity);
        }
        Some(())
    }
}

/// Write the body back, run a hook, and reload. `None` if the hook
/// despawned the entity.
fn notify(world: &mut World, entity: Entity, body: Body, hook: impl FnOnce(&mut World)) -> Option<Body> {
    body.store(world, entity);
    hook(world);
    Body::load(world, entity)
}
