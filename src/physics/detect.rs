use glam::{IVec2, Vec2};
use hecs::Entity;
use log::trace;

use crate::ecs::components::{EntityIndex, Physics, Position, Velocity};
use crate::geometry::{Direction, Rect};
use crate::spatial::{CollisionStyle, Solidity, Tile, TileGrid};

use super::body::Body;
use super::collision::{compare_priority, connect_static, Collision, CollisionCheck, CollisionSource};
use super::{PhysicsContext, RoomMode, RoomPhysics};

impl RoomPhysics {
    /// Fill `self.collisions` with every solid the entity may meet this
    /// tick, directions computed and sorted by priority.
    pub(super) fn gather(&mut self, body: &mut Body, ctx: &PhysicsContext<'_>, entity: Entity) {
        self.checks.clear();
        self.circles.clear();
        self.collisions.clear();

        let eps = self.config.epsilon;
        let current = body.collision_box();
        let next = current.translated(body.motion());
        let reach = self.config.collision_margin
            + body.physics.auto_dodge_distance.max(self.config.snap_height);
        let area = current.union(&next).inflated(reach);

        if body.physics.collide_with_world {
            self.gather_entities(ctx, entity, area);
            self.gather_tiles(body, ctx, area);
        }
        if body.physics.collide_with_room_edge {
            self.checks
                .extend(Direction::ALL.into_iter().map(CollisionCheck::RoomEdge));
        }

        for i in 0..self.checks.len() {
            if let Some(collision) = self.build(self.checks[i], body, ctx) {
                self.collisions.push(collision);
            }
        }

        connect_static(&mut self.collisions, eps);
        let entity_box = body.collision_box();
        let motion = body.motion();
        for c in &mut self.collisions {
            c.compute_direction(&entity_box, motion - c.solid_velocity, eps);
        }
        self.collisions.sort_by(compare_priority);
        trace!(
            "entity {}: {} candidate solids",
            body.index,
            self.collisions.len()
        );
    }

    /// Push the entity back out of any circular solid it moved into.
    pub(super) fn push_out_of_circles(&mut self, body: &mut Body) {
        let eps = self.config.epsilon;
        let mut moved = false;
        for &solid in &self.circles {
            moved |= push_out_of_circle(body, solid, eps);
        }
        if moved {
            trace!("entity {}: pushed out of a circle", body.index);
            self.remeasure(body);
        }
    }

    fn gather_entities(&mut self, ctx: &PhysicsContext<'_>, entity: Entity, area: Rect) {
        for (other, (pos, physics)) in ctx.world.query::<(&Position, &Physics)>().iter() {
            if other == entity || !physics.enabled || !physics.is_solid {
                continue;
            }
            if physics.collision_box.translated(pos.0).intersects(&area) {
                self.checks.push(CollisionCheck::Entity(other));
            }
        }
    }

    fn gather_tiles(&mut self, body: &Body, ctx: &PhysicsContext<'_>, area: Rect) {
        let side_scroll = ctx.mode == RoomMode::SideScroll;
        for tile in ctx.tiles.tiles_touching(area) {
            if !tile.enabled {
                continue;
            }
            if side_scroll && tile.is_ladder && is_ladder_top(body, tile, ctx.tiles) {
                self.checks.push(CollisionCheck::LadderTop(tile.id()));
                continue;
            }
            let one_way = match tile.solidity {
                Solidity::NotSolid => continue,
                Solidity::Solid => None,
                Solidity::HalfSolid => {
                    if body.physics.pass_over_half_solids {
                        continue;
                    }
                    side_scroll.then_some(Direction::Down)
                }
                Solidity::Ledge(dir) => {
                    if body.physics.pass_over_ledges || body.state.ledge_altitude > 0 {
                        continue;
                    }
                    Some(dir.reverse())
                }
            };
            match tile.collision_style() {
                None => {}
                Some(CollisionStyle::Circular) => {
                    self.circles
                        .extend(tile.collision_boxes().map(|(_, b)| b).filter(|b| b.intersects(&area)));
                }
                Some(CollisionStyle::Rectangular) => {
                    for (box_index, solid) in tile.collision_boxes() {
                        if solid.intersects(&area) {
                            self.checks.push(CollisionCheck::Tile {
                                tile: tile.id(),
                                box_index,
                                one_way,
                            });
                        }
                    }
                }
            }
        }
    }

    fn build(&self, check: CollisionCheck, body: &Body, ctx: &PhysicsContext<'_>) -> Option<Collision> {
        let local = body.physics.collision_box;
        match check {
            CollisionCheck::Entity(other) => {
                let pos = ctx.world.get::<&Position>(other).ok()?.0;
                let solid = ctx.world.get::<&Physics>(other).ok()?.collision_box.translated(pos);
                let index = ctx
                    .world
                    .get::<&EntityIndex>(other)
                    .map(|i| i.0)
                    .unwrap_or(u32::MAX);
                let mut c = Collision::new(CollisionSource::Entity { entity: other, index }, local, solid);
                c.is_dynamic = true;
                c.solid_velocity = ctx
                    .world
                    .get::<&Velocity>(other)
                    .map(|v| v.0)
                    .unwrap_or_default();
                c.allowed_penetration = body.physics.edge_clip_amount;
                Some(c)
            }
            CollisionCheck::Tile {
                tile,
                box_index,
                one_way,
            } => {
                let t = ctx.tiles.tile(tile)?;
                let solid = t.model.as_ref()?.boxes.get(box_index)?.translated(t.position);
                let mut c = Collision::new(tile_source(t, box_index), local, solid);
                c.one_way = one_way;
                if t.is_moving() {
                    c.is_dynamic = true;
                    c.solid_velocity = t.motion.velocity;
                } else {
                    c.allowed_penetration = body.physics.edge_clip_amount;
                }
                Some(c)
            }
            CollisionCheck::LadderTop(tile) => {
                let t = ctx.tiles.tile(tile)?;
                let mut c = Collision::new(tile_source(t, 0), local, t.bounds());
                c.one_way = Some(Direction::Down);
                Some(c)
            }
            CollisionCheck::RoomEdge(side) => {
                let mut c = Collision::new(
                    CollisionSource::RoomEdge(side),
                    local,
                    room_edge_band(ctx.bounds, side, self.config.room_edge_depth),
                );
                c.one_way = Some(side);
                Some(c)
            }
        }
    }
}

fn tile_source(tile: &Tile, box_index: usize) -> CollisionSource {
    CollisionSource::Tile {
        tile: tile.id(),
        box_index,
        location: tile.location(),
        layer: tile.layer(),
    }
}

/// Solid band of `depth` just outside `side` of the room, overhanging the
/// corners so diagonal exits are caught too.
pub(super) fn room_edge_band(bounds: Rect, side: Direction, depth: f32) -> Rect {
    let tall = bounds.size.y + depth * 2.0;
    let wide = bounds.size.x + depth * 2.0;
    match side {
        Direction::Left => Rect::new(bounds.left() - depth, bounds.top() - depth, depth, tall),
        Direction::Right => Rect::new(bounds.right(), bounds.top() - depth, depth, tall),
        Direction::Up => Rect::new(bounds.left() - depth, bounds.top() - depth, wide, depth),
        Direction::Down => Rect::new(bounds.left() - depth, bounds.bottom(), wide, depth),
    }
}

// ---------------------------------------------------------------------------
// Ladders
// ---------------------------------------------------------------------------

/// A ladder with no ladder above it acts as a floor unless the entity is
/// climbing or wants to climb down.
fn is_ladder_top(body: &Body, tile: &Tile, tiles: &TileGrid) -> bool {
    !body.state.is_climbing && !body.input.down && !ladder_at(tiles, tile.location() - IVec2::Y)
}

pub(super) fn ladder_at(tiles: &TileGrid, location: IVec2) -> bool {
    (0..tiles.layer_count()).any(|layer| {
        tiles
            .tile_at(location, layer)
            .is_some_and(|t| t.is_ladder && t.enabled)
    })
}

// ---------------------------------------------------------------------------
// Circular solids
// ---------------------------------------------------------------------------

/// Push the entity straight out of a circular solid inscribed in `solid`.
/// Returns whether it moved.
fn push_out_of_circle(body: &mut Body, solid: Rect, epsilon: f32) -> bool {
    let center = solid.center();
    let radius = solid.size.min_element() * 0.5;
    let entity_box = body.collision_box();
    let nearest = center.clamp(entity_box.min, entity_box.max());
    let offset = nearest - center;
    let dist = offset.length();
    if dist >= radius - epsilon {
        return false;
    }

    if dist > epsilon {
        body.position += offset / dist * (radius - dist);
        return true;
    }

    // Center inside the box: leave along the dominant axis.
    let away = entity_box.center() - center;
    let dir = Direction::dominant(away)
        .or_else(|| Direction::dominant(-body.velocity))
        .unwrap_or(Direction::Up);
    let circle = Rect::centered(Vec2::splat(radius * 2.0)).translated(center);
    let shift = entity_box.penetration(&circle, dir.reverse());
    body.position += dir.to_vec2() * shift;
    true
}
