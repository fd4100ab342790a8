use glam::Vec2;

use crate::ecs::components::{Physics, Velocity};
use crate::geometry::Direction;
use crate::spatial::{Hazard, Tile, TileGrid};

use super::body::Body;
use super::collision::CollisionSource;
use super::{PhysicsContext, RoomMode};

/// Find what the entity stands on and the velocity it inherits from it.
/// Returns a hazard the grounded entity has just walked onto.
pub(super) fn detect(body: &mut Body, ctx: &PhysicsContext<'_>, landed: bool) -> Option<Hazard> {
    let surface = ctx
        .tiles
        .top_tile_at_point(body.position)
        .filter(|t| t.enabled);
    let previous = body.state.surface_tile;
    body.state.surface_tile = surface.map(Tile::id);
    body.state.surface_velocity = Vec2::ZERO;

    match ctx.mode {
        RoomMode::TopDown => {
            if body.z.is_airborne() {
                return None;
            }
            let tile = surface?;
            body.state.surface_velocity = carried_by(&body.physics, tile);
            if landed || previous == Some(tile.id()) {
                return None;
            }
            hazard_allowed(body).then_some(tile.hazard).flatten()
        }
        RoomMode::SideScroll => {
            let standing = body
                .state
                .previous_collisions()
                .iter()
                .find(|c| c.is_colliding && c.direction == Some(Direction::Down))
                .map(|c| c.source);
            body.state.surface_velocity = match standing {
                Some(CollisionSource::Tile { tile, .. }) => ctx
                    .tiles
                    .tile(tile)
                    .map(|t| carried_by(&body.physics, t))
                    .unwrap_or_default(),
                Some(CollisionSource::Entity { entity, .. }) if body.physics.moves_with_platforms => {
                    ctx.world
                        .get::<&Velocity>(entity)
                        .map(|v| v.0)
                        .unwrap_or_default()
                }
                _ => Vec2::ZERO,
            };
            None
        }
    }
}

/// Hazard under an entity that is about to land.
pub(super) fn hazard_under(body: &Body, tiles: &TileGrid) -> Option<Hazard> {
    if !hazard_allowed(body) {
        return None;
    }
    tiles
        .top_tile_at_point(body.position)
        .filter(|t| t.enabled)
        .and_then(|t| t.hazard)
}

fn hazard_allowed(body: &Body) -> bool {
    body.physics.check_hazards && body.state.ledge_altitude == 0
}

fn carried_by(physics: &Physics, tile: &Tile) -> Vec2 {
    let mut v = Vec2::ZERO;
    if physics.moves_with_conveyors {
        v += tile.conveyor;
    }
    if physics.moves_with_platforms {
        v += tile.motion.velocity;
    }
    v
}
