use glam::Vec2;

use crate::config::PhysicsConfig;
use crate::geometry::Rect;
use crate::spatial::{Solidity, TileGrid};

use super::body::Body;
use super::detect::ladder_at;

/// Start or stop climbing. Returns the new climbing state when it changed.
pub(super) fn update_ladder(body: &mut Body, tiles: &TileGrid, config: &PhysicsConfig) -> Option<bool> {
    if !body.physics.can_climb {
        if body.state.is_climbing {
            body.state.is_climbing = false;
            return Some(false);
        }
        return None;
    }

    let entity_box = body.collision_box();
    let touching = touching_ladder(&entity_box, tiles);
    if body.state.is_climbing {
        if touching {
            return None;
        }
        body.state.is_climbing = false;
        return Some(false);
    }

    let below = ladder_below(&entity_box, tiles);
    let stepped_off = body.state.was_on_ground && !body.state.is_on_ground && below;
    let begin = (body.input.up && touching)
        || (body.input.down && (touching || below))
        || stepped_off;
    if !begin {
        return None;
    }

    body.state.is_climbing = true;
    body.velocity.y = 0.0;
    if body.input.down && !touching {
        body.position.y += config.ladder_entry_offset;
    }
    Some(true)
}

/// A ladder tile spans the entity's horizontal center.
fn touching_ladder(entity_box: &Rect, tiles: &TileGrid) -> bool {
    let cx = entity_box.center().x;
    tiles.tiles_touching(*entity_box).any(|t| {
        let b = t.bounds();
        t.is_ladder && t.enabled && b.left() <= cx && cx < b.right()
    })
}

fn ladder_below(entity_box: &Rect, tiles: &TileGrid) -> bool {
    let feet = Vec2::new(entity_box.center().x, entity_box.bottom() + 0.5);
    ladder_at(tiles, tiles.cell_coords(feet))
}

/// Count ledges dropped over. Entering a ledge tile while moving along its
/// drop direction raises the altitude; crossing back lowers it.
pub(super) fn update_ledge_altitude(body: &mut Body, tiles: &TileGrid, displacement: Vec2) {
    if !body.physics.pass_over_ledges {
        return;
    }
    let center = body.collision_box().center();
    let ledge = tiles
        .tiles_at_point(center)
        .find(|t| t.enabled && matches!(t.solidity, Solidity::Ledge(_)));
    let current = ledge.map(|t| t.id());
    if current == body.state.ledge_tile {
        return;
    }
    body.state.ledge_tile = current;

    let Some(Solidity::Ledge(dir)) = ledge.map(|t| t.solidity) else {
        return;
    };
    let along = dir.axis().of(displacement) * dir.sign();
    if along > 0.0 {
        body.state.ledge_altitude += 1;
    } else if along < 0.0 {
        body.state.ledge_altitude = (body.state.ledge_altitude - 1).max(0);
    }
}
