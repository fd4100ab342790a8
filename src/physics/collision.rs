use std::cmp::Ordering;

use glam::{IVec2, Vec2};

use crate::geometry::{Axis, Direction, Rect};
use crate::spatial::TileId;

/// A candidate solid, before its geometry is looked up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionCheck {
    Entity(hecs::Entity),
    Tile {
        tile: TileId,
        box_index: usize,
        /// Only blocks an entity travelling in this direction.
        one_way: Option<Direction>,
    },
    /// Top of a ladder standing in for a floor.
    LadderTop(TileId),
    /// Solid band outside the given side of the room.
    RoomEdge(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionSource {
    RoomEdge(Direction),
    Entity {
        entity: hecs::Entity,
        index: u32,
    },
    Tile {
        tile: TileId,
        box_index: usize,
        location: IVec2,
        layer: usize,
    },
}

/// Sides of a solid that are covered by an abutting static solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Connections([bool; 4]);

impl Connections {
    pub fn set(&mut self, side: Direction) {
        self.0[side.index()] = true;
    }

    pub fn has(&self, side: Direction) -> bool {
        self.0[side.index()]
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|c| *c)
    }
}

/// One entity's contact with one solid for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub source: CollisionSource,
    /// Entity-local collision box used for this contact.
    pub collision_box: Rect,
    /// World-space box of the solid.
    pub solid_box: Rect,
    pub solid_velocity: Vec2,
    /// Direction from the entity toward the solid. `None` means the contact
    /// takes no part in resolution this tick.
    pub direction: Option<Direction>,
    /// Depth past the solid's face along `direction`.
    pub penetration: f32,
    /// Overlap on the axis perpendicular to `direction`.
    pub lateral_penetration: f32,
    pub allowed_penetration: f32,
    pub connections: Connections,
    pub one_way: Option<Direction>,
    pub is_dynamic: bool,
    /// The entity already overlapped the solid before moving.
    pub is_inside: bool,
    pub is_resolved: bool,
    pub is_dodged: bool,
    pub is_rebound: bool,
    /// Touching or penetrating after resolution.
    pub is_colliding: bool,
}

impl Collision {
    pub fn new(source: CollisionSource, collision_box: Rect, solid_box: Rect) -> Self {
        Self {
            source,
            collision_box,
            solid_box,
            solid_velocity: Vec2::ZERO,
            direction: None,
            penetration: 0.0,
            lateral_penetration: 0.0,
            allowed_penetration: 0.0,
            connections: Connections::default(),
            one_way: None,
            is_dynamic: false,
            is_inside: false,
            is_resolved: false,
            is_dodged: false,
            is_rebound: false,
            is_colliding: false,
        }
    }

    pub fn axis(&self) -> Option<Axis> {
        self.direction.map(Direction::axis)
    }

    pub fn is_room_edge(&self) -> bool {
        matches!(self.source, CollisionSource::RoomEdge(_))
    }

    pub fn is_tile(&self) -> bool {
        matches!(self.source, CollisionSource::Tile { .. })
    }

    pub fn tile(&self) -> Option<TileId> {
        match self.source {
            CollisionSource::Tile { tile, .. } => Some(tile),
            _ => None,
        }
    }

    pub fn entity(&self) -> Option<hecs::Entity> {
        match self.source {
            CollisionSource::Entity { entity, .. } => Some(entity),
            _ => None,
        }
    }

    /// Static collisions take part in seam connectivity.
    pub fn is_static(&self) -> bool {
        !self.is_dynamic && self.is_tile()
    }

    /// Pick the authoritative direction from the entity's box before it
    /// moves this tick. Leaves `direction` at `None` when no axis is valid.
    pub fn compute_direction(&mut self, entity_box: &Rect, relative_velocity: Vec2, epsilon: f32) {
        self.direction = None;
        let solid = self.solid_box;

        if let Some(dir) = self.one_way {
            // One-way solids only block from the outside.
            let depth = entity_box.penetration(&solid, dir);
            if self.is_room_edge() || depth <= self.allowed_penetration + epsilon {
                self.direction = Some(dir);
            }
            return;
        }

        self.is_inside = entity_box.overlaps_by(&solid, self.allowed_penetration + epsilon);

        let mut best: Option<(Direction, f32)> = None;
        for axis in Axis::ALL {
            let Some(mut dir) = axis_direction(axis, entity_box, &solid, relative_velocity, epsilon)
            else {
                continue;
            };
            // The face met when moving in `dir` is the solid's `dir.reverse()` side.
            if self.connections.has(dir.reverse()) {
                if !self.is_inside {
                    continue;
                }
                dir = dir.reverse();
                if self.connections.has(dir.reverse()) {
                    continue;
                }
            }
            let depth = entity_box.penetration(&solid, dir);
            if best.map_or(true, |(_, d)| depth < d) {
                best = Some((dir, depth));
            }
        }
        self.direction = best.map(|(dir, _)| dir);
    }

    /// Recompute penetration and lateral overlap against the entity's
    /// current world box.
    pub fn measure(&mut self, entity_box: &Rect) {
        let Some(dir) = self.direction else {
            return;
        };
        self.penetration = entity_box.penetration(&self.solid_box, dir);
        self.lateral_penetration = entity_box.overlap_on(dir.axis().perpendicular(), &self.solid_box);
    }

    pub fn needs_resolution(&self, epsilon: f32) -> bool {
        self.direction.is_some()
            && !self.is_resolved
            && self.lateral_penetration > epsilon
            && self.penetration > self.allowed_penetration + epsilon
    }

    /// Touching or overlapping along its direction.
    pub fn is_touching(&self, epsilon: f32) -> bool {
        self.direction.is_some()
            && self.lateral_penetration > epsilon
            && self.penetration >= -epsilon
    }
}

fn axis_direction(
    axis: Axis,
    entity_box: &Rect,
    solid: &Rect,
    relative_velocity: Vec2,
    epsilon: f32,
) -> Option<Direction> {
    let delta = axis.of(solid.center()) - axis.of(entity_box.center());
    if delta.abs() > epsilon {
        return Some(Direction::from_axis_sign(axis, delta));
    }
    let v = axis.of(relative_velocity);
    (v.abs() > epsilon).then(|| Direction::from_axis_sign(axis, v))
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Resolution order: room edge, then dynamic over static, then entity over
/// tile, then lower entity index, then lower tile Y, X and layer.
/// `Less` means `a` is resolved first.
pub fn compare_priority(a: &Collision, b: &Collision) -> Ordering {
    use CollisionSource::*;

    let edge = |c: &Collision| !c.is_room_edge();
    edge(a)
        .cmp(&edge(b))
        .then_with(|| b.is_dynamic.cmp(&a.is_dynamic))
        .then_with(|| match (&a.source, &b.source) {
            (RoomEdge(da), RoomEdge(db)) => da.index().cmp(&db.index()),
            (Entity { index: ia, .. }, Entity { index: ib, .. }) => ia.cmp(ib),
            (Entity { .. }, _) => Ordering::Less,
            (_, Entity { .. }) => Ordering::Greater,
            (
                Tile {
                    location: la,
                    layer: ya,
                    box_index: ba,
                    ..
                },
                Tile {
                    location: lb,
                    layer: yb,
                    box_index: bb,
                    ..
                },
            ) => la
                .y
                .cmp(&lb.y)
                .then(la.x.cmp(&lb.x))
                .then(ya.cmp(yb))
                .then(ba.cmp(bb)),
            (RoomEdge(_), _) => Ordering::Less,
            (_, RoomEdge(_)) => Ordering::Greater,
        })
}

/// Mark sides of static solids covered by an abutting static solid whose
/// extent along that side contains theirs.
pub fn connect_static(collisions: &mut [Collision], epsilon: f32) {
    let n = collisions.len();
    for i in 0..n {
        if !collisions[i].is_static() {
            continue;
        }
        for j in 0..n {
            if i == j || !collisions[j].is_static() {
                continue;
            }
            let a = collisions[i].solid_box;
            let b = collisions[j].solid_box;
            let covers_x = b.left() <= a.left() + epsilon && b.right() >= a.right() - epsilon;
            let covers_y = b.top() <= a.top() + epsilon && b.bottom() >= a.bottom() - epsilon;

            let conn = &mut collisions[i].connections;
            if covers_x && (b.bottom() - a.top()).abs() < epsilon {
                conn.set(Direction::Up);
            }
            if covers_x && (b.top() - a.bottom()).abs() < epsilon {
                conn.set(Direction::Down);
            }
            if covers_y && (b.right() - a.left()).abs() < epsilon {
                conn.set(Direction::Left);
            }
            if covers_y && (b.left() - a.right()).abs() < epsilon {
                conn.set(Direction::Right);
            }
        }
    }
}
