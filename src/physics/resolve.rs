use glam::Vec2;
use log::{debug, trace};

use crate::geometry::{Axis, Direction, Rect};

use super::body::Body;
use super::collision::Collision;
use super::{RoomMode, RoomPhysics};

impl RoomPhysics {
    /// Move the entity along X then Y, resolving each axis before the next.
    pub(super) fn integrate_axes(&mut self, body: &mut Body, mode: RoomMode) {
        let intended = body.motion();
        for axis in Axis::ALL {
            let delta = axis.of(body.motion());
            let before = body.collision_box();
            let target = axis.of(body.position) + delta;
            axis.set(&mut body.position, target);
            self.remeasure(body);
            self.redirect_entered(&before, &body.collision_box(), axis, delta);

            self.resolve_axis(body, axis, mode);
            self.dodge(body, axis, intended);
        }
    }

    /// A contact picked on the other axis that this move slid into from
    /// the side is blocked on this axis instead.
    fn redirect_entered(&mut self, before: &Rect, after: &Rect, axis: Axis, delta: f32) {
        let eps = self.config.epsilon;
        if delta.abs() <= eps {
            return;
        }
        let dir = Direction::from_axis_sign(axis, delta);
        for c in &mut self.collisions {
            if c.one_way.is_some() || c.is_resolved || c.axis() != Some(axis.perpendicular()) {
                continue;
            }
            if before.overlap_on(axis, &c.solid_box) > eps
                || after.overlap_on(axis, &c.solid_box) <= eps
                || c.connections.has(dir.reverse())
            {
                continue;
            }
            c.direction = Some(dir);
            c.measure(after);
        }
    }

    pub(super) fn remeasure(&mut self, body: &Body) {
        let entity_box = body.collision_box();
        for c in &mut self.collisions {
            c.measure(&entity_box);
        }
    }

    fn resolve_axis(&mut self, body: &mut Body, axis: Axis, mode: RoomMode) {
        let eps = self.config.epsilon;
        // Each pass resolves or reclassifies one collision.
        for _ in 0..self.collisions.len() * 2 {
            let Some(i) = self
                .collisions
                .iter()
                .position(|c| c.axis() == Some(axis) && c.needs_resolution(eps))
            else {
                return;
            };
            if axis == Axis::X && self.try_snap(body, i, mode) {
                continue;
            }
            let c = &self.collisions[i];
            let Some(dir) = c.direction else {
                return;
            };

            // Never push the entity deeper into a solid on the far side.
            let mut correction = c.penetration - c.allowed_penetration;
            for (j, other) in self.collisions.iter().enumerate() {
                if j != i
                    && other.direction == Some(dir.reverse())
                    && other.lateral_penetration > eps
                {
                    correction =
                        correction.min((other.allowed_penetration - other.penetration).max(0.0));
                }
            }

            let target = axis.of(body.position) - dir.sign() * correction;
            axis.set(&mut body.position, target);

            let v = axis.of(body.velocity);
            if v * dir.sign() > 0.0 {
                let mut velocity = body.velocity;
                if body.physics.reboundable {
                    axis.set(&mut velocity, -v);
                    self.collisions[i].is_rebound = true;
                } else {
                    axis.set(&mut velocity, 0.0);
                }
                body.velocity = velocity;
            }
            self.collisions[i].is_resolved = true;
            trace!(
                "entity {}: resolved {:?} by {:.3}",
                body.index,
                dir,
                correction
            );
            self.remeasure(body);
        }
    }

    /// True when the probe box would sink into any blocking solid.
    fn blocked(&self, probe: &Rect) -> bool {
        let eps = self.config.epsilon;
        self.blockers().any(|c| probe.overlaps_by(&c.solid_box, eps))
    }

    /// Like `blocked`, ignoring solids `from` already overlaps.
    fn blocked_moving(&self, from: &Rect, to: &Rect) -> bool {
        let eps = self.config.epsilon;
        self.blockers()
            .any(|c| to.overlaps_by(&c.solid_box, eps) && !from.overlaps_by(&c.solid_box, eps))
    }

    fn blockers(&self) -> impl Iterator<Item = &Collision> {
        self.collisions
            .iter()
            .filter(|c| c.one_way.is_none() || c.direction.is_some())
    }

    // -----------------------------------------------------------------------
    // Step snapping
    // -----------------------------------------------------------------------

    /// Lift a grounded side-scroll entity onto a low step instead of
    /// stopping it. Reclassifies the step as floor.
    fn try_snap(&mut self, body: &mut Body, i: usize, mode: RoomMode) -> bool {
        let eps = self.config.epsilon;
        if mode != RoomMode::SideScroll
            || !body.physics.has_gravity
            || body.state.is_climbing
            || !body.state.was_on_ground
        {
            return false;
        }
        let c = &self.collisions[i];
        if c.is_room_edge() || c.one_way.is_some() {
            return false;
        }
        let entity_box = body.collision_box();
        let rise = entity_box.bottom() - c.solid_box.top();
        if rise <= eps || rise > self.config.snap_height {
            return false;
        }
        if self.blocked(&entity_box.translated(Vec2::new(0.0, -rise))) {
            return false;
        }

        body.position.y -= rise;
        self.collisions[i].direction = Some(Direction::Down);
        debug!("entity {}: snapped up {:.2}", body.index, rise);
        self.remeasure(body);
        true
    }

    // -----------------------------------------------------------------------
    // Corner dodging
    // -----------------------------------------------------------------------

    /// Slide around the corner of a solid that blocked straight motion,
    /// when the corner is within reach and the way past it is clear.
    fn dodge(&mut self, body: &mut Body, axis: Axis, intended: Vec2) {
        let eps = self.config.epsilon;
        let reach = body.physics.auto_dodge_distance;
        if reach <= 0.0 || body.physics.auto_dodge_speed <= 0.0 {
            return;
        }
        let lateral = axis.perpendicular();
        if axis.of(intended).abs() <= eps || lateral.of(intended).abs() > eps {
            return;
        }
        let dir = Direction::from_axis_sign(axis, axis.of(intended));
        let Some(i) = self.collisions.iter().position(|c| {
            c.is_resolved && !c.is_dodged && !c.is_room_edge() && c.direction == Some(dir)
        }) else {
            return;
        };

        let solid = self.collisions[i].solid_box;
        let entity_box = body.collision_box();
        let mut options = [
            (-1.0, entity_box.max_on(lateral) - solid.min_on(lateral)),
            (1.0, solid.max_on(lateral) - entity_box.min_on(lateral)),
        ];
        if options[1].1 < options[0].1 {
            options.swap(0, 1);
        }

        for (sign, distance) in options {
            if distance <= eps || distance > reach {
                continue;
            }
            let side = lateral.unit() * sign;
            let probe = entity_box
                .translated(side * distance + dir.to_vec2() * self.config.dodge_probe_distance);
            let step = side * distance.min(body.physics.auto_dodge_speed);
            if self.blocked(&probe) || self.blocked_moving(&entity_box, &entity_box.translated(step)) {
                continue;
            }
            body.position += step;
            self.collisions[i].is_dodged = true;
            debug!(
                "entity {}: dodging {:?} around {:?} corner",
                body.index,
                Direction::from_axis_sign(lateral, sign),
                dir
            );
            self.remeasure(body);
            return;
        }
    }

    // -----------------------------------------------------------------------
    // Crushing
    // -----------------------------------------------------------------------

    /// Axis along which a moving solid is pressing the entity into another
    /// solid with too little room left.
    pub(super) fn detect_crush(&self, body: &Body) -> Option<Axis> {
        if !body.physics.is_crushable {
            return None;
        }
        let eps = self.config.epsilon;
        for (r, rock) in self.collisions.iter().enumerate() {
            let Some(rock_dir) = rock.direction else {
                continue;
            };
            let axis = rock_dir.axis();
            // The rock must be moving toward the entity.
            if !rock.is_dynamic
                || !rock.is_touching(eps)
                || axis.of(rock.solid_velocity) * rock_dir.sign() >= 0.0
            {
                continue;
            }
            let push = rock_dir.reverse();
            for (h, hard) in self.collisions.iter().enumerate() {
                if h == r || hard.direction != Some(push) || !hard.is_touching(eps) {
                    continue;
                }
                let gap = if push.sign() > 0.0 {
                    hard.solid_box.min_on(axis) - rock.solid_box.max_on(axis)
                } else {
                    rock.solid_box.min_on(axis) - hard.solid_box.max_on(axis)
                };
                if gap < body.physics.crush_max_gap {
                    return Some(axis);
                }
            }
        }
        None
    }
}
