use crate::config::PhysicsConfig;
use crate::ecs::components::ZMotion;

use super::body::Body;
use super::RoomMode;

pub(super) enum Settle {
    Bounced,
    Landed,
}

/// Advance Z by one tick. Returns the impact Z velocity when the entity
/// reaches the ground this tick.
pub(super) fn integrate(body: &mut Body, mode: RoomMode) -> Option<f32> {
    match mode {
        RoomMode::SideScroll => {
            // No height axis here: fold it into Y.
            body.position.y -= body.z.z;
            body.z = ZMotion::default();
            if body.physics.has_gravity && !body.state.is_climbing {
                body.velocity.y =
                    (body.velocity.y + body.physics.gravity).min(body.physics.max_fall_speed);
            }
            None
        }
        RoomMode::TopDown => {
            if !body.z.is_airborne() {
                body.z = ZMotion::default();
                return None;
            }
            if body.physics.has_gravity {
                body.z.velocity =
                    (body.z.velocity - body.physics.gravity).max(-body.physics.max_fall_speed);
            }
            body.z.z += body.z.velocity;
            (body.z.z <= 0.0 && body.z.velocity < 0.0).then_some(body.z.velocity)
        }
    }
}

/// Commit a landing: bounce if the entity bounces and the rebound is fast
/// enough, otherwise come to rest.
pub(super) fn settle(body: &mut Body, impact: f32, config: &PhysicsConfig) -> Settle {
    body.z.z = 0.0;
    let rebound = -impact * config.bounce_factor;
    if body.physics.bounces && rebound >= config.min_bounce_speed {
        body.z.velocity = rebound;
        body.velocity *= config.bounce_lateral_damping;
        Settle::Bounced
    } else {
        body.z.velocity = 0.0;
        Settle::Landed
    }
}
