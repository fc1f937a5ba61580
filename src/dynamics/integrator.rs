use crate::math::utils::clamp;
use crate::math::Vec2;
use crate::settings::{MAX_ROTATION, MAX_ROTATION_SQUARED, MAX_TRANSLATION, MAX_TRANSLATION_SQUARED};

use super::body::{Body, BodyType};

/// Integrates gravity, accumulated forces and damping into the velocities
/// of a dynamic body (semi-implicit Euler, velocity half)
pub fn integrate_velocity(body: &mut Body, gravity: Vec2, dt: f32) {
    if body.body_type != BodyType::Dynamic {
        return;
    }

    body.linear_velocity += (gravity + body.force * body.inv_mass) * dt;
    body.angular_velocity += dt * body.inv_inertia * body.torque;

    // Damping is clamped so it never reverses the motion
    body.linear_velocity *= clamp(1.0 - dt * body.linear_damping, 0.0, 1.0);
    body.angular_velocity *= clamp(1.0 - dt * body.angular_damping, 0.0, 1.0);
}

/// Advances the sweep by the body velocities, capping the motion per step.
///
/// The start of the sweep is moved to the current pose first, so the sweep
/// covers exactly this step's motion.
pub fn integrate_position(body: &mut Body, dt: f32) {
    if body.body_type == BodyType::Static {
        return;
    }

    // Check for large velocities
    let translation = body.linear_velocity * dt;
    if translation.length_squared() > MAX_TRANSLATION_SQUARED {
        body.linear_velocity *= MAX_TRANSLATION / translation.length();
    }

    let rotation = dt * body.angular_velocity;
    if rotation * rotation > MAX_ROTATION_SQUARED {
        body.angular_velocity *= MAX_ROTATION / rotation.abs();
    }

    body.sweep.c0 = body.sweep.c;
    body.sweep.a0 = body.sweep.a;

    body.sweep.c += body.linear_velocity * dt;
    body.sweep.a += dt * body.angular_velocity;

    body.synchronize_transform();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::body::BodyDef;
    use approx::assert_relative_eq;

    #[test]
    fn test_gravity_integration() {
        let mut body = Body::new(&BodyDef::dynamic());
        integrate_velocity(&mut body, Vec2::new(0.0, -10.0), 0.1);
        assert_relative_eq!(body.linear_velocity().y, -1.0);

        integrate_position(&mut body, 0.1);
        assert_relative_eq!(body.position().y, -0.1);
        assert_relative_eq!(body.sweep().c0.y, 0.0);
    }

    #[test]
    fn test_static_body_does_not_move() {
        let mut body = Body::new(&BodyDef::fixed());
        integrate_velocity(&mut body, Vec2::new(0.0, -10.0), 0.1);
        integrate_position(&mut body, 0.1);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.position(), Vec2::ZERO);
    }

    #[test]
    fn test_kinematic_ignores_gravity_but_moves() {
        let mut body = Body::new(&BodyDef::kinematic().with_linear_velocity(Vec2::new(1.0, 0.0)));
        integrate_velocity(&mut body, Vec2::new(0.0, -10.0), 0.5);
        integrate_position(&mut body, 0.5);
        assert_relative_eq!(body.linear_velocity().y, 0.0);
        assert_relative_eq!(body.position().x, 0.5);
    }

    #[test]
    fn test_damping_never_reverses() {
        let mut body = Body::new(
            &BodyDef::dynamic()
                .with_linear_velocity(Vec2::new(2.0, 0.0))
                .with_damping(100.0, 100.0),
        );
        integrate_velocity(&mut body, Vec2::ZERO, 0.5);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_translation_is_capped() {
        let mut body = Body::new(&BodyDef::dynamic().with_linear_velocity(Vec2::new(1000.0, 0.0)));
        integrate_position(&mut body, 1.0);
        assert_relative_eq!(body.position().x, MAX_TRANSLATION, epsilon = 1e-4);
    }
}
