use super::consts::EPSILON;
use super::transform::Transform;
use super::vec2::Vec2;

/// The motion of a body's center of mass over one time step.
///
/// `c0`/`a0` hold the pose at time `t0`, `c`/`a` the pose at the end of the
/// step (time 1). Continuous collision interpolates between the two.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sweep {
    /// Center of mass in body-local coordinates
    pub local_center: Vec2,
    /// World center of mass at `t0`
    pub c0: Vec2,
    /// World center of mass at the end of the step
    pub c: Vec2,
    /// Angle at `t0`
    pub a0: f32,
    /// Angle at the end of the step
    pub a: f32,
    /// Fraction of the step already consumed
    pub t0: f32,
}

impl Sweep {
    /// Interpolated transform at `alpha` in [0, 1]
    pub fn transform_at(&self, alpha: f32) -> Transform {
        let center = self.c0 * (1.0 - alpha) + self.c * alpha;
        let angle = (1.0 - alpha) * self.a0 + alpha * self.a;
        let mut xf = Transform::from_angle(center, angle);
        // Shift from center of mass to body origin
        xf.position -= xf.r * self.local_center;
        xf
    }

    /// Moves the start of the sweep forward to time `t`
    pub fn advance(&mut self, t: f32) {
        if self.t0 < t && 1.0 - self.t0 > EPSILON {
            let alpha = (t - self.t0) / (1.0 - self.t0);
            self.c0 = self.c0 * (1.0 - alpha) + self.c * alpha;
            self.a0 = (1.0 - alpha) * self.a0 + alpha * self.a;
            self.t0 = t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn moving_sweep() -> Sweep {
        Sweep {
            local_center: Vec2::ZERO,
            c0: Vec2::new(0.0, 0.0),
            c: Vec2::new(10.0, 0.0),
            a0: 0.0,
            a: 1.0,
            t0: 0.0,
        }
    }

    #[test]
    fn test_transform_endpoints() {
        let sweep = moving_sweep();
        let start = sweep.transform_at(0.0);
        let end = sweep.transform_at(1.0);
        assert_eq!(start.position, Vec2::ZERO);
        assert_relative_eq!(end.position.x, 10.0);
        assert_relative_eq!(end.angle(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_transform_accounts_for_local_center() {
        let mut sweep = moving_sweep();
        sweep.local_center = Vec2::new(1.0, 0.0);
        let xf = sweep.transform_at(0.0);
        // Body origin sits one unit behind the center of mass
        assert_relative_eq!(xf.position.x, -1.0);
    }

    #[test]
    fn test_advance() {
        let mut sweep = moving_sweep();
        sweep.advance(0.5);
        assert_relative_eq!(sweep.t0, 0.5);
        assert_relative_eq!(sweep.c0.x, 5.0);
        assert_relative_eq!(sweep.a0, 0.5);

        // Advancing backwards is a no-op
        sweep.advance(0.25);
        assert_relative_eq!(sweep.t0, 0.5);

        // Remaining half of the motion is split proportionally
        sweep.advance(0.75);
        assert_relative_eq!(sweep.c0.x, 7.5);
    }
}
