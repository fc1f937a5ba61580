use super::ControllerBodies;

/// Mutual attraction between every pair of bodies in the controller.
///
/// With `inv_sqr` the force falls off with the square of the distance;
/// otherwise it falls off linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GravityController {
    /// Gravitational constant
    pub g: f32,
    pub inv_sqr: bool,
}

impl Default for GravityController {
    fn default() -> Self {
        Self { g: 1.0, inv_sqr: true }
    }
}

impl GravityController {
    #[inline]
    pub fn new(g: f32, inv_sqr: bool) -> Self {
        Self { g, inv_sqr }
    }

    pub(crate) fn step(&self, set: &mut ControllerBodies<'_>) {
        for (i, &h1) in set.handles.iter().enumerate() {
            for &h2 in &set.handles[i + 1..] {
                if h1 == h2 {
                    continue;
                }
                let (body1, body2) = set.bodies.pair_mut(h1, h2);
                if !body1.is_awake() && !body2.is_awake() {
                    continue;
                }

                let p1 = body1.world_center();
                let p2 = body2.world_center();
                let d = p2 - p1;
                let r2 = d.length_squared();
                if r2 <= f32::EPSILON {
                    continue;
                }

                let scale = if self.inv_sqr {
                    self.g / (r2 * r2.sqrt())
                } else {
                    self.g / r2
                };
                let f = d * (scale * body1.mass() * body2.mass());

                if body1.is_awake() {
                    body1.apply_force(f, p1);
                }
                if body2.is_awake() {
                    body2.apply_force(-f, p2);
                }
            }
        }
    }
}
