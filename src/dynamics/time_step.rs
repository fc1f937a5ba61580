/// Parameters of one solver pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeStep {
    /// Time step in seconds
    pub dt: f32,
    /// Inverse time step, zero when `dt` is zero
    pub inv_dt: f32,
    /// `dt * inv_dt0`, scales warm-start impulses when the step changes
    pub dt_ratio: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    pub warm_starting: bool,
}

impl TimeStep {
    pub fn new(
        dt: f32,
        dt_ratio: f32,
        velocity_iterations: usize,
        position_iterations: usize,
        warm_starting: bool,
    ) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio,
            velocity_iterations,
            position_iterations,
            warm_starting,
        }
    }
}
