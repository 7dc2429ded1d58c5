pub const DEFAULT_GROUND_LEVEL_ALPHA: f32 = 0.1;

/// Tracks the launch pad's altitude above sea level while on the ground and
/// converts ASL readings to AGL once launched.
///
/// The baseline is an EMA with weight `alpha`. Until `1 / alpha` samples have
/// been seen the weight is `1 / n` instead, so the early estimate is the plain
/// mean and the first sample is taken as is.
#[derive(Debug, Clone)]
pub struct GroundLevelEstimator {
    alpha: f32,
    estimated_ground_level_m: f32,
    sample_count: u32,
    launched: bool,
}

impl Default for GroundLevelEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_GROUND_LEVEL_ALPHA)
    }
}

impl GroundLevelEstimator {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            estimated_ground_level_m: 0.0,
            sample_count: 0,
            launched: false,
        }
    }

    /// Returns the altitude above ground, always 0 before launch.
    pub fn update(&mut self, altitude_asl_m: f32) -> f32 {
        if self.launched {
            return altitude_asl_m - self.estimated_ground_level_m;
        }

        self.sample_count = self.sample_count.saturating_add(1);
        let weight = (1.0 / self.sample_count as f32).max(self.alpha);
        self.estimated_ground_level_m += weight * (altitude_asl_m - self.estimated_ground_level_m);
        0.0
    }

    /// Freezes the baseline.
    pub fn launch_detected(&mut self) {
        if !self.launched {
            log_info!(
                "Ground level frozen at {}m after {} samples",
                self.estimated_ground_level_m,
                self.sample_count
            );
        }
        self.launched = true;
    }

    pub fn egl(&self) -> f32 {
        self.estimated_ground_level_m
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }
}
