/// Single-channel exponential moving average.
///
/// The first sample after construction or [`reset`](Self::reset) passes
/// through unchanged; later samples blend `alpha * x + (1 - alpha) * prev`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialFilter {
    alpha: f32,
    prev: Option<f32>,
}

impl Default for ExponentialFilter {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            prev: None,
        }
    }
}

impl ExponentialFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: Self::clamp_alpha(alpha),
            prev: None,
        }
    }

    fn clamp_alpha(alpha: f32) -> f32 {
        if alpha.is_nan() {
            return 1.0;
        }
        // alpha == 0 would freeze the channel on its first sample
        alpha.clamp(f32::EPSILON, 1.0)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Changes the blend weight without discarding history.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = Self::clamp_alpha(alpha);
    }

    pub fn is_initialized(&self) -> bool {
        self.prev.is_some()
    }

    /// Non-finite samples are dropped: the previous output is returned (0.0
    /// before the first sample) and the history is left untouched.
    pub fn filter(&mut self, x: f32) -> f32 {
        if !x.is_finite() {
            return self.prev.unwrap_or(0.0);
        }
        let out = match self.prev {
            None => x,
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
        };
        self.prev = Some(out);
        out
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
