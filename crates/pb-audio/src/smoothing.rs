use pb_core::band::BandLevels;
use pb_core::config::clamp_unit;

/// Lissage exponentiel à un pôle, une mémoire par bande.
///
/// `level = prev + (raw - prev) * (1 - smoothing)` : 0 = brut, proche de 1 = très lent.
/// The memory starts at 0 and persists across calls.
///
/// # Example
/// ```
/// use pb_audio::smoothing::BandSmoother;
/// use pb_core::band::{BandLevels, FrequencyBand};
///
/// let mut smoother = BandSmoother::new(0.5);
/// let raw = BandLevels::from_pairs(&[(FrequencyBand::Bass, 1.0)]);
/// let out = smoother.smooth(&raw);
/// assert_eq!(out[FrequencyBand::Bass], 0.5);
/// let out = smoother.smooth(&raw);
/// assert_eq!(out[FrequencyBand::Bass], 0.75);
/// ```
#[derive(Clone, Debug)]
pub struct BandSmoother {
    smoothing: f32,
    prev: BandLevels,
}

impl BandSmoother {
    /// `smoothing` is clamped to [0, 1].
    #[must_use]
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: clamp_unit(smoothing),
            prev: BandLevels::default(),
        }
    }

    /// Smooth every band toward `raw` and remember the result.
    pub fn smooth(&mut self, raw: &BandLevels) -> BandLevels {
        let gain = 1.0 - self.smoothing;
        for (band, level) in raw.iter() {
            let prev = self.prev[band];
            self.prev[band] = prev + (level - prev) * gain;
        }
        self.prev
    }

    /// Current smoothed levels (no state change).
    #[must_use]
    pub fn levels(&self) -> &BandLevels {
        &self.prev
    }

    #[must_use]
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Clamp rather than reject out-of-range values.
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = clamp_unit(smoothing);
    }

    /// Forget the per-band memory.
    pub fn reset(&mut self) {
        self.prev = BandLevels::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::band::FrequencyBand;

    #[test]
    fn zero_smoothing_passes_raw_through() {
        let mut smoother = BandSmoother::new(0.0);
        let raw = BandLevels::from_array([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(smoother.smooth(&raw), raw);
    }

    #[test]
    fn full_smoothing_freezes_levels() {
        let mut smoother = BandSmoother::new(1.0);
        let raw = BandLevels::from_array([1.0; 6]);
        for _ in 0..10 {
            smoother.smooth(&raw);
        }
        assert_eq!(smoother.levels()[FrequencyBand::Treble], 0.0);
    }

    #[test]
    fn set_smoothing_clamps() {
        let mut smoother = BandSmoother::new(0.8);
        smoother.set_smoothing(-0.5);
        assert_eq!(smoother.smoothing(), 0.0);
        smoother.set_smoothing(1.5);
        assert_eq!(smoother.smoothing(), 1.0);
    }

    #[test]
    fn stays_within_unit_interval() {
        let mut smoother = BandSmoother::new(0.3);
        for i in 0..200 {
            let v = if i % 3 == 0 { 1.0 } else { 0.0 };
            let out = smoother.smooth(&BandLevels::from_array([v; 6]));
            for (_, level) in out.iter() {
                assert!((0.0..=1.0).contains(&level));
            }
        }
    }
}
