use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::features::DB_FLOOR;

/// FFT pipeline: windowed real FFT using realfft, magnitudes in dB.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
/// Output has `fft_size / 2` bins (the Nyquist bin is dropped), floored at −100 dB.
///
/// # Example
/// ```
/// use pb_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(2048);
/// assert_eq!(fft.bin_count(), 1024);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: Arc<dyn RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
}

/// Magnitude giving exactly the dB floor: 20·log10(1e-5) = −100.
const MIN_MAGNITUDE: f32 = 1e-5;

impl FftPipeline {
    /// Create a new FFT pipeline with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Hann window
        let denom = (size as f32 - 1.0).max(1.0);
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
        }
    }

    /// Process `samples` through windowed FFT and write dB magnitudes into `out`.
    ///
    /// Missing samples are zero-padded. Writes `min(out.len(), bin_count())` values.
    ///
    /// # Example
    /// ```
    /// use pb_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let mut out = vec![0.0f32; 128];
    /// fft.process_db(&vec![0.0f32; 256], &mut out);
    /// assert!(out.iter().all(|&db| (db + 100.0).abs() < 1e-3));
    /// ```
    pub fn process_db(&mut self, samples: &[f32], out: &mut [f32]) {
        let n = self.fft_size.min(samples.len());

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { samples[i] * self.window[i] } else { 0.0 };
        }

        // Forward FFT
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            out.fill(DB_FLOOR);
            return;
        }

        let scale = 1.0 / self.fft_size as f32;
        for (slot, c) in out.iter_mut().zip(self.spectrum_buf.iter()) {
            let magnitude = c.norm() * scale;
            *slot = 20.0 * magnitude.max(MIN_MAGNITUDE).log10();
        }
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of dB bins produced (`fft_size / 2`).
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_peaks_in_expected_bin() {
        let size = 1024;
        let sample_rate = 44100.0f32;
        // Centre of bin 20
        let freq = 20.0 * sample_rate / size as f32;
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let mut fft = FftPipeline::new(size);
        let mut out = vec![0.0f32; fft.bin_count()];
        fft.process_db(&samples, &mut out);

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(20));
        assert!(out[20] > -20.0, "full-scale sine should be loud, got {}", out[20]);
        assert!(out[300] < out[20] - 40.0);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut fft = FftPipeline::new(64);
        let mut out = vec![0.0f32; 32];
        fft.process_db(&[0.0; 10], &mut out);
        assert!(out.iter().all(|&db| (db - DB_FLOOR).abs() < 1e-4));
    }
}
