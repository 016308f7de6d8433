use pb_core::band::{BandLevels, BandRanges, FrequencyBand};
use pb_core::config::AnalyzerConfig;
use pb_core::frame::AnalysisFrame;
use pb_core::ring::RingBuffer;
use pb_core::traits::SampleSource;

use crate::features;
use crate::smoothing::BandSmoother;

/// État de connexion de l'analyseur.
enum Connection {
    Disconnected,
    /// L'hôte pousse lui-même les tableaux via `update_with`.
    External,
    Source(Box<dyn SampleSource>),
}

/// Converts raw FFT magnitudes and waveform samples into a bounded [`AnalysisFrame`].
///
/// Owns the smoothing memory (one previous level per band) and a fixed-capacity
/// energy history. A disconnected analyzer returns the empty analysis and
/// leaves its state untouched.
///
/// # Example
/// ```
/// use pb_audio::analyzer::SpectralAnalyzer;
/// use pb_core::config::AnalyzerConfig;
///
/// let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
/// analyzer.connect_external();
/// let frame = analyzer.update_with(&vec![-40.0; 1024], &vec![0.25; 2048]);
/// assert!((frame.energy - 0.5).abs() < 1e-6);
/// assert!(frame.band_levels.iter().all(|(_, l)| l > 0.0 && l <= 1.0));
/// ```
pub struct SpectralAnalyzer {
    fft_size: usize,
    sample_rate: f32,
    ranges: BandRanges,
    smoother: BandSmoother,
    frequency_data: Vec<f32>,
    waveform_data: Vec<f32>,
    energy: f32,
    energy_history: RingBuffer<f32>,
    connection: Connection,
}

impl SpectralAnalyzer {
    /// Create an analyzer with zero-filled buffers.
    ///
    /// Out-of-range configuration values are corrected, not rejected: a non
    /// power-of-two FFT size is rounded up, an invalid sample rate falls back
    /// to 44.1 kHz.
    #[must_use]
    pub fn new(mut config: AnalyzerConfig) -> Self {
        let requested = config.fft_size;
        config.clamp_all();
        if config.fft_size != requested {
            log::warn!(
                "fft_size {requested} is not a supported power of two, using {}",
                config.fft_size
            );
        }
        Self {
            fft_size: config.fft_size,
            sample_rate: config.sample_rate,
            ranges: config.frequency_ranges,
            smoother: BandSmoother::new(config.smoothing),
            frequency_data: vec![0.0; config.fft_size / 2],
            waveform_data: vec![0.0; config.fft_size],
            energy: 0.0,
            energy_history: RingBuffer::new(config.energy_history_size),
            connection: Connection::Disconnected,
        }
    }

    // === Connection ===

    /// Attach a sample provider and adopt its sample rate.
    ///
    /// Replaces any previously connected source.
    pub fn connect(&mut self, source: Box<dyn SampleSource>) {
        let rate = source.sample_rate();
        self.connection = Connection::Source(source);
        self.set_sample_rate(rate);
        log::info!("spectral analyzer connected @ {}Hz", self.sample_rate);
    }

    /// Mark the analyzer connected without a source: the host feeds arrays
    /// through [`update_with`](Self::update_with).
    pub fn connect_external(&mut self) {
        self.connection = Connection::External;
        log::info!("spectral analyzer connected (external feed)");
    }

    /// Detach. Returns the source if one was attached.
    pub fn disconnect(&mut self) -> Option<Box<dyn SampleSource>> {
        let previous = std::mem::replace(&mut self.connection, Connection::Disconnected);
        match previous {
            Connection::Source(source) => {
                log::info!("spectral analyzer disconnected");
                Some(source)
            }
            Connection::External => {
                log::info!("spectral analyzer disconnected");
                None
            }
            Connection::Disconnected => None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !matches!(self.connection, Connection::Disconnected)
    }

    // === Analysis ===

    /// Pull the connected source and analyze one frame.
    ///
    /// With an external feed, re-analyzes the last arrays pushed through
    /// [`update_with`](Self::update_with).
    pub fn update(&mut self) -> AnalysisFrame {
        if matches!(self.connection, Connection::Disconnected) {
            return self.empty_analysis();
        }
        if let Connection::Source(source) = &mut self.connection {
            source.poll();
            copy_bounded(&mut self.frequency_data, source.frequency_data());
            copy_bounded(&mut self.waveform_data, source.waveform_data());
            let rate = source.sample_rate();
            if rate.is_finite() && rate > 0.0 {
                self.sample_rate = rate;
            }
        }
        self.analyze()
    }

    /// Analyze caller-supplied arrays.
    ///
    /// At most `fft_size / 2` magnitudes and `fft_size` samples are copied;
    /// extra data is ignored and a short array leaves the tail of the buffer
    /// from the previous frame.
    pub fn update_with(&mut self, raw_fft: &[f32], raw_waveform: &[f32]) -> AnalysisFrame {
        if !self.is_connected() {
            return self.empty_analysis();
        }
        copy_bounded(&mut self.frequency_data, raw_fft);
        copy_bounded(&mut self.waveform_data, raw_waveform);
        self.analyze()
    }

    fn analyze(&mut self) -> AnalysisFrame {
        let raw = features::band_levels(&self.frequency_data, &self.ranges, self.sample_rate);
        let band_levels = self.smoother.smooth(&raw);

        self.energy = features::energy(&self.waveform_data);
        self.energy_history.push(self.energy);

        AnalysisFrame {
            frequency_data: self.frequency_data.clone(),
            waveform_data: self.waveform_data.clone(),
            band_levels,
            energy: self.energy,
            average_energy: self.average_energy(),
        }
    }

    /// The empty analysis: zero levels, zero-filled arrays of the right length.
    #[must_use]
    pub fn empty_analysis(&self) -> AnalysisFrame {
        AnalysisFrame::empty(self.fft_size)
    }

    // === Accessors (never mutate) ===

    #[must_use]
    pub fn band_level(&self, band: FrequencyBand) -> f32 {
        self.smoother.levels()[band]
    }

    #[must_use]
    pub fn band_levels(&self) -> BandLevels {
        *self.smoother.levels()
    }

    #[must_use]
    pub fn sub_bass(&self) -> f32 {
        self.band_level(FrequencyBand::SubBass)
    }

    #[must_use]
    pub fn bass(&self) -> f32 {
        self.band_level(FrequencyBand::Bass)
    }

    #[must_use]
    pub fn low_mid(&self) -> f32 {
        self.band_level(FrequencyBand::LowMid)
    }

    #[must_use]
    pub fn mid(&self) -> f32 {
        self.band_level(FrequencyBand::Mid)
    }

    #[must_use]
    pub fn high_mid(&self) -> f32 {
        self.band_level(FrequencyBand::HighMid)
    }

    #[must_use]
    pub fn treble(&self) -> f32 {
        self.band_level(FrequencyBand::Treble)
    }

    /// `min(1, (subBass + bass) / 1.5)`.
    #[must_use]
    pub fn combined_bass_level(&self) -> f32 {
        ((self.sub_bass() + self.bass()) / 1.5).min(1.0)
    }

    /// `min(1, (lowMid + mid + highMid) / 2)`.
    #[must_use]
    pub fn combined_mid_level(&self) -> f32 {
        ((self.low_mid() + self.mid() + self.high_mid()) / 2.0).min(1.0)
    }

    /// Energy of the last analyzed frame.
    #[must_use]
    pub fn energy(&self) -> f32 {
        self.energy
    }

    /// Mean of the energy history, 0 when empty.
    #[must_use]
    pub fn average_energy(&self) -> f32 {
        self.energy_history.mean()
    }

    #[must_use]
    pub fn energy_history_len(&self) -> usize {
        self.energy_history.len()
    }

    #[must_use]
    pub fn energy_history_capacity(&self) -> usize {
        self.energy_history.capacity()
    }

    #[must_use]
    pub fn smoothing(&self) -> f32 {
        self.smoother.smoothing()
    }

    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins (`fft_size / 2`).
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.frequency_data.len()
    }

    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[must_use]
    pub fn frequency_ranges(&self) -> &BandRanges {
        &self.ranges
    }

    // === Configuration ===

    /// Clamped to [0, 1].
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoother.set_smoothing(smoothing);
    }

    /// Report the real sample rate. Non-positive or non-finite values are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        } else {
            log::warn!("ignoring invalid sample rate {sample_rate}");
        }
    }

    // === Lifecycle ===

    /// Zero buffers, band memory and energy history. Configuration and
    /// connection are kept.
    pub fn reset(&mut self) {
        self.frequency_data.fill(0.0);
        self.waveform_data.fill(0.0);
        self.smoother.reset();
        self.energy = 0.0;
        self.energy_history.clear();
    }

    /// `reset` plus disconnect.
    pub fn dispose(&mut self) {
        self.reset();
        let _ = self.disconnect();
    }
}

/// Copy `min(dst.len(), src.len())` values; the rest of `dst` is untouched.
#[inline]
fn copy_bounded(dst: &mut [f32], src: &[f32]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        rate: f32,
        fft: Vec<f32>,
        wave: Vec<f32>,
    }

    impl SampleSource for FixedSource {
        fn sample_rate(&self) -> f32 {
            self.rate
        }
        fn frequency_data(&self) -> &[f32] {
            &self.fft
        }
        fn waveform_data(&self) -> &[f32] {
            &self.wave
        }
    }

    fn small_config() -> AnalyzerConfig {
        AnalyzerConfig {
            fft_size: 64,
            smoothing: 0.0,
            ..AnalyzerConfig::default()
        }
    }

    #[test]
    fn disconnected_update_is_empty() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        let frame = analyzer.update();
        assert_eq!(frame, AnalysisFrame::empty(2048));
        assert!(frame.band_levels.iter().all(|(_, l)| l == 0.0));
        assert_eq!(frame.energy, 0.0);
        assert_eq!(frame.average_energy, 0.0);
        // update_with is also gated
        let frame = analyzer.update_with(&[0.0; 1024], &[1.0; 2048]);
        assert_eq!(frame.energy, 0.0);
        assert_eq!(analyzer.energy_history_len(), 0);
    }

    #[test]
    fn connected_source_is_copied() {
        let mut analyzer = SpectralAnalyzer::new(small_config());
        analyzer.connect(Box::new(FixedSource {
            rate: 48000.0,
            fft: vec![-20.0; 32],
            wave: vec![0.5; 64],
        }));
        assert!(analyzer.is_connected());
        assert_eq!(analyzer.sample_rate(), 48000.0);

        let frame = analyzer.update();
        assert_eq!(frame.frequency_data, vec![-20.0; 32]);
        assert_eq!(frame.energy, 1.0);

        let Some(source) = analyzer.disconnect() else {
            panic!("source should be returned");
        };
        assert!(!analyzer.is_connected());
        assert!(source.waveform_data().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn bounded_copy_keeps_stale_tail() {
        let mut analyzer = SpectralAnalyzer::new(small_config());
        analyzer.connect_external();
        let _ = analyzer.update_with(&[-10.0; 32], &[0.1; 64]);
        let frame = analyzer.update_with(&[-90.0; 8], &[0.2; 200]);
        assert_eq!(frame.frequency_data[..8], [-90.0; 8]);
        assert_eq!(frame.frequency_data[8..], [-10.0; 24]);
        assert_eq!(frame.waveform_data.len(), 64);
        assert!(frame.waveform_data.iter().all(|&s| s == 0.2));
    }

    #[test]
    fn smoothing_follows_one_pole_formula() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig {
            smoothing: 0.5,
            ..AnalyzerConfig::default()
        });
        analyzer.connect_external();
        // 0 dB everywhere → raw level 1.0 in every band
        let frame = analyzer.update_with(&[0.0; 1024], &[0.0; 2048]);
        assert!((frame.band_levels[FrequencyBand::Bass] - 0.5).abs() < 1e-6);
        let frame = analyzer.update_with(&[0.0; 1024], &[0.0; 2048]);
        assert!((frame.band_levels[FrequencyBand::Bass] - 0.75).abs() < 1e-6);
        assert!((analyzer.bass() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn levels_above_zero_db_are_capped() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig {
            smoothing: 0.0,
            ..AnalyzerConfig::default()
        });
        analyzer.connect_external();
        let frame = analyzer.update_with(&[30.0; 1024], &[0.0; 2048]);
        for (band, level) in frame.band_levels.iter() {
            assert_eq!(level, 1.0, "{band} should be capped");
        }
    }

    #[test]
    fn combined_levels_are_bounded() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig {
            smoothing: 0.0,
            ..AnalyzerConfig::default()
        });
        analyzer.connect_external();
        let _ = analyzer.update_with(&[0.0; 1024], &[0.0; 2048]);
        assert_eq!(analyzer.combined_bass_level(), 1.0);
        assert_eq!(analyzer.combined_mid_level(), 1.0);

        let _ = analyzer.update_with(&[-70.0; 1024], &[0.0; 2048]);
        // (0.3 + 0.3) / 1.5
        assert!((analyzer.combined_bass_level() - 0.4).abs() < 1e-5);
        // (0.3 * 3) / 2
        assert!((analyzer.combined_mid_level() - 0.45).abs() < 1e-5);
    }

    #[test]
    fn energy_history_is_capped() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig {
            energy_history_size: 60,
            ..small_config()
        });
        analyzer.connect_external();
        for i in 0..100 {
            let amp = (i % 10) as f32 / 10.0;
            let frame = analyzer.update_with(&[-50.0; 32], &[amp; 64]);
            assert!(analyzer.energy_history_len() <= 60);
            assert!((0.0..=1.0).contains(&frame.average_energy));
        }
        assert_eq!(analyzer.energy_history_len(), 60);
    }

    #[test]
    fn set_smoothing_clamps() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        analyzer.set_smoothing(-0.5);
        assert_eq!(analyzer.smoothing(), 0.0);
        analyzer.set_smoothing(1.5);
        assert_eq!(analyzer.smoothing(), 1.0);
    }

    #[test]
    fn odd_fft_size_is_rounded_up() {
        let analyzer = SpectralAnalyzer::new(AnalyzerConfig {
            fft_size: 1000,
            ..AnalyzerConfig::default()
        });
        assert_eq!(analyzer.fft_size(), 1024);
        assert_eq!(analyzer.bin_count(), 512);
    }

    #[test]
    fn invalid_sample_rate_is_ignored() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        analyzer.set_sample_rate(-1.0);
        analyzer.set_sample_rate(f32::NAN);
        assert_eq!(analyzer.sample_rate(), 44100.0);
        analyzer.set_sample_rate(48000.0);
        assert_eq!(analyzer.sample_rate(), 48000.0);
    }

    #[test]
    fn accessors_do_not_mutate() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        analyzer.connect_external();
        let _ = analyzer.update_with(&[-30.0; 1024], &[0.3; 2048]);
        let first = (analyzer.band_levels(), analyzer.energy(), analyzer.average_energy());
        let second = (analyzer.band_levels(), analyzer.energy(), analyzer.average_energy());
        assert_eq!(first, second);
        assert_eq!(analyzer.energy_history_len(), 1);
    }

    #[test]
    fn reset_and_dispose() {
        let mut analyzer = SpectralAnalyzer::new(AnalyzerConfig::default());
        analyzer.connect_external();
        let _ = analyzer.update_with(&[-30.0; 1024], &[0.3; 2048]);
        analyzer.reset();
        assert!(analyzer.is_connected());
        assert_eq!(analyzer.energy_history_len(), 0);
        assert_eq!(analyzer.bass(), 0.0);

        analyzer.dispose();
        assert!(!analyzer.is_connected());
    }
}
