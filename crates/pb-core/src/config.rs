use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::band::BandRanges;
use crate::error::CoreError;

/// Taille FFT par défaut.
pub const DEFAULT_FFT_SIZE: usize = 2048;
/// Sample rate supposé tant que l'hôte n'a pas rapporté le vrai.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
/// Capacité de l'historique d'énergie.
pub const DEFAULT_ENERGY_HISTORY: usize = 60;
/// Capacité de l'historique de beats.
pub const DEFAULT_BEAT_HISTORY: usize = 30;
/// Fenêtre réfractaire du charleston (ms).
pub const DEFAULT_HIHAT_INTERVAL_MS: f64 = 100.0;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// Configuration de l'analyseur spectral.
///
/// # Example
/// ```
/// use pb_core::config::AnalyzerConfig;
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.fft_size, 2048);
/// assert!((config.smoothing - 0.8).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    /// Taille FFT (puissance de deux).
    pub fft_size: usize,
    /// Lissage exponentiel des bandes [0.0, 1.0]. 0 = brut, 0.9 = très lissé.
    pub smoothing: f32,
    /// Plages de fréquence des six bandes.
    pub frequency_ranges: BandRanges,
    /// Sample rate de la source (Hz).
    pub sample_rate: f32,
    /// Capacité de l'historique d'énergie (moyenne glissante).
    pub energy_history_size: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: 0.8,
            frequency_ranges: BandRanges::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            energy_history_size: DEFAULT_ENERGY_HISTORY,
        }
    }
}

impl AnalyzerConfig {
    /// Clamp all numeric fields to their valid ranges.
    ///
    /// A non power-of-two FFT size is rounded up rather than rejected.
    pub fn clamp_all(&mut self) {
        self.fft_size = normalize_fft_size(self.fft_size);
        self.smoothing = clamp_unit(self.smoothing);
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        self.energy_history_size = self.energy_history_size.max(1);
    }
}

/// Configuration du détecteur de rythme.
///
/// # Example
/// ```
/// use pb_core::config::DetectorConfig;
/// let config = DetectorConfig::default();
/// assert_eq!(config.min_beat_interval, 200.0);
/// assert_eq!(config.hihat_interval, 100.0);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Delta d'énergie déclenchant un beat [0.0, 1.0].
    pub threshold: f32,
    /// Décroissance géométrique du seuil adaptatif, par frame [0.5, 0.99].
    pub decay_rate: f32,
    /// Fenêtre réfractaire beat/kick/snare (ms).
    pub min_beat_interval: f64,
    /// Seuil kick sur subBass + bass.
    pub kick_threshold: f32,
    /// Seuil snare sur mid.
    pub snare_threshold: f32,
    /// Seuil hi-hat sur treble.
    pub hihat_threshold: f32,
    /// Fenêtre réfractaire hi-hat (ms), plus courte : les charlestons se répètent vite.
    pub hihat_interval: f64,
    /// Capacité de l'historique de beats.
    pub beat_history_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            decay_rate: 0.95,
            min_beat_interval: 200.0,
            kick_threshold: 0.2,
            snare_threshold: 0.15,
            hihat_threshold: 0.1,
            hihat_interval: DEFAULT_HIHAT_INTERVAL_MS,
            beat_history_size: DEFAULT_BEAT_HISTORY,
        }
    }
}

impl DetectorConfig {
    /// Clamp all numeric fields to their valid ranges.
    pub fn clamp_all(&mut self) {
        self.threshold = clamp_threshold(self.threshold);
        self.decay_rate = clamp_decay_rate(self.decay_rate);
        self.min_beat_interval = clamp_interval(self.min_beat_interval);
        self.kick_threshold = clamp_instrument_threshold(self.kick_threshold);
        self.snare_threshold = clamp_instrument_threshold(self.snare_threshold);
        self.hihat_threshold = clamp_instrument_threshold(self.hihat_threshold);
        self.hihat_interval = clamp_interval(self.hihat_interval);
        // L'estimation du tempo a besoin d'au moins 4 beats.
        self.beat_history_size = self.beat_history_size.max(4);
    }
}

/// Configuration complète du pipeline.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub analyzer: AnalyzerConfig,
    pub detector: DetectorConfig,
}

impl PipelineConfig {
    /// Clamp every section.
    pub fn clamp_all(&mut self) {
        self.analyzer.clamp_all();
        self.detector.clamp_all();
    }
}

/// Clamp to [0, 1]; NaN maps to 0.
#[inline]
#[must_use]
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Beat threshold domain: [0, 1].
#[inline]
#[must_use]
pub fn clamp_threshold(v: f32) -> f32 {
    clamp_unit(v)
}

/// Decay-rate domain: [0.5, 0.99].
#[inline]
#[must_use]
pub fn clamp_decay_rate(v: f32) -> f32 {
    if v.is_nan() { 0.95 } else { v.clamp(0.5, 0.99) }
}

/// Instrument threshold domain: [0, 2] (kick sums two bands).
#[inline]
#[must_use]
pub fn clamp_instrument_threshold(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 2.0) }
}

/// Refractory windows are non-negative milliseconds.
#[inline]
#[must_use]
pub fn clamp_interval(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

/// Round up to the next power of two within [32, 32768].
///
/// # Example
/// ```
/// use pb_core::config::normalize_fft_size;
/// assert_eq!(normalize_fft_size(2048), 2048);
/// assert_eq!(normalize_fft_size(1000), 1024);
/// assert_eq!(normalize_fft_size(0), 32);
/// ```
#[must_use]
pub fn normalize_fft_size(size: usize) -> usize {
    size.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE).next_power_of_two()
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    analyzer: Option<AnalyzerSection>,
    detector: Option<DetectorSection>,
}

/// Analyzer section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct AnalyzerSection {
    fft_size: Option<usize>,
    smoothing: Option<f32>,
    frequency_ranges: Option<BandRanges>,
    sample_rate: Option<f32>,
    energy_history_size: Option<usize>,
}

/// Detector section of the TOML config, all fields optional.
#[derive(Deserialize)]
struct DetectorSection {
    threshold: Option<f32>,
    decay_rate: Option<f32>,
    min_beat_interval: Option<f64>,
    kick_threshold: Option<f32>,
    snare_threshold: Option<f32>,
    hihat_threshold: Option<f32>,
    hihat_interval: Option<f64>,
    beat_history_size: Option<usize>,
}

/// Parse un document TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed or a band range is invalid.
///
/// # Example
/// ```
/// use pb_core::config::parse_config;
/// let config = parse_config("[detector]\nthreshold = 3.0\n").unwrap();
/// assert_eq!(config.detector.threshold, 1.0);
/// assert_eq!(config.analyzer.fft_size, 2048);
/// ```
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = PipelineConfig::default();

    if let Some(a) = file.analyzer {
        let c = &mut config.analyzer;
        if let Some(v) = a.fft_size {
            c.fft_size = v;
        }
        if let Some(v) = a.smoothing {
            c.smoothing = v;
        }
        if let Some(v) = a.frequency_ranges {
            c.frequency_ranges = v;
        }
        if let Some(v) = a.sample_rate {
            c.sample_rate = v;
        }
        if let Some(v) = a.energy_history_size {
            c.energy_history_size = v;
        }
    }

    if let Some(d) = file.detector {
        let c = &mut config.detector;
        if let Some(v) = d.threshold {
            c.threshold = v;
        }
        if let Some(v) = d.decay_rate {
            c.decay_rate = v;
        }
        if let Some(v) = d.min_beat_interval {
            c.min_beat_interval = v;
        }
        if let Some(v) = d.kick_threshold {
            c.kick_threshold = v;
        }
        if let Some(v) = d.snare_threshold {
            c.snare_threshold = v;
        }
        if let Some(v) = d.hihat_threshold {
            c.hihat_threshold = v;
        }
        if let Some(v) = d.hihat_interval {
            c.hihat_interval = v;
        }
        if let Some(v) = d.beat_history_size {
            c.beat_history_size = v;
        }
    }

    config.analyzer.frequency_ranges.validate()?;
    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file is missing, cannot be read, or fails to parse.
///
/// # Example
/// ```no_run
/// use pb_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let config = parse_config(&content)
        .with_context(|| format!("Configuration invalide dans {}", path.display()))?;
    log::info!("Configuration chargée depuis {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::FrequencyBand;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap_or_default();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = parse_config(
            "[analyzer]\nsmoothing = 1.5\nfft_size = 3000\n\n[detector]\ndecay_rate = 0.1\nmin_beat_interval = -50.0\n",
        );
        let config = match config {
            Ok(c) => c,
            Err(e) => panic!("parse failed: {e}"),
        };
        assert_eq!(config.analyzer.smoothing, 1.0);
        assert_eq!(config.analyzer.fft_size, 4096);
        assert_eq!(config.detector.decay_rate, 0.5);
        assert_eq!(config.detector.min_beat_interval, 0.0);
    }

    #[test]
    fn band_ranges_override_by_name() {
        let config = parse_config(
            "[analyzer.frequency_ranges]\nbass = { min_hz = 50.0, max_hz = 200.0 }\n",
        );
        let Ok(config) = config else {
            panic!("band override should parse");
        };
        let ranges = config.analyzer.frequency_ranges;
        assert_eq!(ranges[FrequencyBand::Bass].min_hz, 50.0);
        assert_eq!(ranges[FrequencyBand::SubBass].max_hz, 60.0);
    }

    #[test]
    fn inverted_band_range_is_rejected() {
        let result = parse_config(
            "[analyzer.frequency_ranges]\nmid = { min_hz = 2000.0, max_hz = 500.0 }\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_config_from_file() {
        let mut file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("tempfile: {e}"),
        };
        let written = writeln!(file, "[detector]\nkick_threshold = 0.3\nbeat_history_size = 2");
        assert!(written.is_ok());

        let Ok(config) = load_config(file.path()) else {
            panic!("config should load");
        };
        assert!((config.detector.kick_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.detector.beat_history_size, 4);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(Path::new("/nonexistent/pulsebeat.toml"));
        let Err(err) = err else {
            panic!("missing file should fail");
        };
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::FileNotFound { .. })
        ));
    }

    #[test]
    fn shipped_default_config_matches_defaults() {
        let config = match parse_config(include_str!("../../../config/default.toml")) {
            Ok(c) => c,
            Err(e) => panic!("config/default.toml should parse: {e}"),
        };
        assert_eq!(config, PipelineConfig::default());
    }
}
