use crate::band::{BandLevels, FrequencyBand};

/// Résultat de l'analyse spectrale pour un tick.
///
/// Produit à neuf à chaque appel de `SpectralAnalyzer::update`. L'état de
/// lissage reste la propriété de l'analyseur.
///
/// # Example
/// ```
/// use pb_core::frame::AnalysisFrame;
/// let frame = AnalysisFrame::empty(2048);
/// assert_eq!(frame.frequency_data.len(), 1024);
/// assert_eq!(frame.waveform_data.len(), 2048);
/// assert_eq!(frame.energy, 0.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisFrame {
    /// Magnitudes FFT en dB, longueur `fft_size / 2`.
    pub frequency_data: Vec<f32>,
    /// Échantillons temporels [-1.0, 1.0], longueur `fft_size`.
    pub waveform_data: Vec<f32>,
    /// Niveau lissé par bande [0.0, 1.0].
    pub band_levels: BandLevels,
    /// Énergie RMS (gain 2, plafonnée) [0.0, 1.0].
    pub energy: f32,
    /// Moyenne glissante de `energy` [0.0, 1.0].
    pub average_energy: f32,
}

impl AnalysisFrame {
    /// The empty analysis: zero levels and zero-filled arrays of the right length.
    #[must_use]
    pub fn empty(fft_size: usize) -> Self {
        Self {
            frequency_data: vec![0.0; fft_size / 2],
            waveform_data: vec![0.0; fft_size],
            band_levels: BandLevels::default(),
            energy: 0.0,
            average_energy: 0.0,
        }
    }

    /// Frame carrying only band levels and energy, with no sample data.
    ///
    /// This is the shape the rhythm detector actually reads, handy for hosts
    /// that compute bands elsewhere.
    ///
    /// # Example
    /// ```
    /// use pb_core::band::{BandLevels, FrequencyBand};
    /// use pb_core::frame::AnalysisFrame;
    /// let frame = AnalysisFrame::from_levels(
    ///     BandLevels::from_pairs(&[(FrequencyBand::Bass, 0.5)]),
    ///     0.3,
    /// );
    /// assert_eq!(frame.level(FrequencyBand::Bass), 0.5);
    /// assert!(frame.frequency_data.is_empty());
    /// ```
    #[must_use]
    pub fn from_levels(band_levels: BandLevels, energy: f32) -> Self {
        Self {
            frequency_data: Vec::new(),
            waveform_data: Vec::new(),
            band_levels,
            energy,
            average_energy: energy,
        }
    }

    #[inline]
    #[must_use]
    pub fn level(&self, band: FrequencyBand) -> f32 {
        self.band_levels[band]
    }
}

/// Sortie du détecteur de rythme pour un tick.
///
/// # Example
/// ```
/// use pb_core::frame::DetectionResult;
/// let r = DetectionResult::default();
/// assert!(!r.beat_detected);
/// assert_eq!(r.bpm, 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectionResult {
    /// Transitoire d'énergie globale.
    pub beat_detected: bool,
    /// Onset grosse caisse (subBass + bass).
    pub kick_detected: bool,
    /// Onset caisse claire (mid).
    pub snare_detected: bool,
    /// Onset charleston (treble).
    pub hihat_detected: bool,
    /// Tempo estimé : 0 si historique insuffisant, sinon dans [60, 200].
    pub bpm: u32,
    /// Régularité des intervalles [0.0, 1.0].
    pub confidence: f32,
    /// Millisecondes depuis le dernier beat (>= 0).
    pub time_since_last_beat: f64,
}

impl DetectionResult {
    /// True if any onset flag is set.
    #[must_use]
    pub fn any_onset(&self) -> bool {
        self.beat_detected || self.kick_detected || self.snare_detected || self.hihat_detected
    }
}
