/// Fournisseur externe d'échantillons auquel l'analyseur spectral se connecte.
///
/// Implémenté par : `StreamSource` (pb-audio), ou tout adaptateur de capture
/// côté hôte. Les échecs du fournisseur (périphérique perdu, etc.) restent
/// son affaire : l'analyseur ne fait que lire les derniers tableaux exposés.
///
/// # Example
/// ```
/// use pb_core::traits::SampleSource;
///
/// struct Silence { fft: Vec<f32>, wave: Vec<f32> }
/// impl SampleSource for Silence {
///     fn sample_rate(&self) -> f32 { 48000.0 }
///     fn frequency_data(&self) -> &[f32] { &self.fft }
///     fn waveform_data(&self) -> &[f32] { &self.wave }
/// }
///
/// let s = Silence { fft: vec![-100.0; 1024], wave: vec![0.0; 2048] };
/// assert_eq!(s.frequency_data().len(), 1024);
/// ```
pub trait SampleSource: Send {
    /// Ramène les échantillons en attente avant lecture. Appelé une fois par
    /// tick par l'analyseur ; ne doit pas bloquer.
    fn poll(&mut self) {}

    /// Sample rate (Hz) of the underlying stream.
    fn sample_rate(&self) -> f32;

    /// Latest FFT magnitudes in dB (conventionally −100..0), `fft_size / 2` values.
    ///
    /// CONTRAT : ne bloque jamais ; retourne le dernier spectre connu.
    fn frequency_data(&self) -> &[f32];

    /// Latest time-domain block, conventionally [-1, 1], `fft_size` values.
    fn waveform_data(&self) -> &[f32];
}
