use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KICK_HZ: f32 = 55.0;
const KICK_DECAY_S: f32 = 0.05;
const KICK_GAIN: f32 = 0.9;

const SNARE_TONE_HZ: f32 = 1000.0;
const SNARE_DECAY_S: f32 = 0.08;
const SNARE_GAIN: f32 = 0.4;

const HIHAT_DECAY_S: f32 = 0.03;
const HIHAT_GAIN: f32 = 0.05;

/// Voices exponentially decayed past this many time constants are skipped.
const TAIL_CONSTANTS: f32 = 8.0;

/// Générateur déterministe de motif de batterie 4/4.
///
/// Kick sur chaque temps, snare sur les temps 2 et 4, hi-hat sur chaque
/// croche. Le bruit (snare, hi-hat) est tiré d'un `StdRng` seedé : deux rendus
/// avec la même seed sont identiques au sample près.
///
/// # Example
/// ```
/// use pb_audio::synth::DrumPattern;
/// let pattern = DrumPattern::new(120.0, 44100);
/// let samples = pattern.render(1.0);
/// assert_eq!(samples.len(), 44100);
/// assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
/// ```
#[derive(Clone, Debug)]
pub struct DrumPattern {
    pub bpm: f32,
    pub sample_rate: u32,
    pub kick: bool,
    pub snare: bool,
    pub hihat: bool,
    pub seed: u64,
}

impl DrumPattern {
    /// Full kit at `bpm` (clamped to [20, 400]).
    #[must_use]
    pub fn new(bpm: f32, sample_rate: u32) -> Self {
        Self {
            bpm: if bpm.is_nan() { 120.0 } else { bpm.clamp(20.0, 400.0) },
            sample_rate,
            kick: true,
            snare: true,
            hihat: true,
            seed: 0x5eed,
        }
    }

    /// Kick only: one clean transient per beat.
    #[must_use]
    pub fn kick_only(bpm: f32, sample_rate: u32) -> Self {
        Self {
            snare: false,
            hihat: false,
            ..Self::new(bpm, sample_rate)
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Beat length in samples.
    #[must_use]
    pub fn samples_per_beat(&self) -> usize {
        (60.0 / self.bpm * self.sample_rate as f32).round() as usize
    }

    /// Render `seconds` of mono audio in [-1, 1].
    #[must_use]
    pub fn render(&self, seconds: f32) -> Vec<f32> {
        if self.sample_rate == 0 || seconds.is_nan() || seconds <= 0.0 {
            return Vec::new();
        }
        let total = (seconds * self.sample_rate as f32) as usize;
        let mut out = vec![0.0_f32; total];
        let beat = self.samples_per_beat().max(2);
        let eighth = beat / 2;
        let sr = self.sample_rate as f32;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut start = 0;
        let mut index = 0_usize;
        while start < total {
            if self.kick {
                add_voice(&mut out[start..], sr, KICK_DECAY_S, |t| {
                    KICK_GAIN * (std::f32::consts::TAU * KICK_HZ * t).sin()
                });
            }
            if self.snare && index % 2 == 1 {
                add_voice(&mut out[start..], sr, SNARE_DECAY_S, |t| {
                    let noise: f32 = rng.gen_range(-1.0..1.0);
                    SNARE_GAIN * (0.7 * noise + 0.3 * (std::f32::consts::TAU * SNARE_TONE_HZ * t).sin())
                });
            }
            if self.hihat {
                for offset in [0, eighth] {
                    if start + offset < total {
                        let mut prev = 0.0_f32;
                        add_voice(&mut out[start + offset..], sr, HIHAT_DECAY_S, |_| {
                            // First difference: pushes the noise energy to the top of the spectrum
                            let noise: f32 = rng.gen_range(-1.0..1.0);
                            let hp = noise - prev;
                            prev = noise;
                            HIHAT_GAIN * hp
                        });
                    }
                }
            }
            start += beat;
            index += 1;
        }

        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        log::debug!(
            "rendered {total} samples @ {}Hz, {} beats at {:.1} bpm",
            self.sample_rate,
            index,
            self.bpm
        );
        out
    }
}

/// Mix an exponentially decaying voice into `out`, starting at its first sample.
fn add_voice(out: &mut [f32], sample_rate: f32, decay_s: f32, mut voice: impl FnMut(f32) -> f32) {
    let len = ((decay_s * TAIL_CONSTANTS * sample_rate) as usize).min(out.len());
    for (i, sample) in out[..len].iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        *sample += voice(t) * (-t / decay_s).exp();
    }
}

/// Pure sine, useful for spectral checks.
#[must_use]
pub fn sine(freq_hz: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let sr = sample_rate.max(1) as f32;
    (0..len)
        .map(|i| amplitude * (std::f32::consts::TAU * freq_hz * i as f32 / sr).sin())
        .collect()
}
