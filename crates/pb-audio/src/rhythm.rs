use pb_core::band::FrequencyBand;
use pb_core::config::{
    DetectorConfig, clamp_decay_rate, clamp_instrument_threshold, clamp_interval,
    clamp_threshold,
};
use pb_core::frame::{AnalysisFrame, DetectionResult};
use pb_core::ring::RingBuffer;

use crate::events::{
    BeatEvent, EventKind, Instrument, Listener, Listeners, OnsetEvent, Subscription,
};

/// Bornes du tempo estimé.
pub const MIN_BPM: u32 = 60;
pub const MAX_BPM: u32 = 200;

/// Nombre minimal de beats dans l'historique pour estimer un tempo.
pub const MIN_BEATS_FOR_TEMPO: usize = 4;

/// Callbacks passés directement à la construction.
///
/// Enregistrés avant tout listener ajouté ensuite via `on_*_detected`.
#[derive(Default)]
pub struct DetectorHooks {
    pub on_beat: Option<Listener<BeatEvent>>,
    pub on_kick: Option<Listener<OnsetEvent>>,
    pub on_snare: Option<Listener<OnsetEvent>>,
    pub on_hihat: Option<Listener<OnsetEvent>>,
}

/// Onset detection and tempo estimation over a stream of [`AnalysisFrame`]s.
///
/// Beat: energy transient above an adaptive threshold that jumps to the last
/// beat's energy and decays geometrically every frame, gated by a refractory
/// window. Kick / snare / hi-hat: independent band thresholds, each with its
/// own refractory timer and no cross-instrument suppression. Tempo: mean
/// inter-beat interval over a fixed-capacity beat history.
///
/// Timestamps are monotonic milliseconds supplied by the host. All timers
/// start at 0, so no onset can fire during the first refractory window of a
/// session.
///
/// # Example
/// ```
/// use pb_audio::rhythm::RhythmDetector;
/// use pb_core::config::DetectorConfig;
/// use pb_core::frame::AnalysisFrame;
///
/// let mut detector = RhythmDetector::new(DetectorConfig::default());
/// let quiet = AnalysisFrame { energy: 0.0, ..AnalysisFrame::default() };
/// let loud = AnalysisFrame { energy: 0.8, ..AnalysisFrame::default() };
/// detector.update(Some(&quiet), 1000.0);
/// let result = detector.update(Some(&loud), 1016.0);
/// assert!(result.beat_detected);
/// assert_eq!(result.bpm, 0); // not enough history yet
/// ```
pub struct RhythmDetector {
    config: DetectorConfig,

    current_energy: f32,
    previous_energy: f32,
    /// Seuil adaptatif : remonte à l'énergie du dernier beat, décroît à chaque frame.
    energy_threshold: f32,

    last_beat_time: f64,
    last_kick_time: f64,
    last_snare_time: f64,
    last_hihat_time: f64,

    beat_history: RingBuffer<f64>,
    bpm: u32,
    confidence: f32,

    beat_listeners: Listeners<BeatEvent>,
    kick_listeners: Listeners<OnsetEvent>,
    snare_listeners: Listeners<OnsetEvent>,
    hihat_listeners: Listeners<OnsetEvent>,
}

impl RhythmDetector {
    /// Create a detector. Out-of-range configuration values are clamped.
    #[must_use]
    pub fn new(mut config: DetectorConfig) -> Self {
        config.clamp_all();
        Self {
            beat_history: RingBuffer::new(config.beat_history_size),
            config,
            current_energy: 0.0,
            previous_energy: 0.0,
            energy_threshold: 0.0,
            last_beat_time: 0.0,
            last_kick_time: 0.0,
            last_snare_time: 0.0,
            last_hihat_time: 0.0,
            bpm: 0,
            confidence: 0.0,
            beat_listeners: Listeners::new(EventKind::Beat),
            kick_listeners: Listeners::new(EventKind::Kick),
            snare_listeners: Listeners::new(EventKind::Snare),
            hihat_listeners: Listeners::new(EventKind::Hihat),
        }
    }

    /// Create a detector with callbacks registered up front.
    #[must_use]
    pub fn with_hooks(config: DetectorConfig, hooks: DetectorHooks) -> Self {
        let mut detector = Self::new(config);
        // Hook handles are not returned: they live until `dispose`.
        if let Some(f) = hooks.on_beat {
            let _ = detector.beat_listeners.add(f);
        }
        if let Some(f) = hooks.on_kick {
            let _ = detector.kick_listeners.add(f);
        }
        if let Some(f) = hooks.on_snare {
            let _ = detector.snare_listeners.add(f);
        }
        if let Some(f) = hooks.on_hihat {
            let _ = detector.hihat_listeners.add(f);
        }
        detector
    }

    /// Process one frame at time `now` (ms).
    ///
    /// `None` leaves every piece of state untouched and reports the previous
    /// tempo with all onset flags cleared.
    pub fn update(&mut self, frame: Option<&AnalysisFrame>, now: f64) -> DetectionResult {
        let Some(frame) = frame else {
            return self.idle_result(now);
        };

        self.previous_energy = self.current_energy;
        self.current_energy = frame.energy;
        self.energy_threshold *= self.config.decay_rate;

        let beat_detected = self.detect_beat(now);

        let kick_energy = frame.level(FrequencyBand::SubBass) + frame.level(FrequencyBand::Bass);
        let kick_detected = self.detect_onset(Instrument::Kick, kick_energy, now);
        let snare_detected = self.detect_onset(Instrument::Snare, frame.level(FrequencyBand::Mid), now);
        let hihat_detected =
            self.detect_onset(Instrument::Hihat, frame.level(FrequencyBand::Treble), now);

        DetectionResult {
            beat_detected,
            kick_detected,
            snare_detected,
            hihat_detected,
            bpm: self.bpm,
            confidence: self.confidence,
            time_since_last_beat: self.time_since_last_beat(now),
        }
    }

    fn idle_result(&self, now: f64) -> DetectionResult {
        DetectionResult {
            bpm: self.bpm,
            confidence: self.confidence,
            time_since_last_beat: self.time_since_last_beat(now),
            ..DetectionResult::default()
        }
    }

    fn detect_beat(&mut self, now: f64) -> bool {
        let energy_delta = self.current_energy - self.previous_energy;
        let fired = energy_delta > self.config.threshold
            && self.current_energy > self.energy_threshold
            && now - self.last_beat_time > self.config.min_beat_interval;
        if !fired {
            return false;
        }

        self.last_beat_time = now;
        // Le pic qui décroît ne doit pas redéclencher : le prochain transitoire
        // doit dépasser cette énergie-ci.
        self.energy_threshold = self.current_energy;
        self.beat_history.push(now);
        self.update_tempo();

        log::trace!(
            "beat @ {now:.1}ms energy={:.3} bpm={} confidence={:.2}",
            self.current_energy,
            self.bpm,
            self.confidence
        );

        let event = BeatEvent {
            time_ms: now,
            energy: self.current_energy,
            bpm: self.bpm,
            confidence: self.confidence,
        };
        self.beat_listeners.emit(&event);
        true
    }

    fn detect_onset(&mut self, instrument: Instrument, energy: f32, now: f64) -> bool {
        let (threshold, refractory, last) = match instrument {
            Instrument::Kick => (
                self.config.kick_threshold,
                self.config.min_beat_interval,
                &mut self.last_kick_time,
            ),
            Instrument::Snare => (
                self.config.snare_threshold,
                self.config.min_beat_interval,
                &mut self.last_snare_time,
            ),
            Instrument::Hihat => (
                self.config.hihat_threshold,
                self.config.hihat_interval,
                &mut self.last_hihat_time,
            ),
        };

        if !(energy > threshold && now - *last > refractory) {
            return false;
        }
        *last = now;

        let event = OnsetEvent {
            instrument,
            time_ms: now,
            energy,
        };
        match instrument {
            Instrument::Kick => self.kick_listeners.emit(&event),
            Instrument::Snare => self.snare_listeners.emit(&event),
            Instrument::Hihat => self.hihat_listeners.emit(&event),
        }
        true
    }

    /// Recompute bpm / confidence from the beat history.
    fn update_tempo(&mut self) {
        if self.beat_history.len() < MIN_BEATS_FOR_TEMPO {
            self.bpm = 0;
            self.confidence = 0.0;
            return;
        }

        let intervals = self
            .beat_history
            .iter()
            .zip(self.beat_history.iter().skip(1))
            .map(|(prev, next)| next - prev);

        let (bpm, confidence) = tempo_from_iter(intervals);
        self.bpm = bpm;
        self.confidence = confidence;
    }

    fn time_since_last_beat(&self, now: f64) -> f64 {
        (now - self.last_beat_time).max(0.0)
    }

    /// Position within the current beat, in [0, 1). 0 when no tempo is known.
    ///
    /// # Example
    /// ```
    /// use pb_audio::rhythm::RhythmDetector;
    /// use pb_core::config::DetectorConfig;
    /// let detector = RhythmDetector::new(DetectorConfig::default());
    /// assert_eq!(detector.beat_phase(1234.0), 0.0);
    /// ```
    #[must_use]
    pub fn beat_phase(&self, now: f64) -> f64 {
        if self.bpm == 0 {
            return 0.0;
        }
        let beat_duration = 60_000.0 / f64::from(self.bpm);
        let elapsed = self.time_since_last_beat(now);
        let phase = elapsed.rem_euclid(beat_duration) / beat_duration;
        if phase >= 1.0 { 0.0 } else { phase }
    }

    // === Listeners ===

    pub fn on_beat_detected<F>(&mut self, f: F) -> Subscription
    where
        F: FnMut(&BeatEvent) + Send + 'static,
    {
        self.beat_listeners.add(Box::new(f))
    }

    pub fn on_kick_detected<F>(&mut self, f: F) -> Subscription
    where
        F: FnMut(&OnsetEvent) + Send + 'static,
    {
        self.kick_listeners.add(Box::new(f))
    }

    pub fn on_snare_detected<F>(&mut self, f: F) -> Subscription
    where
        F: FnMut(&OnsetEvent) + Send + 'static,
    {
        self.snare_listeners.add(Box::new(f))
    }

    pub fn on_hihat_detected<F>(&mut self, f: F) -> Subscription
    where
        F: FnMut(&OnsetEvent) + Send + 'static,
    {
        self.hihat_listeners.add(Box::new(f))
    }

    /// Remove the callback behind `sub`. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        match sub.kind() {
            EventKind::Beat => self.beat_listeners.remove(sub),
            EventKind::Kick => self.kick_listeners.remove(sub),
            EventKind::Snare => self.snare_listeners.remove(sub),
            EventKind::Hihat => self.hihat_listeners.remove(sub),
        }
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Beat => self.beat_listeners.len(),
            EventKind::Kick => self.kick_listeners.len(),
            EventKind::Snare => self.snare_listeners.len(),
            EventKind::Hihat => self.hihat_listeners.len(),
        }
    }

    // === Configuration (clamp, never reject) ===

    pub fn set_threshold(&mut self, threshold: f32) {
        self.config.threshold = clamp_threshold(threshold);
    }

    pub fn set_decay_rate(&mut self, decay_rate: f32) {
        self.config.decay_rate = clamp_decay_rate(decay_rate);
    }

    pub fn set_min_beat_interval(&mut self, ms: f64) {
        self.config.min_beat_interval = clamp_interval(ms);
    }

    pub fn set_kick_threshold(&mut self, threshold: f32) {
        self.config.kick_threshold = clamp_instrument_threshold(threshold);
    }

    pub fn set_snare_threshold(&mut self, threshold: f32) {
        self.config.snare_threshold = clamp_instrument_threshold(threshold);
    }

    pub fn set_hihat_threshold(&mut self, threshold: f32) {
        self.config.hihat_threshold = clamp_instrument_threshold(threshold);
    }

    // === Lifecycle ===

    /// Clear timers, histories, energies and tempo. Configuration and
    /// listeners are kept.
    pub fn reset(&mut self) {
        self.current_energy = 0.0;
        self.previous_energy = 0.0;
        self.energy_threshold = 0.0;
        self.last_beat_time = 0.0;
        self.last_kick_time = 0.0;
        self.last_snare_time = 0.0;
        self.last_hihat_time = 0.0;
        self.beat_history.clear();
        self.bpm = 0;
        self.confidence = 0.0;
    }

    /// `reset` plus removal of every listener.
    pub fn dispose(&mut self) {
        self.reset();
        self.beat_listeners.clear();
        self.kick_listeners.clear();
        self.snare_listeners.clear();
        self.hihat_listeners.clear();
        log::debug!("rhythm detector disposed");
    }

    // === Read-only state ===

    #[must_use]
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[must_use]
    pub fn last_beat_time(&self) -> f64 {
        self.last_beat_time
    }

    #[must_use]
    pub fn energy_threshold(&self) -> f32 {
        self.energy_threshold
    }

    #[must_use]
    pub fn beat_history_len(&self) -> usize {
        self.beat_history.len()
    }

    /// Beat timestamps, oldest first.
    #[must_use]
    pub fn beat_history(&self) -> Vec<f64> {
        self.beat_history.iter().collect()
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    #[must_use]
    pub fn decay_rate(&self) -> f32 {
        self.config.decay_rate
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

/// Tempo and regularity from consecutive inter-beat intervals (ms).
///
/// `bpm = round(60000 / mean)` clamped to [60, 200];
/// `confidence = max(0, 1 - stddev / mean)`. Confidence is exactly 1.0 only
/// when every interval is identical, otherwise at most `1 - f32::EPSILON`.
/// Returns `(0, 0.0)` for an empty or non-positive mean.
///
/// # Example
/// ```
/// use pb_audio::rhythm::tempo_from_intervals;
/// assert_eq!(tempo_from_intervals(&[500.0, 500.0, 500.0]), (120, 1.0));
/// assert_eq!(tempo_from_intervals(&[100.0, 100.0]).0, 200);
/// assert_eq!(tempo_from_intervals(&[]), (0, 0.0));
/// ```
#[must_use]
pub fn tempo_from_intervals(intervals: &[f64]) -> (u32, f32) {
    tempo_from_iter(intervals.iter().copied())
}

/// Two passes over a cloneable iterator: no allocation on the beat path.
fn tempo_from_iter<I>(intervals: I) -> (u32, f32)
where
    I: Iterator<Item = f64> + Clone,
{
    let (count, sum, _, all_equal) = intervals.clone().fold(
        (0_usize, 0.0_f64, None, true),
        |(count, sum, first, equal), i| {
            let first = first.unwrap_or(i);
            (count + 1, sum + i, Some(first), equal && i == first)
        },
    );
    if count == 0 {
        return (0, 0.0);
    }
    let n = count as f64;
    let avg = sum / n;
    if !(avg.is_finite() && avg > 0.0) {
        return (0, 0.0);
    }

    let bpm = (60_000.0 / avg)
        .round()
        .clamp(f64::from(MIN_BPM), f64::from(MAX_BPM)) as u32;

    let confidence = if all_equal {
        1.0
    } else {
        let variance = intervals.map(|i| (i - avg).powi(2)).sum::<f64>() / n;
        ((1.0 - variance.sqrt() / avg) as f32).clamp(0.0, 1.0 - f32::EPSILON)
    };

    (bpm, confidence)
}
