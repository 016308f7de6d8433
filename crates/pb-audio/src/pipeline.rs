use pb_core::config::PipelineConfig;
use pb_core::frame::{AnalysisFrame, DetectionResult};
use pb_core::traits::SampleSource;

use crate::analyzer::SpectralAnalyzer;
use crate::rhythm::RhythmDetector;

/// Analyzer and detector composed frame by frame.
///
/// A disconnected analyzer hands `None` to the detector, which then keeps its
/// tempo and reports no onset.
///
/// # Example
/// ```
/// use pb_audio::pipeline::Pipeline;
/// use pb_core::config::PipelineConfig;
///
/// let mut pipeline = Pipeline::from_config(PipelineConfig::default());
/// let (frame, result) = pipeline.tick(0.0);
/// assert_eq!(frame.energy, 0.0);
/// assert!(!result.beat_detected);
/// ```
pub struct Pipeline {
    analyzer: SpectralAnalyzer,
    detector: RhythmDetector,
}

impl Pipeline {
    #[must_use]
    pub fn new(analyzer: SpectralAnalyzer, detector: RhythmDetector) -> Self {
        Self { analyzer, detector }
    }

    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        Self::new(
            SpectralAnalyzer::new(config.analyzer),
            RhythmDetector::new(config.detector),
        )
    }

    /// Attach a sample provider to the analyzer.
    pub fn connect(&mut self, source: Box<dyn SampleSource>) {
        self.analyzer.connect(source);
    }

    /// Pull the connected source, analyze it, run detection at `now` (ms).
    pub fn tick(&mut self, now: f64) -> (AnalysisFrame, DetectionResult) {
        let frame = self.analyzer.update();
        let result = self.detect(&frame, now);
        (frame, result)
    }

    /// Same as [`tick`](Self::tick) with host-supplied arrays.
    pub fn tick_with(
        &mut self,
        raw_fft: &[f32],
        raw_waveform: &[f32],
        now: f64,
    ) -> (AnalysisFrame, DetectionResult) {
        let frame = self.analyzer.update_with(raw_fft, raw_waveform);
        let result = self.detect(&frame, now);
        (frame, result)
    }

    fn detect(&mut self, frame: &AnalysisFrame, now: f64) -> DetectionResult {
        let frame = self.analyzer.is_connected().then_some(frame);
        self.detector.update(frame, now)
    }

    #[must_use]
    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut SpectralAnalyzer {
        &mut self.analyzer
    }

    #[must_use]
    pub fn detector(&self) -> &RhythmDetector {
        &self.detector
    }

    /// Listener registration and threshold tuning go through here.
    pub fn detector_mut(&mut self) -> &mut RhythmDetector {
        &mut self.detector
    }

    /// Reset both stages; connection and listeners survive.
    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.detector.reset();
    }

    /// Dispose both stages.
    pub fn dispose(&mut self) {
        self.analyzer.dispose();
        self.detector.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn disconnected_pipeline_keeps_tempo() {
        let mut pipeline = Pipeline::from_config(PipelineConfig::default());
        pipeline.analyzer_mut().connect_external();
        let silence = vec![-100.0; 1024];
        let quiet = vec![0.0; 2048];
        let loud = vec![0.4; 2048];
        for i in 0..5 {
            let t = 1000.0 + f64::from(i) * 500.0;
            let _ = pipeline.tick_with(&silence, &quiet, t - 16.0);
            let (_, result) = pipeline.tick_with(&silence, &loud, t);
            assert!(result.beat_detected);
        }
        assert_eq!(pipeline.detector().bpm(), 120);

        let _ = pipeline.analyzer_mut().disconnect();
        let (frame, result) = pipeline.tick(3100.0);
        assert_eq!(frame.energy, 0.0);
        assert_eq!(result.bpm, 120);
        assert!(!result.beat_detected);
    }

    #[test]
    fn dispose_clears_both_stages() {
        let mut pipeline = Pipeline::from_config(PipelineConfig::default());
        pipeline.analyzer_mut().connect_external();
        let _sub = pipeline.detector_mut().on_beat_detected(|_| {});
        let _ = pipeline.tick_with(&[-20.0; 1024], &[0.5; 2048], 500.0);
        assert_eq!(pipeline.analyzer().energy_history_len(), 1);

        pipeline.reset();
        assert_eq!(pipeline.analyzer().energy_history_len(), 0);
        assert_eq!(pipeline.detector().listener_count(EventKind::Beat), 1);

        pipeline.dispose();
        assert!(!pipeline.analyzer().is_connected());
        assert_eq!(pipeline.detector().listener_count(EventKind::Beat), 0);
    }
}
