use pb_core::clock::SessionClock;
use pb_core::config::PipelineConfig;
use pb_core::timeline::{RhythmTimeline, TimelineEntry};

use crate::pipeline::Pipeline;
use crate::source::StreamSource;

/// Analyseur rythmique offline.
///
/// Découpe un buffer d'échantillons mono en frames au framerate cible, les
/// pousse dans un [`StreamSource`] et fait tourner le pipeline complet. Les
/// timestamps viennent de la position en échantillons ([`SessionClock`]), pas
/// de l'horloge murale : deux passes sur le même buffer donnent la même
/// timeline.
pub struct BatchAnalyzer {
    config: PipelineConfig,
    target_fps: u32,
    sample_rate: u32,
}

impl BatchAnalyzer {
    /// Crée un nouvel analyseur batch.
    ///
    /// # Example
    /// ```
    /// use pb_audio::batch_analyzer::BatchAnalyzer;
    /// use pb_core::config::PipelineConfig;
    /// let analyzer = BatchAnalyzer::new(PipelineConfig::default(), 60, 44100);
    /// assert_eq!(analyzer.samples_per_frame(), 735);
    /// ```
    #[must_use]
    pub fn new(mut config: PipelineConfig, target_fps: u32, sample_rate: u32) -> Self {
        config.analyzer.sample_rate = sample_rate as f32;
        config.clamp_all();
        Self {
            config,
            target_fps: target_fps.max(1),
            sample_rate,
        }
    }

    /// Samples consumed per analysis tick.
    #[must_use]
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate / self.target_fps) as usize
    }

    /// Fresh pipeline built from this analyzer's configuration.
    ///
    /// Register listeners on it, then hand it to [`run`](Self::run).
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(self.config.clone())
    }

    /// Analyse l'intégralité d'un buffer audio avec un pipeline neuf.
    ///
    /// # Example
    /// ```
    /// use pb_audio::batch_analyzer::BatchAnalyzer;
    /// use pb_core::config::PipelineConfig;
    /// let analyzer = BatchAnalyzer::new(PipelineConfig::default(), 60, 44100);
    /// let samples = vec![0.0; 44100]; // 1 seconde de silence
    /// let timeline = analyzer.analyze_all(&samples);
    /// assert_eq!(timeline.total_frames(), 60);
    /// assert_eq!(timeline.count_events().beats, 0);
    /// ```
    #[must_use]
    pub fn analyze_all(&self, samples: &[f32]) -> RhythmTimeline {
        let mut pipeline = self.pipeline();
        self.run(&mut pipeline, samples)
    }

    /// Feed `samples` through `pipeline`, one tick per frame.
    ///
    /// The pipeline's analyzer is connected to a new [`StreamSource`] for the
    /// duration of the pass. Detector listeners fire as events occur.
    pub fn run(&self, pipeline: &mut Pipeline, samples: &[f32]) -> RhythmTimeline {
        let samples_per_frame = self.samples_per_frame();
        let frame_duration_ms = if self.sample_rate == 0 {
            0.0
        } else {
            samples_per_frame as f64 * 1000.0 / f64::from(self.sample_rate)
        };

        // Zero division protection
        if samples_per_frame == 0 {
            log::warn!(
                "sample rate {} too low for {} fps, nothing analyzed",
                self.sample_rate,
                self.target_fps
            );
            return RhythmTimeline {
                entries: Vec::new(),
                frame_duration_ms,
            };
        }

        let fft_size = self.config.analyzer.fft_size;
        let (source, mut producer) = StreamSource::new(
            fft_size,
            self.sample_rate as f32,
            fft_size.max(samples_per_frame * 2),
        );
        pipeline.connect(Box::new(source));

        let mut clock = SessionClock::new(self.sample_rate);
        let mut entries = Vec::with_capacity(samples.len().div_ceil(samples_per_frame));
        let mut dropped = 0_usize;

        for chunk in samples.chunks(samples_per_frame) {
            for &sample in chunk {
                if producer.push(sample).is_err() {
                    dropped += 1;
                }
            }
            clock.advance(chunk.len());
            let now = clock.now_ms();
            let (frame, detection) = pipeline.tick(now);
            entries.push(TimelineEntry {
                time_ms: now,
                band_levels: frame.band_levels,
                energy: frame.energy,
                detection,
            });
        }

        if dropped > 0 {
            log::warn!("{dropped} samples dropped: sample ring full");
        }
        log::info!(
            "batch analysis: {} frames, {:.1}s @ {}Hz",
            entries.len(),
            clock.now_ms() / 1000.0,
            self.sample_rate
        );

        RhythmTimeline {
            entries,
            frame_duration_ms,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_last_frame_is_analyzed() {
        let analyzer = BatchAnalyzer::new(PipelineConfig::default(), 60, 44100);
        let timeline = analyzer.analyze_all(&vec![0.0; 735 * 3 + 100]);
        assert_eq!(timeline.total_frames(), 4);
        let last = timeline.entries.last().map(|e| e.time_ms).unwrap_or_default();
        assert!((last - (735.0 * 3.0 + 100.0) / 44.1).abs() < 1e-9);
    }

    #[test]
    fn timestamps_follow_sample_position() {
        let analyzer = BatchAnalyzer::new(PipelineConfig::default(), 50, 48000);
        let timeline = analyzer.analyze_all(&vec![0.0; 48000]);
        assert_eq!(timeline.total_frames(), 50);
        assert!((timeline.frame_duration_ms - 20.0).abs() < 1e-9);
        for (i, entry) in timeline.entries.iter().enumerate() {
            assert!((entry.time_ms - (i as f64 + 1.0) * 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn fps_above_sample_rate_yields_empty_timeline() {
        let analyzer = BatchAnalyzer::new(PipelineConfig::default(), 1000, 500);
        let timeline = analyzer.analyze_all(&[0.5; 100]);
        assert_eq!(timeline.total_frames(), 0);
    }

    #[test]
    fn empty_input_yields_empty_timeline() {
        let analyzer = BatchAnalyzer::new(PipelineConfig::default(), 60, 44100);
        assert_eq!(analyzer.analyze_all(&[]).total_frames(), 0);
    }
}
