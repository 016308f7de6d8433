use std::fmt;

use pb_core::band::{BandLevels, FrequencyBand};
use pb_core::timeline::{EventCounts, RhythmTimeline};

/// Résumé d'une analyse offline.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub frames: usize,
    pub duration_ms: f64,
    pub bpm: u32,
    pub confidence: f32,
    pub counts: EventCounts,
    /// Niveau moyen de chaque bande sur toute la timeline.
    pub mean_levels: BandLevels,
    pub mean_energy: f32,
    /// Bande détaillée : (bande, niveau crête, instant de la crête en ms).
    pub focus: Option<(FrequencyBand, f32, f64)>,
}

impl Report {
    #[must_use]
    pub fn from_timeline(timeline: &RhythmTimeline, focus: Option<FrequencyBand>) -> Self {
        let (bpm, confidence) = timeline.final_tempo();
        let frames = timeline.total_frames();

        let mut sums = [0.0_f64; FrequencyBand::COUNT];
        let mut energy_sum = 0.0_f64;
        for entry in &timeline.entries {
            for (band, level) in entry.band_levels.iter() {
                sums[band.index()] += f64::from(level);
            }
            energy_sum += f64::from(entry.energy);
        }
        let divisor = frames.max(1) as f64;
        let mean_levels = BandLevels::from_array(sums.map(|s| (s / divisor) as f32));

        let focus = focus.map(|band| {
            timeline
                .entries
                .iter()
                .map(|e| (e.band_levels[band], e.time_ms))
                .fold((band, 0.0_f32, 0.0_f64), |peak, (level, t)| {
                    if level > peak.1 { (band, level, t) } else { peak }
                })
        });

        Self {
            frames,
            duration_ms: timeline.entries.last().map_or(0.0, |e| e.time_ms),
            bpm,
            confidence,
            counts: timeline.count_events(),
            mean_levels,
            mean_energy: (energy_sum / divisor) as f32,
            focus,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} frames, {:.2}s analysées",
            self.frames,
            self.duration_ms / 1000.0
        )?;
        if self.bpm == 0 {
            writeln!(f, "tempo      : inconnu (moins de 4 beats)")?;
        } else {
            writeln!(
                f,
                "tempo      : {} bpm (confiance {:.0}%)",
                self.bpm,
                self.confidence * 100.0
            )?;
        }
        writeln!(
            f,
            "événements : {} beats, {} kicks, {} snares, {} hi-hats",
            self.counts.beats, self.counts.kicks, self.counts.snares, self.counts.hihats
        )?;
        writeln!(f, "énergie    : {:.3} en moyenne", self.mean_energy)?;
        for (band, level) in self.mean_levels.iter() {
            writeln!(f, "  {:<8} {level:.3}", band.name())?;
        }
        if let Some((band, peak, t)) = self.focus {
            writeln!(f, "{band} : crête {peak:.3} à {t:.0} ms")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::frame::DetectionResult;
    use pb_core::timeline::TimelineEntry;

    fn timeline() -> RhythmTimeline {
        let entry = |t: f64, bass: f32, beat: bool| TimelineEntry {
            time_ms: t,
            band_levels: BandLevels::from_pairs(&[(FrequencyBand::Bass, bass)]),
            energy: 0.5,
            detection: DetectionResult {
                beat_detected: beat,
                bpm: 120,
                confidence: 0.9,
                ..DetectionResult::default()
            },
        };
        RhythmTimeline {
            entries: vec![entry(10.0, 0.2, false), entry(20.0, 0.8, true), entry(30.0, 0.2, false)],
            frame_duration_ms: 10.0,
        }
    }

    #[test]
    fn summarizes_timeline() {
        let report = Report::from_timeline(&timeline(), Some(FrequencyBand::Bass));
        assert_eq!(report.frames, 3);
        assert_eq!(report.bpm, 120);
        assert_eq!(report.counts.beats, 1);
        assert!((report.mean_levels[FrequencyBand::Bass] - 0.4).abs() < 1e-6);
        assert!((report.mean_energy - 0.5).abs() < 1e-6);
        assert_eq!(report.focus, Some((FrequencyBand::Bass, 0.8, 20.0)));
    }

    #[test]
    fn empty_timeline_reports_unknown_tempo() {
        let report = Report::from_timeline(&RhythmTimeline::default(), None);
        assert_eq!(report.frames, 0);
        assert_eq!(report.mean_energy, 0.0);
        assert!(report.to_string().contains("inconnu"));
    }
}
