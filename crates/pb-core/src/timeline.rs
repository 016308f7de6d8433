use crate::band::BandLevels;
use crate::frame::DetectionResult;

/// Une entrée de timeline : ce que le pipeline a vu et décidé à un instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimelineEntry {
    /// Timestamp de session (ms).
    pub time_ms: f64,
    /// Niveaux de bande lissés.
    pub band_levels: BandLevels,
    /// Énergie RMS [0.0, 1.0].
    pub energy: f32,
    /// Sortie du détecteur.
    pub detection: DetectionResult,
}

/// Counts of fired events over a timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub beats: usize,
    pub kicks: usize,
    pub snares: usize,
    pub hihats: usize,
}

/// Une timeline complète pré-calculée d'une analyse offline.
#[derive(Clone, Debug, Default)]
pub struct RhythmTimeline {
    /// Les entrées, une par tick d'analyse.
    pub entries: Vec<TimelineEntry>,
    /// Durée d'un tick en millisecondes (typiquement 1000 / fps).
    pub frame_duration_ms: f64,
}

impl RhythmTimeline {
    /// Obtenir l'entrée à un temps `t` (en millisecondes).
    ///
    /// # Example
    /// ```
    /// use pb_core::timeline::RhythmTimeline;
    /// let timeline = RhythmTimeline { entries: vec![], frame_duration_ms: 16.6 };
    /// assert!(timeline.get_at_time(1000.0).is_none());
    /// ```
    #[must_use]
    pub fn get_at_time(&self, time_ms: f64) -> Option<&TimelineEntry> {
        if self.entries.is_empty() || self.frame_duration_ms <= 0.0 {
            return None;
        }
        let index = (time_ms.max(0.0) / self.frame_duration_ms) as usize;
        self.entries.get(index.min(self.entries.len() - 1))
    }

    /// Nombre total de ticks analysés.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.entries.len()
    }

    /// Timestamps of every fired beat.
    #[must_use]
    pub fn beat_times(&self) -> Vec<f64> {
        self.entries
            .iter()
            .filter(|e| e.detection.beat_detected)
            .map(|e| e.time_ms)
            .collect()
    }

    /// Tempo and confidence reported by the last tick, `(0, 0.0)` if empty.
    #[must_use]
    pub fn final_tempo(&self) -> (u32, f32) {
        self.entries
            .last()
            .map_or((0, 0.0), |e| (e.detection.bpm, e.detection.confidence))
    }

    /// Count every onset type.
    ///
    /// # Example
    /// ```
    /// use pb_core::timeline::{RhythmTimeline, TimelineEntry};
    /// let mut entry = TimelineEntry::default();
    /// entry.detection.kick_detected = true;
    /// let timeline = RhythmTimeline { entries: vec![entry; 3], frame_duration_ms: 10.0 };
    /// assert_eq!(timeline.count_events().kicks, 3);
    /// ```
    #[must_use]
    pub fn count_events(&self) -> EventCounts {
        self.entries
            .iter()
            .fold(EventCounts::default(), |mut acc, e| {
                acc.beats += usize::from(e.detection.beat_detected);
                acc.kicks += usize::from(e.detection.kick_detected);
                acc.snares += usize::from(e.detection.snare_detected);
                acc.hihats += usize::from(e.detection.hihat_detected);
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(time_ms: f64, beat: bool, bpm: u32) -> TimelineEntry {
        TimelineEntry {
            time_ms,
            detection: DetectionResult {
                beat_detected: beat,
                bpm,
                ..DetectionResult::default()
            },
            ..TimelineEntry::default()
        }
    }

    #[test]
    fn get_at_time_clamps_to_last_entry() {
        let timeline = RhythmTimeline {
            entries: vec![entry(0.0, false, 0), entry(10.0, true, 0)],
            frame_duration_ms: 10.0,
        };
        assert_eq!(timeline.get_at_time(5.0).map(|e| e.time_ms), Some(0.0));
        assert_eq!(timeline.get_at_time(99_999.0).map(|e| e.time_ms), Some(10.0));
        assert_eq!(timeline.get_at_time(-3.0).map(|e| e.time_ms), Some(0.0));
    }

    #[test]
    fn beat_times_and_final_tempo() {
        let timeline = RhythmTimeline {
            entries: vec![
                entry(0.0, true, 0),
                entry(500.0, true, 0),
                entry(1000.0, false, 120),
            ],
            frame_duration_ms: 500.0,
        };
        assert_eq!(timeline.beat_times(), vec![0.0, 500.0]);
        assert_eq!(timeline.final_tempo().0, 120);
        assert_eq!(timeline.count_events().beats, 2);
    }
}
