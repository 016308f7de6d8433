/// Horloge de session monotone, en millisecondes.
///
/// Dérivée d'une position en échantillons et du sample rate : aucune
/// dépendance à l'horloge murale, donc deux analyses du même buffer
/// produisent exactement les mêmes timestamps.
///
/// # Example
/// ```
/// use pb_core::clock::SessionClock;
/// let mut clock = SessionClock::new(48000);
/// clock.advance(24000);
/// assert!((clock.now_ms() - 500.0).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SessionClock {
    /// Position en samples (mono).
    sample_pos: u64,
    /// Sample rate source.
    sample_rate: u32,
}

impl SessionClock {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_pos: 0,
            sample_rate,
        }
    }

    /// Temps courant en millisecondes. 0.0 si le sample rate est inconnu.
    #[inline]
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_pos as f64 * 1000.0 / f64::from(self.sample_rate)
    }

    /// Avance de `samples` échantillons.
    #[inline]
    pub fn advance(&mut self, samples: usize) {
        self.sample_pos = self.sample_pos.saturating_add(samples as u64);
    }

    #[inline]
    #[must_use]
    pub fn sample_pos(&self) -> u64 {
        self.sample_pos
    }

    #[inline]
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Met à jour le sample rate sans toucher à la position.
    #[inline]
    pub fn set_sample_rate(&mut self, rate: u32) {
        self.sample_rate = rate;
    }

    /// Retour à zéro (nouvelle session).
    pub fn reset(&mut self) {
        self.sample_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_basic_operations() {
        let mut clock = SessionClock::new(44100);
        assert_eq!(clock.sample_pos(), 0);
        assert_eq!(clock.now_ms(), 0.0);

        clock.advance(44100);
        assert!((clock.now_ms() - 1000.0).abs() < 1e-9);

        clock.reset();
        assert_eq!(clock.now_ms(), 0.0);
    }

    #[test]
    fn clock_zero_sample_rate() {
        let mut clock = SessionClock::new(0);
        clock.advance(1000);
        assert_eq!(clock.now_ms(), 0.0);
        clock.set_sample_rate(1000);
        assert!((clock.now_ms() - 1000.0).abs() < 1e-9);
    }
}
