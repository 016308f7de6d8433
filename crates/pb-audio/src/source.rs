use pb_core::traits::SampleSource;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::features::DB_FLOOR;
use crate::fft::FftPipeline;

/// Source d'échantillons alimentée par un ring buffer lock-free.
///
/// L'hôte garde le `Producer` (thread de capture, callback audio, boucle
/// offline) et pousse des échantillons mono f32. À chaque `poll`, la source
/// vide le ring, fait glisser sa fenêtre de `fft_size` échantillons et
/// recalcule le spectre en dB.
///
/// # Example
/// ```
/// use pb_audio::source::StreamSource;
/// use pb_core::traits::SampleSource;
///
/// let (mut source, mut producer) = StreamSource::new(256, 48000.0, 1024);
/// for _ in 0..256 {
///     let _ = producer.push(0.5);
/// }
/// source.poll();
/// assert_eq!(source.waveform_data().len(), 256);
/// assert_eq!(source.frequency_data().len(), 128);
/// assert_eq!(source.waveform_data()[255], 0.5);
/// ```
pub struct StreamSource {
    consumer: Consumer<f32>,
    fft: FftPipeline,
    /// Derniers `fft_size` échantillons, du plus ancien au plus récent.
    window: Vec<f32>,
    spectrum: Vec<f32>,
    /// Staging buffer for one poll, pre-allocated to the ring capacity.
    incoming: Vec<f32>,
    sample_rate: f32,
}

impl StreamSource {
    /// Create a source and the producer half feeding it.
    ///
    /// `capacity` is the ring size in samples; it is raised to `fft_size`
    /// if smaller. Samples pushed while the ring is full are dropped by the
    /// producer.
    ///
    /// # Panics
    /// Panics if `fft_size` is 0.
    #[must_use]
    pub fn new(fft_size: usize, sample_rate: f32, capacity: usize) -> (Self, Producer<f32>) {
        let capacity = capacity.max(fft_size);
        let (producer, consumer) = RingBuffer::new(capacity);
        let fft = FftPipeline::new(fft_size);
        let source = Self {
            consumer,
            spectrum: vec![DB_FLOOR; fft.bin_count()],
            window: vec![0.0; fft_size],
            incoming: Vec::with_capacity(capacity),
            fft,
            sample_rate,
        };
        (source, producer)
    }

    /// Slide `samples` into the analysis window and refresh the spectrum.
    ///
    /// Useful when the host owns the source directly instead of going
    /// through the ring buffer.
    pub fn push_block(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let size = self.window.len();
        if samples.len() >= size {
            self.window.copy_from_slice(&samples[samples.len() - size..]);
        } else {
            let n = samples.len();
            self.window.copy_within(n.., 0);
            self.window[size - n..].copy_from_slice(samples);
        }
        self.fft.process_db(&self.window, &mut self.spectrum);
    }

    /// Samples waiting in the ring buffer.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Reset the window and spectrum to silence, discarding pending samples.
    pub fn clear(&mut self) {
        while self.consumer.pop().is_ok() {}
        self.window.fill(0.0);
        self.spectrum.fill(DB_FLOOR);
    }
}

impl SampleSource for StreamSource {
    fn poll(&mut self) {
        self.incoming.clear();
        while let Ok(sample) = self.consumer.pop() {
            self.incoming.push(sample);
        }
        if self.incoming.is_empty() {
            return;
        }
        let incoming = std::mem::take(&mut self.incoming);
        self.push_block(&incoming);
        self.incoming = incoming;
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn frequency_data(&self) -> &[f32] {
        &self.spectrum
    }

    fn waveform_data(&self) -> &[f32] {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_slides_oldest_first() {
        let (mut source, _producer) = StreamSource::new(4, 1000.0, 16);
        source.push_block(&[1.0, 2.0]);
        source.push_block(&[3.0]);
        assert_eq!(source.waveform_data(), &[0.0, 1.0, 2.0, 3.0]);
        source.push_block(&[4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(source.waveform_data(), &[5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn poll_drains_the_ring() {
        let (mut source, mut producer) = StreamSource::new(8, 1000.0, 32);
        for i in 0..5 {
            assert!(producer.push(i as f32).is_ok());
        }
        assert_eq!(source.pending(), 5);
        source.poll();
        assert_eq!(source.pending(), 0);
        assert_eq!(source.waveform_data()[7], 4.0);
        assert_eq!(source.waveform_data()[3], 0.0);
    }

    #[test]
    fn empty_poll_keeps_last_spectrum() {
        let (mut source, _producer) = StreamSource::new(64, 44100.0, 64);
        let tone: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 0.8 } else { -0.8 }).collect();
        source.push_block(&tone);
        let before = source.frequency_data().to_vec();
        source.poll();
        assert_eq!(source.frequency_data(), before.as_slice());
    }

    #[test]
    fn clear_returns_to_silence() {
        let (mut source, mut producer) = StreamSource::new(8, 1000.0, 8);
        let _ = producer.push(1.0);
        source.push_block(&[1.0; 8]);
        source.clear();
        assert_eq!(source.pending(), 0);
        assert!(source.waveform_data().iter().all(|&s| s == 0.0));
        assert!(source.frequency_data().iter().all(|&db| db == DB_FLOOR));
    }
}
