use pb_core::band::{BandLevels, BandRanges, FrequencyRange};

/// Plancher dB supposé de l'analyseur FFT (niveau 0.0).
pub const DB_FLOOR: f32 = -100.0;

/// Gain empirique appliqué au RMS : un programme musical typique approche 1.0
/// sans saturer la mesure.
pub const ENERGY_GAIN: f32 = 2.0;

/// Map an FFT magnitude in dB onto [0, 1].
///
/// −100 dB → 0.0, 0 dB → 1.0. Values below the floor (or NaN) give 0.0;
/// values above 0 dB are capped at 1.0.
///
/// # Example
/// ```
/// use pb_audio::features::db_to_level;
/// assert_eq!(db_to_level(-100.0), 0.0);
/// assert_eq!(db_to_level(-50.0), 0.5);
/// assert_eq!(db_to_level(-140.0), 0.0);
/// assert_eq!(db_to_level(6.0), 1.0);
/// ```
#[inline(always)]
#[must_use]
pub fn db_to_level(db: f32) -> f32 {
    let level = (db - DB_FLOOR) / -DB_FLOOR;
    if level.is_nan() || level <= 0.0 {
        0.0
    } else {
        level.min(1.0)
    }
}

/// Inclusive bin range `[min_bin, max_bin]` covered by `range`.
///
/// Returns `None` when the range collapses to fewer than two bins
/// (`min_bin >= max_bin`), which the analyzer reports as a level of 0.
///
/// # Example
/// ```
/// use pb_audio::features::bin_range;
/// use pb_core::band::FrequencyRange;
/// // 1024 bins @ 44.1 kHz: ~21.5 Hz per bin.
/// let bins = bin_range(FrequencyRange::new(60.0, 250.0), 44100.0, 1024);
/// assert_eq!(bins, Some((2, 12)));
/// ```
#[must_use]
pub fn bin_range(range: FrequencyRange, sample_rate: f32, bin_count: usize) -> Option<(usize, usize)> {
    if bin_count == 0 || sample_rate <= 0.0 {
        return None;
    }
    let nyquist = sample_rate / 2.0;
    let bins = bin_count as f32;
    let min_bin = (range.min_hz / nyquist * bins).floor().max(0.0) as usize;
    let max_bin = ((range.max_hz / nyquist * bins).ceil().max(0.0) as usize).min(bin_count - 1);
    if min_bin >= max_bin {
        None
    } else {
        Some((min_bin, max_bin))
    }
}

/// Raw (unsmoothed) level of one band: mean of [`db_to_level`] over its bins.
#[must_use]
pub fn band_level(frequency_data: &[f32], range: FrequencyRange, sample_rate: f32) -> f32 {
    let Some((lo, hi)) = bin_range(range, sample_rate, frequency_data.len()) else {
        return 0.0;
    };
    let bins = &frequency_data[lo..=hi];
    let sum: f32 = bins.iter().map(|&db| db_to_level(db)).sum();
    sum / bins.len() as f32
}

/// Raw level of every configured band.
#[must_use]
pub fn band_levels(frequency_data: &[f32], ranges: &BandRanges, sample_rate: f32) -> BandLevels {
    let mut levels = BandLevels::default();
    for (band, range) in ranges.iter() {
        levels[band] = band_level(frequency_data, range, sample_rate);
    }
    levels
}

/// RMS of a waveform block. 0.0 for an empty block.
///
/// # Example
/// ```
/// use pb_audio::features::rms;
/// assert_eq!(rms(&[]), 0.0);
/// assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
/// ```
#[must_use]
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    let value = (sum_sq / samples.len() as f32).sqrt();
    if value.is_nan() { 0.0 } else { value }
}

/// Overall energy: `min(1, rms * 2)`.
#[must_use]
pub fn energy(samples: &[f32]) -> f32 {
    (rms(samples) * ENERGY_GAIN).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::band::FrequencyBand;

    #[test]
    fn collapsed_range_has_no_bins() {
        // 16 bins @ 44.1 kHz: 1378 Hz per bin, sub-bass fits in bin 0 only.
        assert_eq!(bin_range(FrequencyRange::new(20.0, 60.0), 44100.0, 16), Some((0, 1)));
        assert_eq!(bin_range(FrequencyRange::new(30000.0, 40000.0), 44100.0, 16), None);
        assert_eq!(bin_range(FrequencyRange::new(20.0, 60.0), 44100.0, 0), None);
    }

    #[test]
    fn max_bin_is_capped_to_last_bin() {
        assert_eq!(
            bin_range(FrequencyRange::new(4000.0, 20000.0), 44100.0, 1024),
            Some((185, 929))
        );
        assert_eq!(
            bin_range(FrequencyRange::new(4000.0, 40000.0), 44100.0, 1024),
            Some((185, 1023))
        );
    }

    #[test]
    fn silent_spectrum_has_zero_levels() {
        let data = vec![-100.0f32; 1024];
        let levels = band_levels(&data, &BandRanges::default(), 44100.0);
        for (band, level) in levels.iter() {
            assert_eq!(level, 0.0, "{band} should be silent");
        }
    }

    #[test]
    fn full_scale_spectrum_is_bounded() {
        let data = vec![12.0f32; 1024];
        let levels = band_levels(&data, &BandRanges::default(), 44100.0);
        assert_eq!(levels[FrequencyBand::Mid], 1.0);
    }

    #[test]
    fn band_level_averages_only_its_bins() {
        let mut data = vec![-100.0f32; 1024];
        // Bass is bins 2..=12 @ 44.1 kHz
        for v in &mut data[2..=12] {
            *v = -50.0;
        }
        let level = band_level(&data, BandRanges::default().bass, 44100.0);
        assert!((level - 0.5).abs() < 1e-6);
        let mid = band_level(&data, BandRanges::default().mid, 44100.0);
        assert_eq!(mid, 0.0);
    }

    #[test]
    fn energy_is_capped() {
        assert_eq!(energy(&[1.0; 64]), 1.0);
        assert!((energy(&[0.25; 64]) - 0.5).abs() < 1e-6);
        assert_eq!(energy(&[f32::NAN; 4]), 0.0);
    }
}
