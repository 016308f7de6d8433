use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Les six bandes de fréquence analysées, dans leur ordre de déclaration.
///
/// L'ensemble est fermé : les consommateurs (détecteur de rythme, mappings
/// visuels) supposent exactement ces six noms.
///
/// # Example
/// ```
/// use pb_core::band::FrequencyBand;
/// assert_eq!(FrequencyBand::ALL.len(), 6);
/// assert_eq!(FrequencyBand::LowMid.name(), "lowMid");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrequencyBand {
    /// 20–60 Hz.
    SubBass,
    /// 60–250 Hz.
    Bass,
    /// 250–500 Hz.
    LowMid,
    /// 500–2000 Hz.
    Mid,
    /// 2000–4000 Hz.
    HighMid,
    /// 4000–20000 Hz.
    Treble,
}

impl FrequencyBand {
    /// Number of bands.
    pub const COUNT: usize = 6;

    /// All bands in declaration order.
    pub const ALL: [FrequencyBand; Self::COUNT] = [
        FrequencyBand::SubBass,
        FrequencyBand::Bass,
        FrequencyBand::LowMid,
        FrequencyBand::Mid,
        FrequencyBand::HighMid,
        FrequencyBand::Treble,
    ];

    /// Position in [`FrequencyBand::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Nom canonique (camelCase), tel qu'utilisé dans la config TOML.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FrequencyBand::SubBass => "subBass",
            FrequencyBand::Bass => "bass",
            FrequencyBand::LowMid => "lowMid",
            FrequencyBand::Mid => "mid",
            FrequencyBand::HighMid => "highMid",
            FrequencyBand::Treble => "treble",
        }
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrequencyBand {
    type Err = CoreError;

    /// Accepts the camelCase name as well as the snake_case spelling.
    ///
    /// # Example
    /// ```
    /// use pb_core::band::FrequencyBand;
    /// assert_eq!("sub_bass".parse::<FrequencyBand>().unwrap(), FrequencyBand::SubBass);
    /// assert!("presence".parse::<FrequencyBand>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subBass" | "sub_bass" => Ok(FrequencyBand::SubBass),
            "bass" => Ok(FrequencyBand::Bass),
            "lowMid" | "low_mid" => Ok(FrequencyBand::LowMid),
            "mid" => Ok(FrequencyBand::Mid),
            "highMid" | "high_mid" => Ok(FrequencyBand::HighMid),
            "treble" => Ok(FrequencyBand::Treble),
            other => Err(CoreError::InvalidBand {
                name: other.to_string(),
            }),
        }
    }
}

/// Plage de fréquence `[min_hz, max_hz)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    /// Borne basse en Hz (incluse).
    pub min_hz: f32,
    /// Borne haute en Hz (exclue).
    pub max_hz: f32,
}

impl FrequencyRange {
    #[must_use]
    pub const fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }
}

/// Frequency range of every band. Overridable, but always six entries.
///
/// # Example
/// ```
/// use pb_core::band::{BandRanges, FrequencyBand};
/// let ranges = BandRanges::default();
/// assert_eq!(ranges[FrequencyBand::Bass].min_hz, 60.0);
/// assert_eq!(ranges[FrequencyBand::Treble].max_hz, 20000.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BandRanges {
    pub sub_bass: FrequencyRange,
    pub bass: FrequencyRange,
    pub low_mid: FrequencyRange,
    pub mid: FrequencyRange,
    pub high_mid: FrequencyRange,
    pub treble: FrequencyRange,
}

impl Default for BandRanges {
    fn default() -> Self {
        Self {
            sub_bass: FrequencyRange::new(20.0, 60.0),
            bass: FrequencyRange::new(60.0, 250.0),
            low_mid: FrequencyRange::new(250.0, 500.0),
            mid: FrequencyRange::new(500.0, 2000.0),
            high_mid: FrequencyRange::new(2000.0, 4000.0),
            treble: FrequencyRange::new(4000.0, 20000.0),
        }
    }
}

impl BandRanges {
    /// Iterate `(band, range)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FrequencyBand, FrequencyRange)> + '_ {
        FrequencyBand::ALL.into_iter().map(|band| (band, self[band]))
    }

    /// Check that every range is finite, non-negative and ordered.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] naming the first offending band.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (band, range) in self.iter() {
            let ok = range.min_hz.is_finite()
                && range.max_hz.is_finite()
                && range.min_hz >= 0.0
                && range.min_hz < range.max_hz;
            if !ok {
                return Err(CoreError::Config(format!(
                    "plage invalide pour {band} : [{}, {})",
                    range.min_hz, range.max_hz
                )));
            }
        }
        Ok(())
    }
}

impl Index<FrequencyBand> for BandRanges {
    type Output = FrequencyRange;

    fn index(&self, band: FrequencyBand) -> &FrequencyRange {
        match band {
            FrequencyBand::SubBass => &self.sub_bass,
            FrequencyBand::Bass => &self.bass,
            FrequencyBand::LowMid => &self.low_mid,
            FrequencyBand::Mid => &self.mid,
            FrequencyBand::HighMid => &self.high_mid,
            FrequencyBand::Treble => &self.treble,
        }
    }
}

impl IndexMut<FrequencyBand> for BandRanges {
    fn index_mut(&mut self, band: FrequencyBand) -> &mut FrequencyRange {
        match band {
            FrequencyBand::SubBass => &mut self.sub_bass,
            FrequencyBand::Bass => &mut self.bass,
            FrequencyBand::LowMid => &mut self.low_mid,
            FrequencyBand::Mid => &mut self.mid,
            FrequencyBand::HighMid => &mut self.high_mid,
            FrequencyBand::Treble => &mut self.treble,
        }
    }
}

/// Niveau normalisé [0.0, 1.0] par bande, indexé par [`FrequencyBand`].
///
/// Taille fixe, Copy : une entrée par bande, toujours.
///
/// # Example
/// ```
/// use pb_core::band::{BandLevels, FrequencyBand};
/// let mut levels = BandLevels::default();
/// levels[FrequencyBand::Mid] = 0.5;
/// assert_eq!(levels[FrequencyBand::Mid], 0.5);
/// assert_eq!(levels.iter().count(), 6);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandLevels([f32; FrequencyBand::COUNT]);

impl BandLevels {
    #[must_use]
    pub const fn from_array(levels: [f32; FrequencyBand::COUNT]) -> Self {
        Self(levels)
    }

    /// Build from `(band, level)` pairs; bands not listed stay at 0.
    ///
    /// # Example
    /// ```
    /// use pb_core::band::{BandLevels, FrequencyBand};
    /// let levels = BandLevels::from_pairs(&[(FrequencyBand::Bass, 0.4)]);
    /// assert_eq!(levels[FrequencyBand::Bass], 0.4);
    /// assert_eq!(levels[FrequencyBand::Treble], 0.0);
    /// ```
    #[must_use]
    pub fn from_pairs(pairs: &[(FrequencyBand, f32)]) -> Self {
        let mut levels = Self::default();
        for &(band, level) in pairs {
            levels[band] = level;
        }
        levels
    }

    /// Iterate `(band, level)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FrequencyBand, f32)> + '_ {
        FrequencyBand::ALL.into_iter().zip(self.0.iter().copied())
    }

    #[must_use]
    pub const fn as_array(&self) -> &[f32; FrequencyBand::COUNT] {
        &self.0
    }
}

impl Index<FrequencyBand> for BandLevels {
    type Output = f32;

    #[inline]
    fn index(&self, band: FrequencyBand) -> &f32 {
        &self.0[band.index()]
    }
}

impl IndexMut<FrequencyBand> for BandLevels {
    #[inline]
    fn index_mut(&mut self, band: FrequencyBand) -> &mut f32 {
        &mut self.0[band.index()]
    }
}
