/// Types partagés, configuration et structures communes de pulsebeat.
///
/// This crate holds everything the spectral analyzer and the rhythm detector
/// exchange, so that neither depends on the other's internals.

pub mod band;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod ring;
pub mod timeline;
pub mod traits;

pub use band::{BandLevels, BandRanges, FrequencyBand, FrequencyRange};
pub use config::{AnalyzerConfig, DetectorConfig, PipelineConfig};
pub use error::CoreError;
pub use frame::{AnalysisFrame, DetectionResult};
pub use ring::RingBuffer;
pub use traits::SampleSource;
