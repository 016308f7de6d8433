// Spectral analysis, rhythm detection and offline batch analysis for pulsebeat.

pub mod analyzer;
pub mod batch_analyzer;
pub mod events;
pub mod features;
pub mod fft;
pub mod pipeline;
pub mod rhythm;
pub mod smoothing;
pub mod source;
pub mod synth;
