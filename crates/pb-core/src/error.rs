use thiserror::Error;

/// Errors originating from the core module.
///
/// Jamais produites sur le chemin chaud : seule la configuration peut échouer.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Unknown frequency band name.
    #[error("Bande de fréquence inconnue : {name}")]
    InvalidBand {
        /// The name that did not match any band.
        name: String,
    },
}
