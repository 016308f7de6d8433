use std::path::PathBuf;

use clap::Parser;
use pb_core::band::FrequencyBand;

/// pulsebeat — offline rhythm analysis of a synthetic drum pattern.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Tempo du motif synthétique.
    #[arg(long, default_value_t = 120.0)]
    pub bpm: f32,

    /// Durée du motif en secondes.
    #[arg(long, default_value_t = 8.0)]
    pub seconds: f32,

    /// Ticks d'analyse par seconde.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Sample rate du signal (remplace la config).
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Taille FFT (remplace la config, arrondie à une puissance de deux).
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Kick seul, sans snare ni hi-hat.
    #[arg(long, default_value_t = false)]
    pub kick_only: bool,

    /// Seed du bruit (snare, hi-hat).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Afficher chaque événement au moment où il est détecté.
    #[arg(long, default_value_t = false)]
    pub events: bool,

    /// Bande à détailler dans le rapport : subBass, bass, lowMid, mid, highMid, treble.
    #[arg(long)]
    pub band: Option<FrequencyBand>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Reject parameters the offline run cannot use.
    ///
    /// # Errors
    /// Returns an error if the duration, tempo or frame rate is not positive.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.seconds.is_finite() && self.seconds > 0.0) {
            anyhow::bail!("--seconds doit être positif (reçu {})", self.seconds);
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            anyhow::bail!("--bpm doit être positif (reçu {})", self.bpm);
        }
        if self.fps == 0 {
            anyhow::bail!("--fps doit être supérieur à 0");
        }
        if self.sample_rate == Some(0) {
            anyhow::bail!("--sample-rate doit être supérieur à 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("pulsebeat").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let Ok(cli) = parse(&[]) else {
            panic!("empty command line should parse");
        };
        assert_eq!(cli.bpm, 120.0);
        assert_eq!(cli.fps, 60);
        assert!(cli.sample_rate.is_none());
        assert!(!cli.events);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn band_names_parse() {
        let Ok(cli) = parse(&["--band", "highMid"]) else {
            panic!("highMid is a valid band");
        };
        assert_eq!(cli.band, Some(FrequencyBand::HighMid));
        assert!(parse(&["--band", "ultrasonic"]).is_err());
    }

    #[test]
    fn validation_rejects_degenerate_runs() {
        let Ok(cli) = parse(&["--seconds", "0"]) else {
            panic!("should parse");
        };
        assert!(cli.validate().is_err());
        let Ok(cli) = parse(&["--fps", "0"]) else {
            panic!("should parse");
        };
        assert!(cli.validate().is_err());
    }
}
