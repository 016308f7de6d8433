use anyhow::{Context, Result};
use clap::Parser;
use pb_audio::batch_analyzer::BatchAnalyzer;
use pb_audio::synth::DrumPattern;
use pb_core::config::PipelineConfig;

pub mod cli;
pub mod report;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    cli.validate()?;

    // 3. Charger la config, puis les overrides CLI
    let mut config = resolve_config(&cli)?;
    if let Some(fft_size) = cli.fft_size {
        config.analyzer.fft_size = fft_size;
    }
    let sample_rate = cli
        .sample_rate
        .unwrap_or(config.analyzer.sample_rate.round() as u32);

    // 4. Générer le signal
    let mut pattern = if cli.kick_only {
        DrumPattern::kick_only(cli.bpm, sample_rate)
    } else {
        DrumPattern::new(cli.bpm, sample_rate)
    };
    if let Some(seed) = cli.seed {
        pattern = pattern.with_seed(seed);
    }
    let samples = pattern.render(cli.seconds);
    log::info!(
        "motif {:.1} bpm, {:.1}s @ {sample_rate}Hz ({} échantillons)",
        pattern.bpm,
        cli.seconds,
        samples.len()
    );

    // 5. Analyser
    let analyzer = BatchAnalyzer::new(config, cli.fps, sample_rate);
    let mut pipeline = analyzer.pipeline();
    if cli.events {
        print_events(pipeline.detector_mut());
    }
    let timeline = analyzer.run(&mut pipeline, &samples);
    pipeline.dispose();

    // 6. Rapport
    print!("{}", report::Report::from_timeline(&timeline, cli.band));
    Ok(())
}

/// Register listeners that print each event as it fires.
fn print_events(detector: &mut pb_audio::rhythm::RhythmDetector) {
    // Handles dropped: the listeners live until `dispose`.
    let _ = detector.on_beat_detected(|e| {
        println!(
            "{:>9.1} ms  beat    energy={:.3} bpm={} confidence={:.2}",
            e.time_ms, e.energy, e.bpm, e.confidence
        );
    });
    let _ = detector.on_kick_detected(|e| {
        println!("{:>9.1} ms  kick    energy={:.3}", e.time_ms, e.energy);
    });
    let _ = detector.on_snare_detected(|e| {
        println!("{:>9.1} ms  snare   energy={:.3}", e.time_ms, e.energy);
    });
    let _ = detector.on_hihat_detected(|e| {
        println!("{:>9.1} ms  hihat   energy={:.3}", e.time_ms, e.energy);
    });
}

/// Load --config if present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<PipelineConfig> {
    if cli.config.exists() {
        pb_core::config::load_config(&cli.config)
            .with_context(|| format!("Chargement de {}", cli.config.display()))
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(PipelineConfig::default())
    }
}
