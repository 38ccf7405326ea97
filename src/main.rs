use std::env;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tempo_player::{
    ChannelFilter, Fanout, GeneralMidiNames, InstrumentNames, LogSink, MidiOutSink, NoteSink,
    Outcome, OutputConfig, PlayerConfig, PresetBank, Sequencer, SmfReader,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <file.mid> [player.ron]", args[0]);
        std::process::exit(1);
    }

    let config = match args.get(2) {
        Some(path) => PlayerConfig::load(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Failed to load config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => PlayerConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&args[1], &config) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(path: &str, config: &PlayerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut sequencer = Sequencer::load(SmfReader::open(path)?)?;

    let bank = Arc::new(PresetBank::new(config.presets.iter().cloned()));
    let names: Arc<dyn InstrumentNames> = if config.presets.is_empty() {
        Arc::new(GeneralMidiNames::new(
            sequencer
                .tracks()
                .iter()
                .map(|track| track.channels.clone())
                .collect(),
        ))
    } else {
        bank.clone()
    };

    for track in sequencer.tracks() {
        for channel in track.channels.ids() {
            tracing::info!(
                track = track.index,
                channel,
                instrument = %names.instrument_name(track.index, channel),
                "channel"
            );
        }
    }

    let output: Arc<dyn NoteSink> = match &config.output {
        OutputConfig::Log => Arc::new(LogSink::with_names(names)),
        OutputConfig::Midi { port } => Arc::new(MidiOutSink::connect(port)?),
    };
    let output: Arc<dyn NoteSink> = match config.channel {
        Some(channel) => Arc::new(ChannelFilter::new(channel, output)),
        None => output,
    };

    sequencer.start(Arc::new(Fanout(vec![bank as Arc<dyn NoteSink>, output])))?;

    let sequencer = Arc::new(sequencer);
    println!("Press Enter to stop...");
    let watcher = sequencer.clone();
    std::thread::Builder::new()
        .name("stop-on-enter".to_string())
        .spawn(move || {
            let mut input = String::new();
            // EOF leaves the performance running.
            if matches!(io::stdin().read_line(&mut input), Ok(n) if n > 0) {
                watcher.stop();
            }
        })?;

    match sequencer.wait() {
        Outcome::Finished => tracing::info!("performance finished"),
        Outcome::Stopped => tracing::info!("performance stopped"),
        Outcome::Unterminated => {
            tracing::warn!("a track ended without an end-of-track event")
        }
        Outcome::NotStarted => tracing::warn!("performance never started"),
    }
    Ok(())
}
