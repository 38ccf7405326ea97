use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputConfig {
    /// Print events through the logger.
    #[default]
    Log,
    /// Send events to the first MIDI output port whose name contains `port`.
    Midi { port: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// `tracing_subscriber::EnvFilter` directives, overridden by `RUST_LOG`.
    pub log_filter: String,
    pub output: OutputConfig,
    /// Only play this channel id.
    pub channel: Option<u8>,
    /// Preset names by program number for the output's sound bank.
    pub presets: Vec<(u8, String)>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            output: OutputConfig::default(),
            channel: None,
            presets: Vec::new(),
        }
    }
}

impl PlayerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path)?;
        let config: PlayerConfig = ron::from_str(&ron_string)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: PlayerConfig = ron::from_str("(channel: Some(9))").unwrap();
        assert_eq!(config.channel, Some(9));
        assert_eq!(config.output, OutputConfig::Log);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn parses_midi_output_and_presets() {
        let config: PlayerConfig = ron::from_str(
            r#"(
                log_filter: "tempo_player=debug",
                output: Midi(port: "FluidSynth"),
                presets: [(0, "Yamaha Grand"), (33, "Finger Bass")],
            )"#,
        )
        .unwrap();

        assert_eq!(
            config.output,
            OutputConfig::Midi {
                port: "FluidSynth".to_string()
            }
        );
        assert_eq!(config.presets[1], (33, "Finger Bass".to_string()));
    }

    #[test]
    fn saves_and_loads() {
        let path = std::env::temp_dir()
            .join(format!("tempo-player-{}", std::process::id()))
            .join("player.ron");
        let config = PlayerConfig {
            channel: Some(3),
            presets: vec![(1, "Bright".to_string())],
            ..PlayerConfig::default()
        };

        config.save(&path).unwrap();
        let loaded = PlayerConfig::load(&path).unwrap();
        let _ = fs::remove_dir_all(path.parent().unwrap());

        assert_eq!(loaded, config);
    }

    #[test]
    fn reports_parse_errors() {
        let err = ron::from_str::<PlayerConfig>("(channel: \"nine\")")
            .map_err(ConfigError::from)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
