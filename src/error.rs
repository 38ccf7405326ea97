use thiserror::Error;

use crate::reader::ContainerFormat;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported container format: {0} (tracks with independent tempo maps cannot share one clock)")]
    UnsupportedFormat(ContainerFormat),

    #[error("header declares {declared} tracks but {found} were read")]
    TrackCountMismatch { declared: usize, found: usize },

    #[error("single-track file contains {0} tracks")]
    SingleTrackCount(usize),

    #[error("header declares a resolution of zero ticks per quarter note")]
    ZeroResolution,

    #[error("SMPTE timecode timing is not supported, expected ticks per quarter note")]
    TimecodeTiming,

    #[error("failed to parse MIDI file: {0}")]
    Parse(#[from] midly::Error),

    #[error("failed to read MIDI file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("performance already started")]
    AlreadyStarted,

    #[error("failed to spawn track player: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A single event whose payload cannot be played. Skipped, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    #[error("channel id {0} is outside 0..=15")]
    ChannelOutOfRange(u8),

    #[error("data byte {0:#04x} has the status bit set")]
    DataByteOutOfRange(u8),

    #[error("pitch bend {0} exceeds 14 bits")]
    PitchBendOutOfRange(u16),

    #[error("tempo of zero microseconds per quarter note")]
    ZeroTempo,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open MIDI output: {0}")]
    Init(#[from] midir::InitError),

    #[error("no MIDI output port matching {0:?}")]
    NoSuchPort(String),

    #[error("failed to connect to MIDI output: {0}")]
    Connect(String),
}
