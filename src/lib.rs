pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod instruments;
pub mod reader;
pub mod sink;
pub mod timing;
pub mod track;

pub use config::{OutputConfig, PlayerConfig};
pub use engine::{Finished, Outcome, Sequencer};
pub use error::{ConfigError, LoadError, MalformedEvent, SinkError, StartError};
pub use events::{Event, MetaKind, PerformanceEvent, TimedEvent};
pub use instruments::{GeneralMidiNames, InstrumentNames, PresetBank};
pub use reader::{ContainerFormat, EventSource, Header, ParsedFile, SmfReader};
pub use sink::{ChannelFilter, ChannelSink, Delivery, Fanout, LogSink, MidiOutSink, NoteSink};
pub use timing::{CompletionBarrier, StopSignal, TempoClock, TrackPlayer, TrackState};
pub use track::{ChannelRegistry, ChannelState, Track};
