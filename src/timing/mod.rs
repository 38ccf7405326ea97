mod barrier;
mod scheduler;
mod stop;
mod tempo;

pub use barrier::CompletionBarrier;
pub use scheduler::{TrackPlayer, TrackState};
pub use stop::{StopHandle, StopSignal, stop_pair};
pub use tempo::{DEFAULT_MICROS_PER_QUARTER, TempoClock};
