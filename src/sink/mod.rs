mod midi_out;

pub use midi_out::MidiOutSink;

use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};

use crate::events::PerformanceEvent;
use crate::instruments::InstrumentNames;
use crate::timing::StopSignal;

/// The sound-producing side of a performance.
///
/// Every track calls into the same sink from its own thread, so calls from
/// different tracks arrive in no particular order. A call returning is the
/// sink accepting the event; the calling track waits for it.
///
/// Implement either the per-kind methods or [`NoteSink::perform`].
pub trait NoteSink: Send + Sync {
    fn on_note(&self, _track: usize, _channel: u8, _pitch: u8, _velocity: u8, _is_on: bool) {}

    fn on_controller(&self, _track: usize, _channel: u8, _number: u8, _value: u8) {}

    fn on_program_change(&self, _track: usize, _channel: u8, _program: u8) {}

    fn on_channel_pressure(&self, _track: usize, _channel: u8, _value: u8) {}

    fn on_pitch_bend(&self, _track: usize, _channel: u8, _value: u16) {}

    fn perform(&self, track: usize, event: PerformanceEvent) {
        event.deliver(track, self);
    }
}

impl<S: NoteSink + ?Sized> NoteSink for Arc<S> {
    fn on_note(&self, track: usize, channel: u8, pitch: u8, velocity: u8, is_on: bool) {
        (**self).on_note(track, channel, pitch, velocity, is_on);
    }

    fn on_controller(&self, track: usize, channel: u8, number: u8, value: u8) {
        (**self).on_controller(track, channel, number, value);
    }

    fn on_program_change(&self, track: usize, channel: u8, program: u8) {
        (**self).on_program_change(track, channel, program);
    }

    fn on_channel_pressure(&self, track: usize, channel: u8, value: u8) {
        (**self).on_channel_pressure(track, channel, value);
    }

    fn on_pitch_bend(&self, track: usize, channel: u8, value: u16) {
        (**self).on_pitch_bend(track, channel, value);
    }

    fn perform(&self, track: usize, event: PerformanceEvent) {
        (**self).perform(track, event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub track: usize,
    pub event: PerformanceEvent,
}

/// Hands each event to a consumer thread over a zero-capacity channel.
///
/// The producing track blocks until the consumer takes the event, so no
/// queue of stale events can build up. Raising `stop` or dropping the
/// receiver releases the producer without delivering.
pub struct ChannelSink {
    sender: Sender<Delivery>,
    stop: StopSignal,
}

impl ChannelSink {
    /// Pass [`crate::Sequencer::stop_signal`] so that stopping the
    /// performance also frees a track blocked on a consumer.
    pub fn rendezvous(stop: StopSignal) -> (Self, Receiver<Delivery>) {
        let (sender, receiver) = channel::bounded(0);
        (Self { sender, stop }, receiver)
    }
}

impl NoteSink for ChannelSink {
    fn perform(&self, track: usize, event: PerformanceEvent) {
        let delivery = Delivery { track, event };
        let delivered = channel::select! {
            send(self.sender, delivery) -> result => result.is_ok(),
            recv(self.stop.receiver()) -> _ => false,
        };
        if !delivered {
            tracing::debug!(track, ?event, "handoff abandoned");
        }
    }
}

/// Forwards only the events of one channel id.
pub struct ChannelFilter<S> {
    channel: u8,
    inner: S,
}

impl<S: NoteSink> ChannelFilter<S> {
    pub fn new(channel: u8, inner: S) -> Self {
        Self { channel, inner }
    }
}

impl<S: NoteSink> NoteSink for ChannelFilter<S> {
    fn perform(&self, track: usize, event: PerformanceEvent) {
        if event.channel() == self.channel {
            self.inner.perform(track, event);
        }
    }
}

/// Passes every event to each sink in turn.
pub struct Fanout(pub Vec<Arc<dyn NoteSink>>);

impl NoteSink for Fanout {
    fn perform(&self, track: usize, event: PerformanceEvent) {
        for sink in &self.0 {
            sink.perform(track, event);
        }
    }
}

/// Writes each event to the log, with the channel's instrument when known.
pub struct LogSink {
    names: Option<Arc<dyn InstrumentNames>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self { names: None }
    }

    pub fn with_names(names: Arc<dyn InstrumentNames>) -> Self {
        Self { names: Some(names) }
    }

    fn instrument(&self, track: usize, channel: u8) -> String {
        self.names
            .as_ref()
            .map(|names| names.instrument_name(track, channel))
            .unwrap_or_default()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteSink for LogSink {
    fn on_note(&self, track: usize, channel: u8, pitch: u8, velocity: u8, is_on: bool) {
        tracing::info!(
            track,
            channel,
            instrument = %self.instrument(track, channel),
            pitch,
            velocity,
            on = is_on,
            "note"
        );
    }

    fn on_controller(&self, track: usize, channel: u8, number: u8, value: u8) {
        tracing::info!(track, channel, number, value, "controller");
    }

    fn on_program_change(&self, track: usize, channel: u8, program: u8) {
        tracing::info!(track, channel, program, "program change");
    }

    fn on_channel_pressure(&self, track: usize, channel: u8, value: u8) {
        tracing::info!(track, channel, value, "channel pressure");
    }

    fn on_pitch_bend(&self, track: usize, channel: u8, value: u16) {
        tracing::info!(track, channel, value, "pitch bend");
    }
}
