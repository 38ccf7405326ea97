use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CompletionBarrier, StopSignal, TempoClock};
use crate::events::{Event, TimedEvent};
use crate::sink::NoteSink;
use crate::track::{ChannelRegistry, Track};

/// How late a handoff may finish before the schedule is rebased on the
/// current instant instead of catching up.
const STALL_REBASE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Running,
    Done,
    Stopped,
}

/// Plays one track on its own timeline.
///
/// Delays are relative to the previous event of the same track. Deadlines
/// are accumulated so scheduler wake-up latency does not add up, but a sink
/// that holds the handoff longer than [`STALL_REBASE`] moves the whole
/// remaining timeline back instead of being made up for.
///
/// A track without an end-of-track event never reaches [`TrackState::Done`]
/// and its performance never finishes.
pub struct TrackPlayer {
    index: usize,
    events: Arc<[TimedEvent]>,
    channels: Arc<ChannelRegistry>,
    clock: Arc<TempoClock>,
    barrier: Arc<CompletionBarrier>,
    sink: Arc<dyn NoteSink>,
    stop: StopSignal,
    state: TrackState,
}

impl TrackPlayer {
    pub fn new(
        track: &Track,
        clock: Arc<TempoClock>,
        barrier: Arc<CompletionBarrier>,
        sink: Arc<dyn NoteSink>,
        stop: StopSignal,
    ) -> Self {
        Self {
            index: track.index,
            events: track.events.clone(),
            channels: track.channels.clone(),
            clock,
            barrier,
            sink,
            stop,
            state: TrackState::Running,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn run(mut self) -> TrackState {
        let mut anchor = Instant::now();

        for (position, timed) in self.events.iter().enumerate() {
            if self.stop.is_stopped() {
                self.state = TrackState::Stopped;
                break;
            }

            let delay = self.clock.delay_for(timed.delta_ticks);
            let deadline = anchor + delay;
            tracing::trace!(position, ?delay, "waiting");
            if !self.stop.sleep_until(deadline) {
                self.state = TrackState::Stopped;
                break;
            }

            self.state = self.handle(&timed.event);
            if self.state != TrackState::Running {
                break;
            }

            let now = Instant::now();
            anchor = if now.saturating_duration_since(deadline) > STALL_REBASE {
                now
            } else {
                deadline
            };
        }

        match self.state {
            TrackState::Done => tracing::info!(track = self.index, "track finished"),
            TrackState::Stopped => tracing::info!(track = self.index, "track stopped"),
            TrackState::Running => {
                tracing::warn!(
                    track = self.index,
                    "track ran out of events without an end-of-track event"
                );
            }
        }
        self.state
    }

    fn handle(&self, event: &Event) -> TrackState {
        if let Err(e) = event.validate() {
            tracing::warn!(track = self.index, ?event, "skipping malformed event: {}", e);
            return TrackState::Running;
        }

        match *event {
            Event::TempoChange { micros_per_quarter } => {
                self.clock.set_micros_per_quarter(micros_per_quarter);
                return TrackState::Running;
            }
            Event::EndOfTrack => {
                if self.barrier.arrive() {
                    tracing::info!("all tracks finished");
                }
                return TrackState::Done;
            }
            Event::Sysex | Event::Meta { .. } => return TrackState::Running,
            Event::ProgramChange { channel, program } => {
                self.channels.set_program(channel, program);
            }
            Event::Controller { channel, value, .. } => {
                self.channels.set_last_controller(channel, value);
            }
            Event::Note { .. } | Event::ChannelPressure { .. } | Event::PitchBend { .. } => {}
        }

        let Some(performance) = event.to_performance() else {
            return TrackState::Running;
        };
        if !self.channels.contains(performance.channel()) {
            tracing::debug!(
                track = self.index,
                channel = performance.channel(),
                "dropping event for unregistered channel"
            );
            return TrackState::Running;
        }

        tracing::debug!(track = self.index, ?performance, "emit");
        self.sink.perform(self.index, performance);
        TrackState::Running
    }
}
