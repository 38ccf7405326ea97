use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{LoadError, StartError};
use crate::reader::{ContainerFormat, EventSource, Header};
use crate::sink::NoteSink;
use crate::timing::{
    CompletionBarrier, StopHandle, StopSignal, TempoClock, TrackPlayer, TrackState, stop_pair,
};
use crate::track::{ChannelRegistry, Track};

/// How a performance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every track reached its end-of-track event.
    Finished,
    Stopped,
    /// Some track ran out of events without an end-of-track event.
    Unterminated,
    /// [`Sequencer::start`] was never called.
    NotStarted,
}

/// Resolves once every track of a performance has finished.
#[derive(Debug, Clone)]
pub struct Finished {
    barrier: Arc<CompletionBarrier>,
}

impl Finished {
    pub fn is_finished(&self) -> bool {
        self.barrier.is_complete()
    }

    pub fn wait(&self) {
        self.barrier.wait();
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.barrier.wait_timeout(timeout)
    }
}

struct Performance {
    finished: Finished,
    players: Mutex<Vec<JoinHandle<TrackState>>>,
}

/// Owns the tracks of one loaded file and plays them.
pub struct Sequencer {
    header: Header,
    name: Option<String>,
    tracks: Vec<Track>,
    clock: Arc<TempoClock>,
    stop: StopHandle,
    stop_signal: StopSignal,
    performance: Option<Performance>,
}

impl Sequencer {
    /// Reads `source` and builds every track's channel registry. Nothing is
    /// played until [`Sequencer::start`].
    pub fn load(source: impl EventSource) -> Result<Self, LoadError> {
        let parsed = source.read()?;
        let header = parsed.header;

        match header.format {
            ContainerFormat::MultiTrackIndependent => {
                return Err(LoadError::UnsupportedFormat(header.format));
            }
            ContainerFormat::SingleTrack if parsed.tracks.len() != 1 => {
                return Err(LoadError::SingleTrackCount(parsed.tracks.len()));
            }
            ContainerFormat::SingleTrack | ContainerFormat::MultiTrackSync => {}
        }
        if header.track_count != parsed.tracks.len() {
            return Err(LoadError::TrackCountMismatch {
                declared: header.track_count,
                found: parsed.tracks.len(),
            });
        }
        let clock = TempoClock::new(header.ticks_per_quarter as u32)
            .ok_or(LoadError::ZeroResolution)?;

        let tracks: Vec<Track> = parsed
            .tracks
            .into_iter()
            .enumerate()
            .map(|(index, events)| Track::new(index, events))
            .collect();

        for track in tracks.iter().filter(|track| !track.is_terminated()) {
            tracing::warn!(
                track = track.index,
                "track has no end-of-track event, the performance will never finish"
            );
        }

        let name = tracks.iter().rev().find_map(|track| track.name.clone());
        let (stop, stop_signal) = stop_pair();

        tracing::info!(
            name = name.as_deref().unwrap_or(""),
            format = %header.format,
            tracks = tracks.len(),
            ticks_per_quarter = header.ticks_per_quarter,
            "loaded sequence"
        );

        Ok(Self {
            header,
            name,
            tracks,
            clock: Arc::new(clock),
            stop,
            stop_signal,
            performance: None,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Name of the last named track.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn channels(&self, track: usize) -> Option<&Arc<ChannelRegistry>> {
        self.tracks.get(track).map(|track| &track.channels)
    }

    pub fn clock(&self) -> &Arc<TempoClock> {
        &self.clock
    }

    /// Observes [`Sequencer::stop`], e.g. for a [`crate::sink::ChannelSink`].
    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    /// Spawns one player thread per track and returns without waiting.
    pub fn start(&mut self, sink: Arc<dyn NoteSink>) -> Result<Finished, StartError> {
        if self.performance.is_some() || self.stop.is_stopped() {
            return Err(StartError::AlreadyStarted);
        }

        let barrier = Arc::new(CompletionBarrier::new(self.tracks.len()));
        let mut players = Vec::with_capacity(self.tracks.len());

        for track in &self.tracks {
            let player = TrackPlayer::new(
                track,
                self.clock.clone(),
                barrier.clone(),
                sink.clone(),
                self.stop_signal.clone(),
            );
            let index = track.index;
            let spawned = std::thread::Builder::new()
                .name(format!("track-{}", index))
                .spawn(move || {
                    let _span = tracing::info_span!("track", index).entered();
                    player.run()
                });

            match spawned {
                Ok(handle) => players.push(handle),
                Err(e) => {
                    self.stop.stop();
                    for handle in players {
                        let _ = handle.join();
                    }
                    return Err(StartError::Spawn(e));
                }
            }
        }

        tracing::info!(tracks = players.len(), "performance started");
        let finished = Finished { barrier };
        self.performance = Some(Performance {
            finished: finished.clone(),
            players: Mutex::new(players),
        });
        Ok(finished)
    }

    /// `None` until the performance is started.
    pub fn finished(&self) -> Option<Finished> {
        self.performance
            .as_ref()
            .map(|performance| performance.finished.clone())
    }

    /// Aborts a running performance. Players wake from their current delay
    /// or handoff and exit without reporting completion.
    pub fn stop(&self) {
        if !self.stop.is_stopped() {
            tracing::info!("stopping performance");
        }
        self.stop.stop();
    }

    /// Blocks until every player thread has exited. Another thread may call
    /// [`Sequencer::stop`] meanwhile.
    pub fn wait(&self) -> Outcome {
        let Some(performance) = self.performance.as_ref() else {
            return Outcome::NotStarted;
        };

        let mut players = performance.players.lock();
        for handle in players.drain(..) {
            if handle.join().is_err() {
                tracing::error!("track player panicked");
            }
        }

        if performance.finished.is_finished() {
            Outcome::Finished
        } else if self.stop.is_stopped() {
            Outcome::Stopped
        } else {
            Outcome::Unterminated
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop.stop();
        if let Some(performance) = self.performance.as_mut() {
            for handle in performance.players.get_mut().drain(..) {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, TimedEvent};
    use crate::reader::ParsedFile;
    use crate::sink::tests::RecordingSink;

    fn file(format: ContainerFormat, tracks: Vec<Vec<TimedEvent>>) -> ParsedFile {
        ParsedFile {
            header: Header {
                format,
                track_count: tracks.len(),
                ticks_per_quarter: 480,
            },
            tracks,
        }
    }

    fn end() -> TimedEvent {
        TimedEvent::new(0, Event::EndOfTrack)
    }

    #[test]
    fn rejects_independent_tracks() {
        let err = Sequencer::load(file(
            ContainerFormat::MultiTrackIndependent,
            vec![vec![end()], vec![end()]],
        ))
        .err()
        .unwrap();
        assert!(matches!(
            err,
            LoadError::UnsupportedFormat(ContainerFormat::MultiTrackIndependent)
        ));
        assert!(err.to_string().contains("unsupported container format"));
    }

    #[test]
    fn rejects_inconsistent_headers() {
        let mut parsed = file(ContainerFormat::MultiTrackSync, vec![vec![end()]]);
        parsed.header.track_count = 3;
        assert!(matches!(
            Sequencer::load(parsed).err().unwrap(),
            LoadError::TrackCountMismatch {
                declared: 3,
                found: 1
            }
        ));

        let parsed = file(ContainerFormat::SingleTrack, vec![vec![end()], vec![end()]]);
        assert!(matches!(
            Sequencer::load(parsed).err().unwrap(),
            LoadError::SingleTrackCount(2)
        ));

        let mut parsed = file(ContainerFormat::SingleTrack, vec![vec![end()]]);
        parsed.header.ticks_per_quarter = 0;
        assert!(matches!(
            Sequencer::load(parsed).err().unwrap(),
            LoadError::ZeroResolution
        ));
    }

    #[test]
    fn loads_names_and_registries() {
        let named = vec![
            TimedEvent::new(
                0,
                Event::Meta {
                    kind: crate::events::MetaKind::TrackName,
                    data: b"Take Five".to_vec(),
                },
            ),
            TimedEvent::new(
                0,
                Event::ProgramChange {
                    channel: 2,
                    program: 11,
                },
            ),
            end(),
        ];
        let sequencer =
            Sequencer::load(file(ContainerFormat::MultiTrackSync, vec![vec![end()], named]))
                .unwrap();

        assert_eq!(sequencer.name(), Some("Take Five"));
        assert_eq!(sequencer.tracks().len(), 2);
        assert!(sequencer.channels(0).unwrap().is_empty());
        assert_eq!(sequencer.channels(1).unwrap().program(2), Some(11));
        assert_eq!(sequencer.clock().current_micros_per_quarter(), 500_000);
        assert_eq!(sequencer.clock().ticks_per_quarter(), 480);
        assert!(sequencer.finished().is_none());
        assert_eq!(sequencer.wait(), Outcome::NotStarted);
    }

    #[test]
    fn sequence_name_comes_from_last_named_track() {
        let named = |name: &[u8]| {
            vec![
                TimedEvent::new(
                    0,
                    Event::Meta {
                        kind: crate::events::MetaKind::TrackName,
                        data: name.to_vec(),
                    },
                ),
                end(),
            ]
        };
        let sequencer = Sequencer::load(file(
            ContainerFormat::MultiTrackSync,
            vec![named(b"Tempo Map"), vec![end()], named(b"Bass")],
        ))
        .unwrap();

        assert_eq!(sequencer.name(), Some("Bass"));
    }

    #[test]
    fn start_runs_once() {
        let mut sequencer =
            Sequencer::load(file(ContainerFormat::SingleTrack, vec![vec![end()]])).unwrap();
        let sink = Arc::new(RecordingSink::default());

        let finished = sequencer.start(sink.clone()).unwrap();
        assert!(matches!(
            sequencer.start(sink),
            Err(StartError::AlreadyStarted)
        ));
        assert!(finished.wait_timeout(Duration::from_secs(5)));
        assert_eq!(sequencer.wait(), Outcome::Finished);
    }

    #[test]
    fn stop_aborts_and_reports_stopped() {
        let long = vec![
            TimedEvent::new(0, Event::note_on(0, 60, 100)),
            TimedEvent::new(480 * 120, Event::note_off(0, 60, 0)),
            end(),
        ];
        let mut sequencer =
            Sequencer::load(file(ContainerFormat::MultiTrackSync, vec![long, vec![end()]]))
                .unwrap();
        let finished = sequencer
            .start(Arc::new(RecordingSink::default()))
            .unwrap();

        std::thread::sleep(Duration::from_millis(20));
        sequencer.stop();

        assert_eq!(sequencer.wait(), Outcome::Stopped);
        assert!(!finished.is_finished());
        assert!(matches!(
            sequencer.start(Arc::new(RecordingSink::default())),
            Err(StartError::AlreadyStarted)
        ));
    }

    #[test]
    fn unterminated_track_never_finishes() {
        let mut sequencer = Sequencer::load(file(
            ContainerFormat::SingleTrack,
            vec![vec![TimedEvent::new(0, Event::note_on(0, 60, 100))]],
        ))
        .unwrap();
        let finished = sequencer
            .start(Arc::new(RecordingSink::default()))
            .unwrap();

        assert_eq!(sequencer.wait(), Outcome::Unterminated);
        assert!(!finished.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn stop_from_another_thread_releases_wait() {
        let long = vec![
            TimedEvent::new(0, Event::note_on(0, 60, 100)),
            TimedEvent::new(480 * 120, Event::note_off(0, 60, 0)),
            end(),
        ];
        let mut sequencer =
            Sequencer::load(file(ContainerFormat::SingleTrack, vec![long])).unwrap();
        sequencer
            .start(Arc::new(RecordingSink::default()))
            .unwrap();

        let started = std::time::Instant::now();
        let outcome = std::thread::scope(|scope| {
            let waiter = scope.spawn(|| sequencer.wait());
            std::thread::sleep(Duration::from_millis(30));
            sequencer.stop();
            waiter.join().unwrap()
        });

        assert_eq!(outcome, Outcome::Stopped);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
