use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::events::{Event, MAX_CHANNEL, TimedEvent};

/// Instrument and controller state of one channel within one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub id: u8,
    pub program: u8,
    pub last_controller: u8,
}

impl ChannelState {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            program: 0,
            last_controller: 0,
        }
    }
}

struct ChannelSlot {
    id: u8,
    state: ArcSwap<ChannelState>,
}

/// The channels a track uses, fixed after the pre-scan.
///
/// Only the track's player writes. Each write publishes a fresh snapshot, so
/// observers on other threads read a consistent `ChannelState` without
/// taking a lock.
pub struct ChannelRegistry {
    slots: Vec<ChannelSlot>,
    index: [Option<usize>; MAX_CHANNEL as usize + 1],
}

impl ChannelRegistry {
    /// Registers every channel id in first-seen order. The last program
    /// change in the track becomes the channel's initial program.
    pub fn scan(events: &[TimedEvent]) -> Self {
        let mut initial: Vec<ChannelState> = Vec::new();
        let mut index = [None; MAX_CHANNEL as usize + 1];

        for timed in events {
            let Some(channel) = timed.event.channel() else {
                continue;
            };
            if channel > MAX_CHANNEL {
                continue;
            }

            let slot = *index[channel as usize].get_or_insert_with(|| {
                initial.push(ChannelState::new(channel));
                initial.len() - 1
            });

            if let Event::ProgramChange { program, .. } = timed.event {
                initial[slot].program = program;
            }
        }

        let slots = initial
            .into_iter()
            .map(|state| ChannelSlot {
                id: state.id,
                state: ArcSwap::from_pointee(state),
            })
            .collect();

        Self { slots, index }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, channel: u8) -> bool {
        self.slot(channel).is_some()
    }

    /// Channel ids in first-seen order.
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots.iter().map(|slot| slot.id)
    }

    pub fn snapshot(&self, channel: u8) -> Option<ChannelState> {
        self.slot(channel).map(|slot| **slot.state.load())
    }

    pub fn snapshots(&self) -> Vec<ChannelState> {
        self.slots.iter().map(|slot| **slot.state.load()).collect()
    }

    pub fn program(&self, channel: u8) -> Option<u8> {
        self.snapshot(channel).map(|state| state.program)
    }

    pub(crate) fn set_program(&self, channel: u8, program: u8) -> bool {
        self.update(channel, |state| state.program = program)
    }

    pub(crate) fn set_last_controller(&self, channel: u8, value: u8) -> bool {
        self.update(channel, |state| state.last_controller = value)
    }

    fn update(&self, channel: u8, apply: impl FnOnce(&mut ChannelState)) -> bool {
        let Some(slot) = self.slot(channel) else {
            return false;
        };
        let mut next = **slot.state.load();
        apply(&mut next);
        slot.state.store(Arc::new(next));
        true
    }

    fn slot(&self, channel: u8) -> Option<&ChannelSlot> {
        let index = (*self.index.get(channel as usize)?)?;
        self.slots.get(index)
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.snapshots()).finish()
    }
}

/// One track's events and the channels they use.
#[derive(Debug)]
pub struct Track {
    pub index: usize,
    pub name: Option<String>,
    pub events: Arc<[TimedEvent]>,
    pub channels: Arc<ChannelRegistry>,
}

impl Track {
    pub fn new(index: usize, events: Vec<TimedEvent>) -> Self {
        let channels = Arc::new(ChannelRegistry::scan(&events));
        let name = events.iter().rev().find_map(|timed| match &timed.event {
            Event::Meta {
                kind: crate::events::MetaKind::TrackName,
                data,
            } => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        });

        Self {
            index,
            name,
            events: events.into(),
            channels,
        }
    }

    /// Whether the track ends with an end-of-track event. A track without
    /// one never finishes.
    pub fn is_terminated(&self) -> bool {
        self.events
            .iter()
            .any(|timed| matches!(timed.event, Event::EndOfTrack))
    }
}
