use crate::error::MalformedEvent;
use crate::sink::NoteSink;

/// Highest channel id a track may reference.
pub const MAX_CHANNEL: u8 = 15;
/// Largest value of a 14-bit pitch bend.
pub const MAX_PITCH_BEND: u16 = 0x3FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    TrackName,
    Other(u8),
}

/// One decoded event of a track, as handed over by the file reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Note {
        channel: u8,
        pitch: u8,
        velocity: u8,
        is_on: bool,
    },
    Controller {
        channel: u8,
        number: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    ChannelPressure {
        channel: u8,
        value: u8,
    },
    /// Raw 14-bit value, 8192 is centered.
    PitchBend {
        channel: u8,
        value: u16,
    },
    TempoChange {
        micros_per_quarter: u32,
    },
    EndOfTrack,
    Sysex,
    Meta {
        kind: MetaKind,
        data: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub delta_ticks: u32,
    pub event: Event,
}

impl TimedEvent {
    pub fn new(delta_ticks: u32, event: Event) -> Self {
        Self { delta_ticks, event }
    }
}

impl Event {
    pub fn note_on(channel: u8, pitch: u8, velocity: u8) -> Self {
        Event::Note {
            channel,
            pitch,
            velocity,
            is_on: true,
        }
    }

    pub fn note_off(channel: u8, pitch: u8, velocity: u8) -> Self {
        Event::Note {
            channel,
            pitch,
            velocity,
            is_on: false,
        }
    }

    /// Channel id referenced by this event, if it is a channel event.
    pub fn channel(&self) -> Option<u8> {
        match self {
            Event::Note { channel, .. }
            | Event::Controller { channel, .. }
            | Event::ProgramChange { channel, .. }
            | Event::ChannelPressure { channel, .. }
            | Event::PitchBend { channel, .. } => Some(*channel),
            Event::TempoChange { .. } | Event::EndOfTrack | Event::Sysex | Event::Meta { .. } => {
                None
            }
        }
    }

    /// Checks the payload ranges a MIDI stream can carry.
    pub fn validate(&self) -> Result<(), MalformedEvent> {
        if let Some(channel) = self.channel() {
            if channel > MAX_CHANNEL {
                return Err(MalformedEvent::ChannelOutOfRange(channel));
            }
        }

        let (data, len) = match *self {
            Event::Note {
                pitch, velocity, ..
            } => ([pitch, velocity], 2),
            Event::Controller { number, value, .. } => ([number, value], 2),
            Event::ProgramChange { program, .. } => ([program, 0], 1),
            Event::ChannelPressure { value, .. } => ([value, 0], 1),
            Event::PitchBend { value, .. } if value > MAX_PITCH_BEND => {
                return Err(MalformedEvent::PitchBendOutOfRange(value));
            }
            Event::TempoChange {
                micros_per_quarter: 0,
            } => return Err(MalformedEvent::ZeroTempo),
            _ => ([0, 0], 0),
        };

        match data[..len].iter().find(|b| **b > 0x7F) {
            Some(byte) => Err(MalformedEvent::DataByteOutOfRange(*byte)),
            None => Ok(()),
        }
    }

    /// Sink-facing form of a channel event. Note on with velocity zero
    /// becomes note off here.
    pub fn to_performance(&self) -> Option<PerformanceEvent> {
        let performance = match *self {
            Event::Note {
                channel,
                pitch,
                velocity,
                is_on,
            } => PerformanceEvent::Note {
                channel,
                pitch,
                velocity,
                is_on: is_on && velocity > 0,
            },
            Event::Controller {
                channel,
                number,
                value,
            } => PerformanceEvent::Controller {
                channel,
                number,
                value,
            },
            Event::ProgramChange { channel, program } => {
                PerformanceEvent::ProgramChange { channel, program }
            }
            Event::ChannelPressure { channel, value } => {
                PerformanceEvent::ChannelPressure { channel, value }
            }
            Event::PitchBend { channel, value } => PerformanceEvent::PitchBend { channel, value },
            Event::TempoChange { .. } | Event::EndOfTrack | Event::Sysex | Event::Meta { .. } => {
                return None;
            }
        };
        Some(performance)
    }
}

/// An event as the note sink sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceEvent {
    Note {
        channel: u8,
        pitch: u8,
        velocity: u8,
        is_on: bool,
    },
    Controller {
        channel: u8,
        number: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    ChannelPressure {
        channel: u8,
        value: u8,
    },
    PitchBend {
        channel: u8,
        value: u16,
    },
}

impl PerformanceEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            PerformanceEvent::Note { channel, .. }
            | PerformanceEvent::Controller { channel, .. }
            | PerformanceEvent::ProgramChange { channel, .. }
            | PerformanceEvent::ChannelPressure { channel, .. }
            | PerformanceEvent::PitchBend { channel, .. } => channel,
        }
    }

    /// Calls the matching sink method.
    pub fn deliver<S: NoteSink + ?Sized>(&self, track: usize, sink: &S) {
        match *self {
            PerformanceEvent::Note {
                channel,
                pitch,
                velocity,
                is_on,
            } => sink.on_note(track, channel, pitch, velocity, is_on),
            PerformanceEvent::Controller {
                channel,
                number,
                value,
            } => sink.on_controller(track, channel, number, value),
            PerformanceEvent::ProgramChange { channel, program } => {
                sink.on_program_change(track, channel, program)
            }
            PerformanceEvent::ChannelPressure { channel, value } => {
                sink.on_channel_pressure(track, channel, value)
            }
            PerformanceEvent::PitchBend { channel, value } => {
                sink.on_pitch_bend(track, channel, value)
            }
        }
    }

    /// Encodes the event as a raw MIDI channel message.
    pub fn to_midi_bytes(&self) -> Vec<u8> {
        match *self {
            PerformanceEvent::Note {
                channel,
                pitch,
                velocity,
                is_on: true,
            } => vec![0x90 | channel, pitch, velocity],
            PerformanceEvent::Note {
                channel,
                pitch,
                velocity,
                is_on: false,
            } => vec![0x80 | channel, pitch, velocity],
            PerformanceEvent::Controller {
                channel,
                number,
                value,
            } => vec![0xB0 | channel, number, value],
            PerformanceEvent::ProgramChange { channel, program } => vec![0xC0 | channel, program],
            PerformanceEvent::ChannelPressure { channel, value } => vec![0xD0 | channel, value],
            PerformanceEvent::PitchBend { channel, value } => {
                vec![0xE0 | channel, (value & 0x7F) as u8, (value >> 7) as u8]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let event = Event::note_on(2, 64, 0);
        assert_eq!(
            event.to_performance(),
            Some(PerformanceEvent::Note {
                channel: 2,
                pitch: 64,
                velocity: 0,
                is_on: false,
            })
        );
    }

    #[test]
    fn note_on_keeps_velocity() {
        let event = Event::note_on(0, 60, 100);
        assert_eq!(
            event.to_performance(),
            Some(PerformanceEvent::Note {
                channel: 0,
                pitch: 60,
                velocity: 100,
                is_on: true,
            })
        );
    }

    #[test]
    fn non_channel_events_have_no_performance() {
        assert_eq!(Event::EndOfTrack.to_performance(), None);
        assert_eq!(
            Event::TempoChange {
                micros_per_quarter: 400_000
            }
            .to_performance(),
            None
        );
        assert_eq!(Event::Sysex.channel(), None);
    }

    #[test]
    fn validates_payload_ranges() {
        assert!(Event::note_on(3, 60, 100).validate().is_ok());
        assert_eq!(
            Event::note_on(16, 60, 100).validate(),
            Err(MalformedEvent::ChannelOutOfRange(16))
        );
        assert_eq!(
            Event::Controller {
                channel: 0,
                number: 7,
                value: 200
            }
            .validate(),
            Err(MalformedEvent::DataByteOutOfRange(200))
        );
        assert_eq!(
            Event::TempoChange {
                micros_per_quarter: 0
            }
            .validate(),
            Err(MalformedEvent::ZeroTempo)
        );
        assert_eq!(
            Event::PitchBend {
                channel: 1,
                value: 0x4000
            }
            .validate(),
            Err(MalformedEvent::PitchBendOutOfRange(0x4000))
        );
    }

    #[test]
    fn encodes_midi_bytes() {
        let bend = PerformanceEvent::PitchBend {
            channel: 1,
            value: 8192,
        };
        assert_eq!(bend.to_midi_bytes(), vec![0xE1, 0x00, 0x40]);

        let off = PerformanceEvent::Note {
            channel: 9,
            pitch: 36,
            velocity: 0,
            is_on: false,
        };
        assert_eq!(off.to_midi_bytes(), vec![0x89, 36, 0]);
    }
}
