use std::fmt;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::LoadError;
use crate::events::{Event, MetaKind, TimedEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    SingleTrack,
    /// Several tracks sharing one tempo map.
    MultiTrackSync,
    /// Several tracks, each with its own tempo map.
    MultiTrackIndependent,
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerFormat::SingleTrack => write!(f, "single-track (format 0)"),
            ContainerFormat::MultiTrackSync => write!(f, "multi-track synchronous (format 1)"),
            ContainerFormat::MultiTrackIndependent => {
                write!(f, "multi-track independent (format 2)")
            }
        }
    }
}

impl From<midly::Format> for ContainerFormat {
    fn from(format: midly::Format) -> Self {
        match format {
            midly::Format::SingleTrack => ContainerFormat::SingleTrack,
            midly::Format::Parallel => ContainerFormat::MultiTrackSync,
            midly::Format::Sequential => ContainerFormat::MultiTrackIndependent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: ContainerFormat,
    pub track_count: usize,
    pub ticks_per_quarter: u16,
}

/// A file decoded into per-track event lists, ready to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub header: Header,
    pub tracks: Vec<Vec<TimedEvent>>,
}

/// Anything that can produce a [`ParsedFile`].
pub trait EventSource {
    fn read(self) -> Result<ParsedFile, LoadError>;
}

impl EventSource for ParsedFile {
    fn read(self) -> Result<ParsedFile, LoadError> {
        Ok(self)
    }
}

/// Reads Standard MIDI Files.
pub struct SmfReader {
    bytes: Vec<u8>,
}

impl SmfReader {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }
}

impl EventSource for SmfReader {
    fn read(self) -> Result<ParsedFile, LoadError> {
        let smf = Smf::parse(&self.bytes)?;
        let ticks_per_quarter = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int(),
            Timing::Timecode(..) => return Err(LoadError::TimecodeTiming),
        };

        let tracks: Vec<Vec<TimedEvent>> = smf.tracks.iter().map(|t| convert_track(t)).collect();
        tracing::debug!(
            format = ?smf.header.format,
            tracks = tracks.len(),
            ticks_per_quarter,
            "parsed MIDI file"
        );

        Ok(ParsedFile {
            header: Header {
                format: smf.header.format.into(),
                track_count: smf.tracks.len(),
                ticks_per_quarter,
            },
            tracks,
        })
    }
}

/// Events that have no counterpart are dropped and their delta is carried
/// onto the next event, so the timing of the rest of the track holds.
fn convert_track(track: &[midly::TrackEvent<'_>]) -> Vec<TimedEvent> {
    let mut events = Vec::with_capacity(track.len());
    let mut carried: u32 = 0;

    for raw in track {
        let delta = carried.saturating_add(raw.delta.as_int());
        match convert_kind(&raw.kind) {
            Some(event) => {
                events.push(TimedEvent::new(delta, event));
                carried = 0;
            }
            None => carried = delta,
        }
    }
    events
}

fn convert_kind(kind: &TrackEventKind<'_>) -> Option<Event> {
    let event = match *kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => {
                    Event::note_on(channel, key.as_int(), vel.as_int())
                }
                MidiMessage::NoteOff { key, vel } => {
                    Event::note_off(channel, key.as_int(), vel.as_int())
                }
                MidiMessage::Controller { controller, value } => Event::Controller {
                    channel,
                    number: controller.as_int(),
                    value: value.as_int(),
                },
                MidiMessage::ProgramChange { program } => Event::ProgramChange {
                    channel,
                    program: program.as_int(),
                },
                MidiMessage::ChannelAftertouch { vel } => Event::ChannelPressure {
                    channel,
                    value: vel.as_int(),
                },
                MidiMessage::PitchBend { bend } => Event::PitchBend {
                    channel,
                    value: bend.0.as_int(),
                },
                MidiMessage::Aftertouch { .. } => {
                    tracing::trace!(channel, "dropping polyphonic aftertouch");
                    return None;
                }
            }
        }
        TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => Event::Sysex,
        TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => Event::TempoChange {
            micros_per_quarter: tempo.as_int(),
        },
        TrackEventKind::Meta(MetaMessage::EndOfTrack) => Event::EndOfTrack,
        TrackEventKind::Meta(MetaMessage::TrackName(name)) => Event::Meta {
            kind: MetaKind::TrackName,
            data: name.to_vec(),
        },
        TrackEventKind::Meta(ref meta) => {
            let (code, data) = meta_payload(meta);
            Event::Meta {
                kind: MetaKind::Other(code),
                data,
            }
        }
    };
    Some(event)
}

fn meta_payload(meta: &MetaMessage<'_>) -> (u8, Vec<u8>) {
    match *meta {
        MetaMessage::Text(data) => (0x01, data.to_vec()),
        MetaMessage::Copyright(data) => (0x02, data.to_vec()),
        MetaMessage::TrackName(data) => (0x03, data.to_vec()),
        MetaMessage::InstrumentName(data) => (0x04, data.to_vec()),
        MetaMessage::Lyric(data) => (0x05, data.to_vec()),
        MetaMessage::Marker(data) => (0x06, data.to_vec()),
        MetaMessage::CuePoint(data) => (0x07, data.to_vec()),
        MetaMessage::ProgramName(data) => (0x08, data.to_vec()),
        MetaMessage::DeviceName(data) => (0x09, data.to_vec()),
        MetaMessage::MidiChannel(channel) => (0x20, vec![channel.as_int()]),
        MetaMessage::MidiPort(port) => (0x21, vec![port.as_int()]),
        MetaMessage::EndOfTrack => (0x2F, Vec::new()),
        MetaMessage::TimeSignature(n, d, c, b) => (0x58, vec![n, d, c, b]),
        MetaMessage::KeySignature(sharps, minor) => (0x59, vec![sharps as u8, minor as u8]),
        MetaMessage::SequencerSpecific(data) => (0x7F, data.to_vec()),
        MetaMessage::Unknown(code, data) => (code, data.to_vec()),
        MetaMessage::Tempo(_) => (0x51, Vec::new()),
        MetaMessage::TrackNumber(_) => (0x00, Vec::new()),
        MetaMessage::SmpteOffset(_) => (0x54, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assembles a format/ppq header followed by raw track chunks.
    fn smf_bytes(format: u16, ppq: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&ppq.to_be_bytes());
        for track in tracks {
            bytes.extend_from_slice(b"MTrk");
            bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
            bytes.extend_from_slice(track);
        }
        bytes
    }

    const END: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

    #[test]
    fn reads_header_and_events() {
        let parts: &[&[u8]] = &[
            &[0x00, 0xFF, 0x03, 0x04],
            b"Lead",
            &[0x00, 0xFF, 0x51, 0x03, 0x04, 0x93, 0xE0],
            &[0x00, 0xC0, 0x05],
            // 480 ticks as a variable-length quantity.
            &[0x83, 0x60, 0x90, 0x3C, 0x64],
            &[0x83, 0x60, 0x90, 0x3C, 0x00],
            &[0x00, 0xE1, 0x00, 0x40],
            &END,
        ];
        let track = parts.concat();
        let bytes = smf_bytes(1, 480, &[&track, &END]);

        let parsed = SmfReader::from_bytes(bytes).read().unwrap();

        assert_eq!(
            parsed.header,
            Header {
                format: ContainerFormat::MultiTrackSync,
                track_count: 2,
                ticks_per_quarter: 480,
            }
        );
        assert_eq!(parsed.tracks[1], vec![TimedEvent::new(0, Event::EndOfTrack)]);

        let events: Vec<_> = parsed.tracks[0].iter().map(|t| (t.delta_ticks, &t.event)).collect();
        assert_eq!(
            events[0],
            (
                0,
                &Event::Meta {
                    kind: MetaKind::TrackName,
                    data: b"Lead".to_vec(),
                }
            )
        );
        assert_eq!(
            events[1],
            (
                0,
                &Event::TempoChange {
                    micros_per_quarter: 300_000,
                }
            )
        );
        assert_eq!(
            events[2],
            (
                0,
                &Event::ProgramChange {
                    channel: 0,
                    program: 5,
                }
            )
        );
        assert_eq!(events[3], (480, &Event::note_on(0, 60, 100)));
        assert_eq!(events[4], (480, &Event::note_on(0, 60, 0)));
        assert_eq!(
            events[5],
            (
                0,
                &Event::PitchBend {
                    channel: 1,
                    value: 8192,
                }
            )
        );
        assert_eq!(events[6], (0, &Event::EndOfTrack));
    }

    #[test]
    fn carries_delta_of_dropped_events() {
        let parts: &[&[u8]] = &[
            &[0x00, 0x90, 0x3C, 0x64],
            &[0x10, 0xA0, 0x3C, 0x20],
            &[0x20, 0x80, 0x3C, 0x00],
            &END,
        ];
        let track = parts.concat();
        let parsed = SmfReader::from_bytes(smf_bytes(0, 96, &[&track]))
            .read()
            .unwrap();

        assert_eq!(parsed.header.format, ContainerFormat::SingleTrack);
        assert_eq!(parsed.tracks[0].len(), 3);
        assert_eq!(parsed.tracks[0][1], TimedEvent::new(0x30, Event::note_off(0, 60, 0)));
    }

    #[test]
    fn maps_independent_format() {
        let parsed = SmfReader::from_bytes(smf_bytes(2, 96, &[&END, &END]))
            .read()
            .unwrap();
        assert_eq!(parsed.header.format, ContainerFormat::MultiTrackIndependent);
    }

    #[test]
    fn rejects_timecode_timing() {
        // Negative high byte selects SMPTE timing: -25 fps, 40 ticks per frame.
        let bytes = smf_bytes(0, 0xE728, &[&END]);
        let err = SmfReader::from_bytes(bytes).read().unwrap_err();
        assert!(matches!(err, LoadError::TimecodeTiming));
    }

    #[test]
    fn rejects_garbage() {
        let err = SmfReader::from_bytes(b"not a midi file".to_vec())
            .read()
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SmfReader::open("/nonexistent/tempo-player/missing.mid")
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
