use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::events::MAX_CHANNEL;
use crate::sink::NoteSink;
use crate::track::ChannelRegistry;

/// Resolves what instrument a channel is currently playing.
pub trait InstrumentNames: Send + Sync {
    fn instrument_name(&self, track: usize, channel: u8) -> String;
}

pub fn general_midi_name(program: u8) -> &'static str {
    GENERAL_MIDI
        .get(program as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Looks up each track's current program in the General MIDI table.
pub struct GeneralMidiNames {
    tracks: Vec<Arc<ChannelRegistry>>,
}

impl GeneralMidiNames {
    pub fn new(tracks: Vec<Arc<ChannelRegistry>>) -> Self {
        Self { tracks }
    }
}

impl InstrumentNames for GeneralMidiNames {
    fn instrument_name(&self, track: usize, channel: u8) -> String {
        self.tracks
            .get(track)
            .and_then(|registry| registry.program(channel))
            .map(general_midi_name)
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Preset state of the sound-producing side.
///
/// Like a synthesizer, it has one program slot per channel shared by every
/// track, changed by the program changes it receives. Names come from the
/// loaded preset list and fall back to General MIDI.
pub struct PresetBank {
    presets: HashMap<u8, String>,
    programs: [AtomicU8; MAX_CHANNEL as usize + 1],
}

impl PresetBank {
    pub fn new(presets: impl IntoIterator<Item = (u8, String)>) -> Self {
        Self {
            presets: presets.into_iter().collect(),
            programs: std::array::from_fn(|_| AtomicU8::new(0)),
        }
    }

    pub fn program(&self, channel: u8) -> Option<u8> {
        self.programs
            .get(channel as usize)
            .map(|program| program.load(Ordering::Acquire))
    }

    pub fn preset_name(&self, program: u8) -> &str {
        self.presets
            .get(&program)
            .map(String::as_str)
            .unwrap_or_else(|| general_midi_name(program))
    }
}

impl NoteSink for PresetBank {
    fn on_program_change(&self, _track: usize, channel: u8, program: u8) {
        if let Some(slot) = self.programs.get(channel as usize) {
            slot.store(program, Ordering::Release);
        }
    }
}

impl InstrumentNames for PresetBank {
    fn instrument_name(&self, _track: usize, channel: u8) -> String {
        match self.program(channel) {
            Some(program) => self.preset_name(program).to_string(),
            None => "Unknown".to_string(),
        }
    }
}

const GENERAL_MIDI: [&str; 128] = [
    "Acoustic Grand Piano",
    "Bright Acoustic Piano",
    "Electric Grand Piano",
    "Honky-tonk Piano",
    "Electric Piano 1",
    "Electric Piano 2",
    "Harpsichord",
    "Clavinet",
    "Celesta",
    "Glockenspiel",
    "Music Box",
    "Vibraphone",
    "Marimba",
    "Xylophone",
    "Tubular Bells",
    "Dulcimer",
    "Drawbar Organ",
    "Percussive Organ",
    "Rock Organ",
    "Church Organ",
    "Reed Organ",
    "Accordion",
    "Harmonica",
    "Tango Accordion",
    "Acoustic Guitar (nylon)",
    "Acoustic Guitar (steel)",
    "Electric Guitar (jazz)",
    "Electric Guitar (clean)",
    "Electric Guitar (muted)",
    "Overdriven Guitar",
    "Distortion Guitar",
    "Guitar Harmonics",
    "Acoustic Bass",
    "Electric Bass (finger)",
    "Electric Bass (pick)",
    "Fretless Bass",
    "Slap Bass 1",
    "Slap Bass 2",
    "Synth Bass 1",
    "Synth Bass 2",
    "Violin",
    "Viola",
    "Cello",
    "Contrabass",
    "Tremolo Strings",
    "Pizzicato Strings",
    "Orchestral Harp",
    "Timpani",
    "String Ensemble 1",
    "String Ensemble 2",
    "Synth Strings 1",
    "Synth Strings 2",
    "Choir Aahs",
    "Voice Oohs",
    "Synth Choir",
    "Orchestra Hit",
    "Trumpet",
    "Trombone",
    "Tuba",
    "Muted Trumpet",
    "French Horn",
    "Brass Section",
    "Synth Brass 1",
    "Synth Brass 2",
    "Soprano Sax",
    "Alto Sax",
    "Tenor Sax",
    "Baritone Sax",
    "Oboe",
    "English Horn",
    "Bassoon",
    "Clarinet",
    "Piccolo",
    "Flute",
    "Recorder",
    "Pan Flute",
    "Blown Bottle",
    "Shakuhachi",
    "Whistle",
    "Ocarina",
    "Lead 1 (square)",
    "Lead 2 (sawtooth)",
    "Lead 3 (calliope)",
    "Lead 4 (chiff)",
    "Lead 5 (charang)",
    "Lead 6 (voice)",
    "Lead 7 (fifths)",
    "Lead 8 (bass + lead)",
    "Pad 1 (new age)",
    "Pad 2 (warm)",
    "Pad 3 (polysynth)",
    "Pad 4 (choir)",
    "Pad 5 (bowed)",
    "Pad 6 (metallic)",
    "Pad 7 (halo)",
    "Pad 8 (sweep)",
    "FX 1 (rain)",
    "FX 2 (soundtrack)",
    "FX 3 (crystal)",
    "FX 4 (atmosphere)",
    "FX 5 (brightness)",
    "FX 6 (goblins)",
    "FX 7 (echoes)",
    "FX 8 (sci-fi)",
    "Sitar",
    "Banjo",
    "Shamisen",
    "Koto",
    "Kalimba",
    "Bagpipe",
    "Fiddle",
    "Shanai",
    "Tinkle Bell",
    "Agogo",
    "Steel Drums",
    "Woodblock",
    "Taiko Drum",
    "Melodic Tom",
    "Synth Drum",
    "Reverse Cymbal",
    "Guitar Fret Noise",
    "Breath Noise",
    "Seashore",
    "Bird Tweet",
    "Telephone Ring",
    "Helicopter",
    "Applause",
    "Gunshot",
];
