use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;

use super::NoteSink;
use crate::error::SinkError;
use crate::events::{MAX_CHANNEL, PerformanceEvent};

const CLIENT_NAME: &str = "tempo-player";
const ALL_NOTES_OFF: u8 = 123;

/// Sends every event as a raw MIDI message to an output port.
pub struct MidiOutSink {
    port_name: String,
    connection: Mutex<MidiOutputConnection>,
}

impl MidiOutSink {
    pub fn port_names() -> Result<Vec<String>, SinkError> {
        let output = MidiOutput::new(CLIENT_NAME)?;
        Ok(output
            .ports()
            .iter()
            .filter_map(|port| output.port_name(port).ok())
            .collect())
    }

    /// Connects to the first port whose name contains `filter`, or to the
    /// first port when `filter` is empty.
    pub fn connect(filter: &str) -> Result<Self, SinkError> {
        let output = MidiOutput::new(CLIENT_NAME)?;
        let ports = output.ports();
        let port = ports
            .iter()
            .find(|port| {
                output
                    .port_name(port)
                    .unwrap_or_default()
                    .contains(filter)
            })
            .cloned()
            .ok_or_else(|| SinkError::NoSuchPort(filter.to_string()))?;

        let port_name = output.port_name(&port).unwrap_or_default();
        let connection = output
            .connect(&port, "tempo-player-out")
            .map_err(|e| SinkError::Connect(e.to_string()))?;

        tracing::info!(port = %port_name, "connected to MIDI output");
        Ok(Self {
            port_name,
            connection: Mutex::new(connection),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl NoteSink for MidiOutSink {
    fn perform(&self, track: usize, event: PerformanceEvent) {
        let bytes = event.to_midi_bytes();
        if let Err(e) = self.connection.lock().send(&bytes) {
            tracing::warn!(track, ?event, "failed to send MIDI message: {}", e);
        }
    }
}

impl Drop for MidiOutSink {
    fn drop(&mut self) {
        let connection = self.connection.get_mut();
        for channel in 0..=MAX_CHANNEL {
            let _ = connection.send(&[0xB0 | channel, ALL_NOTES_OFF, 0]);
        }
    }
}
