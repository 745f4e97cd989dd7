//! MIDI port discovery
//!
//! Uses midir for cross-platform MIDI input (ALSA on Linux, CoreMIDI on macOS, WinMM on Windows).

use midir::{MidiInput, MidiInputPort};

/// Error type for MIDI connection operations
#[derive(Debug, thiserror::Error)]
pub enum MidiConnectionError {
    #[error("Failed to initialize MIDI input: {0}")]
    InputInitError(String),

    #[error("No MIDI input ports available")]
    NoInputPorts,

    #[error("No MIDI port found matching pattern: {0}")]
    PortNotFound(String),

    #[error("Failed to connect to MIDI port: {0}")]
    ConnectionError(String),

    #[error("Failed to get port info: {0}")]
    PortInfoError(String),
}

/// Case-insensitive substring match of a port name against a pattern
pub fn port_matches(port_name: &str, pattern: &str) -> bool {
    port_name.to_lowercase().contains(&pattern.to_lowercase())
}

/// MIDI input port lookup
pub struct MidiConnection;

impl MidiConnection {
    /// Find the first input port whose name contains `port_match`
    ///
    /// Returns the MidiInput together with the port so the caller can
    /// connect its own callback.
    pub fn find_input_port(
        port_match: &str,
    ) -> Result<(MidiInput, MidiInputPort, String), MidiConnectionError> {
        let midi_in = MidiInput::new("buffr-midi-in")
            .map_err(|e| MidiConnectionError::InputInitError(e.to_string()))?;

        let in_ports = midi_in.ports();
        if in_ports.is_empty() {
            return Err(MidiConnectionError::NoInputPorts);
        }

        let input_port = in_ports
            .into_iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .map(|name| port_matches(&name, port_match))
                    .unwrap_or(false)
            })
            .ok_or_else(|| MidiConnectionError::PortNotFound(port_match.to_string()))?;

        let port_name = midi_in
            .port_name(&input_port)
            .map_err(|e| MidiConnectionError::PortInfoError(e.to_string()))?;

        log::info!("MIDI: Found input port: {}", port_name);

        Ok((midi_in, input_port, port_name))
    }

    /// List all available MIDI input ports
    pub fn list_input_ports() -> Result<Vec<String>, MidiConnectionError> {
        let midi_in = MidiInput::new("buffr-midi-list")
            .map_err(|e| MidiConnectionError::InputInitError(e.to_string()))?;

        let ports: Vec<String> = midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect();

        Ok(ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_matching() {
        assert!(port_matches("Arturia KeyStep 37:Arturia KeyStep 37 MIDI 1 20:0", "keystep"));
        assert!(port_matches("Midi Through Port-0", "THROUGH"));
        assert!(!port_matches("Midi Through Port-0", "launchkey"));
        assert!(port_matches("anything", ""));
    }

    #[test]
    fn test_list_ports() {
        // Port availability depends on the system; just make sure enumeration works
        match MidiConnection::list_input_ports() {
            Ok(ports) => log::info!("Found {} MIDI input ports", ports.len()),
            Err(e) => log::warn!("MIDI unavailable: {}", e),
        }
    }

    #[test]
    fn test_missing_port() {
        let result = MidiConnection::find_input_port("buffr-no-such-port-pattern");
        assert!(result.is_err());
    }
}
