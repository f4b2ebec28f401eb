//! Outbound events
//!
//! Serialized as internally tagged JSON for the transport layer:
//! `{"type":"led_status","red":100,"green":0,"blue":40}` and
//! `{"type":"voice_command","command":"..."}`.

use serde::{Deserialize, Serialize};

/// Events fanned out to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Current brightness of every channel, 0..100
    LedStatus { red: u8, green: u8, blue: u8 },
    /// A recognized voice command echoed back to observers
    VoiceCommand { command: String },
}

impl Event {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
