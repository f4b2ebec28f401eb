//! Intent processing module
//!
//! Handles conversion of inbound requests from the transport layer into
//! scheduler operations. Intents arrive as JSON, either directly or queued
//! in a bounded mailbox that the [`IntentProcessor`] drains.

use log::warn;
use serde::Deserialize;

use crate::engine::LightEngine;
use crate::error::{EngineError, Result};
use crate::mailbox::{MailboxReceiver, MailboxSender, mailbox};
use crate::output::ChannelId;
use crate::scheduler::RunHandle;

/// Upper end of the wire brightness scale
pub const WIRE_LEVEL_MAX: f32 = 100.0;

/// A request to change what the lights are doing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightIntent {
    /// Run an effect by identifier
    RunEffect { effect: u8 },
    /// Run an effect by name
    RunNamedEffect { name: String },
    /// Cancel whatever runs and switch everything off
    Stop,
    /// Set one channel, `level` on the 0..100 wire scale
    ///
    /// `channel` is kept wide so that any integer index decodes and an
    /// unknown one is reported as out of range rather than malformed.
    SetChannel { channel: i64, level: f32 },
}

impl LightIntent {
    pub fn from_json_str(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|err| EngineError::MalformedIntent(err.to_string()))
    }
}

/// Scale a 0..100 wire level to `[0, 1]`
pub fn wire_to_unit(level: f32) -> f32 {
    crate::waveform::unit(level / WIRE_LEVEL_MAX)
}

/// Type alias for intent sender
pub type IntentSender<const SIZE: usize> = MailboxSender<LightIntent, SIZE>;

/// Type alias for intent receiver
pub type IntentReceiver<const SIZE: usize> = MailboxReceiver<LightIntent, SIZE>;

/// Create a bounded intent queue
pub fn intent_queue<const SIZE: usize>() -> (IntentSender<SIZE>, IntentReceiver<SIZE>) {
    mailbox()
}

/// Applies intents to an engine
pub struct IntentProcessor<const SIZE: usize> {
    intents: IntentReceiver<SIZE>,
}

impl<const SIZE: usize> IntentProcessor<SIZE> {
    /// Create a new intent processor
    pub const fn new(intents: IntentReceiver<SIZE>) -> Self {
        Self { intents }
    }

    /// Apply every queued intent, oldest first (non-blocking)
    ///
    /// Each intent supersedes the previous one, so only the last started run
    /// stays live. Rejected intents are logged and reported in place.
    pub fn process_pending(&mut self, engine: &LightEngine) -> Vec<Result<RunHandle>> {
        self.intents
            .drain()
            .into_iter()
            .map(|intent| {
                let result = apply(engine, &intent);
                if let Err(err) = &result {
                    warn!("rejected intent {:?}: {}", intent, err);
                }
                result
            })
            .collect()
    }
}

/// Apply a single intent
pub fn apply(engine: &LightEngine, intent: &LightIntent) -> Result<RunHandle> {
    match intent {
        LightIntent::RunEffect { effect } => engine.start(*effect),
        LightIntent::RunNamedEffect { name } => engine.start_named(name),
        LightIntent::Stop => engine.stop(),
        LightIntent::SetChannel { channel, level } => {
            let channel = ChannelId::from_index(*channel)?;
            engine.set_channel(channel, wire_to_unit(*level))
        }
    }
}
