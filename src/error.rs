//! Error types for the effect engine

use thiserror::Error;

/// Engine errors reported to callers
#[derive(Debug, Error)]
pub enum EngineError {
    /// No effect is registered under this identifier
    #[error("Unknown effect: {0}")]
    UnknownEffect(u8),

    /// No effect is registered under this name
    #[error("Unknown effect name: {0}")]
    UnknownEffectName(String),

    /// Manual control addressed a channel that does not exist
    #[error("Channel out of range: {0}")]
    ChannelOutOfRange(i64),

    /// Inbound intent payload could not be decoded
    #[error("Malformed intent: {0}")]
    MalformedIntent(String),

    /// Configuration text is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The run thread could not be created
    #[error("Failed to spawn run thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Reasons a subscriber failed to take a delivery.
///
/// Any of these removes the subscriber from the hub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber's queue is full
    #[error("subscriber queue is full")]
    Full,

    /// The receiving side went away
    #[error("subscriber disconnected")]
    Disconnected,

    /// The sink sat on a delivery past the hub's budget
    #[error("subscriber timed out")]
    TimedOut,

    /// The sink refused the payload
    #[error("subscriber rejected delivery: {0}")]
    Rejected(String),
}

/// Result type for engine operations
pub type Result<T> = core::result::Result<T, EngineError>;
