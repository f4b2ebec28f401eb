//! Multi-channel lighting effect engine.
//!
//! Effects are trees of [`Action`]s run by a [`Scheduler`] that keeps at
//! most one effect live, cancels superseded runs cooperatively, and pushes
//! every channel update through a [`BroadcastHub`].

pub mod action;
pub mod config;
pub mod effect;
pub mod engine;
pub mod error;
pub mod event;
pub mod hub;
pub mod intent;
pub mod mailbox;
pub mod output;
pub mod pacer;
pub mod scheduler;
pub mod state;
pub mod waveform;

pub use action::Action;
pub use config::EngineConfig;
pub use effect::{EffectCatalog, EffectId};
pub use engine::LightEngine;
pub use error::{DeliveryError, EngineError, Result};
pub use event::Event;
pub use hub::{BroadcastHub, Sink, SubscriptionId};
pub use intent::{IntentProcessor, IntentReceiver, IntentSender, LightIntent, intent_queue};
pub use mailbox::{MailboxReceiver, MailboxSender, mailbox};
pub use output::{CHANNEL_COUNT, ChannelId, DutyCycleDriver, NoopDriver};
pub use pacer::TickPacer;
pub use scheduler::{RunHandle, RunId, RunKind, RunState, Scheduler};
pub use state::{Snapshot, StateStore};
pub use waveform::{WaveformKind, WaveformSpec};

pub use embassy_time::{Duration, Instant};
