//! Light engine - the main orchestrator
//!
//! Owns the state store, the broadcast hub and the scheduler, and wires
//! them together. There is no global state: every collaborator lives in
//! the engine and is shared with run threads by reference counting.

use std::sync::Arc;

use log::info;

use crate::config::EngineConfig;
use crate::effect::EffectCatalog;
use crate::error::Result;
use crate::event::Event;
use crate::hub::{BroadcastHub, Sink, SubscriptionId};
use crate::intent::{self, LightIntent};
use crate::output::{CHANNEL_COUNT, ChannelId, DutyCycleDriver, NoopDriver};
use crate::scheduler::{RunHandle, Scheduler};
use crate::state::{Snapshot, StateStore};

/// Facade over the effect engine
pub struct LightEngine {
    store: Arc<StateStore>,
    hub: Arc<BroadcastHub>,
    scheduler: Scheduler,
}

impl LightEngine {
    /// Create an engine driving the given channel drivers.
    pub fn new(
        catalog: EffectCatalog,
        drivers: [Box<dyn DutyCycleDriver>; CHANNEL_COUNT],
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(StateStore::new());
        let hub = Arc::new(BroadcastHub::with_limits(
            config.subscriber_queue,
            config.delivery_timeout,
        ));
        hub.publish_state(store.snapshot());
        let scheduler = Scheduler::new(
            catalog,
            Arc::clone(&store),
            Arc::clone(&hub),
            drivers,
            config,
        );
        info!(
            "light engine ready: {} effects, tick {} ms",
            scheduler.catalog().len(),
            config.tick_period.as_millis()
        );
        Ok(Self {
            store,
            hub,
            scheduler,
        })
    }

    /// Engine with the reference catalog and no hardware attached
    pub fn headless(config: EngineConfig) -> Result<Self> {
        Self::new(
            EffectCatalog::reference(),
            [Box::new(NoopDriver), Box::new(NoopDriver), Box::new(NoopDriver)],
            config,
        )
    }

    pub fn start(&self, effect: u8) -> Result<RunHandle> {
        self.scheduler.start(effect)
    }

    pub fn start_named(&self, name: &str) -> Result<RunHandle> {
        self.scheduler.start_named(name)
    }

    pub fn stop(&self) -> Result<RunHandle> {
        self.scheduler.stop()
    }

    /// Manual control; `level` in `[0, 1]`
    pub fn set_channel(&self, channel: ChannelId, level: f32) -> Result<RunHandle> {
        self.scheduler.set_channel(channel, level)
    }

    pub fn handle_intent(&self, intent: &LightIntent) -> Result<RunHandle> {
        intent::apply(self, intent)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn subscribe<S: Sink + 'static>(&self, sink: S) -> SubscriptionId {
        self.hub.subscribe(sink)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }

    /// Echo a recognized voice command to every subscriber
    pub fn announce_voice_command(&self, command: &str) {
        self.hub.publish_event(&Event::VoiceCommand {
            command: command.to_owned(),
        });
    }

    pub fn live_run(&self) -> Option<RunHandle> {
        self.scheduler.live()
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
