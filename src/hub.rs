//! Broadcast hub
//!
//! Fans state snapshots and discrete events out to a dynamic set of
//! subscribers. Every payload is serialized once per publish. Publishing
//! never waits on a subscriber:
//!
//! - sinks whose `deliver` cannot block (mailboxes) are fed inline;
//! - any other sink gets a bounded queue and its own worker thread, and the
//!   hub only ever `try_send`s into that queue.
//!
//! A subscriber is dropped when a delivery fails, when its queue is full or
//! gone, or when its worker has been stuck in one `deliver` for longer than
//! the delivery timeout. The remaining subscribers still receive the payload.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use embassy_time::{Duration, Instant};
use log::{debug, warn};

use crate::error::DeliveryError;
use crate::event::Event;
use crate::state::Snapshot;

/// Default depth of the queue in front of a worker-driven sink.
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 64;

/// Default budget for a single `deliver` on a worker-driven sink.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_millis(250);

/// Receiver of published events.
pub trait Sink: Send {
    /// Deliver one event together with its JSON serialization
    fn deliver(&mut self, event: &Event, payload: &str) -> Result<(), DeliveryError>;

    /// Whether `deliver` always returns without waiting.
    ///
    /// Such sinks are fed on the publishing thread. Everything else is
    /// driven from a dedicated worker thread.
    fn never_blocks(&self) -> bool {
        false
    }
}

impl<F> Sink for F
where
    F: FnMut(&Event, &str) -> Result<(), DeliveryError> + Send,
{
    fn deliver(&mut self, event: &Event, payload: &str) -> Result<(), DeliveryError> {
        self(event, payload)
    }
}

/// Identifier of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

type Delivery = (Event, Arc<str>);

const IDLE: u64 = u64::MAX;

/// Progress of a worker, shared with the hub
struct WorkerHealth {
    /// Tick count at which the current `deliver` started, `IDLE` otherwise
    busy_since: AtomicU64,
    failed: AtomicBool,
    retired: AtomicBool,
}

/// Hub side of a worker-driven sink. Dropping it retires the worker.
struct Worker {
    queue: Sender<Delivery>,
    health: Arc<WorkerHealth>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.health.retired.store(true, Ordering::Release);
    }
}

enum Outlet {
    Inline(Box<dyn Sink>),
    Worker(Worker),
}

impl Outlet {
    fn offer(&mut self, delivery: &Delivery, timeout: Duration) -> Result<(), DeliveryError> {
        match self {
            Self::Inline(sink) => sink.deliver(&delivery.0, &delivery.1),
            Self::Worker(worker) => {
                if worker.health.failed.load(Ordering::Acquire) {
                    return Err(DeliveryError::Disconnected);
                }
                let since = worker.health.busy_since.load(Ordering::Acquire);
                if since != IDLE
                    && Instant::now().as_ticks().saturating_sub(since) > timeout.as_ticks()
                {
                    return Err(DeliveryError::TimedOut);
                }
                worker
                    .queue
                    .try_send(delivery.clone())
                    .map_err(|err| match err {
                        TrySendError::Full(_) => DeliveryError::Full,
                        TrySendError::Disconnected(_) => DeliveryError::Disconnected,
                    })
            }
        }
    }

    fn is_dead(&self) -> bool {
        match self {
            Self::Inline(_) => false,
            Self::Worker(worker) => worker.health.failed.load(Ordering::Acquire),
        }
    }
}

struct Registration {
    id: SubscriptionId,
    outlet: Outlet,
}

#[derive(Default)]
struct Registry {
    subscribers: Vec<Registration>,
    next_id: u64,
    latest: Option<Snapshot>,
}

/// Thread-safe subscriber registry with best-effort fan-out
pub struct BroadcastHub {
    registry: Mutex<Registry>,
    queue_depth: usize,
    delivery_timeout: Duration,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SUBSCRIBER_QUEUE, DEFAULT_DELIVERY_TIMEOUT)
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub with a custom worker queue depth and per-delivery budget.
    ///
    /// A zero depth is raised to one.
    pub fn with_limits(queue_depth: usize, delivery_timeout: Duration) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            queue_depth: queue_depth.max(1),
            delivery_timeout,
        }
    }

    /// Register a sink.
    ///
    /// If a state snapshot was published before, the sink receives it first
    /// so late joiners never miss the current state. A sink that fails this
    /// first delivery is not kept.
    pub fn subscribe<S: Sink + 'static>(&self, sink: S) -> SubscriptionId {
        let mut registry = self.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;

        let mut outlet = if sink.never_blocks() {
            Outlet::Inline(Box::new(sink))
        } else {
            match self.spawn_worker(id, Box::new(sink)) {
                Ok(worker) => Outlet::Worker(worker),
                Err(err) => {
                    warn!("subscriber {} has no worker: {}", id.0, err);
                    return id;
                }
            }
        };

        if let Some(latest) = registry.latest {
            if let Some(delivery) = prepare(latest.to_event()) {
                if let Err(err) = outlet.offer(&delivery, self.delivery_timeout) {
                    warn!("subscriber {} failed initial delivery: {}", id.0, err);
                    return id;
                }
            }
        }

        registry.subscribers.push(Registration { id, outlet });
        debug!(
            "subscriber {} registered ({} active)",
            id.0,
            registry.subscribers.len()
        );
        id
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let before = registry.subscribers.len();
        registry.subscribers.retain(|registration| registration.id != id);
        let removed = registry.subscribers.len() != before;
        if removed {
            debug!("subscriber {} unregistered", id.0);
        }
        removed
    }

    /// Publish a state snapshot as a `led_status` event.
    ///
    /// Snapshots that are not newer than the last published one are
    /// dropped. Returns `true` if the snapshot was fanned out.
    pub fn publish_state(&self, snapshot: Snapshot) -> bool {
        let mut registry = self.lock();
        if let Some(latest) = registry.latest {
            if latest.revision >= snapshot.revision {
                return false;
            }
        }
        registry.latest = Some(snapshot);
        self.fan_out(&mut registry, snapshot.to_event());
        true
    }

    /// Publish a discrete event to every subscriber.
    pub fn publish_event(&self, event: &Event) {
        let mut registry = self.lock();
        self.fan_out(&mut registry, event.clone());
    }

    /// The last snapshot that was fanned out
    pub fn latest(&self) -> Option<Snapshot> {
        self.lock().latest
    }

    /// Number of live subscribers. Workers that already failed are pruned.
    pub fn subscriber_count(&self) -> usize {
        let mut registry = self.lock();
        registry.subscribers.retain(|registration| {
            let dead = registration.outlet.is_dead();
            if dead {
                warn!("dropping subscriber {}: worker failed", registration.id.0);
            }
            !dead
        });
        registry.subscribers.len()
    }

    fn fan_out(&self, registry: &mut Registry, event: Event) {
        let Some(delivery) = prepare(event) else {
            return;
        };
        registry.subscribers.retain_mut(|registration| {
            match registration.outlet.offer(&delivery, self.delivery_timeout) {
                Ok(()) => true,
                Err(err) => {
                    warn!("dropping subscriber {}: {}", registration.id.0, err);
                    false
                }
            }
        });
    }

    fn spawn_worker(&self, id: SubscriptionId, sink: Box<dyn Sink>) -> std::io::Result<Worker> {
        let (queue, deliveries) = bounded(self.queue_depth);
        let health = Arc::new(WorkerHealth {
            busy_since: AtomicU64::new(IDLE),
            failed: AtomicBool::new(false),
            retired: AtomicBool::new(false),
        });
        let worker_health = Arc::clone(&health);
        thread::Builder::new()
            .name(format!("hub-sink-{}", id.0))
            .spawn(move || drive(id, sink, &deliveries, &worker_health))?;
        Ok(Worker { queue, health })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Worker loop: hand queued deliveries to the sink until the hub lets go.
fn drive(
    id: SubscriptionId,
    mut sink: Box<dyn Sink>,
    deliveries: &Receiver<Delivery>,
    health: &WorkerHealth,
) {
    for (event, payload) in deliveries {
        if health.retired.load(Ordering::Acquire) {
            break;
        }
        health
            .busy_since
            .store(Instant::now().as_ticks(), Ordering::Release);
        let result = sink.deliver(&event, &payload);
        health.busy_since.store(IDLE, Ordering::Release);
        if let Err(err) = result {
            debug!("subscriber {} worker stopping: {}", id.0, err);
            health.failed.store(true, Ordering::Release);
            break;
        }
    }
}

fn prepare(event: Event) -> Option<Delivery> {
    match event.to_json() {
        Ok(payload) => Some((event, Arc::from(payload))),
        Err(err) => {
            warn!("failed to serialize {:?}: {}", event, err);
            None
        }
    }
}
