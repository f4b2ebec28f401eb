//! Effect scheduler
//!
//! Runs one effect at a time. Every run gets its own thread; `Parallel`
//! nodes fan out into scoped threads that share the run's single
//! cancellation flag and are joined before the node completes. Starting a
//! new run flags the live one, waits up to the grace period for its thread
//! to exit, and only then spawns the replacement.
//!
//! ## Timeline of a superseding start
//!
//! ```text
//! caller            live slot (locked)          old run thread
//!   │ start(4)            │                           │
//!   │────────────────────>│ cancel flag = true        │
//!   │                     │──────────────────────────>│ sees flag at next tick
//!   │                     │   wait ≤ grace period     │ joins parallel children
//!   │                     │<──────────────────────────│ exits
//!   │                     │ spawn new run, install    │
//!   │<────────────────────│                           │
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::action::Action;
use crate::config::EngineConfig;
use crate::effect::EffectCatalog;
use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::output::{CHANNEL_COUNT, ChannelId, DutyCycleDriver, OutputBank};
use crate::pacer::{TickPacer, to_std};
use crate::state::StateStore;
use crate::waveform::{self, WaveformSpec, unit};

/// Identifier of one run, unique per scheduler
pub type RunId = u64;

/// Lifecycle of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RunState {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl RunState {
    const fn from_raw(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Failed,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// What a run was started for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunKind {
    /// A catalog effect
    Effect(u8),
    /// All channels off
    Stop,
    /// Manual level on one channel
    Manual(ChannelId),
}

struct RunShared {
    id: RunId,
    kind: RunKind,
    cancel: AtomicBool,
    state: AtomicU8,
}

impl RunShared {
    fn set_state(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Live-run identity and cancellation token.
///
/// Clones observe the same run. The handle never blocks unless asked to
/// wait.
#[derive(Clone)]
pub struct RunHandle {
    shared: Arc<RunShared>,
    /// Disconnects when the run thread exits
    exited: Receiver<()>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.shared.id
    }

    pub fn kind(&self) -> RunKind {
        self.shared.kind
    }

    pub fn state(&self) -> RunState {
        RunState::from_raw(self.shared.state.load(Ordering::Acquire))
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Block until the run reaches a terminal state.
    pub fn wait(&self) -> RunState {
        let _ = self.exited.recv();
        self.state()
    }

    /// Block up to `timeout`; `None` if the run is still going.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RunState> {
        match self.exited.recv_timeout(to_std(timeout)) {
            Err(RecvTimeoutError::Timeout) => None,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Some(self.state()),
        }
    }

    fn request_cancel(&self) {
        self.shared.cancel.store(true, Ordering::Release);
    }
}

impl core::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .finish()
    }
}

/// Everything a tick writes to
struct Stage {
    store: Arc<StateStore>,
    hub: Arc<BroadcastHub>,
    outputs: OutputBank,
}

impl Stage {
    /// Store, drive and broadcast one channel update
    fn write(&self, channel: ChannelId, level: f32) {
        let level = unit(level);
        self.store.apply(channel, level);
        self.outputs.write(channel, level);
        self.hub.publish_state(self.store.snapshot());
    }
}

/// How an action ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Flow {
    Done,
    Cancelled,
    Failed,
}

/// One in-flight execution of an action tree
struct Run {
    shared: Arc<RunShared>,
    stage: Arc<Stage>,
    config: EngineConfig,
}

impl Run {
    fn execute(&self, root: &Action) {
        self.shared.set_state(RunState::Running);
        let flow = panic::catch_unwind(AssertUnwindSafe(|| self.perform(root)))
            .unwrap_or(Flow::Failed);
        let state = match flow {
            Flow::Done => RunState::Completed,
            Flow::Cancelled => RunState::Cancelled,
            Flow::Failed => RunState::Failed,
        };
        self.shared.set_state(state);
        match state {
            RunState::Failed => warn!("run {} failed", self.shared.id),
            _ => info!("run {} finished: {:?}", self.shared.id, state),
        }
    }

    fn cancelled(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }

    fn perform(&self, action: &Action) -> Flow {
        if self.cancelled() {
            return Flow::Cancelled;
        }
        match action {
            Action::Wave {
                channel,
                duration,
                spec,
            } => self.wave(*channel, *duration, spec),
            Action::Ramp {
                channel,
                duration,
                from,
                to,
            } => self.ramp(*channel, *duration, *from, *to),
            Action::SetLevel { channel, level } => {
                self.stage.write(*channel, *level);
                Flow::Done
            }
            Action::Wait { duration } => self.hold(*duration),
            Action::Sequential(children) => self.sequential(children),
            Action::Parallel(children) => self.parallel(children),
        }
    }

    fn sequential(&self, children: &[Action]) -> Flow {
        for child in children {
            let flow = self.perform(child);
            if flow != Flow::Done {
                return flow;
            }
        }
        Flow::Done
    }

    /// Barrier join over all children; the worst outcome wins.
    fn parallel(&self, children: &[Action]) -> Flow {
        match children {
            [] => Flow::Done,
            [only] => self.perform(only),
            _ => thread::scope(|scope| {
                // children carry the run's thread name so writes stay attributable
                let workers: Vec<_> = children
                    .iter()
                    .map(|child| {
                        thread::Builder::new()
                            .name(format!("effect-run-{}", self.shared.id))
                            .spawn_scoped(scope, move || self.perform(child))
                    })
                    .collect();
                workers
                    .into_iter()
                    .map(|worker| match worker {
                        Ok(worker) => worker.join().unwrap_or(Flow::Failed),
                        Err(err) => {
                            warn!("run {} could not spawn a branch: {}", self.shared.id, err);
                            Flow::Failed
                        }
                    })
                    .max()
                    .unwrap_or(Flow::Done)
            }),
        }
    }

    fn wave(&self, channel: ChannelId, duration: Duration, spec: &WaveformSpec) -> Flow {
        let start = Instant::now();
        let mut pacer = TickPacer::new(self.config.tick_period, start);
        loop {
            if self.cancelled() {
                return Flow::Cancelled;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return Flow::Done;
            }
            self.stage.write(channel, waveform::brightness(elapsed, spec));
            let tick = pacer.tick(Instant::now());
            thread::sleep(to_std(tick.sleep_duration));
        }
    }

    /// Fixed number of steps, so the update rate is bounded by the step count.
    /// Cancellation is still observed every tick.
    fn ramp(&self, channel: ChannelId, duration: Duration, from: f32, to: f32) -> Flow {
        let steps = self.config.ramp_steps.max(1);
        let mut pacer = TickPacer::new(duration / steps, Instant::now());
        for step in 0..=steps {
            if self.cancelled() {
                return Flow::Cancelled;
            }
            self.stage
                .write(channel, waveform::ramp_level(from, to, step, steps));
            if step < steps {
                let tick = pacer.tick(Instant::now());
                if !self.nap(tick.sleep_duration) {
                    return Flow::Cancelled;
                }
            }
        }
        Flow::Done
    }

    fn hold(&self, duration: Duration) -> Flow {
        if self.nap(duration) {
            Flow::Done
        } else {
            Flow::Cancelled
        }
    }

    /// Sleep in slices of at most one tick. Returns `false` once cancelled.
    fn nap(&self, span: Duration) -> bool {
        let until = Instant::now() + span;
        loop {
            if self.cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            thread::sleep(to_std((until - now).min(self.config.tick_period)));
        }
    }
}

/// Single-live-run effect scheduler
pub struct Scheduler {
    catalog: EffectCatalog,
    stage: Arc<Stage>,
    config: EngineConfig,
    live: Mutex<Option<RunHandle>>,
    next_run_id: AtomicU64,
    all_off: Arc<Action>,
}

impl Scheduler {
    pub fn new(
        catalog: EffectCatalog,
        store: Arc<StateStore>,
        hub: Arc<BroadcastHub>,
        drivers: [Box<dyn DutyCycleDriver>; CHANNEL_COUNT],
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            stage: Arc::new(Stage {
                store,
                hub,
                outputs: OutputBank::new(drivers),
            }),
            config,
            live: Mutex::new(None),
            next_run_id: AtomicU64::new(1),
            all_off: Arc::new(Action::set_all(0.0)),
        }
    }

    /// Start a catalog effect, superseding the live run.
    ///
    /// Unknown identifiers are rejected before anything else happens, so the
    /// live run and the channel state are left untouched. Returns as soon as
    /// the new run is spawned.
    pub fn start(&self, effect: u8) -> Result<RunHandle> {
        let root = self.catalog.build(effect)?;
        self.launch(RunKind::Effect(effect), root)
    }

    /// Start a catalog effect by name
    pub fn start_named(&self, name: &str) -> Result<RunHandle> {
        let effect = self.catalog.resolve(name)?;
        self.start(effect)
    }

    /// Cancel the live run and switch every channel off once it has exited.
    pub fn stop(&self) -> Result<RunHandle> {
        self.launch(RunKind::Stop, Arc::clone(&self.all_off))
    }

    /// Supersede the live run with a manual level on one channel.
    pub fn set_channel(&self, channel: ChannelId, level: f32) -> Result<RunHandle> {
        let root = Arc::new(Action::set_level(channel, level));
        self.launch(RunKind::Manual(channel), root)
    }

    /// Handle of the most recently started run, finished or not
    pub fn live(&self) -> Option<RunHandle> {
        self.lock_live().clone()
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn launch(&self, kind: RunKind, root: Arc<Action>) -> Result<RunHandle> {
        // Holding the slot for the whole exchange serializes concurrent starts.
        let mut live = self.lock_live();
        if let Some(previous) = live.take() {
            self.retire(&previous);
        }

        let id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(RunShared {
            id,
            kind,
            cancel: AtomicBool::new(false),
            state: AtomicU8::new(RunState::Pending as u8),
        });
        let (exit_tx, exit_rx) = bounded::<()>(0);
        let handle = RunHandle {
            shared: Arc::clone(&shared),
            exited: exit_rx,
        };
        let run = Run {
            shared,
            stage: Arc::clone(&self.stage),
            config: self.config,
        };

        thread::Builder::new()
            .name(format!("effect-run-{id}"))
            .spawn(move || {
                let _exit = exit_tx;
                run.execute(&root);
            })?;

        info!("run {} started: {:?}", id, kind);
        *live = Some(handle.clone());
        Ok(handle)
    }

    /// Flag a run and wait, bounded by the grace period, for it to exit
    fn retire(&self, previous: &RunHandle) {
        if previous.is_finished() {
            return;
        }
        previous.request_cancel();
        debug!("cancelling run {}", previous.id());
        match previous.wait_timeout(self.config.grace_period) {
            Some(state) => debug!("run {} exited as {:?}", previous.id(), state),
            None => warn!(
                "run {} still running after {} ms grace period, starting anyway",
                previous.id(),
                self.config.grace_period.as_millis()
            ),
        }
    }

    fn lock_live(&self) -> std::sync::MutexGuard<'_, Option<RunHandle>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(live) = self.lock_live().as_ref() {
            live.request_cancel();
        }
    }
}
