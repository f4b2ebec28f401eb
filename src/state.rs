//! Authoritative channel state
//!
//! One lock guards the whole brightness array and its revision counter.
//! Multi-channel ticks apply channel by channel, so a snapshot may observe
//! a tick half-way across channels; each individual `apply` is atomic.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::event::Event;
use crate::output::{CHANNEL_COUNT, ChannelId};
use crate::waveform::unit;

#[derive(Debug, Clone, Copy, Default)]
struct Levels {
    brightness: [f32; CHANNEL_COUNT],
    revision: u64,
}

/// Immutable copy of every channel's brightness at some revision
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub brightness: [f32; CHANNEL_COUNT],
    pub revision: u64,
}

impl Snapshot {
    /// Brightness of one channel in `[0, 1]`
    pub fn level(&self, channel: ChannelId) -> f32 {
        self.brightness[channel.index()]
    }

    /// Brightness of one channel on the 0..100 wire scale
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self, channel: ChannelId) -> u8 {
        (self.level(channel) * 100.0).round() as u8
    }

    /// `led_status` event for this snapshot
    pub fn to_event(&self) -> Event {
        Event::LedStatus {
            red: self.percent(ChannelId::Red),
            green: self.percent(ChannelId::Green),
            blue: self.percent(ChannelId::Blue),
        }
    }
}

/// Thread-safe store of channel brightness
pub struct StateStore {
    inner: Mutex<RefCell<Levels>>,
}

impl StateStore {
    /// Create a store with every channel off at revision 0.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Levels {
                brightness: [0.0; CHANNEL_COUNT],
                revision: 0,
            })),
        }
    }

    /// Store a clamped brightness and return the new revision.
    pub fn apply(&self, channel: ChannelId, brightness: f32) -> u64 {
        let brightness = unit(brightness);
        critical_section::with(|cs| {
            let mut levels = self.inner.borrow(cs).borrow_mut();
            levels.brightness[channel.index()] = brightness;
            levels.revision += 1;
            levels.revision
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        critical_section::with(|cs| {
            let levels = self.inner.borrow(cs).borrow();
            Snapshot {
                brightness: levels.brightness,
                revision: levels.revision,
            }
        })
    }

    pub fn level(&self, channel: ChannelId) -> f32 {
        self.snapshot().level(channel)
    }

    pub fn revision(&self) -> u64 {
        self.snapshot().revision
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
