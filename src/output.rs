//! Output channels and the hardware boundary.
//!
//! Each channel is one independently dimmable output. The engine never talks
//! to hardware directly; it hands clamped duty cycles to a [`DutyCycleDriver`]
//! per channel.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Number of output channels driven by the engine.
pub const CHANNEL_COUNT: usize = 3;

const CHANNEL_NAME_RED: &str = "red";
const CHANNEL_NAME_GREEN: &str = "green";
const CHANNEL_NAME_BLUE: &str = "blue";

/// Identifier of an output channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChannelId {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl ChannelId {
    /// All channels in index order.
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [Self::Red, Self::Green, Self::Blue];

    /// Map a raw channel index, as it arrives on the wire, to a channel.
    pub fn from_index(index: i64) -> Result<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|slot| Self::ALL.get(slot))
            .copied()
            .ok_or(EngineError::ChannelOutOfRange(index))
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => CHANNEL_NAME_RED,
            Self::Green => CHANNEL_NAME_GREEN,
            Self::Blue => CHANNEL_NAME_BLUE,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            CHANNEL_NAME_RED => Some(Self::Red),
            CHANNEL_NAME_GREEN => Some(Self::Green),
            CHANNEL_NAME_BLUE => Some(Self::Blue),
            _ => None,
        }
    }
}

/// Abstract PWM driver for a single channel
///
/// Implement this trait to support different hardware platforms.
/// `set_duty_cycle` is called synchronously from the tick loop, so it must
/// return within one tick period and never block indefinitely.
pub trait DutyCycleDriver: Send {
    /// Apply a duty cycle in `[0, 1]`
    fn set_duty_cycle(&mut self, level: f32);
}

/// Driver that discards every write
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDriver;

impl DutyCycleDriver for NoopDriver {
    fn set_duty_cycle(&mut self, _level: f32) {}
}

impl<F: FnMut(f32) + Send> DutyCycleDriver for F {
    fn set_duty_cycle(&mut self, level: f32) {
        self(level);
    }
}

/// One driver per channel, each behind its own lock.
pub(crate) struct OutputBank {
    drivers: [Mutex<Box<dyn DutyCycleDriver>>; CHANNEL_COUNT],
}

impl OutputBank {
    pub(crate) fn new(drivers: [Box<dyn DutyCycleDriver>; CHANNEL_COUNT]) -> Self {
        Self {
            drivers: drivers.map(Mutex::new),
        }
    }

    pub(crate) fn write(&self, channel: ChannelId, level: f32) {
        let mut driver = self.drivers[channel.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        driver.set_duty_cycle(level);
    }
}
