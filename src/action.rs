//! Effect building blocks
//!
//! An effect is a tree of actions: leaves drive a single channel, and
//! `Sequential`/`Parallel` nodes compose them. Actions are immutable once
//! built and are shared between runs.

use embassy_time::Duration;

use crate::output::ChannelId;
use crate::waveform::WaveformSpec;

/// A unit of effect behavior
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Drive a channel with a waveform for `duration`
    Wave {
        channel: ChannelId,
        duration: Duration,
        spec: WaveformSpec,
    },
    /// Linearly move a channel from `from` to `to` over `duration`
    Ramp {
        channel: ChannelId,
        duration: Duration,
        from: f32,
        to: f32,
    },
    /// Set a channel immediately
    SetLevel { channel: ChannelId, level: f32 },
    /// Hold without touching any channel
    Wait { duration: Duration },
    /// Run children one after another
    Sequential(Vec<Action>),
    /// Run children concurrently and wait for all of them
    Parallel(Vec<Action>),
}

impl Action {
    pub const fn wave(channel: ChannelId, duration: Duration, spec: WaveformSpec) -> Self {
        Self::Wave {
            channel,
            duration,
            spec,
        }
    }

    pub const fn ramp(channel: ChannelId, duration: Duration, from: f32, to: f32) -> Self {
        Self::Ramp {
            channel,
            duration,
            from,
            to,
        }
    }

    pub const fn set_level(channel: ChannelId, level: f32) -> Self {
        Self::SetLevel { channel, level }
    }

    pub const fn wait(duration: Duration) -> Self {
        Self::Wait { duration }
    }

    /// Set every channel to the same level at once
    pub fn set_all(level: f32) -> Self {
        Self::Parallel(
            ChannelId::ALL
                .iter()
                .map(|&channel| Self::set_level(channel, level))
                .collect(),
        )
    }

    /// Build one action per channel and run them concurrently
    pub fn on_all_channels(build: impl Fn(ChannelId) -> Action) -> Self {
        Self::Parallel(ChannelId::ALL.iter().map(|&channel| build(channel)).collect())
    }

    /// Nominal running time, ignoring tick granularity
    pub fn duration(&self) -> Duration {
        let zero = Duration::from_ticks(0);
        match self {
            Self::Wave { duration, .. } | Self::Ramp { duration, .. } | Self::Wait { duration } => {
                *duration
            }
            Self::SetLevel { .. } => zero,
            Self::Sequential(children) => children
                .iter()
                .fold(zero, |total, child| total + child.duration()),
            Self::Parallel(children) => children
                .iter()
                .map(Action::duration)
                .max()
                .unwrap_or(zero),
        }
    }

    /// Channels this action writes to, without duplicates
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels = Vec::new();
        self.collect_channels(&mut channels);
        channels.sort_unstable();
        channels.dedup();
        channels
    }

    fn collect_channels(&self, out: &mut Vec<ChannelId>) {
        match self {
            Self::Wave { channel, .. }
            | Self::Ramp { channel, .. }
            | Self::SetLevel { channel, .. } => out.push(*channel),
            Self::Wait { .. } => {}
            Self::Sequential(children) | Self::Parallel(children) => {
                for child in children {
                    child.collect_channels(out);
                }
            }
        }
    }
}
