//! The seven reference effects

use embassy_time::Duration;

use crate::action::Action;
use crate::output::ChannelId;
use crate::waveform::WaveformSpec;

const SLOW_HZ: f32 = 0.5;
const MEDIUM_HZ: f32 = 1.0;
const FAST_HZ: f32 = 2.0;

const FOCUS_LEVEL: f32 = 0.7;

/// Delay between channel starts in the relax effect
const RELAX_STAGGER_SECS: u64 = 1;

pub(super) fn drowsy() -> Action {
    Action::Sequential(vec![
        Action::wave(ChannelId::Red, Duration::from_secs(5), WaveformSpec::sine(SLOW_HZ)),
        Action::ramp(ChannelId::Red, Duration::from_secs(3), 1.0, 0.0),
    ])
}

pub(super) fn lively() -> Action {
    Action::Sequential(vec![Action::Parallel(vec![
        Action::set_level(ChannelId::Green, 1.0),
        Action::wave(ChannelId::Blue, Duration::from_secs(10), WaveformSpec::sine(FAST_HZ)),
    ])])
}

pub(super) fn focus() -> Action {
    Action::Sequential(vec![Action::Parallel(vec![
        Action::set_level(ChannelId::Red, FOCUS_LEVEL),
        Action::set_level(ChannelId::Green, FOCUS_LEVEL),
    ])])
}

pub(super) fn relax() -> Action {
    let breathe = Action::on_all_channels(|channel| {
        let delay = u64::from(channel as u8) * RELAX_STAGGER_SECS;
        Action::Sequential(vec![
            Action::wait(Duration::from_secs(delay)),
            Action::wave(channel, Duration::from_secs(8), WaveformSpec::sine(SLOW_HZ)),
        ])
    });
    let fade =
        Action::on_all_channels(|channel| Action::ramp(channel, Duration::from_secs(3), 1.0, 0.0));
    Action::Sequential(vec![breathe, fade])
}

pub(super) fn uplift() -> Action {
    Action::Sequential(vec![
        Action::wave(ChannelId::Blue, Duration::from_secs(5), WaveformSpec::sine(MEDIUM_HZ)),
        Action::ramp(ChannelId::Blue, Duration::from_secs(3), 0.0, 1.0),
    ])
}

pub(super) fn all_off() -> Action {
    Action::Sequential(vec![Action::set_all(0.0)])
}

pub(super) fn all_on() -> Action {
    Action::Sequential(vec![Action::set_all(1.0)])
}
