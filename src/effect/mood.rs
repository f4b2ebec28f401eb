//! Mood patterns
//!
//! Long-running ambient waveforms played on every channel at once. The
//! frequencies come from the time scaling of the single-LED mood
//! controller: its phase counters advanced at a fixed rate per loop, which
//! works out to the cycles-per-second values below.

use core::f32::consts::FRAC_PI_2;

use embassy_time::Duration;

use crate::action::Action;
use crate::waveform::WaveformSpec;

const MOOD_DURATION: Duration = Duration::from_secs(60);

/// One cycle every ~6.3 s, swinging between 10% and 90%
const CALM: WaveformSpec = WaveformSpec::sine(0.159)
    .with_offset(0.5)
    .with_amplitude(0.4);

/// Fast base with a 7:3 cosine accent layer
const EXCITED: WaveformSpec = WaveformSpec::layered(2.39, 7.0 / 3.0, 0.3)
    .with_accent_phase(FRAC_PI_2)
    .with_offset(0.6)
    .with_amplitude(0.35);

/// Slow drift kept under half brightness
const MELANCHOLY: WaveformSpec = WaveformSpec::layered(0.06, 5.67, 0.2)
    .with_offset(0.2)
    .with_amplitude(0.25)
    .with_clamp(0.05, 0.5);

const CONCENTRATE: WaveformSpec = WaveformSpec::pulse(1.06);

fn everywhere(spec: WaveformSpec) -> Action {
    Action::Sequential(vec![Action::on_all_channels(|channel| {
        Action::wave(channel, MOOD_DURATION, spec)
    })])
}

pub(super) fn calm() -> Action {
    everywhere(CALM)
}

pub(super) fn excited() -> Action {
    everywhere(EXCITED)
}

pub(super) fn melancholy() -> Action {
    everywhere(MELANCHOLY)
}

pub(super) fn concentrate() -> Action {
    everywhere(CONCENTRATE)
}
