//! Waveform generators
//!
//! Pure functions mapping elapsed time to a brightness in `[0, 1]`.
//! Nothing here holds state, so every function is safe to call from any
//! tick loop without synchronization.

use core::f32::consts::PI;

use embassy_time::Duration;

/// Quantized levels of the pulse waveform, from low to high.
pub const PULSE_LEVELS: [f32; 3] = [0.4, 0.6, 0.8];

/// Thresholds on the underlying sine that select a pulse level
const PULSE_HIGH_THRESHOLD: f32 = 0.5;
const PULSE_LOW_THRESHOLD: f32 = -0.5;

/// Secondary sine layered over the pulse to soften the steps
const PULSE_RIPPLE_RATIO: f32 = 4.0;
const PULSE_RIPPLE_AMPLITUDE: f32 = 0.1;

/// Shape of a waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveformKind {
    /// Plain sine around `offset`
    Sine,
    /// Three-level quantized sine with a small high-frequency ripple
    Pulse,
    /// Sine plus a weighted secondary sine at `ratio * frequency`, shifted
    /// by `phase` radians
    Layered { ratio: f32, weight: f32, phase: f32 },
}

/// Parameters of a waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSpec {
    pub kind: WaveformKind,
    /// Cycles per second
    pub frequency: f32,
    pub amplitude: f32,
    pub offset: f32,
    pub clamp_min: f32,
    pub clamp_max: f32,
}

impl WaveformSpec {
    /// Full `0..1` sine sweep at the given frequency
    pub const fn sine(frequency: f32) -> Self {
        Self {
            kind: WaveformKind::Sine,
            frequency,
            amplitude: 0.5,
            offset: 0.5,
            clamp_min: 0.0,
            clamp_max: 1.0,
        }
    }

    /// Focus pulse at the given frequency
    pub const fn pulse(frequency: f32) -> Self {
        Self {
            kind: WaveformKind::Pulse,
            ..Self::sine(frequency)
        }
    }

    /// Two layered sines at the given base frequency
    pub const fn layered(frequency: f32, ratio: f32, weight: f32) -> Self {
        Self {
            kind: WaveformKind::Layered {
                ratio,
                weight,
                phase: 0.0,
            },
            ..Self::sine(frequency)
        }
    }

    /// Shift the secondary layer; `FRAC_PI_2` turns it into a cosine.
    /// No effect on other kinds.
    #[must_use]
    pub const fn with_accent_phase(mut self, phase: f32) -> Self {
        if let WaveformKind::Layered { ratio, weight, .. } = self.kind {
            self.kind = WaveformKind::Layered {
                ratio,
                weight,
                phase,
            };
        }
        self
    }

    /// Set the swing around the offset
    #[must_use]
    pub const fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Set the resting level
    #[must_use]
    pub const fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Limit the output range
    #[must_use]
    pub const fn with_clamp(mut self, min: f32, max: f32) -> Self {
        self.clamp_min = min;
        self.clamp_max = max;
        self
    }
}

impl Default for WaveformSpec {
    fn default() -> Self {
        Self::sine(1.0)
    }
}

/// Brightness of a waveform after `elapsed` time
pub fn brightness(elapsed: Duration, spec: &WaveformSpec) -> f32 {
    sample(seconds(elapsed), spec)
}

/// Brightness of a waveform at `t` seconds
pub fn sample(t: f32, spec: &WaveformSpec) -> f32 {
    let raw = match spec.kind {
        WaveformKind::Sine => sine(t, spec),
        WaveformKind::Pulse => pulse(t, spec),
        WaveformKind::Layered {
            ratio,
            weight,
            phase,
        } => layered(t, spec, ratio, weight, phase),
    };
    clamp_to(unit(raw), spec.clamp_min, spec.clamp_max)
}

/// `offset + amplitude * sin(2π f t)`
pub fn sine(t: f32, spec: &WaveformSpec) -> f32 {
    spec.offset + spec.amplitude * phase_sin(t, spec.frequency)
}

/// Three-level pulse with a ripple on top
pub fn pulse(t: f32, spec: &WaveformSpec) -> f32 {
    let base = phase_sin(t, spec.frequency);
    let level = if base > PULSE_HIGH_THRESHOLD {
        PULSE_LEVELS[2]
    } else if base > PULSE_LOW_THRESHOLD {
        PULSE_LEVELS[1]
    } else {
        PULSE_LEVELS[0]
    };
    let ripple = PULSE_RIPPLE_AMPLITUDE * phase_sin(t, spec.frequency * PULSE_RIPPLE_RATIO);
    level + ripple
}

fn layered(t: f32, spec: &WaveformSpec, ratio: f32, weight: f32, phase: f32) -> f32 {
    let primary = phase_sin(t, spec.frequency);
    let secondary = weight * libm::sinf(2.0 * PI * spec.frequency * ratio * t + phase);
    spec.offset + spec.amplitude * (primary + secondary)
}

/// Level of step `step` out of `steps` on a linear ramp
///
/// Step 0 is exactly `from` and step `steps` is exactly `to`.
#[allow(clippy::cast_precision_loss)]
pub fn ramp_level(from: f32, to: f32, step: u32, steps: u32) -> f32 {
    if steps == 0 || step >= steps {
        return unit(to);
    }
    let progress = step as f32 / steps as f32;
    unit(from + (to - from) * progress)
}

/// Clamp into `[0, 1]`, mapping NaN to 0
pub fn unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Clamp into `[min, max]` without panicking on inverted or NaN bounds
fn clamp_to(value: f32, min: f32, max: f32) -> f32 {
    let min = unit(min);
    let max = if max.is_nan() { 1.0 } else { unit(max) };
    value.max(min).min(max)
}

fn phase_sin(t: f32, frequency: f32) -> f32 {
    libm::sinf(2.0 * PI * frequency * t)
}

#[allow(clippy::cast_precision_loss)]
fn seconds(elapsed: Duration) -> f32 {
    elapsed.as_micros() as f32 / 1_000_000.0
}
