//! Stateless command-message builders
//!
//! Pure functions producing ready-to-send [`Message`]s. Target and
//! sequence are stamped later by the owning session.

mod matrix;
mod multizone;

pub use matrix::*;
pub use multizone::*;

use crate::device::color;
use crate::protocol::{
    packets::{Hsbk, LightSetWaveformOptional, Payload, SetPower, Waveform},
    Message,
};
use std::time::Duration;

const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Sets a device power to its maximum value of 65535.
pub fn set_power_on() -> Message {
    Message::new(Payload::SetPower(SetPower { level: u16::MAX }))
}

/// Sets a device power to 0.
pub fn set_power_off() -> Message {
    Message::new(Payload::SetPower(SetPower { level: 0 }))
}

/// Sets a device color with no required fields, which allows keeping
/// parts of the original HSBK color. Durations below one second are
/// clamped to one second.
pub fn set_color(
    h: Option<f64>,
    s: Option<f64>,
    b: Option<f64>,
    k: Option<u16>,
    duration: Duration,
    waveform: Waveform,
) -> Message {
    let duration = duration.max(DEFAULT_PERIOD);
    let mut p = LightSetWaveformOptional {
        waveform,
        cycles: 1.0,
        period: duration.as_millis() as u32,
        ..Default::default()
    };
    if let Some(h) = h {
        p.color.hue = color::external_to_device(h, 360.0);
        p.set_hue = true;
    }
    if let Some(s) = s {
        p.color.saturation = color::external_to_device(s, 100.0);
        p.set_saturation = true;
    }
    if let Some(b) = b {
        p.color.brightness = color::external_to_device(b, 100.0);
        p.set_brightness = true;
    }
    if let Some(k) = k {
        p.color.kelvin = k;
        p.set_kelvin = true;
    }
    Message::new(Payload::LightSetWaveformOptional(p))
}

pub(crate) fn duration_ms(d: Duration) -> u32 {
    d.as_millis() as u32
}

pub(crate) fn hsbk_array<const N: usize>(colors: &[Hsbk]) -> [Hsbk; N] {
    let mut out = [Hsbk::default(); N];
    let n = colors.len().min(N);
    out[..n].copy_from_slice(&colors[..n]);
    out
}
