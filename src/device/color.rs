//! HSBK color handling
//!
//! Devices speak four unsigned 16-bit channels; applications prefer
//! degrees and percentages. Conversion rounds half-away-from-zero on both
//! sides to match the wire's integer quantization.

use crate::protocol::packets::Hsbk;
use std::fmt;

/// A HSBK color in external form: hue in degrees [0, 360], saturation and
/// brightness in percent [0, 100], kelvin as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
    pub kelvin: u16,
}

impl Color {
    /// Parses a wire HSBK into a Color, converting device values into
    /// human readable ones.
    pub fn from_device(hsbk: Hsbk) -> Color {
        Color {
            hue: device_to_external(hsbk.hue, 360.0),
            saturation: device_to_external(hsbk.saturation, 100.0),
            brightness: device_to_external(hsbk.brightness, 100.0),
            kelvin: hsbk.kelvin,
        }
    }

    /// Converts the Color to its wire HSBK form.
    pub fn to_device(self) -> Hsbk {
        Hsbk {
            hue: external_to_device(self.hue, 360.0),
            saturation: external_to_device(self.saturation, 100.0),
            brightness: external_to_device(self.brightness, 100.0),
            kelvin: self.kelvin,
        }
    }

    /// Converts the color from Hue, Saturation, Brightness to Red, Green,
    /// Blue. Hue is expected in degrees [0,360), saturation and brightness
    /// as percentages [0,100]. Components are returned in [0,255].
    pub fn hsb_to_rgb(&self) -> (u8, u8, u8) {
        let h = self.hue;
        let s = self.saturation / 100.0;
        let b = self.brightness / 100.0;

        if s == 0.0 {
            let v = (b * 255.0) as u8;
            return (v, v, v);
        }

        let h = h.rem_euclid(360.0);
        let hi = (h / 60.0).floor();
        let f = h / 60.0 - hi;
        let p = b * (1.0 - s);
        let q = b * (1.0 - f * s);
        let t = b * (1.0 - (1.0 - f) * s);

        let (r, g, bl) = match hi as i32 {
            0 => (b, t, p),
            1 => (q, b, p),
            2 => (p, b, t),
            3 => (p, q, b),
            4 => (t, p, b),
            5 => (b, p, q),
            _ => (0.0, 0.0, 0.0),
        };
        ((r * 255.0) as u8, (g * 255.0) as u8, (bl * 255.0) as u8)
    }

    /// Converts the color temperature in Kelvin to an RGB approximation.
    /// Accuracy is best between 1000K and 40000K.
    pub fn kelvin_to_rgb(&self) -> (u8, u8, u8) {
        let temp = (f64::from(self.kelvin) / 100.0).round();

        let r = if temp <= 66.0 {
            255
        } else {
            let r = 329.698727446 * (temp - 60.0).powf(-0.1332047592);
            (r as i64).clamp(0, 255)
        };

        let g = if temp <= 66.0 {
            let g = 99.4708025861 * temp.ln() - 161.1195681661;
            (g as i64).clamp(0, 255)
        } else {
            let g = 288.1221695283 * (temp - 60.0).powf(-0.0755148492);
            (g as i64).clamp(0, 255)
        };

        let b = if temp >= 66.0 {
            255
        } else if temp <= 19.0 {
            0
        } else {
            let b = 138.5177312231 * (temp - 10.0).ln() - 305.0447927307;
            (b as i64).clamp(0, 255)
        };

        (r as u8, g as u8, b as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.saturation == 0.0 {
            write!(
                f,
                "Brightness: {:.0}% Kelvin: {}",
                self.brightness, self.kelvin
            )
        } else {
            write!(
                f,
                "Brightness: {:.0}%, Hue: {:.0}, Saturation: {:.0}%",
                self.brightness, self.hue, self.saturation
            )
        }
    }
}

/// Takes a device value in the range 0-65535 and converts it into the
/// range defined by the multiplier.
pub fn device_to_external(v: u16, multiplier: f64) -> f64 {
    (f64::from(v) / f64::from(u16::MAX) * multiplier).round()
}

/// Takes an external value and multiplier and converts it into a device
/// value 0-65535.
pub fn external_to_device(v: f64, multiplier: f64) -> u16 {
    (v * f64::from(u16::MAX) / multiplier).round() as u16
}
