//! Cached model of a LIFX device on the LAN
//!
//! A [`Device`] holds the immutable address/serial pair plus the mutable
//! state a session keeps in sync with the physical device. Only the
//! owning session's inbound processor writes mutable fields, always under
//! the session's lock.

pub mod color;

pub use color::Color;

use crate::protocol::packets::{
    Hsbk, MultiZoneExtendedStateMultiZone, TileState64, TileStateDeviceChain,
};
use crate::protocol::{packets::TileBufferRect, packets::TileGet64, Message, Payload};
use crate::registry;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// A LIFX device serial as set in the protocol header: the first 6 bytes
/// carry the serial number and the last 2 bytes are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Serial(pub [u8; 8]);

impl Serial {
    /// Parses a 12-character hex string into a Serial.
    pub fn from_hex(hex: &str) -> crate::Result<Serial> {
        if hex.len() != 12 {
            return Err(crate::Error::Config(format!(
                "expected 12 hex chars (6 bytes), got {}",
                hex.len()
            )));
        }
        let mut b = [0u8; 8];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk)
                .map_err(|_| crate::Error::Config("invalid hex".into()))?;
            b[i] = u8::from_str_radix(s, 16)
                .map_err(|e| crate::Error::Config(format!("decode error: {}", e)))?;
        }
        Ok(Serial(b))
    }

    /// Returns whether the serial is unset.
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 8]
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..6] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl From<[u8; 8]> for Serial {
    fn from(b: [u8; 8]) -> Self {
        Serial(b)
    }
}

/// The type of LIFX device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    Light,
    Switch,
    /// A device that acts both as a light and a switch.
    Hybrid,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceType::Light => "light",
            DeviceType::Switch => "switch",
            DeviceType::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// What interface a light implements and what capability it has access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    #[default]
    SingleZone,
    MultiZone,
    Matrix,
}

impl fmt::Display for LightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LightType::SingleZone => "single_zone",
            LightType::MultiZone => "multi_zone",
            LightType::Matrix => "matrix",
        };
        f.write_str(s)
    }
}

/// Wifi signal strength: either RSSI or SNR depending on firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WifiRssi(pub i16);

impl fmt::Display for WifiRssi {
    /// Describes the signal, handling both RSSI and SNR scales.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.0;
        let s = if w < 0 {
            if w >= -50 {
                "Excellent"
            } else if w >= -60 {
                "Good"
            } else if w >= -70 {
                "Fair"
            } else if w >= -80 {
                "Poor"
            } else {
                "Very Poor"
            }
        } else if (4..=24).contains(&w) {
            if w > 20 {
                "Excellent"
            } else if w > 16 {
                "Good"
            } else if w >= 12 {
                "Fair"
            } else if w >= 7 {
                "Poor"
            } else {
                "Very Poor"
            }
        } else {
            "No Signal"
        };
        f.write_str(s)
    }
}

/// Color capability of a light product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorProperties {
    pub has_color: bool,
    pub temperature_range: TemperatureRange,
}

/// Supported color temperature range in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemperatureRange {
    pub min: u16,
    pub max: u16,
}

/// Matrix topology and cached zone state for matrix lights.
///
/// `chain_zones` supports both legacy chain devices and modern devices
/// with more than 64 zones. Each outer entry corresponds to a device in
/// the chain and always holds exactly `n_zones` colors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixProperties {
    pub height: usize,
    pub width: usize,
    pub n_zones: usize,
    pub state_packets: usize,
    pub chain_length: usize,
    pub chain_zones: Vec<Vec<Hsbk>>,
}

/// Cached zone state for multizone lights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultizoneProperties {
    pub zones: Vec<Hsbk>,
}

/// The representation of a LIFX device on the LAN.
///
/// `address` and `serial` are immutable; everything else is periodically
/// refreshed by the owning session.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    // Immutable
    pub address: SocketAddr,
    pub serial: Serial,

    // Low frequency updated fields.
    pub label: String,
    pub registry_name: String,
    pub product_id: u32,
    pub firmware_version: String,
    pub device_type: DeviceType,
    pub light_type: LightType,
    pub location: String,
    pub group: String,
    pub wifi_rssi: WifiRssi,
    pub color_properties: ColorProperties,

    // Device specific properties.
    pub matrix_properties: MatrixProperties,
    pub multizone_properties: MultizoneProperties,

    // High frequency updated fields.
    pub color: Color,
    pub powered_on: bool,
    pub last_seen_at: Option<Instant>,
    pub last_updated_at: Option<Instant>,
}

impl Device {
    pub fn new(address: SocketAddr, serial: Serial) -> Device {
        Device {
            address,
            serial,
            label: String::new(),
            registry_name: String::new(),
            product_id: 0,
            firmware_version: String::new(),
            device_type: DeviceType::default(),
            light_type: LightType::default(),
            location: String::new(),
            group: String::new(),
            wifi_rssi: WifiRssi::default(),
            color_properties: ColorProperties::default(),
            matrix_properties: MatrixProperties::default(),
            multizone_properties: MultizoneProperties::default(),
            color: Color::default(),
            powered_on: false,
            last_seen_at: None,
            last_updated_at: None,
        }
    }

    /// Resolves the product id against the catalog and derives the device
    /// type, light type and color capabilities.
    pub fn set_product_info(&mut self, pid: u32) {
        self.product_id = pid;
        let Some(p) = registry::product_by_pid(pid) else {
            return;
        };
        self.registry_name = p.name.to_string();

        let is_light = p.features.color || p.features.temperature_range.is_some();
        if p.features.relays {
            self.device_type = DeviceType::Switch;
        } else if is_light && p.features.buttons {
            self.device_type = DeviceType::Hybrid;
        }

        if p.features.multizone {
            self.light_type = LightType::MultiZone;
        } else if p.features.matrix {
            self.light_type = LightType::Matrix;
        }

        if is_light {
            self.color_properties.has_color = p.features.color;
            if let Some(range) = p.features.temperature_range {
                self.color_properties.temperature_range = TemperatureRange {
                    min: range.min,
                    max: range.max,
                };
            }
        }
    }

    /// Sets the matrix size and chain length according to the first tile
    /// in the chain, resizing `chain_zones` to match.
    ///
    /// Returns false for empty reports and when the (width, height,
    /// chain_length) tuple is unchanged.
    pub fn set_matrix_properties(&mut self, p: &TileStateDeviceChain) -> bool {
        if p.tile_devices_count == 0 {
            return false;
        }
        let first = &p.tile_devices[p.start_index as usize];
        let (w, h) = (first.width as usize, first.height as usize);
        let l = p.tile_devices_count as usize;

        let mp = &mut self.matrix_properties;
        if mp.width == w && mp.height == h && mp.chain_length == l {
            return false;
        }

        let n_zones = w * h;
        let shape_changed = w != mp.width || h != mp.height;
        mp.width = w;
        mp.height = h;
        mp.n_zones = n_zones;
        mp.chain_length = l;
        mp.state_packets = 1 + (n_zones.saturating_sub(1)) / 64;

        if shape_changed {
            // Per-tile shape changed, cached zone data is invalid.
            mp.chain_zones = vec![vec![Hsbk::default(); n_zones]; l];
            return true;
        }

        let cl = mp.chain_zones.len();
        if cl < l {
            for _ in cl..l {
                mp.chain_zones.push(vec![Hsbk::default(); n_zones]);
            }
        } else if cl > l {
            mp.chain_zones.truncate(l);
        }
        true
    }

    /// Writes a 64-zone state packet into the cached chain zones.
    ///
    /// Returns false when the tile index or zone offset is out of range,
    /// or when the packet matches the cached state exactly.
    pub fn set_matrix_state(&mut self, p: &TileState64) -> bool {
        let mp = &mut self.matrix_properties;
        let ti = p.tile_index as usize;
        if ti >= mp.chain_zones.len() {
            return false;
        }
        let zone_index = p.rect.y as usize * mp.width;
        let zones = &mut mp.chain_zones[ti];
        if zone_index >= zones.len() {
            return false;
        }

        let n = (zones.len() - zone_index).min(64);
        if zones[zone_index..zone_index + n] == p.colors[..n] {
            return false;
        }

        zones[zone_index..zone_index + n].copy_from_slice(&p.colors[..n]);
        true
    }

    /// Writes an extended multizone state packet into the cached zones,
    /// reallocating when the device reports a different zone count.
    pub fn set_multizone_properties(&mut self, p: &MultiZoneExtendedStateMultiZone) -> bool {
        let count = p.count as usize;
        if count == 0 || p.colors_count == 0 {
            return false;
        }

        let zones = &mut self.multizone_properties.zones;
        if zones.len() != count {
            *zones = vec![Hsbk::default(); count];
        }

        let start = p.index as usize;
        if start >= count {
            return false;
        }

        let n = (count - start).min(p.colors_count as usize);
        zones[start..start + n].copy_from_slice(&p.colors[..n]);
        true
    }

    /// Returns the messages polling state that changes often.
    /// The set varies with the light type.
    pub fn high_freq_messages(&self) -> Vec<Message> {
        match self.light_type {
            LightType::MultiZone => vec![
                Message::new(Payload::LightGet),
                Message::new(Payload::GetPower),
                Message::new(Payload::MultiZoneExtendedGetColorZones),
            ],
            LightType::Matrix => {
                let mp = &self.matrix_properties;
                let mut msgs = vec![
                    Message::new(Payload::LightGet),
                    Message::new(Payload::GetPower),
                ];
                for tile in 0..mp.chain_length {
                    for packet in 0..mp.state_packets {
                        msgs.push(Message::new(Payload::TileGet64(TileGet64 {
                            tile_index: tile as u8,
                            length: 1,
                            rect: TileBufferRect {
                                fb_index: 0,
                                x: 0,
                                y: (packet * 64 / mp.width) as u8,
                                width: mp.width as u8,
                            },
                        })));
                    }
                }
                msgs
            }
            LightType::SingleZone => vec![Message::new(Payload::LightGet)],
        }
    }

    /// Returns the messages polling state that rarely changes.
    pub fn low_freq_messages(&self) -> Vec<Message> {
        let mut msgs = vec![
            Message::new(Payload::GetLabel),
            Message::new(Payload::GetHostFirmware),
            Message::new(Payload::GetLocation),
            Message::new(Payload::GetGroup),
            Message::new(Payload::GetWifiInfo),
        ];
        if self.light_type == LightType::Matrix {
            msgs.push(Message::new(Payload::TileGetDeviceChain));
        }
        msgs
    }
}

/// Sorts devices by label and, if equal, by raw serial bytes.
pub fn sort_devices(devices: &mut [Device]) {
    devices.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.serial.0.cmp(&b.serial.0)));
}

/// Parses a raw byte label into a string, trimming C-style null bytes.
pub fn parse_label(label: &[u8; 32]) -> String {
    String::from_utf8_lossy(label)
        .trim_matches('\u{0}')
        .to_string()
}
