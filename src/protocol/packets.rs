//! Typed LIFX LAN payloads
//!
//! Every payload this crate understands is a struct plus a variant of
//! [`Payload`]. The inbound processor dispatches on the variant; unknown
//! payload tags fail decoding with a codec error and are dropped by the
//! receive loop.
//!
//! All integers are little-endian on the wire.

use crate::error::{Error, Result};

// Payload type tags.
pub const TYPE_GET_SERVICE: u16 = 2;
pub const TYPE_STATE_SERVICE: u16 = 3;
pub const TYPE_GET_HOST_FIRMWARE: u16 = 14;
pub const TYPE_STATE_HOST_FIRMWARE: u16 = 15;
pub const TYPE_GET_WIFI_INFO: u16 = 16;
pub const TYPE_STATE_WIFI_INFO: u16 = 17;
pub const TYPE_GET_POWER: u16 = 20;
pub const TYPE_SET_POWER: u16 = 21;
pub const TYPE_STATE_POWER: u16 = 22;
pub const TYPE_GET_LABEL: u16 = 23;
pub const TYPE_STATE_LABEL: u16 = 25;
pub const TYPE_GET_VERSION: u16 = 32;
pub const TYPE_STATE_VERSION: u16 = 33;
pub const TYPE_GET_LOCATION: u16 = 48;
pub const TYPE_STATE_LOCATION: u16 = 50;
pub const TYPE_GET_GROUP: u16 = 51;
pub const TYPE_STATE_GROUP: u16 = 53;
pub const TYPE_LIGHT_GET: u16 = 101;
pub const TYPE_LIGHT_STATE: u16 = 107;
pub const TYPE_LIGHT_SET_WAVEFORM_OPTIONAL: u16 = 119;
pub const TYPE_STATE_UNHANDLED: u16 = 223;
pub const TYPE_MULTIZONE_SET_EFFECT: u16 = 508;
pub const TYPE_MULTIZONE_EXT_SET_COLOR_ZONES: u16 = 510;
pub const TYPE_MULTIZONE_EXT_GET_COLOR_ZONES: u16 = 511;
pub const TYPE_MULTIZONE_EXT_STATE_MULTIZONE: u16 = 512;
pub const TYPE_TILE_GET_DEVICE_CHAIN: u16 = 701;
pub const TYPE_TILE_STATE_DEVICE_CHAIN: u16 = 702;
pub const TYPE_TILE_GET_64: u16 = 707;
pub const TYPE_TILE_STATE_64: u16 = 711;
pub const TYPE_TILE_SET_64: u16 = 715;
pub const TYPE_TILE_COPY_FRAME_BUFFER: u16 = 716;
pub const TYPE_TILE_SET_EFFECT: u16 = 719;

/// UDP service identifier reported by `StateService`.
pub const SERVICE_UDP: u8 = 1;

/// Maximum zones an extended multizone message can carry.
pub const EXTENDED_MULTIZONE_MAX_ZONES: usize = 82;

/// Light waveforms accepted by `LightSetWaveformOptional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Waveform {
    #[default]
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    Pulse = 4,
}

/// Tile firmware effect selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TileEffectType {
    #[default]
    Off = 0,
    Morph = 2,
    Flame = 3,
    Sky = 5,
}

/// Sky effect sub-type (parameter 0 of the Sky effect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TileEffectSkyType {
    #[default]
    Sunrise = 0,
    Sunset = 1,
    Clouds = 2,
}

/// Multizone firmware effect selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MultiZoneEffectType {
    #[default]
    Off = 0,
    Move = 1,
}

/// Apply directive on extended multizone color writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MultiZoneExtendedApplicationRequest {
    #[default]
    NoApply = 0,
    Apply = 1,
    ApplyOnly = 2,
}

/// HSBK color in device form: four unsigned 16-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

/// Buffer rectangle addressing a region of a tile framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileBufferRect {
    pub fb_index: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
}

/// One tile entry in a `TileStateDeviceChain` report. 55 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileStateDevice {
    pub accel_meas: [i16; 3],
    pub user_x: f32,
    pub user_y: f32,
    pub width: u8,
    pub height: u8,
    pub device_version_vendor: u32,
    pub device_version_product: u32,
    pub firmware_build: u64,
    pub firmware_version_minor: u16,
    pub firmware_version_major: u16,
}

impl Default for TileStateDevice {
    fn default() -> Self {
        TileStateDevice {
            accel_meas: [0; 3],
            user_x: 0.0,
            user_y: 0.0,
            width: 0,
            height: 0,
            device_version_vendor: 0,
            device_version_product: 0,
            firmware_build: 0,
            firmware_version_minor: 0,
            firmware_version_major: 0,
        }
    }
}

const TILE_STATE_DEVICE_SIZE: usize = 55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateService {
    pub service: u8,
    pub port: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateHostFirmware {
    pub build: u64,
    pub version_minor: u16,
    pub version_major: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateWifiInfo {
    pub signal: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetPower {
    pub level: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatePower {
    pub level: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLabel {
    pub label: [u8; 32],
}

impl Default for StateLabel {
    fn default() -> Self {
        StateLabel { label: [0; 32] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateVersion {
    pub vendor: u32,
    pub product: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLocation {
    pub location: [u8; 16],
    pub label: [u8; 32],
    pub updated_at: u64,
}

impl Default for StateLocation {
    fn default() -> Self {
        StateLocation {
            location: [0; 16],
            label: [0; 32],
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateGroup {
    pub group: [u8; 16],
    pub label: [u8; 32],
    pub updated_at: u64,
}

impl Default for StateGroup {
    fn default() -> Self {
        StateGroup {
            group: [0; 16],
            label: [0; 32],
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub color: Hsbk,
    pub power: u16,
    pub label: [u8; 32],
}

impl Default for LightState {
    fn default() -> Self {
        LightState {
            color: Hsbk::default(),
            power: 0,
            label: [0; 32],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightSetWaveformOptional {
    pub transient: bool,
    pub color: Hsbk,
    pub period: u32,
    pub cycles: f32,
    pub skew_ratio: i16,
    pub waveform: Waveform,
    pub set_hue: bool,
    pub set_saturation: bool,
    pub set_brightness: bool,
    pub set_kelvin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateUnhandled {
    pub unhandled_type: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultiZoneEffectSettings {
    pub instanceid: u32,
    pub effect_type: MultiZoneEffectType,
    pub speed: u32,
    pub duration: u64,
    pub parameter: [u32; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultiZoneSetEffect {
    pub settings: MultiZoneEffectSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiZoneExtendedSetColorZones {
    pub duration: u32,
    pub apply: MultiZoneExtendedApplicationRequest,
    pub index: u16,
    pub colors_count: u8,
    pub colors: [Hsbk; EXTENDED_MULTIZONE_MAX_ZONES],
}

impl Default for MultiZoneExtendedSetColorZones {
    fn default() -> Self {
        MultiZoneExtendedSetColorZones {
            duration: 0,
            apply: MultiZoneExtendedApplicationRequest::NoApply,
            index: 0,
            colors_count: 0,
            colors: [Hsbk::default(); EXTENDED_MULTIZONE_MAX_ZONES],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiZoneExtendedStateMultiZone {
    pub count: u16,
    pub index: u16,
    pub colors_count: u8,
    pub colors: [Hsbk; EXTENDED_MULTIZONE_MAX_ZONES],
}

impl Default for MultiZoneExtendedStateMultiZone {
    fn default() -> Self {
        MultiZoneExtendedStateMultiZone {
            count: 0,
            index: 0,
            colors_count: 0,
            colors: [Hsbk::default(); EXTENDED_MULTIZONE_MAX_ZONES],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileStateDeviceChain {
    pub start_index: u8,
    pub tile_devices: [TileStateDevice; 16],
    pub tile_devices_count: u8,
}

impl Default for TileStateDeviceChain {
    fn default() -> Self {
        TileStateDeviceChain {
            start_index: 0,
            tile_devices: [TileStateDevice::default(); 16],
            tile_devices_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileGet64 {
    pub tile_index: u8,
    pub length: u8,
    pub rect: TileBufferRect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileState64 {
    pub tile_index: u8,
    pub rect: TileBufferRect,
    pub colors: [Hsbk; 64],
}

impl Default for TileState64 {
    fn default() -> Self {
        TileState64 {
            tile_index: 0,
            rect: TileBufferRect::default(),
            colors: [Hsbk::default(); 64],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSet64 {
    pub tile_index: u8,
    pub length: u8,
    pub rect: TileBufferRect,
    pub duration: u32,
    pub colors: [Hsbk; 64],
}

impl Default for TileSet64 {
    fn default() -> Self {
        TileSet64 {
            tile_index: 0,
            length: 0,
            rect: TileBufferRect::default(),
            duration: 0,
            colors: [Hsbk::default(); 64],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileCopyFrameBuffer {
    pub tile_index: u8,
    pub length: u8,
    pub dst_fb_index: u8,
    pub src_fb_index: u8,
    pub width: u8,
    pub height: u8,
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileEffectSettings {
    pub instanceid: u32,
    pub effect_type: TileEffectType,
    pub speed: u32,
    pub duration: u64,
    pub parameter: [u32; 8],
    pub palette_count: u8,
    pub palette: [Hsbk; 16],
}

impl Default for TileEffectSettings {
    fn default() -> Self {
        TileEffectSettings {
            instanceid: 0,
            effect_type: TileEffectType::Off,
            speed: 0,
            duration: 0,
            parameter: [0; 8],
            palette_count: 0,
            palette: [Hsbk::default(); 16],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileSetEffect {
    pub settings: TileEffectSettings,
}

/// Every payload this crate can put on or take off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    GetService,
    StateService(StateService),
    GetHostFirmware,
    StateHostFirmware(StateHostFirmware),
    GetWifiInfo,
    StateWifiInfo(StateWifiInfo),
    GetPower,
    SetPower(SetPower),
    StatePower(StatePower),
    GetLabel,
    StateLabel(StateLabel),
    GetVersion,
    StateVersion(StateVersion),
    GetLocation,
    StateLocation(StateLocation),
    GetGroup,
    StateGroup(StateGroup),
    LightGet,
    LightState(LightState),
    LightSetWaveformOptional(LightSetWaveformOptional),
    StateUnhandled(StateUnhandled),
    MultiZoneSetEffect(MultiZoneSetEffect),
    MultiZoneExtendedSetColorZones(MultiZoneExtendedSetColorZones),
    MultiZoneExtendedGetColorZones,
    MultiZoneExtendedStateMultiZone(MultiZoneExtendedStateMultiZone),
    TileGetDeviceChain,
    TileStateDeviceChain(TileStateDeviceChain),
    TileGet64(TileGet64),
    TileState64(TileState64),
    TileSet64(TileSet64),
    TileCopyFrameBuffer(TileCopyFrameBuffer),
    TileSetEffect(TileSetEffect),
}

impl Payload {
    /// The 16-bit payload tag carried in the header.
    pub fn payload_type(&self) -> u16 {
        match self {
            Payload::GetService => TYPE_GET_SERVICE,
            Payload::StateService(_) => TYPE_STATE_SERVICE,
            Payload::GetHostFirmware => TYPE_GET_HOST_FIRMWARE,
            Payload::StateHostFirmware(_) => TYPE_STATE_HOST_FIRMWARE,
            Payload::GetWifiInfo => TYPE_GET_WIFI_INFO,
            Payload::StateWifiInfo(_) => TYPE_STATE_WIFI_INFO,
            Payload::GetPower => TYPE_GET_POWER,
            Payload::SetPower(_) => TYPE_SET_POWER,
            Payload::StatePower(_) => TYPE_STATE_POWER,
            Payload::GetLabel => TYPE_GET_LABEL,
            Payload::StateLabel(_) => TYPE_STATE_LABEL,
            Payload::GetVersion => TYPE_GET_VERSION,
            Payload::StateVersion(_) => TYPE_STATE_VERSION,
            Payload::GetLocation => TYPE_GET_LOCATION,
            Payload::StateLocation(_) => TYPE_STATE_LOCATION,
            Payload::GetGroup => TYPE_GET_GROUP,
            Payload::StateGroup(_) => TYPE_STATE_GROUP,
            Payload::LightGet => TYPE_LIGHT_GET,
            Payload::LightState(_) => TYPE_LIGHT_STATE,
            Payload::LightSetWaveformOptional(_) => TYPE_LIGHT_SET_WAVEFORM_OPTIONAL,
            Payload::StateUnhandled(_) => TYPE_STATE_UNHANDLED,
            Payload::MultiZoneSetEffect(_) => TYPE_MULTIZONE_SET_EFFECT,
            Payload::MultiZoneExtendedSetColorZones(_) => TYPE_MULTIZONE_EXT_SET_COLOR_ZONES,
            Payload::MultiZoneExtendedGetColorZones => TYPE_MULTIZONE_EXT_GET_COLOR_ZONES,
            Payload::MultiZoneExtendedStateMultiZone(_) => TYPE_MULTIZONE_EXT_STATE_MULTIZONE,
            Payload::TileGetDeviceChain => TYPE_TILE_GET_DEVICE_CHAIN,
            Payload::TileStateDeviceChain(_) => TYPE_TILE_STATE_DEVICE_CHAIN,
            Payload::TileGet64(_) => TYPE_TILE_GET_64,
            Payload::TileState64(_) => TYPE_TILE_STATE_64,
            Payload::TileSet64(_) => TYPE_TILE_SET_64,
            Payload::TileCopyFrameBuffer(_) => TYPE_TILE_COPY_FRAME_BUFFER,
            Payload::TileSetEffect(_) => TYPE_TILE_SET_EFFECT,
        }
    }

    /// Encoded payload size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Payload::GetService
            | Payload::GetHostFirmware
            | Payload::GetWifiInfo
            | Payload::GetPower
            | Payload::GetLabel
            | Payload::GetVersion
            | Payload::GetLocation
            | Payload::GetGroup
            | Payload::LightGet
            | Payload::MultiZoneExtendedGetColorZones
            | Payload::TileGetDeviceChain => 0,
            Payload::StateService(_) => 5,
            Payload::StateHostFirmware(_) => 20,
            Payload::StateWifiInfo(_) => 14,
            Payload::SetPower(_) | Payload::StatePower(_) | Payload::StateUnhandled(_) => 2,
            Payload::StateLabel(_) => 32,
            Payload::StateVersion(_) => 12,
            Payload::StateLocation(_) | Payload::StateGroup(_) => 56,
            Payload::LightState(_) => 52,
            Payload::LightSetWaveformOptional(_) => 25,
            Payload::MultiZoneSetEffect(_) => 59,
            Payload::MultiZoneExtendedSetColorZones(_) => 664,
            Payload::MultiZoneExtendedStateMultiZone(_) => 661,
            Payload::TileStateDeviceChain(_) => 2 + 16 * TILE_STATE_DEVICE_SIZE,
            Payload::TileGet64(_) => 6,
            Payload::TileState64(_) => 517,
            Payload::TileSet64(_) => 522,
            Payload::TileCopyFrameBuffer(_) => 10,
            Payload::TileSetEffect(_) => 188,
        }
    }

    pub fn encode(&self, w: &mut Vec<u8>) {
        match self {
            Payload::GetService
            | Payload::GetHostFirmware
            | Payload::GetWifiInfo
            | Payload::GetPower
            | Payload::GetLabel
            | Payload::GetVersion
            | Payload::GetLocation
            | Payload::GetGroup
            | Payload::LightGet
            | Payload::MultiZoneExtendedGetColorZones
            | Payload::TileGetDeviceChain => {}
            Payload::StateService(p) => {
                w.push(p.service);
                put_u32(w, p.port);
            }
            Payload::StateHostFirmware(p) => {
                put_u64(w, p.build);
                put_u64(w, 0);
                put_u16(w, p.version_minor);
                put_u16(w, p.version_major);
            }
            Payload::StateWifiInfo(p) => {
                put_f32(w, p.signal);
                put_u32(w, 0);
                put_u32(w, 0);
                put_u16(w, 0);
            }
            Payload::SetPower(p) => put_u16(w, p.level),
            Payload::StatePower(p) => put_u16(w, p.level),
            Payload::StateLabel(p) => w.extend_from_slice(&p.label),
            Payload::StateVersion(p) => {
                put_u32(w, p.vendor);
                put_u32(w, p.product);
                put_u32(w, 0);
            }
            Payload::StateLocation(p) => {
                w.extend_from_slice(&p.location);
                w.extend_from_slice(&p.label);
                put_u64(w, p.updated_at);
            }
            Payload::StateGroup(p) => {
                w.extend_from_slice(&p.group);
                w.extend_from_slice(&p.label);
                put_u64(w, p.updated_at);
            }
            Payload::LightState(p) => {
                put_hsbk(w, &p.color);
                put_u16(w, 0);
                put_u16(w, p.power);
                w.extend_from_slice(&p.label);
                put_u64(w, 0);
            }
            Payload::LightSetWaveformOptional(p) => {
                w.push(0);
                w.push(p.transient as u8);
                put_hsbk(w, &p.color);
                put_u32(w, p.period);
                put_f32(w, p.cycles);
                put_u16(w, p.skew_ratio as u16);
                w.push(p.waveform as u8);
                w.push(p.set_hue as u8);
                w.push(p.set_saturation as u8);
                w.push(p.set_brightness as u8);
                w.push(p.set_kelvin as u8);
            }
            Payload::StateUnhandled(p) => put_u16(w, p.unhandled_type),
            Payload::MultiZoneSetEffect(p) => {
                put_u32(w, p.settings.instanceid);
                w.push(p.settings.effect_type as u8);
                put_u16(w, 0);
                put_u32(w, p.settings.speed);
                put_u64(w, p.settings.duration);
                put_u32(w, 0);
                put_u32(w, 0);
                for v in p.settings.parameter {
                    put_u32(w, v);
                }
            }
            Payload::MultiZoneExtendedSetColorZones(p) => {
                put_u32(w, p.duration);
                w.push(p.apply as u8);
                put_u16(w, p.index);
                w.push(p.colors_count);
                for c in &p.colors {
                    put_hsbk(w, c);
                }
            }
            Payload::MultiZoneExtendedStateMultiZone(p) => {
                put_u16(w, p.count);
                put_u16(w, p.index);
                w.push(p.colors_count);
                for c in &p.colors {
                    put_hsbk(w, c);
                }
            }
            Payload::TileStateDeviceChain(p) => {
                w.push(p.start_index);
                for t in &p.tile_devices {
                    put_tile_device(w, t);
                }
                w.push(p.tile_devices_count);
            }
            Payload::TileGet64(p) => {
                w.push(p.tile_index);
                w.push(p.length);
                put_rect(w, &p.rect);
            }
            Payload::TileState64(p) => {
                w.push(p.tile_index);
                put_rect(w, &p.rect);
                for c in &p.colors {
                    put_hsbk(w, c);
                }
            }
            Payload::TileSet64(p) => {
                w.push(p.tile_index);
                w.push(p.length);
                put_rect(w, &p.rect);
                put_u32(w, p.duration);
                for c in &p.colors {
                    put_hsbk(w, c);
                }
            }
            Payload::TileCopyFrameBuffer(p) => {
                w.push(p.tile_index);
                w.push(p.length);
                w.push(p.dst_fb_index);
                w.push(p.src_fb_index);
                w.push(p.width);
                w.push(p.height);
                put_u32(w, p.duration);
            }
            Payload::TileSetEffect(p) => {
                put_u16(w, 0);
                put_u32(w, p.settings.instanceid);
                w.push(p.settings.effect_type as u8);
                put_u32(w, p.settings.speed);
                put_u64(w, p.settings.duration);
                put_u32(w, 0);
                put_u32(w, 0);
                for v in p.settings.parameter {
                    put_u32(w, v);
                }
                w.push(p.settings.palette_count);
                for c in &p.settings.palette {
                    put_hsbk(w, c);
                }
            }
        }
    }

    /// Decodes the payload of the given type from `data`.
    pub fn decode(payload_type: u16, data: &[u8]) -> Result<Payload> {
        let mut r = Reader::new(data);
        let payload = match payload_type {
            TYPE_GET_SERVICE => Payload::GetService,
            TYPE_STATE_SERVICE => Payload::StateService(StateService {
                service: r.u8()?,
                port: r.u32()?,
            }),
            TYPE_GET_HOST_FIRMWARE => Payload::GetHostFirmware,
            TYPE_STATE_HOST_FIRMWARE => {
                let build = r.u64()?;
                r.skip(8)?;
                Payload::StateHostFirmware(StateHostFirmware {
                    build,
                    version_minor: r.u16()?,
                    version_major: r.u16()?,
                })
            }
            TYPE_GET_WIFI_INFO => Payload::GetWifiInfo,
            TYPE_STATE_WIFI_INFO => Payload::StateWifiInfo(StateWifiInfo { signal: r.f32()? }),
            TYPE_GET_POWER => Payload::GetPower,
            TYPE_SET_POWER => Payload::SetPower(SetPower { level: r.u16()? }),
            TYPE_STATE_POWER => Payload::StatePower(StatePower { level: r.u16()? }),
            TYPE_GET_LABEL => Payload::GetLabel,
            TYPE_STATE_LABEL => Payload::StateLabel(StateLabel { label: r.bytes32()? }),
            TYPE_GET_VERSION => Payload::GetVersion,
            TYPE_STATE_VERSION => Payload::StateVersion(StateVersion {
                vendor: r.u32()?,
                product: r.u32()?,
            }),
            TYPE_GET_LOCATION => Payload::GetLocation,
            TYPE_STATE_LOCATION => Payload::StateLocation(StateLocation {
                location: r.bytes16()?,
                label: r.bytes32()?,
                updated_at: r.u64()?,
            }),
            TYPE_GET_GROUP => Payload::GetGroup,
            TYPE_STATE_GROUP => Payload::StateGroup(StateGroup {
                group: r.bytes16()?,
                label: r.bytes32()?,
                updated_at: r.u64()?,
            }),
            TYPE_LIGHT_GET => Payload::LightGet,
            TYPE_LIGHT_STATE => {
                let color = r.hsbk()?;
                r.skip(2)?;
                Payload::LightState(LightState {
                    color,
                    power: r.u16()?,
                    label: r.bytes32()?,
                })
            }
            TYPE_LIGHT_SET_WAVEFORM_OPTIONAL => {
                r.skip(1)?;
                let transient = r.u8()? != 0;
                let color = r.hsbk()?;
                let period = r.u32()?;
                let cycles = r.f32()?;
                let skew_ratio = r.u16()? as i16;
                let waveform = match r.u8()? {
                    0 => Waveform::Saw,
                    1 => Waveform::Sine,
                    2 => Waveform::HalfSine,
                    3 => Waveform::Triangle,
                    4 => Waveform::Pulse,
                    other => {
                        return Err(Error::Codec(format!("invalid waveform: {}", other)));
                    }
                };
                Payload::LightSetWaveformOptional(LightSetWaveformOptional {
                    transient,
                    color,
                    period,
                    cycles,
                    skew_ratio,
                    waveform,
                    set_hue: r.u8()? != 0,
                    set_saturation: r.u8()? != 0,
                    set_brightness: r.u8()? != 0,
                    set_kelvin: r.u8()? != 0,
                })
            }
            TYPE_STATE_UNHANDLED => Payload::StateUnhandled(StateUnhandled {
                unhandled_type: r.u16()?,
            }),
            TYPE_MULTIZONE_SET_EFFECT => {
                let instanceid = r.u32()?;
                let effect_type = match r.u8()? {
                    0 => MultiZoneEffectType::Off,
                    1 => MultiZoneEffectType::Move,
                    other => {
                        return Err(Error::Codec(format!(
                            "invalid multizone effect type: {}",
                            other
                        )));
                    }
                };
                r.skip(2)?;
                let speed = r.u32()?;
                let duration = r.u64()?;
                r.skip(8)?;
                let mut parameter = [0u32; 8];
                for v in parameter.iter_mut() {
                    *v = r.u32()?;
                }
                Payload::MultiZoneSetEffect(MultiZoneSetEffect {
                    settings: MultiZoneEffectSettings {
                        instanceid,
                        effect_type,
                        speed,
                        duration,
                        parameter,
                    },
                })
            }
            TYPE_MULTIZONE_EXT_SET_COLOR_ZONES => {
                let duration = r.u32()?;
                let apply = match r.u8()? {
                    0 => MultiZoneExtendedApplicationRequest::NoApply,
                    1 => MultiZoneExtendedApplicationRequest::Apply,
                    2 => MultiZoneExtendedApplicationRequest::ApplyOnly,
                    other => {
                        return Err(Error::Codec(format!("invalid apply request: {}", other)));
                    }
                };
                let index = r.u16()?;
                let colors_count = r.u8()?;
                let mut colors = [Hsbk::default(); EXTENDED_MULTIZONE_MAX_ZONES];
                for c in colors.iter_mut() {
                    *c = r.hsbk()?;
                }
                Payload::MultiZoneExtendedSetColorZones(MultiZoneExtendedSetColorZones {
                    duration,
                    apply,
                    index,
                    colors_count,
                    colors,
                })
            }
            TYPE_MULTIZONE_EXT_GET_COLOR_ZONES => Payload::MultiZoneExtendedGetColorZones,
            TYPE_MULTIZONE_EXT_STATE_MULTIZONE => {
                let count = r.u16()?;
                let index = r.u16()?;
                let colors_count = r.u8()?;
                let mut colors = [Hsbk::default(); EXTENDED_MULTIZONE_MAX_ZONES];
                for c in colors.iter_mut() {
                    *c = r.hsbk()?;
                }
                Payload::MultiZoneExtendedStateMultiZone(MultiZoneExtendedStateMultiZone {
                    count,
                    index,
                    colors_count,
                    colors,
                })
            }
            TYPE_TILE_GET_DEVICE_CHAIN => Payload::TileGetDeviceChain,
            TYPE_TILE_STATE_DEVICE_CHAIN => {
                let start_index = r.u8()?;
                let mut tile_devices = [TileStateDevice::default(); 16];
                for t in tile_devices.iter_mut() {
                    *t = r.tile_device()?;
                }
                Payload::TileStateDeviceChain(TileStateDeviceChain {
                    start_index,
                    tile_devices,
                    tile_devices_count: r.u8()?,
                })
            }
            TYPE_TILE_GET_64 => Payload::TileGet64(TileGet64 {
                tile_index: r.u8()?,
                length: r.u8()?,
                rect: r.rect()?,
            }),
            TYPE_TILE_STATE_64 => {
                let tile_index = r.u8()?;
                let rect = r.rect()?;
                let mut colors = [Hsbk::default(); 64];
                for c in colors.iter_mut() {
                    *c = r.hsbk()?;
                }
                Payload::TileState64(TileState64 {
                    tile_index,
                    rect,
                    colors,
                })
            }
            TYPE_TILE_SET_64 => {
                let tile_index = r.u8()?;
                let length = r.u8()?;
                let rect = r.rect()?;
                let duration = r.u32()?;
                let mut colors = [Hsbk::default(); 64];
                for c in colors.iter_mut() {
                    *c = r.hsbk()?;
                }
                Payload::TileSet64(TileSet64 {
                    tile_index,
                    length,
                    rect,
                    duration,
                    colors,
                })
            }
            TYPE_TILE_COPY_FRAME_BUFFER => Payload::TileCopyFrameBuffer(TileCopyFrameBuffer {
                tile_index: r.u8()?,
                length: r.u8()?,
                dst_fb_index: r.u8()?,
                src_fb_index: r.u8()?,
                width: r.u8()?,
                height: r.u8()?,
                duration: r.u32()?,
            }),
            TYPE_TILE_SET_EFFECT => {
                r.skip(2)?;
                let instanceid = r.u32()?;
                let effect_type = match r.u8()? {
                    0 => TileEffectType::Off,
                    2 => TileEffectType::Morph,
                    3 => TileEffectType::Flame,
                    5 => TileEffectType::Sky,
                    other => {
                        return Err(Error::Codec(format!("invalid tile effect type: {}", other)));
                    }
                };
                let speed = r.u32()?;
                let duration = r.u64()?;
                r.skip(8)?;
                let mut parameter = [0u32; 8];
                for v in parameter.iter_mut() {
                    *v = r.u32()?;
                }
                let palette_count = r.u8()?;
                let mut palette = [Hsbk::default(); 16];
                for c in palette.iter_mut() {
                    *c = r.hsbk()?;
                }
                Payload::TileSetEffect(TileSetEffect {
                    settings: TileEffectSettings {
                        instanceid,
                        effect_type,
                        speed,
                        duration,
                        parameter,
                        palette_count,
                        palette,
                    },
                })
            }
            other => {
                return Err(Error::Codec(format!("unknown payload type: {}", other)));
            }
        };
        Ok(payload)
    }
}

fn put_u16(w: &mut Vec<u8>, v: u16) {
    w.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(w: &mut Vec<u8>, v: u32) {
    w.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(w: &mut Vec<u8>, v: u64) {
    w.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(w: &mut Vec<u8>, v: f32) {
    w.extend_from_slice(&v.to_le_bytes());
}

fn put_hsbk(w: &mut Vec<u8>, c: &Hsbk) {
    put_u16(w, c.hue);
    put_u16(w, c.saturation);
    put_u16(w, c.brightness);
    put_u16(w, c.kelvin);
}

fn put_rect(w: &mut Vec<u8>, r: &TileBufferRect) {
    w.push(r.fb_index);
    w.push(r.x);
    w.push(r.y);
    w.push(r.width);
}

fn put_tile_device(w: &mut Vec<u8>, t: &TileStateDevice) {
    for v in t.accel_meas {
        put_u16(w, v as u16);
    }
    put_u16(w, 0);
    put_f32(w, t.user_x);
    put_f32(w, t.user_y);
    w.push(t.width);
    w.push(t.height);
    w.push(0);
    put_u32(w, t.device_version_vendor);
    put_u32(w, t.device_version_product);
    put_u32(w, 0);
    put_u64(w, t.firmware_build);
    put_u64(w, 0);
    put_u16(w, t.firmware_version_minor);
    put_u16(w, t.firmware_version_major);
    put_u32(w, 0);
}

/// Bounds-checked little-endian cursor over a payload buffer.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::Codec(format!(
                "payload too short: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.data.len()
            )));
        }
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let s = self.take(2)?;
        Ok(u16::from_le_bytes([s[0], s[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let s = self.take(4)?;
        Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let s = self.take(8)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(s);
        Ok(u64::from_le_bytes(b))
    }

    fn f32(&mut self) -> Result<f32> {
        let s = self.take(4)?;
        Ok(f32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    fn bytes16(&mut self) -> Result<[u8; 16]> {
        let mut b = [0u8; 16];
        b.copy_from_slice(self.take(16)?);
        Ok(b)
    }

    fn bytes32(&mut self) -> Result<[u8; 32]> {
        let mut b = [0u8; 32];
        b.copy_from_slice(self.take(32)?);
        Ok(b)
    }

    fn hsbk(&mut self) -> Result<Hsbk> {
        Ok(Hsbk {
            hue: self.u16()?,
            saturation: self.u16()?,
            brightness: self.u16()?,
            kelvin: self.u16()?,
        })
    }

    fn rect(&mut self) -> Result<TileBufferRect> {
        Ok(TileBufferRect {
            fb_index: self.u8()?,
            x: self.u8()?,
            y: self.u8()?,
            width: self.u8()?,
        })
    }

    fn tile_device(&mut self) -> Result<TileStateDevice> {
        let mut accel_meas = [0i16; 3];
        for v in accel_meas.iter_mut() {
            *v = self.u16()? as i16;
        }
        self.skip(2)?;
        let user_x = self.f32()?;
        let user_y = self.f32()?;
        let width = self.u8()?;
        let height = self.u8()?;
        self.skip(1)?;
        let device_version_vendor = self.u32()?;
        let device_version_product = self.u32()?;
        self.skip(4)?;
        let firmware_build = self.u64()?;
        self.skip(8)?;
        let firmware_version_minor = self.u16()?;
        let firmware_version_major = self.u16()?;
        self.skip(4)?;
        Ok(TileStateDevice {
            accel_meas,
            user_x,
            user_y,
            width,
            height,
            device_version_vendor,
            device_version_product,
            firmware_build,
            firmware_version_minor,
            firmware_version_major,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(payload: Payload) {
        let mut buf = Vec::new();
        payload.encode(&mut buf);
        assert_eq!(buf.len(), payload.size(), "size mismatch for {:?}", payload);
        let decoded = Payload::decode(payload.payload_type(), &buf).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_empty_payloads() {
        for p in [
            Payload::GetService,
            Payload::GetLabel,
            Payload::GetVersion,
            Payload::LightGet,
            Payload::TileGetDeviceChain,
            Payload::MultiZoneExtendedGetColorZones,
        ] {
            round_trip(p);
        }
    }

    #[test]
    fn test_state_payload_round_trips() {
        round_trip(Payload::StateService(StateService {
            service: SERVICE_UDP,
            port: 56700,
        }));
        round_trip(Payload::StateHostFirmware(StateHostFirmware {
            build: 1604880106000000000,
            version_minor: 70,
            version_major: 3,
        }));
        round_trip(Payload::StatePower(StatePower { level: 65535 }));
        round_trip(Payload::StateVersion(StateVersion {
            vendor: 1,
            product: 55,
        }));

        let mut label = [0u8; 32];
        label[..4].copy_from_slice(b"Lamp");
        round_trip(Payload::StateLabel(StateLabel { label }));
        round_trip(Payload::StateLocation(StateLocation {
            location: [7; 16],
            label,
            updated_at: 12345,
        }));
        round_trip(Payload::StateGroup(StateGroup {
            group: [9; 16],
            label,
            updated_at: 6789,
        }));
        round_trip(Payload::LightState(LightState {
            color: Hsbk {
                hue: 32768,
                saturation: 65535,
                brightness: 65535,
                kelvin: 3500,
            },
            power: 65535,
            label,
        }));
        round_trip(Payload::StateUnhandled(StateUnhandled {
            unhandled_type: 32,
        }));
    }

    #[test]
    fn test_tile_payload_round_trips() {
        let mut chain = TileStateDeviceChain {
            tile_devices_count: 2,
            ..Default::default()
        };
        chain.tile_devices[0].width = 8;
        chain.tile_devices[0].height = 8;
        chain.tile_devices[1].width = 8;
        chain.tile_devices[1].height = 8;
        round_trip(Payload::TileStateDeviceChain(chain));

        round_trip(Payload::TileGet64(TileGet64 {
            tile_index: 1,
            length: 1,
            rect: TileBufferRect {
                fb_index: 0,
                x: 0,
                y: 4,
                width: 16,
            },
        }));

        let mut colors = [Hsbk::default(); 64];
        colors[3] = Hsbk {
            kelvin: 3500,
            ..Default::default()
        };
        round_trip(Payload::TileState64(TileState64 {
            tile_index: 0,
            rect: TileBufferRect {
                width: 8,
                ..Default::default()
            },
            colors,
        }));
        round_trip(Payload::TileSet64(TileSet64 {
            tile_index: 0,
            length: 1,
            rect: TileBufferRect {
                fb_index: 1,
                width: 16,
                y: 4,
                ..Default::default()
            },
            duration: 1,
            colors,
        }));
        round_trip(Payload::TileCopyFrameBuffer(TileCopyFrameBuffer {
            tile_index: 0,
            length: 1,
            dst_fb_index: 0,
            src_fb_index: 1,
            width: 16,
            height: 8,
            duration: 100,
        }));

        let mut settings = TileEffectSettings {
            instanceid: 42,
            effect_type: TileEffectType::Morph,
            speed: 3000,
            palette_count: 2,
            ..Default::default()
        };
        settings.palette[0] = Hsbk {
            hue: 100,
            ..Default::default()
        };
        settings.palette[1] = Hsbk {
            hue: 200,
            ..Default::default()
        };
        round_trip(Payload::TileSetEffect(TileSetEffect { settings }));
    }

    #[test]
    fn test_multizone_payload_round_trips() {
        let mut colors = [Hsbk::default(); EXTENDED_MULTIZONE_MAX_ZONES];
        colors[0] = Hsbk {
            hue: 1,
            saturation: 2,
            brightness: 3,
            kelvin: 4,
        };
        round_trip(Payload::MultiZoneExtendedSetColorZones(
            MultiZoneExtendedSetColorZones {
                duration: 1000,
                apply: MultiZoneExtendedApplicationRequest::Apply,
                index: 0,
                colors_count: 1,
                colors,
            },
        ));
        round_trip(Payload::MultiZoneExtendedStateMultiZone(
            MultiZoneExtendedStateMultiZone {
                count: 24,
                index: 0,
                colors_count: 1,
                colors,
            },
        ));
        round_trip(Payload::MultiZoneSetEffect(MultiZoneSetEffect {
            settings: MultiZoneEffectSettings {
                instanceid: 7,
                effect_type: MultiZoneEffectType::Move,
                speed: 5000,
                duration: 0,
                parameter: [0, 1, 0, 0, 0, 0, 0, 0],
            },
        }));
    }

    #[test]
    fn test_waveform_round_trip() {
        round_trip(Payload::LightSetWaveformOptional(LightSetWaveformOptional {
            transient: false,
            color: Hsbk {
                hue: 16384,
                saturation: 65535,
                brightness: 32768,
                kelvin: 3500,
            },
            period: 1000,
            cycles: 1.0,
            skew_ratio: 0,
            waveform: Waveform::Saw,
            set_hue: true,
            set_saturation: true,
            set_brightness: true,
            set_kelvin: false,
        }));
    }

    #[test]
    fn test_unknown_payload_type() {
        assert!(Payload::decode(9999, &[]).is_err());
    }

    #[test]
    fn test_short_payload() {
        assert!(Payload::decode(TYPE_LIGHT_STATE, &[0u8; 10]).is_err());
    }
}
