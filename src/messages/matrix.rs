//! Tile / matrix message builders

use super::{duration_ms, hsbk_array};
use crate::protocol::{
    packets::{
        Hsbk, Payload, TileBufferRect, TileCopyFrameBuffer, TileEffectSettings, TileEffectSkyType,
        TileEffectType, TileSet64, TileSetEffect,
    },
    Message,
};
use rand::Rng;
use std::time::Duration;

const DEFAULT_CLOUDS_MIN_SATURATION: u32 = 50;

/// A `TileSet64` setting a matrix with the given size to the provided
/// colors on the visible framebuffer.
pub fn set_matrix_colors(
    start_index: u8,
    length: u8,
    width: u8,
    colors: [Hsbk; 64],
    duration: Duration,
) -> Message {
    new_tile_set_64(start_index, length, 0, width, 0, colors, duration)
}

/// One or more `TileSet64` messages covering an arbitrary-length color
/// slice.
///
/// Up to 64 colors fit one packet on the visible framebuffer. Longer
/// slices are fragmented into 64-color packets written to the off-screen
/// framebuffer 1 with zero per-packet duration, followed by a
/// [`set_matrix_visible_frame_buffer`] flip carrying the caller's
/// duration, so the device never shows a half-written frame.
pub fn set_matrix_colors_from_slice(
    start_index: u8,
    length: u8,
    width: u8,
    colors: &[Hsbk],
    duration: Duration,
) -> Vec<Message> {
    let (fb, packet_duration, flip_duration) = if colors.len() > 64 {
        (1, Duration::ZERO, Some(duration))
    } else {
        (0, duration, None)
    };

    let mut msgs = Vec::new();
    for (packet, chunk) in colors.chunks(64).enumerate() {
        let y = (packet * 64 / width as usize) as u8;
        msgs.push(new_tile_set_64(
            start_index,
            length,
            fb,
            width,
            y,
            hsbk_array::<64>(chunk),
            packet_duration,
        ));
    }

    if let Some(d) = flip_duration {
        let height = (colors.len() / width as usize) as u8;
        msgs.push(set_matrix_visible_frame_buffer(
            start_index,
            length,
            fb,
            width,
            height,
            d,
        ));
    }

    msgs
}

/// Copies the given framebuffer into the visible framebuffer (0). Used
/// to flip previously stored frames for animations or smooth transitions
/// on matrices exceeding 64 zones.
pub fn set_matrix_visible_frame_buffer(
    start_index: u8,
    length: u8,
    fb: u8,
    width: u8,
    height: u8,
    duration: Duration,
) -> Message {
    Message::new(Payload::TileCopyFrameBuffer(TileCopyFrameBuffer {
        tile_index: start_index,
        length,
        dst_fb_index: 0,
        src_fb_index: fb,
        width,
        height,
        duration: duration_ms(duration),
    }))
}

/// Preloads animation frames into the hidden framebuffers 1..=N and
/// returns the preload messages plus a closure producing successive flip
/// messages cycling through the loaded frames.
///
/// Brightness is rescaled by the given percentage, clamped to 1..=100.
/// Returns `None` for an empty frame list.
#[allow(clippy::type_complexity)]
pub fn set_matrix_frame_animation(
    start_index: u8,
    length: u8,
    width: u8,
    frames: &[Vec<Hsbk>],
    brightness: f64,
    duration: Duration,
) -> Option<(Vec<Message>, impl FnMut() -> Message)> {
    if frames.is_empty() {
        return None;
    }
    let brightness = brightness.clamp(1.0, 100.0);
    let frame_count = frames.len();
    let height = (frames[0].len() / width as usize) as u8;

    let mut msgs = Vec::new();
    for (fb, frame) in frames.iter().enumerate() {
        for (packet, chunk) in frame.chunks(64).enumerate() {
            let mut colors = hsbk_array::<64>(chunk);
            for c in colors.iter_mut() {
                c.brightness = (f64::from(c.brightness) / 100.0 * brightness) as u16;
            }
            let y = (packet * 64 / width as usize) as u8;
            msgs.push(new_tile_set_64(
                start_index,
                length,
                (fb + 1) as u8,
                width,
                y,
                colors,
                Duration::ZERO,
            ));
        }
    }

    // active_frame is the index of the last frame flipped into the
    // visible buffer.
    let mut active_frame = 0usize;
    let next_flip = move || {
        let next_fb = active_frame + 1;
        active_frame = next_fb % frame_count;
        set_matrix_visible_frame_buffer(start_index, length, next_fb as u8, width, height, duration)
    };

    Some((msgs, next_flip))
}

/// Turns any running matrix firmware effect off.
pub fn set_matrix_effect_off() -> Message {
    Message::new(Payload::TileSetEffect(TileSetEffect {
        settings: TileEffectSettings {
            instanceid: rand::thread_rng().gen(),
            effect_type: TileEffectType::Off,
            ..Default::default()
        },
    }))
}

/// Runs the Flame firmware effect.
pub fn set_matrix_flame_effect(speed: Duration) -> Message {
    Message::new(Payload::TileSetEffect(TileSetEffect {
        settings: TileEffectSettings {
            instanceid: rand::thread_rng().gen(),
            effect_type: TileEffectType::Flame,
            speed: duration_ms(speed),
            ..Default::default()
        },
    }))
}

/// Runs the Morph firmware effect with a palette of up to 16 colors.
pub fn set_matrix_morph_effect(speed: Duration, colors: &[Hsbk]) -> Message {
    let colors = &colors[..colors.len().min(16)];
    Message::new(Payload::TileSetEffect(TileSetEffect {
        settings: TileEffectSettings {
            instanceid: rand::thread_rng().gen(),
            effect_type: TileEffectType::Morph,
            speed: duration_ms(speed),
            palette_count: colors.len() as u8,
            palette: hsbk_array::<16>(colors),
            ..Default::default()
        },
    }))
}

/// Runs the Clouds sky effect. The minimum saturation is clamped to
/// 0..=100 and defaults to 50 when unset.
pub fn set_matrix_clouds_effect(speed: Duration, min_saturation: Option<u32>) -> Message {
    let min_saturation = min_saturation
        .map(|s| s.min(100))
        .unwrap_or(DEFAULT_CLOUDS_MIN_SATURATION);
    let mut settings = TileEffectSettings {
        instanceid: rand::thread_rng().gen(),
        effect_type: TileEffectType::Sky,
        speed: duration_ms(speed),
        ..Default::default()
    };
    settings.parameter[0] = TileEffectSkyType::Clouds as u32;
    settings.parameter[1] = min_saturation;
    Message::new(Payload::TileSetEffect(TileSetEffect { settings }))
}

/// Runs the Sunrise sky effect.
pub fn set_matrix_sunrise_effect(speed: Duration) -> Message {
    let mut settings = TileEffectSettings {
        instanceid: rand::thread_rng().gen(),
        effect_type: TileEffectType::Sky,
        speed: duration_ms(speed),
        ..Default::default()
    };
    settings.parameter[0] = TileEffectSkyType::Sunrise as u32;
    Message::new(Payload::TileSetEffect(TileSetEffect { settings }))
}

/// Runs the Sunset sky effect. With `soft_off` the device turns off at
/// the end of the effect.
pub fn set_matrix_sunset_effect(speed: Duration, soft_off: bool) -> Message {
    let mut settings = TileEffectSettings {
        instanceid: rand::thread_rng().gen(),
        effect_type: TileEffectType::Sky,
        speed: duration_ms(speed),
        ..Default::default()
    };
    settings.parameter[0] = TileEffectSkyType::Sunset as u32;
    settings.parameter[1] = soft_off as u32;
    Message::new(Payload::TileSetEffect(TileSetEffect { settings }))
}

fn new_tile_set_64(
    start_index: u8,
    length: u8,
    fb: u8,
    width: u8,
    y: u8,
    colors: [Hsbk; 64],
    duration: Duration,
) -> Message {
    Message::new(Payload::TileSet64(TileSet64 {
        tile_index: start_index,
        length,
        rect: TileBufferRect {
            fb_index: fb,
            x: 0,
            y,
            width,
        },
        duration: duration_ms(duration),
        colors,
    }))
}
