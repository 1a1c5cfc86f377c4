//! Animated effects for matrix devices
//!
//! Each effect renders frames onto a [`Matrix`] canvas and hands the
//! resulting tile messages to a send function, sleeping between frames.
//! Effects run on the caller's thread; cancellation is cooperative
//! through the stop flag returned by [`send_with_stop`].
//!
//! Frames for chains with more than 64 zones are written to an
//! off-screen framebuffer in multiple packets and made visible with a
//! single buffer flip, so partially written frames are never shown.

use super::iterate::{bounce_down, bounce_up, iterate_down, iterate_up};
use super::{Matrix, PixelCache};
use crate::error::{Error, Result};
use crate::messages;
use crate::protocol::{packets::Hsbk, Message};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Floor for the inter-frame interval and the per-frame transition.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A sink for effect frames.
pub type SendFn<'a> = &'a mut dyn FnMut(Message) -> Result<()>;

/// Fan-out policy for effects on multi-tile chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainMode {
    /// Apply the effect to the first device in the chain.
    #[default]
    None,
    /// Apply the effect sequentially on each chain index.
    Sequential,
    /// Apply the effect to the whole chain at once.
    Synced,
}

impl ChainMode {
    /// Converts an integer to a chain mode, defaulting to `None`.
    pub fn parse(v: i64) -> ChainMode {
        match v {
            1 => ChainMode::Sequential,
            2 => ChainMode::Synced,
            _ => ChainMode::None,
        }
    }
}

/// Traversal direction for concentric frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationDirection {
    #[default]
    Inwards,
    Outwards,
    InOut,
    OutIn,
}

impl AnimationDirection {
    /// Converts an integer to a direction, defaulting to `Inwards`.
    pub fn parse(v: i64) -> AnimationDirection {
        match v {
            1 => AnimationDirection::Outwards,
            2 => AnimationDirection::InOut,
            3 => AnimationDirection::OutIn,
            _ => AnimationDirection::Inwards,
        }
    }
}

/// Wraps a send function with a stop flag checked before every send.
/// Once the flag is set the wrapper returns [`Error::Stopped`] and the
/// running effect unwinds.
pub fn send_with_stop<F>(mut send: F) -> (impl FnMut(Message) -> Result<()>, Arc<AtomicBool>)
where
    F: FnMut(Message) -> Result<()>,
{
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    let wrapped = move |msg: Message| {
        if flag.load(Ordering::Relaxed) {
            return Err(Error::Stopped);
        }
        send(msg)
    };
    (wrapped, stopped)
}

/// Applies the given colors sequentially on each row, centered when
/// possible. Waits for the interval between rows and repeats for
/// `cycles` full passes; 0 repeats indefinitely.
pub fn waterfall(
    m: &mut Matrix,
    send: SendFn,
    interval_ms: u64,
    cycles: u32,
    mode: ChainMode,
    colors: &[Hsbk],
) -> Result<()> {
    if colors.is_empty() {
        return Err(Error::MissingColors);
    }
    let d = interval(interval_ms);
    let chain_length = m.chain_length as u8;
    let colors = &colors[..colors.len().min(m.width)];
    // Try to center the colors if possible.
    let x = (m.width - colors.len()) / 2;

    repeat_for_cycles(cycles, &mut || match mode {
        ChainMode::Sequential => {
            for ti in 0..chain_length {
                waterfall_tile(m, send, d, x, ti, 1, colors)?;
            }
            Ok(())
        }
        ChainMode::Synced => waterfall_tile(m, send, d, x, 0, chain_length, colors),
        ChainMode::None => waterfall_tile(m, send, d, x, 0, 1, colors),
    })
}

fn waterfall_tile(
    m: &mut Matrix,
    send: SendFn,
    d: Duration,
    x: usize,
    tile_index: u8,
    length: u8,
    colors: &[Hsbk],
) -> Result<()> {
    m.clear();
    for row in 0..m.height {
        m.set_colors(x, row, colors);
        send_frame(m, send, tile_index, length, d)?;
        thread::sleep(d);
    }
    Ok(())
}

/// Lights a single pixel at a time in row-major order, switching colors
/// at row boundaries. Repeats for `cycles` full passes; 0 repeats
/// indefinitely.
pub fn rockets(
    m: &mut Matrix,
    send: SendFn,
    interval_ms: u64,
    cycles: u32,
    mode: ChainMode,
    colors: &[Hsbk],
) -> Result<()> {
    if colors.is_empty() {
        return Err(Error::MissingColors);
    }
    let d = interval(interval_ms);
    let chain_length = m.chain_length as u8;

    repeat_for_cycles(cycles, &mut || match mode {
        ChainMode::Sequential => {
            for ti in 0..chain_length {
                rockets_tile(m, send, d, ti, 1, colors)?;
            }
            Ok(())
        }
        ChainMode::Synced => rockets_tile(m, send, d, 0, chain_length, colors),
        ChainMode::None => rockets_tile(m, send, d, 0, 1, colors),
    })
}

fn rockets_tile(
    m: &mut Matrix,
    send: SendFn,
    d: Duration,
    tile_index: u8,
    length: u8,
    colors: &[Hsbk],
) -> Result<()> {
    m.clear();
    let mut color = colors[0];
    let mut y = 0;
    for i in 0..m.size {
        let x = i % m.width;
        if i > 0 && x == 0 {
            y += 1;
            color = colors[y % colors.len()];
        }
        m.clear();
        m.set_pixel(x, y, color);
        send_frame(m, send, tile_index, length, d)?;
        thread::sleep(d);
    }
    Ok(())
}

/// Moves a multi-pixel worm along the matrix with a serpentine walk,
/// clearing the whole tail in one go whenever the body is complete.
/// Repeats for `cycles` full passes; 0 repeats indefinitely.
pub fn worm(
    m: &mut Matrix,
    send: SendFn,
    interval_ms: u64,
    cycles: u32,
    mode: ChainMode,
    size: usize,
    color: Hsbk,
) -> Result<()> {
    let d = interval(interval_ms);
    let chain_length = m.chain_length as u8;
    let worm_size = size.clamp(1, m.width);

    repeat_for_cycles(cycles, &mut || match mode {
        ChainMode::Sequential => {
            for ti in 0..chain_length {
                worm_tile(m, send, d, worm_size, ti, 1, color)?;
            }
            Ok(())
        }
        ChainMode::Synced => worm_tile(m, send, d, worm_size, 0, chain_length, color),
        ChainMode::None => worm_tile(m, send, d, worm_size, 0, 1, color),
    })
}

fn worm_tile(
    m: &mut Matrix,
    send: SendFn,
    d: Duration,
    worm_size: usize,
    tile_index: u8,
    length: u8,
    color: Hsbk,
) -> Result<()> {
    m.clear();
    let mut cache = PixelCache::new(worm_size);
    let mut pixels_set = 0;

    let mut y = 0;
    let mut reversed = false;
    for i in 0..m.size {
        let (x, ny) = next_pixel(m, i, y, &mut reversed);
        y = ny;
        if pixels_set == worm_size {
            let tail = cache.pixels();
            m.clear_pixels(&tail);
            pixels_set = 0;
        }
        pixels_set += 1;
        cache.set(i % worm_size, x, y);

        m.set_pixel(x, y, color);
        send_frame(m, send, tile_index, length, d)?;
        thread::sleep(d);
    }

    fade_tail(m, send, d, &cache, tile_index, length)
}

/// Moves a multi-pixel snake along the matrix with a serpentine walk,
/// clearing only the oldest pixel each step for continuous motion.
/// Repeats for `cycles` full passes; 0 repeats indefinitely.
pub fn snake(
    m: &mut Matrix,
    send: SendFn,
    interval_ms: u64,
    cycles: u32,
    mode: ChainMode,
    size: usize,
    color: Hsbk,
) -> Result<()> {
    let d = interval(interval_ms);
    let chain_length = m.chain_length as u8;
    let snake_size = size.clamp(1, m.width);

    repeat_for_cycles(cycles, &mut || match mode {
        ChainMode::Sequential => {
            for ti in 0..chain_length {
                snake_tile(m, send, d, snake_size, ti, 1, color)?;
            }
            Ok(())
        }
        ChainMode::Synced => snake_tile(m, send, d, snake_size, 0, chain_length, color),
        ChainMode::None => snake_tile(m, send, d, snake_size, 0, 1, color),
    })
}

fn snake_tile(
    m: &mut Matrix,
    send: SendFn,
    d: Duration,
    snake_size: usize,
    tile_index: u8,
    length: u8,
    color: Hsbk,
) -> Result<()> {
    m.clear();
    let mut cache = PixelCache::new(snake_size);

    let mut y = 0;
    let mut reversed = false;
    for i in 0..m.size {
        let (x, ny) = next_pixel(m, i, y, &mut reversed);
        y = ny;
        let slot = i % snake_size;
        if let Some(oldest) = cache.get(slot) {
            m.set_pixel(oldest.x, oldest.y, Hsbk::default());
        }
        cache.set(slot, x, y);

        m.set_pixel(x, y, color);
        send_frame(m, send, tile_index, length, d)?;
        thread::sleep(d);
    }

    fade_tail(m, send, d, &cache, tile_index, length)
}

/// Draws concentric borders moving in the given direction. With an empty
/// palette the hue is randomized on every frame; with multiple colors,
/// each full cycle advances to the next one. Repeats for `cycles` full
/// passes; 0 repeats indefinitely.
pub fn concentric_frames(
    m: &mut Matrix,
    send: SendFn,
    interval_ms: u64,
    cycles: u32,
    mode: ChainMode,
    direction: AnimationDirection,
    colors: &[Hsbk],
) -> Result<()> {
    let d = interval(interval_ms);
    let chain_length = m.chain_length as u8;
    let max_steps = m.max_padding() + 1;

    let mut cycle = 0usize;
    repeat_for_cycles(cycles, &mut || {
        let color = if colors.is_empty() {
            None
        } else {
            Some(colors[cycle % colors.len()])
        };
        cycle += 1;

        match mode {
            ChainMode::Sequential => {
                for ti in 0..chain_length {
                    concentric_tile(m, send, d, ti, 1, direction, max_steps, color)?;
                }
                Ok(())
            }
            ChainMode::Synced => {
                concentric_tile(m, send, d, 0, chain_length, direction, max_steps, color)
            }
            ChainMode::None => concentric_tile(m, send, d, 0, 1, direction, max_steps, color),
        }
    })
}

#[allow(clippy::too_many_arguments)]
fn concentric_tile(
    m: &mut Matrix,
    send: SendFn,
    d: Duration,
    tile_index: u8,
    length: u8,
    direction: AnimationDirection,
    max_steps: usize,
    color: Option<Hsbk>,
) -> Result<()> {
    m.clear();

    let steps: Box<dyn Iterator<Item = usize>> = match direction {
        AnimationDirection::Inwards => Box::new(iterate_up(0, max_steps)),
        AnimationDirection::Outwards => Box::new(iterate_down(max_steps, 0)),
        AnimationDirection::InOut => Box::new(bounce_up(max_steps)),
        AnimationDirection::OutIn => Box::new(bounce_down(max_steps)),
    };

    for padding in steps {
        // Without a palette color the hue is rerolled on every frame.
        let frame_color = color.unwrap_or_else(random_frame_color);
        m.clear();
        m.set_border(padding, &[frame_color]);
        send_frame(m, send, tile_index, length, d)?;
        thread::sleep(d);
    }
    Ok(())
}

fn random_frame_color() -> Hsbk {
    Hsbk {
        hue: rand::thread_rng().gen_range(0..u16::MAX),
        saturation: u16::MAX,
        brightness: u16::MAX,
        kelvin: 3500,
    }
}

/// Sends the current canvas as one frame. Chains above 64 zones go
/// through the off-screen framebuffer and a single flip: the packet
/// writes carry zero duration and only the flip carries the frame
/// interval.
fn send_frame(m: &Matrix, send: SendFn, tile_index: u8, length: u8, d: Duration) -> Result<()> {
    if m.size > 64 {
        for msg in messages::set_matrix_colors_from_slice(
            tile_index,
            length,
            m.width as u8,
            &m.flatten_colors_slice(),
            d,
        ) {
            send(msg)?;
        }
        return Ok(());
    }
    send(messages::set_matrix_colors(
        tile_index,
        length,
        m.width as u8,
        m.flatten_colors(),
        MIN_INTERVAL,
    ))
}

/// Clears the cached tail one pixel at a time, emitting a frame per step.
fn fade_tail(
    m: &mut Matrix,
    send: SendFn,
    d: Duration,
    cache: &PixelCache,
    tile_index: u8,
    length: u8,
) -> Result<()> {
    for p in cache.pixels() {
        m.clear_pixels(&[p]);
        send_frame(m, send, tile_index, length, d)?;
        thread::sleep(d);
    }
    Ok(())
}

/// The next serpentine-walk position for step `i`. The direction toggles
/// at every row boundary before the x coordinate is mirrored, so a
/// reversed row starts at the far edge.
fn next_pixel(m: &Matrix, i: usize, mut y: usize, reversed: &mut bool) -> (usize, usize) {
    let mut x = i % m.width;
    if i > 0 && x == 0 {
        y += 1;
        *reversed = !*reversed;
    }
    if *reversed {
        x = m.max_x() - x;
    }
    (x, y)
}

fn interval(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms).max(MIN_INTERVAL)
}

/// Repeats the given function for n cycles or indefinitely if cycles
/// is 0.
fn repeat_for_cycles(cycles: u32, f: &mut dyn FnMut() -> Result<()>) -> Result<()> {
    if cycles > 0 {
        for _ in 0..cycles {
            f()?;
        }
        return Ok(());
    }
    loop {
        f()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packets::{Payload, TileCopyFrameBuffer, TileSet64};

    fn k(kelvin: u16) -> Hsbk {
        Hsbk {
            kelvin,
            ..Default::default()
        }
    }

    /// A TileSet64 payload with the given cells set, everything else
    /// default: the shape every sub-64-zone effect frame takes.
    fn frame(width: u8, tile_index: u8, length: u8, cells: &[(usize, u16)]) -> Payload {
        let mut colors = [Hsbk::default(); 64];
        for &(i, kelvin) in cells {
            colors[i] = k(kelvin);
        }
        Payload::TileSet64(TileSet64 {
            tile_index,
            length,
            rect: crate::protocol::packets::TileBufferRect {
                width,
                ..Default::default()
            },
            duration: 1,
            colors,
        })
    }

    fn collect_frames<F>(run: F) -> Vec<Payload>
    where
        F: FnOnce(SendFn) -> Result<()>,
    {
        let mut got = Vec::new();
        {
            let mut send = |msg: Message| {
                got.push(msg.payload.clone());
                Ok(())
            };
            run(&mut send).unwrap();
        }
        got
    }

    #[test]
    fn test_parse_chain_mode() {
        assert_eq!(ChainMode::parse(0), ChainMode::None);
        assert_eq!(ChainMode::parse(1), ChainMode::Sequential);
        assert_eq!(ChainMode::parse(2), ChainMode::Synced);
        assert_eq!(ChainMode::parse(100), ChainMode::None);
    }

    #[test]
    fn test_parse_animation_direction() {
        assert_eq!(AnimationDirection::parse(0), AnimationDirection::Inwards);
        assert_eq!(AnimationDirection::parse(1), AnimationDirection::Outwards);
        assert_eq!(AnimationDirection::parse(2), AnimationDirection::InOut);
        assert_eq!(AnimationDirection::parse(3), AnimationDirection::OutIn);
        assert_eq!(AnimationDirection::parse(100), AnimationDirection::Inwards);
    }

    #[test]
    fn test_send_with_stop() {
        let (mut wrapped, stop) = send_with_stop(|_msg| Ok(()));

        assert!(wrapped(Message::new(Payload::LightGet)).is_ok());
        stop.store(true, Ordering::Relaxed);
        assert!(matches!(
            wrapped(Message::new(Payload::LightGet)),
            Err(Error::Stopped)
        ));
    }

    #[test]
    fn test_stop_unwinds_running_effect() {
        let (mut wrapped, stop) = send_with_stop(|_msg| Ok(()));
        stop.store(true, Ordering::Relaxed);

        let mut m = Matrix::new(4, 4, 1);
        let err = waterfall(&mut m, &mut wrapped, 1, 0, ChainMode::None, &[k(3500)]);
        assert!(matches!(err, Err(Error::Stopped)));
    }

    #[test]
    fn test_waterfall_missing_colors() {
        let mut m = Matrix::new(4, 4, 2);
        let mut send = |_msg: Message| Ok(());
        assert!(matches!(
            waterfall(&mut m, &mut send, 1, 1, ChainMode::None, &[]),
            Err(Error::MissingColors)
        ));
    }

    #[test]
    fn test_waterfall_single_tile() {
        let mut m = Matrix::new(4, 4, 2);
        let got = collect_frames(|send| {
            waterfall(&mut m, send, 1, 1, ChainMode::None, &[k(3500), k(3600)])
        });

        // Rows accumulate the centered palette one row per frame.
        let rows = |n: usize| -> Vec<(usize, u16)> {
            (0..n)
                .flat_map(|r| [(r * 4 + 1, 3500), (r * 4 + 2, 3600)])
                .collect()
        };
        let want = vec![
            frame(4, 0, 1, &rows(1)),
            frame(4, 0, 1, &rows(2)),
            frame(4, 0, 1, &rows(3)),
            frame(4, 0, 1, &rows(4)),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_waterfall_sequential() {
        let mut m = Matrix::new(4, 4, 2);
        let got = collect_frames(|send| {
            waterfall(&mut m, send, 1, 1, ChainMode::Sequential, &[k(3500), k(3600)])
        });

        assert_eq!(got.len(), 8);
        for (i, payload) in got.iter().enumerate() {
            let Payload::TileSet64(p) = payload else {
                panic!("expected TileSet64")
            };
            assert_eq!(p.tile_index, (i / 4) as u8);
            assert_eq!(p.length, 1);
        }
    }

    #[test]
    fn test_waterfall_synced() {
        let mut m = Matrix::new(4, 4, 2);
        let got = collect_frames(|send| {
            waterfall(&mut m, send, 1, 1, ChainMode::Synced, &[k(3500), k(3600)])
        });

        assert_eq!(got.len(), 4);
        for payload in &got {
            let Payload::TileSet64(p) = payload else {
                panic!("expected TileSet64")
            };
            assert_eq!((p.tile_index, p.length), (0, 2));
        }
    }

    #[test]
    fn test_waterfall_truncates_palette_to_width() {
        let mut m = Matrix::new(2, 2, 1);
        let got = collect_frames(|send| {
            waterfall(
                &mut m,
                send,
                1,
                1,
                ChainMode::None,
                &[k(3500), k(3600), k(3700)],
            )
        });

        let want = vec![
            frame(2, 0, 1, &[(0, 3500), (1, 3600)]),
            frame(2, 0, 1, &[(0, 3500), (1, 3600), (2, 3500), (3, 3600)]),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_rockets_missing_colors() {
        let mut m = Matrix::new(2, 2, 1);
        let mut send = |_msg: Message| Ok(());
        assert!(matches!(
            rockets(&mut m, &mut send, 1, 1, ChainMode::None, &[]),
            Err(Error::MissingColors)
        ));
    }

    #[test]
    fn test_rockets_single_tile() {
        let mut m = Matrix::new(2, 2, 2);
        let got =
            collect_frames(|send| rockets(&mut m, send, 1, 1, ChainMode::None, &[k(3500)]));

        let want = vec![
            frame(2, 0, 1, &[(0, 3500)]),
            frame(2, 0, 1, &[(1, 3500)]),
            frame(2, 0, 1, &[(2, 3500)]),
            frame(2, 0, 1, &[(3, 3500)]),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_rockets_color_switches_per_row() {
        let mut m = Matrix::new(2, 2, 1);
        let got = collect_frames(|send| {
            rockets(&mut m, send, 1, 1, ChainMode::None, &[k(3500), k(3600)])
        });

        let want = vec![
            frame(2, 0, 1, &[(0, 3500)]),
            frame(2, 0, 1, &[(1, 3500)]),
            frame(2, 0, 1, &[(2, 3600)]),
            frame(2, 0, 1, &[(3, 3600)]),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_rockets_synced() {
        let mut m = Matrix::new(2, 2, 2);
        let got =
            collect_frames(|send| rockets(&mut m, send, 1, 1, ChainMode::Synced, &[k(3500)]));

        let want = vec![
            frame(2, 0, 2, &[(0, 3500)]),
            frame(2, 0, 2, &[(1, 3500)]),
            frame(2, 0, 2, &[(2, 3500)]),
            frame(2, 0, 2, &[(3, 3500)]),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_rockets_cycles() {
        let mut m = Matrix::new(2, 2, 1);
        let got =
            collect_frames(|send| rockets(&mut m, send, 1, 2, ChainMode::None, &[k(3500)]));
        assert_eq!(got.len(), 8);
        assert_eq!(got[0], got[4]);
    }

    #[test]
    fn test_worm_single_tile() {
        let mut m = Matrix::new(2, 2, 2);
        let got = collect_frames(|send| worm(&mut m, send, 1, 1, ChainMode::None, 2, k(3500)));

        // The whole tail clears at once when the body is complete, then
        // fades pixel by pixel at the end.
        let want = vec![
            frame(2, 0, 1, &[(0, 3500)]),
            frame(2, 0, 1, &[(0, 3500), (1, 3500)]),
            frame(2, 0, 1, &[(3, 3500)]),
            frame(2, 0, 1, &[(2, 3500), (3, 3500)]),
            frame(2, 0, 1, &[(2, 3500)]),
            frame(2, 0, 1, &[]),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_worm_sequential() {
        let mut m = Matrix::new(2, 2, 2);
        let got =
            collect_frames(|send| worm(&mut m, send, 1, 1, ChainMode::Sequential, 2, k(3500)));

        assert_eq!(got.len(), 12);
        for (i, payload) in got.iter().enumerate() {
            let Payload::TileSet64(p) = payload else {
                panic!("expected TileSet64")
            };
            assert_eq!(p.tile_index, (i / 6) as u8);
        }
    }

    #[test]
    fn test_snake_single_tile() {
        let mut m = Matrix::new(2, 2, 2);
        let got = collect_frames(|send| snake(&mut m, send, 1, 1, ChainMode::None, 2, k(3500)));

        // Continuous motion: exactly one pixel clears per step.
        let want = vec![
            frame(2, 0, 1, &[(0, 3500)]),
            frame(2, 0, 1, &[(0, 3500), (1, 3500)]),
            frame(2, 0, 1, &[(1, 3500), (3, 3500)]),
            frame(2, 0, 1, &[(2, 3500), (3, 3500)]),
            frame(2, 0, 1, &[(2, 3500)]),
            frame(2, 0, 1, &[]),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_snake_synced() {
        let mut m = Matrix::new(2, 2, 2);
        let got =
            collect_frames(|send| snake(&mut m, send, 1, 1, ChainMode::Synced, 2, k(3500)));

        assert_eq!(got.len(), 6);
        for payload in &got {
            let Payload::TileSet64(p) = payload else {
                panic!("expected TileSet64")
            };
            assert_eq!((p.tile_index, p.length), (0, 2));
        }
    }

    #[test]
    fn test_snake_size_clamped_to_width() {
        let mut m = Matrix::new(2, 2, 1);
        // Size 10 clamps to the 2-wide matrix.
        let got = collect_frames(|send| snake(&mut m, send, 1, 1, ChainMode::None, 10, k(3500)));
        assert_eq!(got.len(), 6);
    }

    fn border_cells(width: usize, kelvin: u16, padding: usize, size: usize) -> Vec<(usize, u16)> {
        let mut m = Matrix::new(width, size / width, 0);
        m.set_border(padding, &[k(kelvin)]);
        let mut cells = Vec::new();
        for (i, c) in m.flatten_colors().iter().enumerate() {
            if c.kelvin != 0 {
                cells.push((i, c.kelvin));
            }
        }
        cells
    }

    #[test]
    fn test_concentric_frames_inwards() {
        let mut m = Matrix::new(6, 6, 2);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                1,
                ChainMode::None,
                AnimationDirection::Inwards,
                &[k(3500)],
            )
        });

        let want = vec![
            frame(6, 0, 1, &border_cells(6, 3500, 0, 36)),
            frame(6, 0, 1, &border_cells(6, 3500, 1, 36)),
            frame(6, 0, 1, &border_cells(6, 3500, 2, 36)),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_concentric_frames_outwards() {
        let mut m = Matrix::new(6, 6, 2);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                1,
                ChainMode::None,
                AnimationDirection::Outwards,
                &[k(3500)],
            )
        });

        let want = vec![
            frame(6, 0, 1, &border_cells(6, 3500, 2, 36)),
            frame(6, 0, 1, &border_cells(6, 3500, 1, 36)),
            frame(6, 0, 1, &border_cells(6, 3500, 0, 36)),
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_concentric_frames_in_out() {
        let mut m = Matrix::new(6, 6, 2);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                1,
                ChainMode::None,
                AnimationDirection::InOut,
                &[k(3500)],
            )
        });

        // Paddings 0, 1, 2, 1.
        assert_eq!(got.len(), 4);
        assert_eq!(got[1], got[3]);
        assert_eq!(got[0], frame(6, 0, 1, &border_cells(6, 3500, 0, 36)));
        assert_eq!(got[2], frame(6, 0, 1, &border_cells(6, 3500, 2, 36)));
    }

    #[test]
    fn test_concentric_frames_out_in() {
        let mut m = Matrix::new(6, 6, 2);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                1,
                ChainMode::None,
                AnimationDirection::OutIn,
                &[k(3500)],
            )
        });

        // Paddings 2, 1, 0, 1.
        assert_eq!(got.len(), 4);
        assert_eq!(got[1], got[3]);
        assert_eq!(got[0], frame(6, 0, 1, &border_cells(6, 3500, 2, 36)));
        assert_eq!(got[2], frame(6, 0, 1, &border_cells(6, 3500, 0, 36)));
    }

    #[test]
    fn test_concentric_frames_sequential() {
        let mut m = Matrix::new(6, 6, 2);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                1,
                ChainMode::Sequential,
                AnimationDirection::Inwards,
                &[k(3500)],
            )
        });

        assert_eq!(got.len(), 6);
        for (i, payload) in got.iter().enumerate() {
            let Payload::TileSet64(p) = payload else {
                panic!("expected TileSet64")
            };
            assert_eq!(p.tile_index, (i / 3) as u8);
        }
    }

    #[test]
    fn test_concentric_frames_palette_advances_per_cycle() {
        let mut m = Matrix::new(6, 6, 1);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                2,
                ChainMode::None,
                AnimationDirection::Inwards,
                &[k(3500), k(3600)],
            )
        });

        assert_eq!(got.len(), 6);
        let first_cycle = vec![
            frame(6, 0, 1, &border_cells(6, 3500, 0, 36)),
            frame(6, 0, 1, &border_cells(6, 3500, 1, 36)),
            frame(6, 0, 1, &border_cells(6, 3500, 2, 36)),
        ];
        let second_cycle = vec![
            frame(6, 0, 1, &border_cells(6, 3600, 0, 36)),
            frame(6, 0, 1, &border_cells(6, 3600, 1, 36)),
            frame(6, 0, 1, &border_cells(6, 3600, 2, 36)),
        ];
        assert_eq!(&got[..3], &first_cycle[..]);
        assert_eq!(&got[3..], &second_cycle[..]);
    }

    #[test]
    fn test_concentric_frames_random_color_has_fixed_channels() {
        let mut m = Matrix::new(4, 4, 1);
        let got = collect_frames(|send| {
            concentric_frames(
                &mut m,
                send,
                1,
                1,
                ChainMode::None,
                AnimationDirection::Inwards,
                &[],
            )
        });

        assert_eq!(got.len(), 2);
        for payload in &got {
            let Payload::TileSet64(p) = payload else {
                panic!("expected TileSet64")
            };
            let lit: Vec<&Hsbk> = p.colors.iter().filter(|c| **c != Hsbk::default()).collect();
            assert!(!lit.is_empty());
            for c in lit {
                assert_eq!(c.saturation, u16::MAX);
                assert_eq!(c.brightness, u16::MAX);
                assert_eq!(c.kelvin, 3500);
            }
        }
    }

    #[test]
    fn test_large_matrix_frames_use_framebuffer_flip() {
        let mut m = Matrix::new(16, 8, 1);
        let got = collect_frames(|send| {
            waterfall(&mut m, send, 20, 1, ChainMode::None, &[k(3500), k(3600)])
        });

        // 8 rows, each frame = 2 off-screen packets + 1 flip. The
        // packet writes carry zero duration; the flip carries the frame
        // interval.
        assert_eq!(got.len(), 24);
        for step in got.chunks(3) {
            let Payload::TileSet64(first) = &step[0] else {
                panic!("expected TileSet64")
            };
            let Payload::TileSet64(second) = &step[1] else {
                panic!("expected TileSet64")
            };
            let Payload::TileCopyFrameBuffer(flip) = &step[2] else {
                panic!("expected TileCopyFrameBuffer")
            };

            assert_eq!((first.rect.fb_index, first.rect.y, first.duration), (1, 0, 0));
            assert_eq!((second.rect.fb_index, second.rect.y, second.duration), (1, 4, 0));
            assert_eq!(first.rect.width, 16);
            assert_eq!(
                flip,
                &TileCopyFrameBuffer {
                    tile_index: 0,
                    length: 1,
                    dst_fb_index: 0,
                    src_fb_index: 1,
                    width: 16,
                    height: 8,
                    duration: 20,
                }
            );
        }

        // The first step lights the centered palette on row 0.
        let Payload::TileSet64(first) = &got[0] else {
            panic!("expected TileSet64")
        };
        assert_eq!(first.colors[7], k(3500));
        assert_eq!(first.colors[8], k(3600));
    }
}
