//! Multizone message builders

use super::{duration_ms, hsbk_array};
use crate::protocol::{
    packets::{
        Hsbk, MultiZoneEffectSettings, MultiZoneEffectType, MultiZoneExtendedApplicationRequest,
        MultiZoneExtendedSetColorZones, MultiZoneSetEffect, Payload,
        EXTENDED_MULTIZONE_MAX_ZONES,
    },
    Message,
};
use rand::Rng;
use std::time::Duration;

/// Builds the extended multizone color messages for an arbitrary-length
/// color list, catering for devices with more zones than a single
/// message supports (82).
///
/// A single chunk carries the `Apply` directive itself. Multiple chunks
/// are buffered with `ApplyOnly` and a final empty apply message
/// triggers them atomically. `start_index` is the zone the colors apply
/// from.
pub fn set_multizone_extended_colors(
    start_index: u16,
    colors: &[Hsbk],
    duration: Duration,
) -> Vec<Message> {
    let mut msgs: Vec<Message> = colors
        .chunks(EXTENDED_MULTIZONE_MAX_ZONES)
        .enumerate()
        .map(|(i, chunk)| {
            Message::new(Payload::MultiZoneExtendedSetColorZones(
                MultiZoneExtendedSetColorZones {
                    duration: duration_ms(duration),
                    apply: MultiZoneExtendedApplicationRequest::NoApply,
                    index: start_index + (i * EXTENDED_MULTIZONE_MAX_ZONES) as u16,
                    colors_count: chunk.len() as u8,
                    colors: hsbk_array::<EXTENDED_MULTIZONE_MAX_ZONES>(chunk),
                },
            ))
        })
        .collect();

    if msgs.len() == 1 {
        if let Payload::MultiZoneExtendedSetColorZones(p) = &mut msgs[0].payload {
            p.apply = MultiZoneExtendedApplicationRequest::Apply;
        }
    } else {
        for msg in &mut msgs {
            if let Payload::MultiZoneExtendedSetColorZones(p) = &mut msg.payload {
                p.apply = MultiZoneExtendedApplicationRequest::ApplyOnly;
            }
        }
        msgs.push(Message::new(Payload::MultiZoneExtendedSetColorZones(
            MultiZoneExtendedSetColorZones {
                apply: MultiZoneExtendedApplicationRequest::Apply,
                ..Default::default()
            },
        )));
    }

    msgs
}

/// Turns any running multizone firmware effect off.
pub fn set_multizone_effect_off() -> Message {
    Message::new(Payload::MultiZoneSetEffect(MultiZoneSetEffect {
        settings: MultiZoneEffectSettings {
            instanceid: rand::thread_rng().gen(),
            effect_type: MultiZoneEffectType::Off,
            ..Default::default()
        },
    }))
}

/// Runs the Move firmware effect in the given direction.
pub fn set_multizone_move_effect(speed: Duration, direction_forward: bool) -> Message {
    let mut settings = MultiZoneEffectSettings {
        instanceid: rand::thread_rng().gen(),
        effect_type: MultiZoneEffectType::Move,
        speed: duration_ms(speed),
        ..Default::default()
    };
    settings.parameter[1] = direction_forward as u32;
    Message::new(Payload::MultiZoneSetEffect(MultiZoneSetEffect { settings }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n_colors(n: usize) -> Vec<Hsbk> {
        (0..n)
            .map(|i| Hsbk {
                hue: i as u16,
                ..Default::default()
            })
            .collect()
    }

    fn as_extended(msg: &Message) -> &MultiZoneExtendedSetColorZones {
        match &msg.payload {
            Payload::MultiZoneExtendedSetColorZones(p) => p,
            other => panic!("expected extended colors message, got {:?}", other.payload_type()),
        }
    }

    #[test]
    fn test_single_chunk_applies_inline() {
        let colors = n_colors(24);
        let msgs = set_multizone_extended_colors(0, &colors, Duration::from_secs(1));

        assert_eq!(msgs.len(), 1);
        let p = as_extended(&msgs[0]);
        assert_eq!(p.apply, MultiZoneExtendedApplicationRequest::Apply);
        assert_eq!(p.index, 0);
        assert_eq!(p.colors_count, 24);
        assert_eq!(p.duration, 1000);
        assert_eq!(&p.colors[..24], &colors[..]);
    }

    #[test]
    fn test_exactly_82_colors_is_single_message() {
        let msgs = set_multizone_extended_colors(0, &n_colors(82), Duration::ZERO);
        assert_eq!(msgs.len(), 1);
        assert_eq!(
            as_extended(&msgs[0]).apply,
            MultiZoneExtendedApplicationRequest::Apply
        );
    }

    #[test]
    fn test_multiple_chunks_buffer_then_apply() {
        let colors = n_colors(200);
        let msgs = set_multizone_extended_colors(0, &colors, Duration::from_secs(1));

        // ceil(200 / 82) buffered chunks plus the final apply trigger.
        assert_eq!(msgs.len(), 4);

        let first = as_extended(&msgs[0]);
        assert_eq!(first.apply, MultiZoneExtendedApplicationRequest::ApplyOnly);
        assert_eq!((first.index, first.colors_count), (0, 82));

        let second = as_extended(&msgs[1]);
        assert_eq!(second.apply, MultiZoneExtendedApplicationRequest::ApplyOnly);
        assert_eq!((second.index, second.colors_count), (82, 82));

        let third = as_extended(&msgs[2]);
        assert_eq!(third.apply, MultiZoneExtendedApplicationRequest::ApplyOnly);
        assert_eq!((third.index, third.colors_count), (164, 36));

        let trigger = as_extended(&msgs[3]);
        assert_eq!(trigger.apply, MultiZoneExtendedApplicationRequest::Apply);
        assert_eq!(trigger.colors_count, 0);
    }

    #[test]
    fn test_start_index_offsets_chunks() {
        let msgs = set_multizone_extended_colors(10, &n_colors(100), Duration::ZERO);
        assert_eq!(as_extended(&msgs[0]).index, 10);
        assert_eq!(as_extended(&msgs[1]).index, 92);
    }

    #[test]
    fn test_multizone_effect_builders() {
        let off = set_multizone_effect_off();
        let Payload::MultiZoneSetEffect(p) = off.payload else {
            panic!("expected MultiZoneSetEffect")
        };
        assert_eq!(p.settings.effect_type, MultiZoneEffectType::Off);

        let fwd = set_multizone_move_effect(Duration::from_secs(5), true);
        let Payload::MultiZoneSetEffect(p) = fwd.payload else {
            panic!("expected MultiZoneSetEffect")
        };
        assert_eq!(p.settings.effect_type, MultiZoneEffectType::Move);
        assert_eq!(p.settings.speed, 5000);
        assert_eq!(p.settings.parameter[1], 1);

        let back = set_multizone_move_effect(Duration::from_secs(5), false);
        let Payload::MultiZoneSetEffect(p) = back.payload else {
            panic!("expected MultiZoneSetEffect")
        };
        assert_eq!(p.settings.parameter[1], 0);
    }
}
