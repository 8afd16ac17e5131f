//! Property-based tests for normalization, capability expansion and frame timing.

use std::collections::BTreeSet;

use hidmotion::caps::resolve;
use hidmotion::motion::{elapsed_since, MotionFrame, MAX_ELAPSED_MS, MAX_TIME_TO_LIVE};
use hidmotion::normalize::normalize_range;
use hidmotion::{CapabilitySet, DeviceClass, UsageSpec, ValueCap};
use proptest::prelude::*;

/// Ordered `(min, center, max)` calibration triples.
fn bounds() -> impl Strategy<Value = (i32, i32, i32)> {
    (-40_000i32..40_000, 0i32..40_000, 0i32..40_000).prop_map(|(min, a, b)| (min, min + a, min + a + b))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_normalized_values_stay_in_unit_range((min, center, max) in bounds(), raw in any::<i32>()) {
        let v = normalize_range(raw, min, center, max);
        prop_assert!((-1.0..=1.0).contains(&v), "{raw} -> {v}");
    }

    #[test]
    fn prop_center_maps_to_zero((min, center, max) in bounds()) {
        prop_assert_eq!(normalize_range(center, min, center, max), 0.0);
    }

    #[test]
    fn prop_normalization_is_monotonic((min, center, max) in bounds(), a in -50_000i32..50_000, b in -50_000i32..50_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(normalize_range(lo, min, center, max) <= normalize_range(hi, min, center, max));
    }

    #[test]
    fn prop_range_expands_to_one_descriptor_per_usage(
        usage_min in 0u16..0x100,
        len in 1u16..64,
        data_index_min in 0u16..1000,
    ) {
        let usage_max = usage_min + len - 1;
        let caps = CapabilitySet {
            buttons: vec![],
            values: vec![ValueCap {
                report_id: 1,
                usage_page: 0xff00,
                link_collection: 0,
                usages: UsageSpec::Range {
                    usage_min,
                    usage_max,
                    data_index_min,
                    data_index_max: data_index_min + len - 1,
                },
                logical_min: 0,
                logical_max: 255,
                physical_min: 0,
                physical_max: 255,
                bit_size: 8,
            }],
        };
        let set = resolve(&caps, DeviceClass::MultiAxisController);
        prop_assert_eq!(set.axes.len(), usize::from(len));
        let usages: BTreeSet<u16> = set.axes.iter().map(|a| a.usage).collect();
        let indices: BTreeSet<u16> = set.axes.iter().map(|a| a.data_index).collect();
        prop_assert_eq!(usages, (usage_min..=usage_max).collect::<BTreeSet<_>>());
        prop_assert_eq!(indices.len(), usize::from(len));
        prop_assert!(set.axes.windows(2).all(|w| w[0].data_index < w[1].data_index));
    }

    #[test]
    fn prop_elapsed_time_is_bounded(last in proptest::option::of(any::<u32>()), now in any::<u32>()) {
        let e = elapsed_since(last, now);
        prop_assert!((1..=MAX_ELAPSED_MS).contains(&e));
    }

    #[test]
    fn prop_silent_frames_reach_rest(axes in proptest::array::uniform6(-1.0f32..=1.0), ticks in 5usize..20) {
        let mut frame = MotionFrame { axes, time_to_live: MAX_TIME_TO_LIVE, is_dirty: false };
        for _ in 0..ticks {
            frame.decay();
            prop_assert!(frame.time_to_live <= MAX_TIME_TO_LIVE);
        }
        prop_assert_eq!(frame.time_to_live, 0);
        prop_assert!(frame.is_zero());
    }
}
