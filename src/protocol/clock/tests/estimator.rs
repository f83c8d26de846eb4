use proptest::prelude::*;

use crate::protocol::clock::{ClockOffsetEstimator, OffsetCorrection, SubSamples, TimestampPair};

/// At this rate one nanosecond is exactly one sub-sample, which makes
/// residuals easy to dial in: residual = ptp_nanos - media_samples * 8.
const NANOS_AS_SUBS_RATE: u32 = 125_000_000;

fn pair_for_residual(residual: u64) -> TimestampPair {
    TimestampPair::new(residual, 0)
}

/// Pair whose residual is `residual` sub-samples, negative values included.
fn pair_for_signed_residual(residual: i64) -> TimestampPair {
    const MEDIA: u32 = 1_000_000;
    let ptp = i64::from(MEDIA) * 8 + residual;
    TimestampPair::new(u64::try_from(ptp).unwrap(), MEDIA)
}

#[test]
fn test_unit_rate_helper() {
    let est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 0);
    assert_eq!(est.residual(TimestampPair::new(801, 100)), SubSamples(1));
}

// ===== Construction =====

#[test]
fn test_new_seeds_state_from_initial_offset() {
    let est = ClockOffsetEstimator::new(48_000, 100);
    assert_eq!(est.last_applied_offset(), 100);
    assert_eq!(est.last_sub_samples(), SubSamples(800));
    assert_eq!(est.sample_rate(), 48_000);
    assert_eq!(
        est.drift_threshold(),
        ClockOffsetEstimator::DEFAULT_DRIFT_THRESHOLD
    );
}

#[test]
fn test_threshold_clamped_to_one() {
    let est = ClockOffsetEstimator::new(48_000, 0).with_drift_threshold(0);
    assert_eq!(est.drift_threshold(), 1);
}

// ===== Corrections =====

#[test]
fn test_three_sample_drift_at_48k() {
    let mut est = ClockOffsetEstimator::new(48_000, 0);

    assert_eq!(est.process(TimestampPair::new(0, 0)), None);

    // 62.5 us is exactly three samples at 48 kHz.
    let correction = est.process(TimestampPair::new(62_500, 0));
    assert_eq!(
        correction,
        Some(OffsetCorrection {
            old_offset: 0,
            new_offset: 3
        })
    );
    assert_eq!(est.last_applied_offset(), 3);
}

#[test]
fn test_identical_pair_twice_fires_once() {
    let mut est = ClockOffsetEstimator::new(48_000, 0);
    let pair = TimestampPair::new(1_000_000_000, 47_990);

    let first = est.process(pair);
    assert_eq!(
        first,
        Some(OffsetCorrection {
            old_offset: 0,
            new_offset: 10
        })
    );
    assert_eq!(est.process(pair), None);
    assert_eq!(est.process(pair), None);
}

#[test]
fn test_large_drift_with_same_rounded_offset_is_silent() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 100);
    // Residual moves from 800 to 803 (>= threshold) but still rounds to 100.
    assert_eq!(est.process(pair_for_residual(803)), None);
    assert_eq!(est.last_sub_samples(), SubSamples(803));
    assert_eq!(est.last_applied_offset(), 100);
}

#[test]
fn test_backward_correction() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 100);
    let correction = est.process(pair_for_residual(784)).unwrap();
    assert_eq!(correction.old_offset, 100);
    assert_eq!(correction.new_offset, 98);
    assert_eq!(correction.delta(), -2);
}

#[test]
fn test_residual_tracked_even_without_correction() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 100);
    assert_eq!(est.process(pair_for_residual(801)), None);
    assert_eq!(est.last_sub_samples(), SubSamples(801));
}

#[test]
fn test_slow_drift_below_threshold_is_not_corrected() {
    // Hysteresis compares against the previous residual, so a residual
    // creeping by one sub-sample per tick never triggers a correction.
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 100);
    for residual in 801..=812 {
        assert_eq!(est.process(pair_for_residual(residual)), None);
    }
    assert_eq!(est.last_applied_offset(), 100);
}

#[test]
fn test_custom_threshold() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 100).with_drift_threshold(16);
    // Eight sub-samples (one sample) is below the threshold.
    assert_eq!(est.process(pair_for_residual(808)), None);
    // Jumping another two samples is not.
    assert_eq!(
        est.process(pair_for_residual(824)),
        Some(OffsetCorrection {
            old_offset: 100,
            new_offset: 103
        })
    );
}

#[test]
fn test_wrapped_media_counter_keeps_offset() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 0);
    let first = est.process(pair_for_residual(64)).unwrap();
    assert_eq!(first.new_offset, 8);

    // PTP time runs 2^32 samples further than the media counter can show:
    // a huge residual jump, but the same register value modulo 2^32.
    let wrapped = (1u64 << 35) + 64;
    assert_eq!(est.process(pair_for_residual(wrapped)), None);
    assert_eq!(est.last_sub_samples(), SubSamples(wrapped));

    // Both clocks advance five samples: still nothing to do.
    assert_eq!(est.process(TimestampPair::new(wrapped + 40, 5)), None);
    assert_eq!(est.last_applied_offset(), 8);
}

// ===== Residual crossing zero =====

#[test]
fn test_crossing_zero_below_threshold_is_silent() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 0).with_drift_threshold(8);
    assert_eq!(est.process(TimestampPair::new(2, 0)), None);
    // Residual steps from +2 to -5 sub-samples: a drift of 7.
    assert_eq!(est.process(TimestampPair::new(3, 1)), None);
    assert_eq!(est.last_applied_offset(), 0);
}

#[test]
fn test_slow_walk_through_zero_keeps_offset() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 1);
    for residual in [4, 3, 2, 1, 0, -1, -2, -3] {
        assert_eq!(
            est.process(pair_for_signed_residual(residual)),
            None,
            "residual {residual}"
        );
    }
    assert_eq!(est.last_applied_offset(), 1);
}

#[test]
fn test_negative_residual_rounds_to_wrapped_offset() {
    let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 0);
    // One whole sample behind zero.
    let correction = est.process(pair_for_signed_residual(-8)).unwrap();
    assert_eq!(correction.old_offset, 0);
    assert_eq!(correction.new_offset, u32::MAX);
    assert_eq!(correction.delta(), -1);

    // Back to zero is a real step of one sample.
    let correction = est.process(pair_for_signed_residual(0)).unwrap();
    assert_eq!(correction.new_offset, 0);
    assert_eq!(correction.delta(), 1);
}

#[test]
fn test_correction_delta_wraps() {
    let c = OffsetCorrection {
        old_offset: u32::MAX,
        new_offset: 1,
    };
    assert_eq!(c.delta(), 2);
}

proptest! {
    #[test]
    fn test_jitter_within_threshold_never_corrects(
        threshold in 1u64..=4,
        offset in 1u32..1_000_000,
        jitter in prop::collection::vec(-3i64..=3, 1..50),
    ) {
        let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, offset)
            .with_drift_threshold(threshold);
        let limit = i64::try_from(threshold).unwrap() - 1;
        let centre = i64::from(offset) * 8;

        for j in jitter {
            let j = j.clamp(-limit, limit);
            let residual = u64::try_from(centre + j).unwrap();
            prop_assert_eq!(est.process(pair_for_residual(residual)), None);
        }
        prop_assert_eq!(est.last_applied_offset(), offset);
    }

    #[test]
    fn test_steps_below_threshold_never_correct_around_zero(
        threshold in 1u64..=64,
        start in -200i64..200,
        steps in prop::collection::vec(-63i64..=63, 1..50),
    ) {
        let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 0)
            .with_drift_threshold(threshold);
        let _ = est.process(pair_for_signed_residual(start));
        let applied = est.last_applied_offset();

        let limit = i64::try_from(threshold).unwrap() - 1;
        let mut residual = start;
        for step in steps {
            residual += step.clamp(-limit, limit);
            prop_assert_eq!(est.process(pair_for_signed_residual(residual)), None);
        }
        prop_assert_eq!(est.last_applied_offset(), applied);
    }

    #[test]
    fn test_repeated_pair_never_repeats_event(ptp in any::<u64>(), media in any::<u32>()) {
        let mut est = ClockOffsetEstimator::new(48_000, 0);
        let pair = TimestampPair::new(ptp, media);
        let _ = est.process(pair);
        prop_assert_eq!(est.process(pair), None);
    }

    #[test]
    fn test_events_always_change_offset(residuals in prop::collection::vec(0u64..100_000, 1..50)) {
        let mut est = ClockOffsetEstimator::new(NANOS_AS_SUBS_RATE, 0);
        for r in residuals {
            let before = est.last_applied_offset();
            if let Some(c) = est.process(pair_for_residual(r)) {
                prop_assert_eq!(c.old_offset, before);
                prop_assert_ne!(c.new_offset, c.old_offset);
            }
        }
    }
}
