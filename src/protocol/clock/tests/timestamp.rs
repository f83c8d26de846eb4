use crate::error::RavennaError;
use crate::protocol::clock::TimestampPair;

// ===== Construction =====

#[test]
fn test_zero_constant() {
    assert_eq!(TimestampPair::ZERO.ptp_nanos, 0);
    assert_eq!(TimestampPair::ZERO.media_samples, 0);
}

#[test]
fn test_split_seconds() {
    let pair = TimestampPair::new(3_250_000_001, 7);
    assert_eq!(pair.ptp_seconds(), 3);
    assert_eq!(pair.ptp_subsec_nanos(), 250_000_001);
}

#[test]
fn test_from_tuple() {
    let pair: TimestampPair = (42u64, 9u32).into();
    assert_eq!(pair, TimestampPair::new(42, 9));
}

// ===== Parsing =====

#[test]
fn test_parse_two_tokens() {
    let pair: TimestampPair = "1700000000123456789 4294967295\n".parse().unwrap();
    assert_eq!(pair.ptp_nanos, 1_700_000_000_123_456_789);
    assert_eq!(pair.media_samples, u32::MAX);
}

#[test]
fn test_parse_tolerates_surrounding_whitespace() {
    let pair: TimestampPair = "  12 34  \n".parse().unwrap();
    assert_eq!(pair, TimestampPair::new(12, 34));
}

#[test]
fn test_parse_rejects_wrong_token_count() {
    for text in ["", "12", "1 2 3", "\n"] {
        let err = text.parse::<TimestampPair>().unwrap_err();
        assert!(
            matches!(err, RavennaError::MalformedPayload { .. }),
            "{text:?} gave {err:?}"
        );
        assert!(err.is_transient());
    }
}

#[test]
fn test_parse_rejects_non_numeric_tokens() {
    assert!("abc 12".parse::<TimestampPair>().is_err());
    assert!("12 -1".parse::<TimestampPair>().is_err());
    // Media counter is 32 bits wide.
    assert!("12 4294967296".parse::<TimestampPair>().is_err());
}

#[test]
fn test_parse_attribute_names_source() {
    let err = TimestampPair::parse_attribute("bogus", "ptp0/rtp_timestamp").unwrap_err();
    let RavennaError::MalformedPayload { what, payload } = err else {
        panic!("unexpected error variant");
    };
    assert_eq!(what, "ptp0/rtp_timestamp");
    assert_eq!(payload, "bogus");
}

#[test]
fn test_display_matches_attribute_format() {
    let pair = TimestampPair::new(1_000, 48);
    assert_eq!(pair.to_string(), "1000 48");
    assert_eq!(pair.to_string().parse::<TimestampPair>().unwrap(), pair);
}
