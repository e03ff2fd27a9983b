//! Property-based tests for the composite identifier codec.
//!
//! The codec has one law: decoding an encoded identifier gives back the
//! original parts, as long as only the last part contains the delimiter.

use provkit_types::{decode, encode, CompositeId};
use proptest::prelude::*;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

/// Parts that never contain the delimiter (may be empty).
fn plain_part() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_./@ -]{0,24}").unwrap()
}

/// Parts that may contain the delimiter anywhere.
fn any_part() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_:./@ -]{0,24}").unwrap()
}

fn parts_with_free_tail(arity: usize) -> impl Strategy<Value = Vec<String>> {
    (prop::collection::vec(plain_part(), arity - 1), any_part()).prop_map(|(mut head, tail)| {
        head.push(tail);
        head
    })
}

// =============================================================================
// ROUND-TRIP PROPERTIES
// =============================================================================

mod roundtrip_properties {
    use super::*;

    proptest! {
        #[test]
        fn two_part_roundtrip(parts in parts_with_free_tail(2)) {
            let id = encode(&parts, 2).unwrap();
            prop_assert_eq!(decode(&id, 2).unwrap(), parts);
        }

        #[test]
        fn three_part_roundtrip(parts in parts_with_free_tail(3)) {
            let id = encode(&parts, 3).unwrap();
            prop_assert_eq!(decode(&id, 3).unwrap(), parts);
        }

        #[test]
        fn n_part_roundtrip(arity in 2usize..8, seed in prop::collection::vec(plain_part(), 8), tail in any_part()) {
            let mut parts: Vec<String> = seed.into_iter().take(arity - 1).collect();
            parts.push(tail);
            let id = encode(&parts, arity).unwrap();
            prop_assert_eq!(decode(&id, arity).unwrap(), parts);
        }

        #[test]
        fn composite_id_display_parses_back(parts in parts_with_free_tail(3)) {
            let id = CompositeId::new(parts.clone()).unwrap();
            let parsed = CompositeId::parse(&id.to_string(), 3).unwrap();
            prop_assert_eq!(parsed, id);
        }
    }
}

// =============================================================================
// FORMAT PROPERTIES
// =============================================================================

mod format_properties {
    use super::*;

    proptest! {
        /// An encoded id always holds exactly arity - 1 delimiters plus those in the tail.
        #[test]
        fn delimiter_count(parts in parts_with_free_tail(3)) {
            let id = encode(&parts, 3).unwrap();
            let tail_colons = parts[2].matches(':').count();
            prop_assert_eq!(id.matches(':').count(), 2 + tail_colons);
        }

        /// Strings without a delimiter never decode as composite ids.
        #[test]
        fn no_delimiter_fails(raw in plain_part(), arity in 2usize..6) {
            prop_assert!(decode(&raw, arity).is_err());
        }

        /// Encoding rejects every part count except the declared arity.
        #[test]
        fn encode_checks_count(parts in prop::collection::vec(plain_part(), 0..6), arity in 2usize..6) {
            let result = encode(&parts, arity);
            prop_assert_eq!(result.is_ok(), parts.len() == arity);
        }
    }
}
