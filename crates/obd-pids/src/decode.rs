//! Mode-01 Response Decoding
//!
//! Maps a raw adapter response string to a target PID's decoded value.
//! Matching is two-stage: the exact "41"+code signature is tried first; only
//! when that fails and the response still starts with "41" is it
//! reinterpreted as some mode-01 reply, best-effort and never
//! authoritative.

use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::pid::PidDefinition;
use crate::unit::SpeedUnit;

/// Length of the "41XX" positive-response signature in characters.
const SIGNATURE_LEN: usize = 4;

/// Normalize a raw response for matching: uppercase, keep only printable
/// non-space characters, drop the prompt. Tolerates responses with or
/// without inter-byte spaces regardless of the adapter's ATS setting.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_graphic() && *c != '>')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Decode a raw response against a target PID.
///
/// Failures are field-local diagnostics, never a reason to abort the cycle.
pub fn decode_response(
    pid: &PidDefinition,
    raw: &str,
    unit: SpeedUnit,
) -> Result<String, DecodeError> {
    let clean = normalize(raw);
    debug!("Parsing cleaned response for {}: {}", pid.command, clean);

    let signature = pid.signature();
    let payload_start = match clean.find(&signature) {
        Some(index) => index + SIGNATURE_LEN,
        None => {
            // The adapter answered some mode-01 request. Take the two
            // digits after "41" as the effective code position and keep
            // going with this PID's formula.
            if clean.starts_with("41") && clean.len() >= SIGNATURE_LEN {
                warn!(
                    "Expected {} in '{}', reinterpreting as mode-01 response",
                    signature, clean
                );
                SIGNATURE_LEN
            } else {
                return Err(DecodeError::MissingSignature {
                    code: format!("{:02X}", pid.code),
                    response: clean,
                });
            }
        }
    };

    if clean.len() < payload_start + 2 {
        return Err(DecodeError::Incomplete { response: clean });
    }

    let bytes = parse_payload(&clean[payload_start..]);
    Ok(pid.decode(&bytes, unit))
}

/// Parse payload bytes from pairs of hex digits, stopping on a leftover odd
/// digit. Pairs that are not valid hex are skipped.
fn parse_payload(data: &str) -> Vec<u8> {
    data.as_bytes()
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .filter_map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::by_name;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_spaces_prompt_and_case() {
        assert_eq!(normalize("41 0c 1a f8\r\n>"), "410C1AF8");
        assert_eq!(normalize("410C1AF8"), "410C1AF8");
        assert_eq!(normalize("  \r\n>"), "");
    }

    #[test]
    fn test_exact_signature_decode() {
        let rpm = by_name("RPM").unwrap();
        let value = decode_response(rpm, "410C1AF8", SpeedUnit::Kmh).unwrap();
        assert_eq!(value, "1726");
    }

    #[test]
    fn test_spaced_and_unspaced_responses_decode_identically() {
        let rpm = by_name("RPM").unwrap();
        let spaced = decode_response(rpm, "41 0C 1A F8\r\n>", SpeedUnit::Kmh).unwrap();
        let compact = decode_response(rpm, "410C1AF8", SpeedUnit::Kmh).unwrap();
        assert_eq!(spaced, compact);
    }

    #[test]
    fn test_speed_units() {
        let speed = by_name("Speed").unwrap();
        assert_eq!(
            decode_response(speed, "410D50", SpeedUnit::Kmh).unwrap(),
            "80"
        );
        assert_eq!(
            decode_response(speed, "410D50", SpeedUnit::Mph).unwrap(),
            "49.7"
        );
    }

    #[test]
    fn test_fallback_reinterprets_position_only() {
        // Queried Speed but the echo carries a different code; the payload
        // after "41XX" still decodes with the Speed formula.
        let speed = by_name("Speed").unwrap();
        let value = decode_response(speed, "410C3C", SpeedUnit::Kmh).unwrap();
        assert_eq!(value, "60");
    }

    #[test]
    fn test_missing_signature_is_field_local_error() {
        let rpm = by_name("RPM").unwrap();
        let err = decode_response(rpm, "NO DATA", SpeedUnit::Kmh).unwrap_err();
        assert!(matches!(err, DecodeError::MissingSignature { .. }));
        assert!(err.to_string().contains("No valid PID 0C"));
    }

    #[test]
    fn test_bare_signature_is_incomplete() {
        let rpm = by_name("RPM").unwrap();
        let err = decode_response(rpm, "410C", SpeedUnit::Kmh).unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete { .. }));
    }

    #[test]
    fn test_odd_trailing_digit_is_dropped() {
        let speed = by_name("Speed").unwrap();
        let value = decode_response(speed, "410D501", SpeedUnit::Kmh).unwrap();
        assert_eq!(value, "80");
    }

    #[test]
    fn test_short_payload_falls_back_to_default() {
        // One byte where RPM needs two: structure is plausible, decode
        // substitutes the default instead of erroring.
        let rpm = by_name("RPM").unwrap();
        let value = decode_response(rpm, "410C1A", SpeedUnit::Kmh).unwrap();
        assert_eq!(value, "0");
    }

    #[test]
    fn test_parse_payload_skips_bad_pairs() {
        assert_eq!(parse_payload("1AF8"), vec![0x1A, 0xF8]);
        assert_eq!(parse_payload("1AZZF8"), vec![0x1A, 0xF8]);
        assert_eq!(parse_payload("1"), Vec::<u8>::new());
    }

    proptest! {
        #[test]
        fn prop_decode_is_deterministic(raw in "[0-9A-Fa-f ]{0,16}") {
            for pid in crate::pid::all() {
                let first = decode_response(pid, &raw, SpeedUnit::Mph);
                let second = decode_response(pid, &raw, SpeedUnit::Mph);
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn prop_kind_decode_is_total(bytes in proptest::collection::vec(any::<u8>(), 0..4)) {
            for pid in crate::pid::all() {
                // Must never panic, whatever the payload length.
                let _ = pid.decode(&bytes, SpeedUnit::Kmh);
                let _ = pid.decode(&bytes, SpeedUnit::Mph);
            }
        }

        #[test]
        fn prop_speed_kmh_is_identity(byte in any::<u8>()) {
            let speed = by_name("Speed").unwrap();
            prop_assert_eq!(speed.decode(&[byte], SpeedUnit::Kmh), byte.to_string());
        }
    }
}
