//! ISO 6346 container identifier validation.
//!
//! A well-formed identifier is 11 characters after normalization: a 3-letter
//! owner code, a 1-letter equipment category, a 6-digit serial number, and a
//! single check digit computed from the first 10 characters. Validation is a
//! pure function; malformed input yields an invalid verdict, never an error.

use std::sync::LazyLock;

use regex::Regex;

/// Normalized identifier shape: 4 letters + 6 serial digits + check digit.
static ID_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}[0-9]{7}$").expect("valid regex"));

/// ISO 6346 letter values for A through Z. Fixed table, not a formula:
/// multiples of 11 (11, 22, 33) are skipped, so the sequence runs
/// 10, 12..21, 23..32, 34..38.
const LETTER_VALUES: [u32; 26] = [
    10, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 34, 35,
    36, 37, 38,
];

/// Normalized length of a well-formed identifier.
pub const ID_LENGTH: usize = 11;

/// Verdict for one candidate identifier. Produced fresh on every call,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// The identifier after normalization (uppercased, separators stripped).
    pub container_id: String,
    pub is_valid: bool,
    /// Check digit the first 10 characters call for. `None` when the
    /// identifier does not have the 4-letter + 7-digit shape.
    pub expected_check_digit: Option<u8>,
}

/// Uppercase and strip everything outside `[A-Z0-9]`.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Validate a candidate identifier against the ISO 6346 check digit.
pub fn validate(raw: &str) -> ValidationResult {
    let container_id = normalize(raw);

    if !ID_SHAPE.is_match(&container_id) {
        return ValidationResult {
            container_id,
            is_valid: false,
            expected_check_digit: None,
        };
    }

    let expected = check_digit(&container_id[..ID_LENGTH - 1]);
    let supplied = container_id.as_bytes()[ID_LENGTH - 1] - b'0';

    ValidationResult {
        container_id,
        is_valid: supplied == expected,
        expected_check_digit: Some(expected),
    }
}

/// Compute the check digit for the first 10 characters of a normalized
/// identifier. Each character value is weighted by 2^position; the sum
/// mod 11 is the check digit, with a remainder of 10 mapping to 0.
fn check_digit(code: &str) -> u8 {
    debug_assert_eq!(code.len(), ID_LENGTH - 1);

    let sum: u32 = code
        .bytes()
        .enumerate()
        .map(|(position, byte)| {
            let value = if byte.is_ascii_digit() {
                u32::from(byte - b'0')
            } else {
                LETTER_VALUES[usize::from(byte - b'A')]
            };
            value << position
        })
        .sum();

    match sum % 11 {
        10 => 0,
        remainder => remainder as u8,
    }
}
