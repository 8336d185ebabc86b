//! Input validation utilities.
//!
//! Pure, stateless checks shared by the validators and the appointment lifecycle:
//! - UK postcode format
//! - NHS number format and MOD 11 checksum
//! - Compact duration strings such as `1h30m`
//!
//! None of these functions touch the store or the clock.

use crate::constants::NHS_NUMBER_LENGTH;
use once_cell::sync::Lazy;
use regex::Regex;

static UK_POSTCODE: Lazy<Regex> = Lazy::new(|| {
    // ASCII classes only: a case-insensitive [A-Z] would also accept the Kelvin sign and long s.
    Regex::new(
        r"^(?:(?i:GIR 0AA)|[A-Za-z]{1,2}[0-9]{1,2} ?[0-9][A-Za-z]{2}|[A-Za-z]{1,2}[0-9][A-Za-z] ?[0-9][A-Za-z]{2}|[A-Za-z]{1,2}[0-9]{2} ?[0-9][A-Za-z]{2})$",
    )
    .expect("UK postcode pattern is a valid regex")
});

/// Errors raised while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,
    #[error("missing number before '{0}'")]
    MissingNumber(char),
    #[error("unexpected character '{0}' in duration")]
    UnexpectedCharacter(char),
    #[error("unfinished duration component at the end")]
    UnterminatedComponent,
    #[error("duration is too large")]
    Overflow,
}

/// Checks whether `postcode` is a plausibly formatted UK postcode.
///
/// Surrounding whitespace is ignored and letters may be in either case. The single space
/// between outward and inward code is optional. `GIR 0AA` is accepted as a special case.
///
/// This is a format check only: it does not confirm the postcode exists.
pub fn is_valid_postcode(postcode: &str) -> bool {
    let trimmed = postcode.trim();
    if trimmed.is_empty() {
        return false;
    }
    UK_POSTCODE.is_match(trimmed)
}

/// The stored form of a postcode: surrounding whitespace removed, case kept.
pub fn normalise_postcode(postcode: &str) -> String {
    postcode.trim().to_string()
}

/// The stored form of an NHS number: every space removed.
///
/// Uniqueness is checked on this form, so `"137 364 5350"` and `"1373645350"` are the same
/// patient.
pub fn normalise_nhs_number(nhs_number: &str) -> String {
    nhs_number.chars().filter(|c| *c != ' ').collect()
}

/// Checks an NHS number's shape and MOD 11 check digit.
///
/// Spaces anywhere in the input are ignored, so `"137 364 5350"` and `"1373645350"` are
/// equivalent. After removing spaces the input must be exactly ten ASCII digits.
///
/// The first nine digits are weighted 10 down to 2 and summed. The check digit is
/// `11 - (sum % 11)`, where 11 maps to 0 and 10 means the number can never be valid.
///
/// # Arguments
///
/// * `nhs_number` - The candidate NHS number.
pub fn is_valid_nhs_number(nhs_number: &str) -> bool {
    if nhs_number.trim().is_empty() {
        return false;
    }

    let digits: Vec<u32> = nhs_number
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    if digits.len() != NHS_NUMBER_LENGTH {
        return false;
    }

    let sum: u32 = digits[..9]
        .iter()
        .zip((2..=10).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();

    let check_digit = match 11 - (sum % 11) {
        11 => 0,
        10 => return false,
        d => d,
    };

    check_digit == digits[9]
}

/// Parses a compact duration such as `1h30m` into a number of seconds.
///
/// The input is scanned left to right. Digits accumulate into a running number that must be
/// closed by a unit marker: `h` (hours) or `m` (minutes). Components may repeat and appear in
/// any order, so `30m1h` is 5400 seconds just like `1h30m`.
///
/// # Errors
///
/// Returns a [`DurationError`] if:
/// - the input is empty or whitespace,
/// - a unit marker has no digits before it (`h30m`),
/// - any character other than a digit, `h` or `m` appears (`1x30m`, `1hour`),
/// - digits trail at the end without a unit (`90`),
/// - the total does not fit in a `u64`.
pub fn parse_duration_to_seconds(input: &str) -> Result<u64, DurationError> {
    if input.trim().is_empty() {
        return Err(DurationError::Empty);
    }

    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut number_seen = false;

    for c in input.chars() {
        let unit_seconds = match c {
            '0'..='9' => {
                current = current
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(u64::from(c as u8 - b'0')))
                    .ok_or(DurationError::Overflow)?;
                number_seen = true;
                continue;
            }
            'h' => 3600,
            'm' => 60,
            other => return Err(DurationError::UnexpectedCharacter(other)),
        };

        if !number_seen {
            return Err(DurationError::MissingNumber(c));
        }

        total = current
            .checked_mul(unit_seconds)
            .and_then(|secs| total.checked_add(secs))
            .ok_or(DurationError::Overflow)?;
        current = 0;
        number_seen = false;
    }

    if number_seen {
        return Err(DurationError::UnterminatedComponent);
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_postcodes() {
        for postcode in ["EC1A 1BB", "ec1a1bb", " EC1A1BB ", "GIR 0AA", "M1 1AE", "B33 8TH", "CR2 6XH", "DN55 1PT", "W1A 0AX"] {
            assert!(is_valid_postcode(postcode), "{postcode:?} should be valid");
        }
    }

    #[test]
    fn test_invalid_postcodes() {
        for postcode in ["", "   ", "123456", "EC1A1BB2", "EC1A  1BB", "E", "1EC 1BB", "EC1A 1B"] {
            assert!(!is_valid_postcode(postcode), "{postcode:?} should be invalid");
        }
    }

    #[test]
    fn test_postcode_rejects_non_ascii_case_folds() {
        // U+212A KELVIN SIGN folds to 'k' under Unicode case-insensitive matching.
        assert!(!is_valid_postcode("\u{212A}T1 1AA"));
    }

    #[test]
    fn test_valid_nhs_numbers() {
        assert!(is_valid_nhs_number("1373645350"));
        assert!(is_valid_nhs_number("137 364 5350"));
        assert!(is_valid_nhs_number("9434765919"));
    }

    #[test]
    fn test_invalid_nhs_numbers() {
        assert!(!is_valid_nhs_number("1373645351"));
        assert!(!is_valid_nhs_number(""));
        assert!(!is_valid_nhs_number("   "));
        assert!(!is_valid_nhs_number("137364535"));
        assert!(!is_valid_nhs_number("13736453500"));
        assert!(!is_valid_nhs_number("137364535a"));
        assert!(!is_valid_nhs_number("137-364-5350"));
    }

    #[test]
    fn test_nhs_number_with_check_digit_ten_is_invalid() {
        // 6 * 2 = 12, remainder 1, so the check digit would be 10.
        for last in 0..=9 {
            let candidate = format!("000000006{last}");
            assert!(!is_valid_nhs_number(&candidate), "{candidate} should be invalid");
        }
    }

    #[test]
    fn test_single_digit_mutation_breaks_checksum() {
        let valid = "1373645350";
        for position in 0..valid.len() {
            for replacement in '0'..='9' {
                let mut chars: Vec<char> = valid.chars().collect();
                if chars[position] == replacement {
                    continue;
                }
                chars[position] = replacement;
                let mutated: String = chars.into_iter().collect();
                // MOD 11 detects every single-digit substitution.
                assert!(!is_valid_nhs_number(&mutated), "{mutated} should be invalid");
            }
        }
    }

    #[test]
    fn test_normalised_forms() {
        assert_eq!(normalise_nhs_number(" 137 364 5350 "), "1373645350");
        assert_eq!(normalise_postcode("    EC1A 1BB    "), "EC1A 1BB");
        assert_eq!(normalise_postcode("ec1a1bb"), "ec1a1bb");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_to_seconds("1h30m"), Ok(5400));
        assert_eq!(parse_duration_to_seconds("0h0m"), Ok(0));
        assert_eq!(parse_duration_to_seconds("30m"), Ok(1800));
        assert_eq!(parse_duration_to_seconds("2h15m"), Ok(8100));
        assert_eq!(parse_duration_to_seconds("30m1h"), Ok(5400));
        assert_eq!(parse_duration_to_seconds("1h1h"), Ok(7200));
    }

    #[test]
    fn test_parse_duration_rejects_malformed_input() {
        assert_eq!(
            parse_duration_to_seconds("1hour"),
            Err(DurationError::UnexpectedCharacter('o'))
        );
        assert_eq!(
            parse_duration_to_seconds("h30m"),
            Err(DurationError::MissingNumber('h'))
        );
        assert_eq!(
            parse_duration_to_seconds("1x30m"),
            Err(DurationError::UnexpectedCharacter('x'))
        );
        assert_eq!(
            parse_duration_to_seconds("1hm"),
            Err(DurationError::MissingNumber('m'))
        );
        assert_eq!(
            parse_duration_to_seconds("90"),
            Err(DurationError::UnterminatedComponent)
        );
        assert_eq!(parse_duration_to_seconds(""), Err(DurationError::Empty));
        assert_eq!(parse_duration_to_seconds("  "), Err(DurationError::Empty));
        assert_eq!(
            parse_duration_to_seconds("1h 30m"),
            Err(DurationError::UnexpectedCharacter(' '))
        );
    }

    #[test]
    fn test_parse_duration_reports_overflow() {
        assert_eq!(
            parse_duration_to_seconds("99999999999999999999h"),
            Err(DurationError::Overflow)
        );
    }
}
