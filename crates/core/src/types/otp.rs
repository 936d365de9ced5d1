//! One-time passcode type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    /// Fewer than six digits remained after stripping non-digits.
    #[error("verification code must be {expected} digits (got {got})")]
    TooShort {
        /// Required number of digits.
        expected: usize,
        /// Digits present after sanitizing.
        got: usize,
    },
}

/// A six-digit one-time passcode.
///
/// User input is sanitized the way the code field behaves on every
/// keystroke: non-digit characters are dropped and the result is capped at
/// six digits. Anything shorter is rejected, so a malformed code never
/// reaches the backend.
///
/// ```
/// use proconnect_core::OtpCode;
///
/// assert_eq!(OtpCode::parse("12 34-56").unwrap().as_str(), "123456");
/// assert_eq!(OtpCode::parse("1234567").unwrap().as_str(), "123456");
/// assert!(OtpCode::parse("12a45").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 6;

    /// Strip non-digits from raw input and cap it at [`Self::LENGTH`].
    ///
    /// This is the value a code field should hold after each keystroke.
    #[must_use]
    pub fn sanitize(input: &str) -> String {
        input
            .chars()
            .filter(char::is_ascii_digit)
            .take(Self::LENGTH)
            .collect()
    }

    /// Parse a code from raw user input.
    ///
    /// # Errors
    ///
    /// Returns [`OtpCodeError::TooShort`] if fewer than six digits remain
    /// after sanitizing.
    pub fn parse(input: &str) -> Result<Self, OtpCodeError> {
        let digits = Self::sanitize(input);
        if digits.len() < Self::LENGTH {
            return Err(OtpCodeError::TooShort {
                expected: Self::LENGTH,
                got: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are credentials; keep them out of logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_and_caps() {
        assert_eq!(OtpCode::sanitize("1a2b3c"), "123");
        assert_eq!(OtpCode::sanitize("987654321"), "987654");
        assert_eq!(OtpCode::sanitize(""), "");
    }

    #[test]
    fn test_parse_rejects_short_and_non_numeric() {
        assert_eq!(
            OtpCode::parse("12345"),
            Err(OtpCodeError::TooShort {
                expected: 6,
                got: 5
            })
        );
        assert!(OtpCode::parse("abcdef").is_err());
        assert!(OtpCode::parse("").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let code = OtpCode::parse("424242").unwrap();
        assert!(!format!("{code:?}").contains("424242"));
    }
}
