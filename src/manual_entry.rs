// SPDX-License-Identifier: GPL-3.0-only

//! Manual barcode entry
//!
//! Fallback for when scanning is unavailable or the code will not read.
//! Accepts GTIN-8, GTIN-12 (UPC-A) and GTIN-13 (EAN-13) and verifies the
//! check digit.

use thiserror::Error;

/// Accepted GTIN lengths
pub const GTIN_LENGTHS: [usize; 3] = [8, 12, 13];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManualEntryError {
    #[error("Enter a barcode number")]
    Empty,
    #[error("Barcodes contain digits only")]
    NonDigit,
    #[error("Barcodes have 8, 12 or 13 digits (got {0})")]
    InvalidLength(usize),
    #[error("Check digit should be {expected}, not {found}")]
    BadCheckDigit { expected: u8, found: u8 },
}

/// GS1 mod-10 check digit for `body` (all digits except the last)
pub fn check_digit(body: &[u8]) -> u8 {
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Validate a typed GTIN, returning it without surrounding whitespace
pub fn validate_gtin(input: &str) -> Result<String, ManualEntryError> {
    let code = input.trim();
    if code.is_empty() {
        return Err(ManualEntryError::Empty);
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ManualEntryError::NonDigit);
    }
    if !GTIN_LENGTHS.contains(&code.len()) {
        return Err(ManualEntryError::InvalidLength(code.len()));
    }

    let digits: Vec<u8> = code.bytes().map(|b| b - b'0').collect();
    let (body, last) = digits.split_at(digits.len() - 1);
    let expected = check_digit(body);
    if expected != last[0] {
        return Err(ManualEntryError::BadCheckDigit {
            expected,
            found: last[0],
        });
    }

    Ok(code.to_string())
}

/// Line editor for manual entry
#[derive(Debug, Default, Clone)]
pub struct ManualEntry {
    input: String,
    error: Option<ManualEntryError>,
}

impl ManualEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn error(&self) -> Option<&ManualEntryError> {
        self.error.as_ref()
    }

    pub fn push(&mut self, c: char) {
        if c.is_ascii_digit() && self.input.len() < 13 {
            self.input.push(c);
            self.error = None;
        }
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.error = None;
    }

    /// Validate the input; on success the editor is cleared
    pub fn submit(&mut self) -> Option<String> {
        match validate_gtin(&self.input) {
            Ok(code) => {
                self.input.clear();
                self.error = None;
                Some(code)
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert_eq!(validate_gtin("012345678905").unwrap(), "012345678905");
        assert_eq!(validate_gtin(" 4006381333931 ").unwrap(), "4006381333931");
        assert_eq!(validate_gtin("96385074").unwrap(), "96385074");
    }

    #[test]
    fn test_bad_check_digit() {
        assert_eq!(
            validate_gtin("012345678901"),
            Err(ManualEntryError::BadCheckDigit {
                expected: 5,
                found: 1
            })
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(validate_gtin(""), Err(ManualEntryError::Empty));
        assert_eq!(validate_gtin("12a45678"), Err(ManualEntryError::NonDigit));
        assert_eq!(validate_gtin("12345"), Err(ManualEntryError::InvalidLength(5)));
    }

    #[test]
    fn test_editor_ignores_non_digits() {
        let mut entry = ManualEntry::new();
        for c in "9638x5074".chars() {
            entry.push(c);
        }
        assert_eq!(entry.input(), "96385074");
        assert_eq!(entry.submit(), Some("96385074".to_string()));
        assert!(entry.input().is_empty());
    }

    #[test]
    fn test_editor_keeps_input_on_error() {
        let mut entry = ManualEntry::new();
        for c in "12345".chars() {
            entry.push(c);
        }
        assert_eq!(entry.submit(), None);
        assert_eq!(entry.error(), Some(&ManualEntryError::InvalidLength(5)));
        entry.backspace();
        assert!(entry.error().is_none());
        assert_eq!(entry.input(), "1234");
    }
}
