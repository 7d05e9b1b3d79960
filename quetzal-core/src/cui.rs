//! Guatemalan CUI (Código Único de Identificación) validation and
//! synthesis.
//!
//! A CUI is 13 digits: 8 personal digits, a 2-digit department code
//! (01-22), a 2-digit municipality code (01-99) and a final check digit
//! computed over the first 12 digits with the RENAP weighting scheme.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CuiError {
    #[error("CUI must be exactly 13 digits")]
    InvalidFormat,

    #[error("department code {0:02} is outside 01-22")]
    InvalidDepartment(u8),

    #[error("municipality code {0:02} is outside 01-99")]
    InvalidMunicipality(u8),

    #[error("check digit mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: u8, found: u8 },

    #[error("personal segment must be exactly 8 digits")]
    IncompleteInput,
}

/// Location codes embedded in a valid CUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuiParts {
    pub department: u8,
    pub municipality: u8,
}

/// Validates a CUI, tolerating `-` and whitespace separators.
///
/// Checks, in order: 13 ASCII digits, department in [1,22], municipality
/// in [1,99], and the check digit.
pub fn validate(cui: &str) -> Result<CuiParts, CuiError> {
    let digits = strip_separators(cui);

    if digits.len() != 13 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CuiError::InvalidFormat);
    }

    let department: u8 = digits[8..10].parse().map_err(|_| CuiError::InvalidFormat)?;
    if !(1..=22).contains(&department) {
        return Err(CuiError::InvalidDepartment(department));
    }

    let municipality: u8 = digits[10..12].parse().map_err(|_| CuiError::InvalidFormat)?;
    if !(1..=99).contains(&municipality) {
        return Err(CuiError::InvalidMunicipality(municipality));
    }

    let expected = check_digit(&digits[..12])?;
    let found = digits.as_bytes()[12] - b'0';
    if found != expected {
        return Err(CuiError::ChecksumMismatch { expected, found });
    }

    Ok(CuiParts {
        department,
        municipality,
    })
}

/// Computes the check digit over a 12-digit prefix.
///
/// Each digit is weighted 1 at even positions and 2 at odd positions
/// (0-indexed); two-digit products are reduced by summing their digits.
/// The check digit is `0` when the weighted sum is a multiple of 10,
/// otherwise `10 - (sum % 10)`.
pub fn check_digit(prefix: &str) -> Result<u8, CuiError> {
    if prefix.len() != 12 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CuiError::InvalidFormat);
    }

    let sum: u32 = prefix
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            let product = digit * if i % 2 == 0 { 1 } else { 2 };
            if product > 9 { product - 9 } else { product }
        })
        .sum();

    let modulus = (sum % 10) as u8;
    Ok(if modulus == 0 { 0 } else { 10 - modulus })
}

/// Builds a complete CUI from the 8 personal digits, a 2-digit department
/// code and a 1-based municipality index.
pub fn synthesize(
    personal: &str,
    department: &str,
    municipality_index: u8,
) -> Result<String, CuiError> {
    let personal = strip_separators(personal);
    if personal.len() != 8 || !personal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CuiError::IncompleteInput);
    }

    let prefix = format!("{personal}{department}{municipality_index:02}");
    let check = check_digit(&prefix)?;
    Ok(format!("{prefix}{check}"))
}

fn strip_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}
