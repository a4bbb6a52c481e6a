//! Common validation utilities for device identifiers and request ids.

use validator::ValidationError;

/// Length of a Type Allocation Code.
pub const TAC_LENGTH: usize = 8;

/// Length of a normalized IMEI (check digit and software version dropped).
pub const NORMALIZED_IMEI_LENGTH: usize = 14;

/// Minimum accepted IMEI length.
pub const MIN_IMEI_LENGTH: usize = 14;

/// Maximum accepted IMEI length (IMEISV).
pub const MAX_IMEI_LENGTH: usize = 16;

/// Validates that a TAC is exactly eight decimal digits.
pub fn validate_tac(tac: &str) -> Result<(), ValidationError> {
    if tac.len() == TAC_LENGTH && tac.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("tac_format");
        err.message = Some("TAC must be 8 digits".into());
        Err(err)
    }
}

/// Validates that an IMEI is 14 to 16 hexadecimal characters.
pub fn validate_imei(imei: &str) -> Result<(), ValidationError> {
    let len_ok = (MIN_IMEI_LENGTH..=MAX_IMEI_LENGTH).contains(&imei.len());
    if len_ok && imei.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("imei_format");
        err.message = Some(format!("IMEI {} is invalid", imei).into());
        Err(err)
    }
}

/// Returns the normalized form of an IMEI used for registry lookups.
///
/// Keeps the first 14 characters, upper-cased. Shorter input is returned as-is.
pub fn normalize_imei(imei: &str) -> String {
    imei.chars()
        .take(NORMALIZED_IMEI_LENGTH)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Returns the TAC prefix of an IMEI, if the IMEI is long enough to carry one.
pub fn tac_of(imei: &str) -> Option<&str> {
    imei.get(..TAC_LENGTH)
}

/// Parses a request id that must consist of decimal digits only.
pub fn parse_numeric_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Returns the lower-cased extension of a file name, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}
