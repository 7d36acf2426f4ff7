use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for CRM record and file-version identifiers
    /// Must start alphanumeric, then alphanumerics, hyphens or underscores, 64 chars max
    /// - Valid: "001A000001AbCdE", "001A000001AbCdEIAX", "ACC-001"
    /// - Invalid: "", "-001", "001 A", "001'A", "../etc"
    pub static ref RECORD_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap();
}

/// Validator hook for DTO fields holding CRM identifiers
pub fn validate_record_id(value: &str) -> Result<(), validator::ValidationError> {
    if RECORD_ID_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_record_id"))
    }
}
