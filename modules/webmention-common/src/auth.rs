use crate::error::{AuthError, Result};

/// Check a supplied token against the configured shared secret.
///
/// An unconfigured secret is a server misconfiguration and is reported
/// before anything about the caller's token.
pub fn authorize(configured: Option<&str>, supplied: Option<&str>) -> Result<()> {
    let Some(expected) = configured.filter(|t| !t.is_empty()) else {
        return Err(AuthError::NotConfigured.into());
    };
    let Some(supplied) = supplied.filter(|t| !t.is_empty()) else {
        return Err(AuthError::Missing.into());
    };
    if !constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
        return Err(AuthError::Mismatch.into());
    }
    Ok(())
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
