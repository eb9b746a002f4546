//! Authentication utilities for SmartAPI

use totp_rs::{Algorithm, Secret, TOTP};

use super::error::{AngelError, AngelResult};

/// TOTP time step in seconds
pub const TOTP_STEP: u64 = 30;

const TOTP_DIGITS: usize = 6;

/// Token returned by a successful login
#[derive(Clone)]
pub struct Session {
    pub jwt_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Six-digit RFC 6238 code for `unix_time` from a base32 secret.
/// Case, spaces and `=` padding in the secret are ignored.
pub fn generate_totp(secret: &str, unix_time: u64) -> AngelResult<String> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let key = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|e| AngelError::Auth(format!("TOTP_KEY is not valid base32: {:?}", e)))?;
    let totp = TOTP::new(Algorithm::SHA1, TOTP_DIGITS, 1, TOTP_STEP, key)
        .map_err(|e| AngelError::Auth(format!("TOTP_KEY rejected: {:?}", e)))?;

    Ok(totp.generate(unix_time))
}
