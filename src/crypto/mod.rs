//! Key derivation for session cookie signing.
//!
//! The configured secret is stretched with PBKDF2-HMAC-SHA512 into the
//! 64-byte master key `axum_extra`'s signed cookie jar expects.

use axum_extra::extract::cookie::Key;
use ring::pbkdf2;
use std::num::NonZeroU32;

/// Length of the cookie master key in bytes
const KEY_LENGTH: usize = 64;

/// Number of PBKDF2 iterations for key derivation
const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// Fixed salt; the secret itself is unique per deployment
const PBKDF2_SALT: &[u8] = b"mayanetra-session-cookie-v1";

/// Derive raw key material from a secret string.
pub fn derive_key_bytes(secret: &str) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA512,
        PBKDF2_ITERATIONS,
        PBKDF2_SALT,
        secret.as_bytes(),
        &mut key,
    );
    key
}

/// Signing key for session and flash cookies.
pub fn derive_cookie_key(secret: &str) -> Key {
    Key::from(&derive_key_bytes(secret))
}
