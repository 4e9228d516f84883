//! Scrypt password hashing and verification.
//!
//! Stored format: `scrypt$<N>$<r>$<p>$<saltBase64>$<hashBase64>`.
//! Verification re-derives with the parameters embedded in the stored
//! string, so old hashes stay valid if the defaults ever change.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use rand::RngCore;
use scrypt::Params;
use subtle::ConstantTimeEq;

/// Scrypt cost parameter N (must be a power of two).
const SCRYPT_N: u32 = 16384;
/// Scrypt block size parameter.
const SCRYPT_R: u32 = 8;
/// Scrypt parallelism parameter.
const SCRYPT_P: u32 = 1;
/// Derived key length in bytes.
const KEY_LEN: usize = 64;
/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Error produced when hashing a new password.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid scrypt parameters: {0}")]
    Params(String),
    #[error("scrypt derivation failed: {0}")]
    Derive(String),
}

/// Hashes a password with scrypt and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let derived = derive(password.as_bytes(), &salt, SCRYPT_N, SCRYPT_R, SCRYPT_P, KEY_LEN)?;

    Ok(format!(
        "scrypt${}${}${}${}${}",
        SCRYPT_N,
        SCRYPT_R,
        SCRYPT_P,
        BASE64_STANDARD.encode(salt),
        BASE64_STANDARD.encode(derived),
    ))
}

/// Verifies a password against a stored hash string.
///
/// Stored values without the `scrypt$` tag are compared as plaintext: a
/// backward-compatibility shim for operator rows seeded before hashing
/// existed. Malformed stored strings verify as false, never as an error.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.strip_prefix("scrypt$") {
        Some(rest) => verify_scrypt(password, rest).unwrap_or(false),
        None => constant_time_eq(password.as_bytes(), stored.as_bytes()),
    }
}

/// Parses `<N>$<r>$<p>$<saltB64>$<hashB64>` and re-derives with the stored
/// parameters. Any parse or derivation failure yields None.
fn verify_scrypt(password: &str, encoded: &str) -> Option<bool> {
    let mut parts = encoded.split('$');
    let n: u32 = parts.next()?.parse().ok()?;
    let r: u32 = parts.next()?.parse().ok()?;
    let p: u32 = parts.next()?.parse().ok()?;
    let salt = BASE64_STANDARD.decode(parts.next()?).ok()?;
    let expected = BASE64_STANDARD.decode(parts.next()?).ok()?;
    if parts.next().is_some() || expected.is_empty() {
        return None;
    }

    let derived = derive(password.as_bytes(), &salt, n, r, p, expected.len()).ok()?;
    Some(constant_time_eq(&derived, &expected))
}

fn derive(
    password: &[u8],
    salt: &[u8],
    n: u32,
    r: u32,
    p: u32,
    len: usize,
) -> Result<Vec<u8>, HashError> {
    if !n.is_power_of_two() || n < 2 {
        return Err(HashError::Params(format!("N must be a power of two, got {n}")));
    }
    let log_n = n.trailing_zeros() as u8;
    let params =
        Params::new(log_n, r, p, len).map_err(|e| HashError::Params(e.to_string()))?;

    let mut out = vec![0u8; len];
    scrypt::scrypt(password, salt, &params, &mut out)
        .map_err(|e| HashError::Derive(e.to_string()))?;
    Ok(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).unwrap_u8() == 1
}
