use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Symbols a sign-in nonce is drawn from.
pub const NONCE_CHARSET: &[u8; 69] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-._~+/=";

/// Nonce length used for Apple sign-in requests.
pub const DEFAULT_NONCE_LENGTH: usize = 32;

// Largest multiple of the charset size that fits in a byte; bytes at or
// above it are rejected so every symbol stays equally likely.
const ACCEPT_BELOW: u8 = (256 / NONCE_CHARSET.len() * NONCE_CHARSET.len()) as u8;

/// Generates a random nonce of `length` symbols from [`NONCE_CHARSET`].
///
/// Random bytes come straight from the operating system; bytes that would bias
/// the modulo mapping are discarded and redrawn.
///
/// # Errors
///
/// Returns [`AuthError::RandomSource`] if the OS random source fails. Sign-in
/// must not continue in that case.
pub fn generate_nonce(length: usize) -> Result<String, AuthError> {
    let mut nonce = String::with_capacity(length);
    let mut buf = [0u8; 16];

    while nonce.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| AuthError::RandomSource(e.to_string()))?;

        for &byte in &buf {
            if nonce.len() == length {
                break;
            }
            if byte < ACCEPT_BELOW {
                let idx = usize::from(byte) % NONCE_CHARSET.len();
                nonce.push(char::from(NONCE_CHARSET[idx]));
            }
        }
    }

    Ok(nonce)
}

/// Computes the challenge handed to the provider: lowercase hex of `SHA256(nonce)`.
#[must_use]
pub fn nonce_digest(nonce: &str) -> String {
    hex::encode(Sha256::digest(nonce.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_threshold_is_a_multiple_of_the_charset() {
        assert_eq!(usize::from(ACCEPT_BELOW) % NONCE_CHARSET.len(), 0);
        assert_eq!(ACCEPT_BELOW, 207);
    }

    #[test]
    fn test_nonce_length() {
        for len in [1, 16, 32, 64, 100] {
            assert_eq!(generate_nonce(len).unwrap().len(), len);
        }
        assert!(generate_nonce(0).unwrap().is_empty());
    }

    #[test]
    fn test_nonce_stays_in_charset() {
        for _ in 0..500 {
            let nonce = generate_nonce(DEFAULT_NONCE_LENGTH).unwrap();
            assert_eq!(nonce.len(), DEFAULT_NONCE_LENGTH);
            assert!(
                nonce.bytes().all(|b| NONCE_CHARSET.contains(&b)),
                "nonce has a symbol outside the charset: {nonce}"
            );
        }
    }

    #[test]
    fn test_nonce_uniqueness() {
        let n1 = generate_nonce(DEFAULT_NONCE_LENGTH).unwrap();
        let n2 = generate_nonce(DEFAULT_NONCE_LENGTH).unwrap();
        assert_ne!(n1, n2, "nonces should be unique");
    }

    #[test]
    fn test_digest_is_sha256_hex() {
        assert_eq!(
            nonce_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_deterministic() {
        let nonce = generate_nonce(DEFAULT_NONCE_LENGTH).unwrap();
        assert_eq!(nonce_digest(&nonce), nonce_digest(&nonce));
        assert_ne!(nonce_digest("nonce_1"), nonce_digest("nonce_2"));
    }
}
