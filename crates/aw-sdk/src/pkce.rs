//! PKCE and anti-replay parameter generation
//!
//! Implements PKCE as defined in RFC 7636 with the S256 (SHA-256) challenge
//! method, plus the state and nonce tokens carried in the authorization
//! request. All randomness comes from the thread-local CSPRNG.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{thread_rng, RngCore};
use sha2::{Digest, Sha256};

/// Generate a PKCE code verifier
///
/// 64 random bytes, returned unpadded base64url-encoded (86 characters).
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 64];
    thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the S256 code challenge for a verifier
///
/// Returns BASE64URL(SHA256(verifier)), unpadded. Deterministic for a given
/// verifier; the authorization and token servers must derive the same
/// relationship.
pub fn generate_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a state parameter for CSRF protection
///
/// 16 random bytes rendered as 32 lowercase hex characters.
pub fn generate_state() -> String {
    random_hex(16)
}

/// Generate a nonce for replay protection
///
/// Same shape as the state parameter; carried in the authorization request.
pub fn generate_nonce() -> String {
    random_hex(16)
}

/// Generate a random lowercase hex string of the given byte length
fn random_hex(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
