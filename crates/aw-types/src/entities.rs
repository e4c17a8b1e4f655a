//! Persisted entities for the verification flow

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Handshake parameters persisted for the duration of one authorization
/// attempt
///
/// Created when a verification attempt starts and deleted exactly once when
/// the matching callback is consumed, whatever its outcome. Persisted (rather
/// than held in memory) because the hosting process may be suspended while
/// the external browser is in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeState {
    /// Anti-CSRF token; must be echoed verbatim by the authorization server
    pub state: String,

    /// PKCE code verifier; never sent in the authorization request,
    /// presented at token exchange
    pub verifier: String,

    /// Anti-replay token carried in the authorization request
    pub nonce: String,
}

/// Cached result of a successful verification flow
///
/// The sole unit of truth for "is this user currently age-verified". Field
/// names stay camelCase on disk for compatibility with records written by
/// earlier SDK versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// Opaque bearer credential returned by the token endpoint
    pub access_token: String,

    /// Absolute expiry as unix milliseconds
    pub expires_at: i64,

    /// True only for records produced by a successful flow
    pub is_verified: bool,
}

impl VerificationRecord {
    /// Check whether the record has expired
    ///
    /// A record is valid only while the current time is strictly before
    /// `expires_at`.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() >= self.expires_at
    }
}
