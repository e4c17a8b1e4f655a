//! Session persistence for the verification flow
//!
//! Owns the two durable keys of the SDK: the in-flight OIDC handshake
//! parameters and the cached verification record. All reads self-heal: a
//! stored value that no longer parses is deleted and reported as absent.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::KeyValueStore;
use aw_types::{AppResult, HandshakeState, VerificationRecord};

/// Key holding the cached verification record
const VERIFICATION_KEY: &str = "io.agewallet.sdk.verification";

/// Key holding the in-flight handshake parameters
const HANDSHAKE_KEY: &str = "io.agewallet.sdk.oidc";

/// Durable session state for the verification flow
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Create a session store over the given key-value store
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Get the cached verification record, enforcing expiry
    ///
    /// An expired record is deleted as a side effect of the read and
    /// reported as absent; reading again is a plain miss.
    pub async fn get_verification(&self) -> AppResult<Option<VerificationRecord>> {
        let Some(raw) = self.store.get(VERIFICATION_KEY).await? else {
            return Ok(None);
        };

        let record: VerificationRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding unparsable verification record: {}", e);
                self.store.remove(VERIFICATION_KEY).await?;
                return Ok(None);
            }
        };

        if record.is_expired() {
            debug!("Verification record expired, clearing");
            self.store.remove(VERIFICATION_KEY).await?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Store the verification record
    pub async fn set_verification(&self, record: &VerificationRecord) -> AppResult<()> {
        let raw = serde_json::to_string(record)?;
        self.store.set(VERIFICATION_KEY, &raw).await
    }

    /// Delete the verification record; idempotent
    pub async fn clear_verification(&self) -> AppResult<()> {
        self.store.remove(VERIFICATION_KEY).await
    }

    /// Get the in-flight handshake parameters
    pub async fn get_handshake(&self) -> AppResult<Option<HandshakeState>> {
        let Some(raw) = self.store.get(HANDSHAKE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(handshake) => Ok(Some(handshake)),
            Err(e) => {
                warn!("Discarding unparsable handshake state: {}", e);
                self.store.remove(HANDSHAKE_KEY).await?;
                Ok(None)
            }
        }
    }

    /// Store the handshake parameters, overwriting any prior attempt's
    pub async fn set_handshake(&self, handshake: &HandshakeState) -> AppResult<()> {
        let raw = serde_json::to_string(handshake)?;
        self.store.set(HANDSHAKE_KEY, &raw).await
    }

    /// Delete the handshake parameters; idempotent
    pub async fn clear_handshake(&self) -> AppResult<()> {
        self.store.remove(HANDSHAKE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn session() -> (SessionStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionStore::new(store.clone()), store)
    }

    fn record(expires_at: i64) -> VerificationRecord {
        VerificationRecord {
            access_token: "tok".to_string(),
            expires_at,
            is_verified: true,
        }
    }

    #[tokio::test]
    async fn test_fresh_store_has_no_verification() {
        let (session, _) = session();
        assert!(session.get_verification().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verification_round_trip() {
        let (session, _) = session();
        let future = Utc::now().timestamp_millis() + 60_000;

        session.set_verification(&record(future)).await.unwrap();

        let loaded = session.get_verification().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok");
        assert!(loaded.is_verified);
    }

    #[tokio::test]
    async fn test_expired_verification_deleted_on_read() {
        let (session, store) = session();
        let past = Utc::now().timestamp_millis() - 1_000;

        session.set_verification(&record(past)).await.unwrap();

        assert!(session.get_verification().await.unwrap().is_none());
        // The read deleted the key, not just filtered it
        assert!(store.get(VERIFICATION_KEY).await.unwrap().is_none());
        // Reading again is a plain miss
        assert!(session.get_verification().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_verification_self_heals() {
        let (session, store) = session();
        store.set(VERIFICATION_KEY, "{not json").await.unwrap();

        assert!(session.get_verification().await.unwrap().is_none());
        assert!(store.get(VERIFICATION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handshake_round_trip() {
        let (session, _) = session();
        let handshake = HandshakeState {
            state: "s".to_string(),
            verifier: "v".to_string(),
            nonce: "n".to_string(),
        };

        session.set_handshake(&handshake).await.unwrap();
        assert_eq!(session.get_handshake().await.unwrap().unwrap(), handshake);
    }

    #[tokio::test]
    async fn test_handshake_overwrite() {
        let (session, _) = session();
        let first = HandshakeState {
            state: "first".to_string(),
            verifier: "v1".to_string(),
            nonce: "n1".to_string(),
        };
        let second = HandshakeState {
            state: "second".to_string(),
            verifier: "v2".to_string(),
            nonce: "n2".to_string(),
        };

        session.set_handshake(&first).await.unwrap();
        session.set_handshake(&second).await.unwrap();

        assert_eq!(session.get_handshake().await.unwrap().unwrap(), second);
    }

    #[tokio::test]
    async fn test_corrupt_handshake_self_heals() {
        let (session, store) = session();
        store.set(HANDSHAKE_KEY, "][").await.unwrap();

        assert!(session.get_handshake().await.unwrap().is_none());
        assert!(store.get(HANDSHAKE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (session, _) = session();

        session.clear_verification().await.unwrap();
        session.clear_verification().await.unwrap();
        session.clear_handshake().await.unwrap();
        session.clear_handshake().await.unwrap();
    }
}
