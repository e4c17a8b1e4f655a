//! Verification flow controller
//!
//! Orchestrates one authorization attempt end to end: parameter generation,
//! handshake persistence, browser hand-off, deep-link callback correlation,
//! token exchange, claim inspection, and caching of the verification result.
//! The controller is reusable across attempts; only one attempt is in flight
//! at a time, and a new attempt supersedes any pending one.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use aw_storage::{KeyValueStore, SessionStore};
use aw_types::{AgeWalletConfig, AppResult, HandshakeState, VerificationRecord};

use crate::host::{DeepLinkSource, SystemBrowser};
use crate::pkce::{generate_challenge, generate_nonce, generate_state, generate_verifier};
use crate::token::TokenClient;

/// Scope requested in the authorization URL
const AUTH_SCOPE: &str = "openid age";

/// Token lifetime in seconds assumed when the server declares none
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Terminal outcome of processing one callback URL
///
/// `handle_callback` collapses this to a boolean; tests and hosts that care
/// about the reason use `process_callback` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Flow completed and a verification record was cached
    Verified,

    /// The authorization server reported an error
    ProviderError {
        /// The `error` query parameter
        error: String,
        /// The `error_description` query parameter, if present
        description: Option<String>,
    },

    /// The URL did not parse, or lacked a code or state parameter
    MalformedCallback,

    /// No handshake was pending, or its state did not match the callback's
    StateMismatch,

    /// Token exchange failed (transport, status, or body decode)
    ExchangeFailed,

    /// Claim fetch failed (transport, status, or body decode)
    ClaimsFetchFailed,

    /// Claims did not carry an affirmative age-verified flag
    NotAgeVerified,

    /// The verification record could not be persisted
    PersistenceFailed,
}

impl CallbackOutcome {
    /// True only for the verified outcome
    pub fn is_verified(&self) -> bool {
        matches!(self, CallbackOutcome::Verified)
    }
}

struct Inner {
    config: AgeWalletConfig,
    session: SessionStore,
    browser: Arc<dyn SystemBrowser>,
    deep_links: Arc<dyn DeepLinkSource>,
    token_client: TokenClient,
    /// Deep-link listener for the active attempt; replaced (and the previous
    /// task aborted) on every re-arm so callbacks never cross attempts
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Age-verification flow controller
///
/// Holds no per-attempt state in memory beyond the armed listener; the
/// persisted handshake is what survives the host being suspended while the
/// browser is foregrounded. Cheap to clone; clones share one controller.
#[derive(Clone)]
pub struct AgeWallet {
    inner: Arc<Inner>,
}

impl AgeWallet {
    /// Create a flow controller
    ///
    /// Fails fast with a configuration error when `client_id` or
    /// `redirect_uri` is empty; misconfiguration is never deferred to flow
    /// start.
    pub fn new(
        config: AgeWalletConfig,
        store: Arc<dyn KeyValueStore>,
        browser: Arc<dyn SystemBrowser>,
        deep_links: Arc<dyn DeepLinkSource>,
    ) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                session: SessionStore::new(store),
                config,
                browser,
                deep_links,
                token_client: TokenClient::new(),
                listener: Mutex::new(None),
            }),
        })
    }

    /// Check whether the user currently holds a valid verification
    ///
    /// Reads the cached record through the session store, which deletes it
    /// if expired. Absent, expired, or unreadable records all report `false`.
    pub async fn is_verified(&self) -> bool {
        match self.inner.session.get_verification().await {
            Ok(Some(record)) => record.is_verified,
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to read verification record: {}", e);
                false
            }
        }
    }

    /// Start a verification attempt
    ///
    /// Persists a fresh handshake, arms the deep-link listener, and opens
    /// the system browser on the authorization URL. Any pending attempt is
    /// superseded; its callback will fail state validation. Failures are
    /// logged and leave the controller reusable.
    pub async fn start_verification(&self) {
        if let Err(e) = self.try_start().await {
            error!("Failed to start verification: {}", e);
        }
    }

    async fn try_start(&self) -> AppResult<()> {
        let verifier = generate_verifier();
        let challenge = generate_challenge(&verifier);
        let state = generate_state();
        let nonce = generate_nonce();

        info!("Starting verification attempt");

        // Persist before opening the browser: the host may be backgrounded
        // as soon as the browser takes the foreground.
        self.inner
            .session
            .set_handshake(&HandshakeState {
                state: state.clone(),
                verifier,
                nonce: nonce.clone(),
            })
            .await?;

        self.arm_listener();

        let auth_url = self.build_authorization_url(&challenge, &state, &nonce);
        self.inner.browser.open(&auth_url).await
    }

    /// Build the authorization URL for this attempt
    fn build_authorization_url(&self, challenge: &str, state: &str, nonce: &str) -> String {
        let config = &self.inner.config;
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256&nonce={}",
            config.auth_endpoint(),
            urlencoding::encode(&config.client_id),
            urlencoding::encode(&config.redirect_uri),
            urlencoding::encode(AUTH_SCOPE),
            urlencoding::encode(state),
            urlencoding::encode(challenge),
            urlencoding::encode(nonce),
        )
    }

    /// Arm the single-shot deep-link listener for this attempt
    ///
    /// The listener ignores URLs outside the configured redirect prefix,
    /// closes the browser view on a match, dispatches the URL to the
    /// callback handler, and unregisters itself once the handler returns —
    /// whatever the handler decided.
    fn arm_listener(&self) {
        let wallet = self.clone();
        let handle = tokio::spawn(async move {
            let mut rx = match wallet.inner.deep_links.subscribe().await {
                Ok(rx) => rx,
                Err(e) => {
                    error!("Failed to register deep link listener: {}", e);
                    return;
                }
            };

            while let Some(url) = rx.recv().await {
                if !url.starts_with(&wallet.inner.config.redirect_uri) {
                    debug!("Ignoring unrelated deep link");
                    continue;
                }

                if let Err(e) = wallet.inner.browser.close().await {
                    warn!("Failed to close browser view: {}", e);
                }

                let verified = wallet.handle_callback(&url).await;
                debug!("Callback dispatched, verified={}", verified);

                // Single-shot: dropping the receiver unregisters the
                // listener; the next attempt re-arms.
                break;
            }
        });

        let mut slot = self.inner.listener.lock();
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Handle a callback URL, reporting only success or failure
    ///
    /// Total: never raises, whatever the URL or the network does.
    pub async fn handle_callback(&self, url: &str) -> bool {
        self.process_callback(url).await.is_verified()
    }

    /// Process a callback URL and report the detailed outcome
    ///
    /// Every exit path consumes the pending handshake exactly once; no path
    /// leaves a stale handshake that a later callback could match.
    pub async fn process_callback(&self, url: &str) -> CallbackOutcome {
        let outcome = self.evaluate_callback(url).await;

        if let Err(e) = self.inner.session.clear_handshake().await {
            warn!("Failed to clear handshake state: {}", e);
        }

        match &outcome {
            CallbackOutcome::Verified => info!("Verification callback accepted"),
            other => warn!("Verification callback rejected: {:?}", other),
        }

        outcome
    }

    async fn evaluate_callback(&self, url: &str) -> CallbackOutcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Callback URL did not parse: {}", e);
                return CallbackOutcome::MalformedCallback;
            }
        };

        let mut code = None;
        let mut state = None;
        let mut auth_error = None;
        let mut error_description = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => auth_error = Some(value.into_owned()),
                "error_description" => error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = auth_error {
            error!(
                "Authorization error: {} - {}",
                error,
                error_description.as_deref().unwrap_or("")
            );
            return CallbackOutcome::ProviderError {
                error,
                description: error_description,
            };
        }

        let (Some(code), Some(state)) = (code, state) else {
            error!("Missing code or state in callback");
            return CallbackOutcome::MalformedCallback;
        };

        let handshake = match self.inner.session.get_handshake().await {
            Ok(Some(handshake)) => handshake,
            Ok(None) => {
                error!("No pending handshake for callback");
                return CallbackOutcome::StateMismatch;
            }
            Err(e) => {
                error!("Failed to load handshake state: {}", e);
                return CallbackOutcome::StateMismatch;
            }
        };

        // Exact, case-sensitive comparison; this is the sole defense against
        // cross-request callback injection.
        if handshake.state != state {
            error!("Callback state does not match pending handshake");
            return CallbackOutcome::StateMismatch;
        }

        let config = &self.inner.config;
        let tokens = match self
            .inner
            .token_client
            .exchange_code(
                config.token_endpoint(),
                &config.client_id,
                &config.redirect_uri,
                &code,
                &handshake.verifier,
            )
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Token exchange failed: {}", e);
                return CallbackOutcome::ExchangeFailed;
            }
        };

        let claims = match self
            .inner
            .token_client
            .fetch_userinfo(config.userinfo_endpoint(), &tokens.access_token)
            .await
        {
            Ok(claims) => claims,
            Err(e) => {
                error!("Claim fetch failed: {}", e);
                return CallbackOutcome::ClaimsFetchFailed;
            }
        };

        // A present-but-false flag and an absent flag reject identically.
        if !claims.age_verified {
            info!("Provider did not assert age verification");
            return CallbackOutcome::NotAgeVerified;
        }

        let expires_in = tokens.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let record = VerificationRecord {
            access_token: tokens.access_token,
            expires_at: Utc::now().timestamp_millis() + expires_in * 1000,
            is_verified: true,
        };

        if let Err(e) = self.inner.session.set_verification(&record).await {
            error!("Failed to persist verification record: {}", e);
            return CallbackOutcome::PersistenceFailed;
        }

        CallbackOutcome::Verified
    }

    /// Explicit logout/reset
    ///
    /// Deletes the cached verification record and any pending handshake.
    /// Idempotent; a stray callback arriving afterwards fails state
    /// validation and reports unverified.
    pub async fn clear_verification(&self) {
        if let Err(e) = self.inner.session.clear_verification().await {
            warn!("Failed to clear verification record: {}", e);
        }
        if let Err(e) = self.inner.session.clear_handshake().await {
            warn!("Failed to clear handshake state: {}", e);
        }
    }
}
