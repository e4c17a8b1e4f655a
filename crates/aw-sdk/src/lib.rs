//! AgeWallet SDK for Rust host applications
//!
//! Obtains an age-verification assertion from the AgeWallet identity
//! provider via an OIDC authorization-code flow with PKCE, and caches the
//! result locally until it expires.
//!
//! The host supplies three services: a system browser view
//! ([`SystemBrowser`]), a deep-link event source ([`DeepLinkSource`]), and a
//! durable key-value store ([`KeyValueStore`]).
//!
//! # Usage Example
//! ```no_run
//! use std::sync::Arc;
//! use aw_sdk::{AgeWallet, AgeWalletConfig, FileStore};
//! # use aw_sdk::{MockBrowser, MockDeepLinks};
//!
//! # async fn example() -> aw_sdk::AppResult<()> {
//! let store = Arc::new(FileStore::new("agewallet.json".into()).await?);
//! # let browser = Arc::new(MockBrowser::new());
//! # let deep_links = Arc::new(MockDeepLinks::new());
//! let wallet = AgeWallet::new(
//!     AgeWalletConfig::new("your-client-id", "https://yourapp.com/callback"),
//!     store,
//!     browser,
//!     deep_links,
//! )?;
//!
//! if !wallet.is_verified().await {
//!     wallet.start_verification().await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod flow;
pub mod host;
pub mod pkce;
pub mod token;

// Re-export public API
pub use flow::{AgeWallet, CallbackOutcome};
pub use host::{DeepLinkSource, MockBrowser, MockDeepLinks, SystemBrowser};
pub use token::{TokenClient, TokenResponse, UserInfo};

pub use aw_storage::{FileStore, KeyValueStore, MemoryStore, SessionStore};
pub use aw_types::{
    AgeWalletConfig, AppError, AppResult, EndpointOverrides, HandshakeState, VerificationRecord,
};
