//! Shared types, configuration, and error types for the AgeWallet SDK

pub mod config;
pub mod entities;
pub mod errors;

pub use config::{
    AgeWalletConfig, EndpointOverrides, DEFAULT_AUTH_ENDPOINT, DEFAULT_TOKEN_ENDPOINT,
    DEFAULT_USERINFO_ENDPOINT,
};
pub use entities::{HandshakeState, VerificationRecord};
pub use errors::{AppError, AppResult};
