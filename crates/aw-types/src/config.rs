//! SDK configuration and endpoint defaults

use crate::errors::{AppError, AppResult};

/// Default authorization endpoint (browser-navigated)
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://app.agewallet.io/user/authorize";

/// Default token endpoint (form-encoded POST)
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://app.agewallet.io/user/token";

/// Default userinfo endpoint (bearer-authenticated GET)
pub const DEFAULT_USERINFO_ENDPOINT: &str = "https://app.agewallet.io/user/userinfo";

/// Optional per-instance endpoint overrides
///
/// Any field left as `None` falls back to the corresponding
/// `app.agewallet.io` default.
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    /// Authorization endpoint override
    pub auth: Option<String>,

    /// Token endpoint override
    pub token: Option<String>,

    /// Userinfo endpoint override
    pub userinfo: Option<String>,
}

/// AgeWallet SDK configuration
#[derive(Debug, Clone)]
pub struct AgeWalletConfig {
    /// OAuth client ID issued by the AgeWallet dashboard
    pub client_id: String,

    /// Callback URL registered for the application (universal link or
    /// custom scheme); inbound deep links are matched against this prefix
    pub redirect_uri: String,

    /// Endpoint overrides, primarily for staging environments and tests
    pub endpoints: EndpointOverrides,
}

impl AgeWalletConfig {
    /// Create a configuration with default endpoints
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            endpoints: EndpointOverrides::default(),
        }
    }

    /// Validate required parameters
    ///
    /// Both `client_id` and `redirect_uri` must be non-empty. Called by the
    /// flow controller at construction time so misconfiguration fails fast
    /// instead of at flow start.
    pub fn validate(&self) -> AppResult<()> {
        if self.client_id.is_empty() {
            return Err(AppError::Config("Missing clientId".to_string()));
        }
        if self.redirect_uri.is_empty() {
            return Err(AppError::Config("Missing redirectUri".to_string()));
        }
        Ok(())
    }

    /// Resolved authorization endpoint
    pub fn auth_endpoint(&self) -> &str {
        self.endpoints.auth.as_deref().unwrap_or(DEFAULT_AUTH_ENDPOINT)
    }

    /// Resolved token endpoint
    pub fn token_endpoint(&self) -> &str {
        self.endpoints
            .token
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_ENDPOINT)
    }

    /// Resolved userinfo endpoint
    pub fn userinfo_endpoint(&self) -> &str {
        self.endpoints
            .userinfo
            .as_deref()
            .unwrap_or(DEFAULT_USERINFO_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ok() {
        let config = AgeWalletConfig::new("client-1", "https://app.example/cb");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_client_id() {
        let config = AgeWalletConfig::new("", "https://app.example/cb");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_missing_redirect_uri() {
        let config = AgeWalletConfig::new("client-1", "");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_default_endpoints() {
        let config = AgeWalletConfig::new("client-1", "https://app.example/cb");
        assert_eq!(config.auth_endpoint(), DEFAULT_AUTH_ENDPOINT);
        assert_eq!(config.token_endpoint(), DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.userinfo_endpoint(), DEFAULT_USERINFO_ENDPOINT);
    }

    #[test]
    fn test_endpoint_overrides() {
        let mut config = AgeWalletConfig::new("client-1", "https://app.example/cb");
        config.endpoints.token = Some("https://staging.agewallet.io/user/token".to_string());

        assert_eq!(config.auth_endpoint(), DEFAULT_AUTH_ENDPOINT);
        assert_eq!(
            config.token_endpoint(),
            "https://staging.agewallet.io/user/token"
        );
    }
}
