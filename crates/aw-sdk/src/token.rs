//! Token exchange and claim fetch
//!
//! The two outbound HTTP calls of the flow: exchanging the authorization
//! code (with the PKCE verifier) for an access token, and fetching the
//! age-verification claim from the userinfo endpoint. Non-success statuses
//! and undecodable bodies are reported as errors, never raised as faults.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use aw_types::{AppError, AppResult};

/// Token endpoint response body
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,

    /// Declared lifetime in seconds (optional)
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Userinfo endpoint response body
#[derive(Debug, Deserialize)]
pub struct UserInfo {
    /// Affirmative age-verification claim; an absent field is treated the
    /// same as `false`
    #[serde(default)]
    pub age_verified: bool,
}

/// HTTP client for the token and userinfo endpoints
pub struct TokenClient {
    client: Client,
}

impl TokenClient {
    /// Create a new client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Exchange an authorization code for an access token
    ///
    /// Form-encoded POST carrying the stored PKCE verifier as proof of
    /// possession of the original request.
    pub async fn exchange_code(
        &self,
        token_url: &str,
        client_id: &str,
        redirect_uri: &str,
        code: &str,
        verifier: &str,
    ) -> AppResult<TokenResponse> {
        debug!("Exchanging authorization code at {}", token_url);

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("code", code),
            ("code_verifier", verifier),
        ];

        let response = self
            .client
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Failed to send token request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed with status {}: {}", status, body);
            return Err(AppError::OAuth(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("Failed to parse token response: {}", e)))
    }

    /// Fetch claims from the userinfo endpoint
    pub async fn fetch_userinfo(&self, userinfo_url: &str, access_token: &str) -> AppResult<UserInfo> {
        debug!("Fetching claims from {}", userinfo_url);

        let response = self
            .client
            .get(userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Failed to send userinfo request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Userinfo request failed with status {}", status);
            return Err(AppError::OAuth(format!(
                "Userinfo request failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("Failed to parse userinfo response: {}", e)))
    }
}

impl Default for TokenClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_deserialization() {
        let json = r#"{
            "access_token": "test_access",
            "token_type": "Bearer",
            "expires_in": 3600
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "test_access");
        assert_eq!(response.expires_in, Some(3600));
    }

    #[test]
    fn test_token_response_minimal() {
        let json = r#"{"access_token": "test_access"}"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "test_access");
        assert_eq!(response.expires_in, None);
    }

    #[test]
    fn test_token_response_missing_access_token() {
        let json = r#"{"expires_in": 3600}"#;

        assert!(serde_json::from_str::<TokenResponse>(json).is_err());
    }

    #[test]
    fn test_userinfo_verified() {
        let json = r#"{"sub": "user-1", "age_verified": true}"#;

        let info: UserInfo = serde_json::from_str(json).unwrap();
        assert!(info.age_verified);
    }

    #[test]
    fn test_userinfo_unverified_and_absent_are_equivalent() {
        let explicit: UserInfo = serde_json::from_str(r#"{"age_verified": false}"#).unwrap();
        let absent: UserInfo = serde_json::from_str(r#"{"sub": "user-1"}"#).unwrap();

        assert!(!explicit.age_verified);
        assert!(!absent.age_verified);
    }
}
