// Authentication options and configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// JWT signing algorithms
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl Default for JwtAlgorithm {
    fn default() -> Self {
        Self::HS256
    }
}

/// Token type for JWT claims
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    /// Access token for API requests
    Access,
    /// Refresh token for obtaining new access tokens
    Refresh,
}

impl Default for TokenType {
    fn default() -> Self {
        Self::Access
    }
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Main authentication configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthOptions {
    /// JWT-specific configuration
    pub jwt: JwtOptions,
}

impl AuthOptions {
    /// Validate the entire authentication configuration
    pub fn validate(&self) -> Result<(), String> {
        self.jwt
            .validate()
            .map_err(|e| format!("JWT validation failed: {}", e))
    }

    /// Create a new AuthOptions builder
    pub fn builder() -> AuthOptionsBuilder {
        AuthOptionsBuilder::new()
    }
}

/// JWT-specific configuration options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    /// JWT signing algorithm
    pub algorithm: JwtAlgorithm,
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Token audience (aud claim)
    pub audience: Vec<String>,
    /// Access token expiration duration
    #[serde(with = "humantime_serde")]
    pub access_token_expires_in: Duration,
    /// Refresh token expiration duration
    #[serde(with = "humantime_serde")]
    pub refresh_token_expires_in: Duration,
    /// Custom claims to include in tokens
    pub custom_claims: HashMap<String, serde_json::Value>,
    /// JWT signing secret (process-wide, set at startup)
    pub secret: Option<String>,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "clinrs-auth".to_string(),
            audience: vec!["clinrs-api".to_string()],
            access_token_expires_in: Duration::from_secs(3600), // 1 hour
            refresh_token_expires_in: Duration::from_secs(604800), // 7 days
            custom_claims: HashMap::new(),
            secret: None,
        }
    }
}

impl JwtOptions {
    /// Validate JWT configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.issuer.is_empty() {
            return Err("JWT issuer cannot be empty".to_string());
        }

        if self.audience.is_empty() {
            return Err("JWT audience cannot be empty".to_string());
        }

        if self.secret.is_none() {
            return Err("HMAC algorithms require a secret".to_string());
        }

        if self.access_token_expires_in.as_secs() == 0 {
            return Err("Access token expiration must be greater than 0".to_string());
        }

        if self.refresh_token_expires_in.as_secs() == 0 {
            return Err("Refresh token expiration must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Per-call overrides for token creation/verification.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOverrides {
    pub issuer: Option<String>,
    pub audience: Option<Vec<String>>,
    pub expires_in_seconds: Option<u64>,
}

/// Builder pattern for AuthOptions configuration
#[derive(Clone, Debug, Default)]
pub struct AuthOptionsBuilder {
    jwt: Option<JwtOptions>,
}

impl AuthOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure JWT options
    pub fn jwt(mut self, jwt_options: JwtOptions) -> Self {
        self.jwt = Some(jwt_options);
        self
    }

    /// Shortcut: default JWT options with the given HMAC secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        let mut jwt = self.jwt.take().unwrap_or_default();
        jwt.secret = Some(secret.into());
        self.jwt = Some(jwt);
        self
    }

    /// Build the final AuthOptions configuration
    pub fn build(self) -> AuthOptions {
        AuthOptions {
            jwt: self.jwt.unwrap_or_default(),
        }
    }

    /// Build and validate the AuthOptions configuration
    pub fn build_validated(self) -> Result<AuthOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_fail_validation_without_a_secret() {
        let opts = AuthOptions::default();
        assert!(opts.validate().is_err());
    }

    #[test]
    fn builder_with_secret_validates() {
        let opts = AuthOptions::builder().secret("s3cret").build_validated();
        assert!(opts.is_ok());
    }

    #[test]
    fn zero_expiry_is_rejected() {
        let mut jwt = JwtOptions {
            secret: Some("s".into()),
            ..JwtOptions::default()
        };
        jwt.access_token_expires_in = Duration::from_secs(0);
        assert!(jwt.validate().is_err());
    }
}
