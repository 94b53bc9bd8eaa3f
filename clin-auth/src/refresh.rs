// Refresh flow.
//
// The server stays stateless for access credentials; the refresh token
// store is the external collaborator that remembers which refresh token a
// subject currently holds. Refresh failure is terminal for the session:
// callers surface session-expired and never retry the original credential.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clin_core::errors::ClinError;
use clin_core::{Principal, TenantId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::credential::CredentialIssuer;

/// Safety buffer before expiry: a credential within this window of its
/// expiry is treated as needing refresh, so it cannot expire mid-flight.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(60);

/// Access/refresh token pair handed out at login and on refresh.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokens {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// External collaborator holding the current refresh token per subject.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn get(&self, subject: &str) -> Option<String>;
    async fn put(&self, subject: &str, token: String);
    async fn remove(&self, subject: &str);
}

/// In-memory refresh token store for tests and single-node deployments.
#[derive(Default)]
pub struct MemoryRefreshStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryRefreshStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshStore {
    async fn get(&self, subject: &str) -> Option<String> {
        self.tokens.read().get(subject).cloned()
    }

    async fn put(&self, subject: &str, token: String) {
        self.tokens.write().insert(subject.to_string(), token);
    }

    async fn remove(&self, subject: &str) {
        self.tokens.write().remove(subject);
    }
}

/// Issues login token pairs and exchanges refresh tokens for fresh access
/// credentials.
pub struct SessionManager {
    issuer: Arc<CredentialIssuer>,
    store: Arc<dyn RefreshTokenStore>,
}

impl SessionManager {
    pub fn new(issuer: Arc<CredentialIssuer>, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { issuer, store }
    }

    pub fn issuer(&self) -> &Arc<CredentialIssuer> {
        &self.issuer
    }

    /// Start a session: issue an access/refresh pair and remember the
    /// refresh token for the subject.
    pub async fn login(&self, principal: &Principal, tenant: Option<&TenantId>) -> Result<SessionTokens> {
        let access_token = self.issuer.issue(principal, tenant)?;
        let refresh_token = self.issuer.issue_refresh(principal, tenant)?;

        self.store
            .put(&principal.subject, refresh_token.clone())
            .await;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access credential.
    ///
    /// The presented token must verify and must equal the one on record
    /// for its subject. On any failure the store is left untouched and a
    /// session-expired error is returned.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens> {
        let principal = self
            .issuer
            .validate_refresh(refresh_token)
            .map_err(|_| ClinError::not_authenticated("Session expired").into_anyhow())?;

        let on_record = self.store.get(&principal.subject).await;
        if on_record.as_deref() != Some(refresh_token) {
            tracing::warn!(subject = %principal.subject, "refresh token not on record");
            return Err(ClinError::not_authenticated("Session expired").into_anyhow());
        }

        let tenant = principal.clinic_id.clone();
        let access_token = self.issuer.issue(&principal, tenant.as_ref())?;

        Ok(SessionTokens {
            access_token,
            refresh_token: refresh_token.to_string(),
        })
    }

    /// End a session server-side; the client discards its tokens.
    pub async fn logout(&self, subject: &str) {
        self.store.remove(subject).await;
    }
}
