//! Authentication REST surface: login, refresh, logout.
//!
//! The server stays stateless for access credentials; only the refresh
//! token store (inside the session manager) remembers anything between
//! requests.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{routing, Json, Router};
use clin_auth::credential::extract_bearer_token;
use clin_auth::refresh::{SessionManager, SessionTokens};
use clin_core::errors::ClinError;
use clin_core::{resolve_tenant_id, Principal};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::headers_to_map;
use crate::ClinAxumError;

/// Credential-verification collaborator: given the login payload,
/// produce the authenticated principal or fail. Backends decide what the
/// payload means (password check, directory lookup, ...).
#[async_trait]
pub trait LoginHandler: Send + Sync {
    async fn verify(&self, request: &LoginRequest) -> Result<Principal>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub strategy: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

pub struct AuthRouterState {
    pub session: Arc<SessionManager>,
    pub login: Arc<dyn LoginHandler>,
}

impl Clone for AuthRouterState {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            login: Arc::clone(&self.login),
        }
    }
}

async fn login(
    State(state): State<AuthRouterState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionTokens>, ClinAxumError> {
    let principal = state.login.verify(&request).await?;

    // Bind the session to the clinic named on the request, falling back
    // to the principal's own clinic.
    let header_map: HashMap<String, String> = headers_to_map(&headers);
    let tenant = resolve_tenant_id(&header_map, Some(&principal));

    let tokens = state.session.login(&principal, tenant.as_ref()).await?;
    Ok(Json(tokens))
}

async fn refresh(
    State(state): State<AuthRouterState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<SessionTokens>, ClinAxumError> {
    let tokens = state.session.refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

async fn logout(
    State(state): State<AuthRouterState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ClinAxumError> {
    let header_map = headers_to_map(&headers);
    let token = extract_bearer_token(&header_map)
        .ok_or_else(|| ClinError::not_authenticated("Invalid access token").into_anyhow())?;

    // Logout still requires a genuine credential; the clinic binding is
    // not checked here since the session is being torn down either way.
    let principal = state.session.issuer().validate(&token, None)?;
    state.session.logout(&principal.subject).await;

    Ok(Json(serde_json::json!({ "loggedOut": true })))
}

/// Router for `/authentication`-style mounts: POST `/` logs in,
/// POST `/refresh` exchanges a refresh token, POST `/logout` ends the
/// session.
pub fn auth_router(state: AuthRouterState) -> Router<()> {
    Router::new()
        .route("/", routing::post(login))
        .route("/refresh", routing::post(refresh))
        .route("/logout", routing::post(logout))
        .with_state(state)
}
