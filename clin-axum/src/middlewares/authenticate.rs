//! Credential validation middleware.
//!
//! Rejects requests without a verifiable bearer credential. When the
//! request also names a clinic via `x-clinic-id`, validation demands an
//! exact match against the credential's embedded clinic binding; a
//! mismatch is logged at warn level (possible tenant-boundary probing)
//! and answered 403.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clin_auth::credential::{extract_bearer_token, CredentialIssuer};
use clin_core::errors::{ClinError, ErrorKind};
use clin_core::{resolve_tenant_id, RequestContext};
use uuid::Uuid;

use crate::params::headers_to_map;
use crate::ClinAxumError;

pub async fn require_auth(
    State(issuer): State<Arc<CredentialIssuer>>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = headers_to_map(req.headers());

    let Some(token) = extract_bearer_token(&headers) else {
        return ClinAxumError(ClinError::not_authenticated("No access token").into_anyhow())
            .into_response();
    };

    // The header-named clinic, if any, is the expected tenant for the
    // credential-layer isolation check. The principal is not consulted
    // here; its binding is what is being checked.
    let expected = resolve_tenant_id(&headers, None);

    let principal = match issuer.validate(&token, expected.as_ref()) {
        Ok(p) => p,
        Err(err) => {
            if let Some(clin) = ClinError::from_anyhow(&err) {
                if clin.kind == ErrorKind::Forbidden {
                    let correlation_id = req
                        .extensions()
                        .get::<RequestContext>()
                        .map(|c| c.correlation_id.clone())
                        .unwrap_or_default();
                    tracing::warn!(
                        correlation_id = %correlation_id,
                        clinic_id = %expected.map(|t| t.0).unwrap_or_default(),
                        "credential rejected: bound to a different clinic"
                    );
                }
            }
            return ClinAxumError(err).into_response();
        }
    };

    let ctx = req
        .extensions_mut()
        .get_mut::<RequestContext>()
        .map(|c| {
            c.set_principal(principal.clone());
        });
    if ctx.is_none() {
        // Mounted without the correlation layer: still attach a context.
        let mut fresh = RequestContext::new(Uuid::new_v4().to_string());
        fresh.set_principal(principal);
        req.extensions_mut().insert(fresh);
    }

    next.run(req).await
}
