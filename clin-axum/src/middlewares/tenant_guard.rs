//! Tenant guard.
//!
//! Single-shot, per-request gate in front of tenant-scoped routes:
//! resolves the clinic identifier onto the request context, or
//! short-circuits with a client error before any business logic runs.
//! There is no retry; a resolution failure is a client error, not
//! transient. Re-entry (nested mounts) reuses the already-resolved value.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use clin_core::tenant::{missing_tenant_error, resolve_tenant_id};
use clin_core::{RequestContext, TenantContext, TenantId};
use uuid::Uuid;

use crate::params::headers_to_map;
use crate::{ClinAxumError, ClinAxumState};

pub async fn require_tenant<R, P>(
    State(state): State<ClinAxumState<R, P>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: Send + 'static,
    P: Send + 'static,
{
    if req.extensions().get::<RequestContext>().is_none() {
        // Mounted without the correlation layer: still attach a context.
        req.extensions_mut()
            .insert(RequestContext::new(Uuid::new_v4().to_string()));
    }

    // Already resolved on this request: idempotent.
    if let Some(tenant) = req
        .extensions()
        .get::<RequestContext>()
        .and_then(|c| c.tenant().cloned())
    {
        req.extensions_mut().insert(tenant);
        return next.run(req).await;
    }

    let headers = headers_to_map(req.headers());
    let principal = req
        .extensions()
        .get::<RequestContext>()
        .and_then(|c| c.principal.clone());

    let resolved = resolve_tenant_id(&headers, principal.as_ref()).or_else(|| {
        // Opt-in single-tenant-mode fallback; never a resolver default.
        state
            .app
            .config_snapshot()
            .get_string("tenant.default")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(TenantId)
    });

    let Some(tenant_id) = resolved else {
        return ClinAxumError(missing_tenant_error()).into_response();
    };

    let tenant = TenantContext {
        tenant_id: tenant_id.clone(),
    };

    let correlation_id = {
        let ctx = req
            .extensions_mut()
            .get_mut::<RequestContext>()
            .expect("request context attached above");
        ctx.set_tenant(tenant.clone());
        ctx.correlation_id.clone()
    };

    // Handlers extract the tenant directly; the full context stays
    // available for anything else.
    req.extensions_mut().insert(tenant);

    tracing::debug!(
        correlation_id = %correlation_id,
        clinic_id = %tenant_id,
        "tenant resolved"
    );

    next.run(req).await
}
