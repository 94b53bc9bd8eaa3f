use std::sync::Arc;

use axum::middleware;
use axum::Router;
use clin_auth::credential::CredentialIssuer;
use clin_core::{ClinApp, ClinService};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;

use crate::middlewares::{propagate_correlation_id, require_auth, require_tenant};
use crate::params::FromRestParams;
use crate::rest;
use crate::ClinAxumState;

/// Axum application wrapper around a [`ClinApp`].
///
/// Tenant-scoped services are mounted behind the tenant guard;
/// correlation propagation and request tracing wrap the whole router.
pub struct ClinAxumApp<R, P = ()>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub app: Arc<ClinApp<R, P>>,
    inner: Router<()>,
}

impl<R, P> Clone for ClinAxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            inner: self.inner.clone(),
        }
    }
}

impl<R, P> ClinAxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub fn new(app: ClinApp<R, P>) -> Self {
        Self {
            app: Arc::new(app),
            inner: Router::new(),
        }
    }

    /// Mount a router as-is (not tenant-guarded). Used for public
    /// surfaces such as the authentication routes.
    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.inner = self.inner.nest(path, router);
        self
    }

    /// Register a service and mount its REST routes behind the tenant
    /// guard.
    pub fn use_service(mut self, path: &'static str, service: Arc<dyn ClinService<R, P>>) -> Self
    where
        R: Serialize + DeserializeOwned,
        P: FromRestParams,
    {
        let name = path.trim_start_matches('/');
        self.app.register_service(name, service);

        let service_name = Arc::new(name.to_string());
        let state = ClinAxumState {
            app: Arc::clone(&self.app),
        };
        let router = rest::service_router(Arc::clone(&service_name), Arc::clone(&self.app))
            .layer(middleware::from_fn_with_state(state, require_tenant::<R, P>));

        self.inner = self.inner.nest(path, router);
        self
    }

    /// Like [`use_service`](Self::use_service), but additionally demands a
    /// verifiable bearer credential; the credential-layer tenant check
    /// runs before the guard, and the guard can fall back to the
    /// credential's clinic binding when no header names one.
    pub fn use_protected_service(
        mut self,
        path: &'static str,
        service: Arc<dyn ClinService<R, P>>,
        issuer: Arc<CredentialIssuer>,
    ) -> Self
    where
        R: Serialize + DeserializeOwned,
        P: FromRestParams,
    {
        let name = path.trim_start_matches('/');
        self.app.register_service(name, service);

        let service_name = Arc::new(name.to_string());
        let state = ClinAxumState {
            app: Arc::clone(&self.app),
        };
        let router = rest::service_router(Arc::clone(&service_name), Arc::clone(&self.app))
            .layer(middleware::from_fn_with_state(state, require_tenant::<R, P>))
            .layer(middleware::from_fn_with_state(issuer, require_auth));

        self.inner = self.inner.nest(path, router);
        self
    }

    /// The finished router with the request-wide layers applied:
    /// correlation propagation outermost, then HTTP tracing.
    pub fn router(&self) -> Router<()> {
        self.inner
            .clone()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn(propagate_correlation_id))
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

pub fn axum_app<R, P>(app: ClinApp<R, P>) -> ClinAxumApp<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    ClinAxumApp::new(app)
}
