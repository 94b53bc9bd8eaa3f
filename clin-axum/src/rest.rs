use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{OriginalUri, Path, Query, State},
    http::HeaderMap,
    routing, Extension, Json, Router,
};
use clin_core::errors::ClinError;
use clin_core::{ClinApp, ClinService, ServiceMethodKind, TenantContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::{
    params::{FromRestParams, RestParams},
    ClinAxumError, ClinAxumState,
};

fn map_json_rejection(rejection: JsonRejection) -> ClinAxumError {
    ClinError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.to_string()]}))
        .into_anyhow()
        .into()
}

fn ensure_allowed<R, P>(
    svc: &Arc<dyn ClinService<R, P>>,
    method: ServiceMethodKind,
) -> Result<(), ClinAxumError>
where
    R: Send + 'static,
    P: Send + 'static,
{
    if svc.capabilities().allows(&method) {
        return Ok(());
    }
    Err(ClinError::method_not_allowed(format!("Method not allowed: {method:?}"))
        .into_anyhow()
        .into())
}

/// Build a REST router over a registered service.
///
/// Handlers read the tenant from the request extension the guard
/// installed; they never re-derive it from headers and there is no
/// default. Mount this behind [`require_tenant`](crate::middlewares::require_tenant).
pub fn service_router<R, P>(service_name: Arc<String>, app: Arc<ClinApp<R, P>>) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + 'static,
{
    let state = ClinAxumState { app };

    Router::new()
        .route(
            "/",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<ClinAxumState<R, P>>,
                      Extension(tenant): Extension<TenantContext>,
                      headers: HeaderMap,
                      Query(query): Query<std::collections::HashMap<String, String>>,
                      OriginalUri(uri): OriginalUri| async move {
                    let params = RestParams::from_parts("rest", &headers, query, "GET", &uri);
                    let params = P::from_rest_params(params);

                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc, ServiceMethodKind::Find)?;
                    let res = svc.find(&tenant, params).await?;
                    Ok::<_, ClinAxumError>(Json(res))
                }
            })
            .post({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<ClinAxumState<R, P>>,
                      Extension(tenant): Extension<TenantContext>,
                      headers: HeaderMap,
                      Query(query): Query<std::collections::HashMap<String, String>>,
                      OriginalUri(uri): OriginalUri,
                      data: Result<Json<R>, JsonRejection>| async move {
                    let Json(data) = data.map_err(map_json_rejection)?;

                    let params = RestParams::from_parts("rest", &headers, query, "POST", &uri);
                    let params = P::from_rest_params(params);

                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc, ServiceMethodKind::Create)?;
                    let res = svc.create(&tenant, data, params).await?;
                    Ok::<_, ClinAxumError>(Json(res))
                }
            }),
        )
        .route(
            "/{id}",
            routing::get({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<ClinAxumState<R, P>>,
                      Extension(tenant): Extension<TenantContext>,
                      headers: HeaderMap,
                      Query(query): Query<std::collections::HashMap<String, String>>,
                      OriginalUri(uri): OriginalUri,
                      Path(id): Path<String>| async move {
                    let params = RestParams::from_parts("rest", &headers, query, "GET", &uri);
                    let params = P::from_rest_params(params);

                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc, ServiceMethodKind::Get)?;
                    let res = svc.get(&tenant, &id, params).await?;
                    Ok::<_, ClinAxumError>(Json(res))
                }
            })
            .put({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<ClinAxumState<R, P>>,
                      Extension(tenant): Extension<TenantContext>,
                      headers: HeaderMap,
                      Query(query): Query<std::collections::HashMap<String, String>>,
                      OriginalUri(uri): OriginalUri,
                      Path(id): Path<String>,
                      data: Result<Json<R>, JsonRejection>| async move {
                    let Json(data) = data.map_err(map_json_rejection)?;

                    let params = RestParams::from_parts("rest", &headers, query, "PUT", &uri);
                    let params = P::from_rest_params(params);

                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc, ServiceMethodKind::Update)?;
                    let res = svc.update(&tenant, &id, data, params).await?;
                    Ok::<_, ClinAxumError>(Json(res))
                }
            })
            .patch({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<ClinAxumState<R, P>>,
                      Extension(tenant): Extension<TenantContext>,
                      headers: HeaderMap,
                      Query(query): Query<std::collections::HashMap<String, String>>,
                      OriginalUri(uri): OriginalUri,
                      Path(id): Path<String>,
                      data: Result<Json<R>, JsonRejection>| async move {
                    let Json(data) = data.map_err(map_json_rejection)?;

                    let params = RestParams::from_parts("rest", &headers, query, "PATCH", &uri);
                    let params = P::from_rest_params(params);

                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc, ServiceMethodKind::Patch)?;
                    let res = svc.patch(&tenant, Some(&id), data, params).await?;
                    Ok::<_, ClinAxumError>(Json(res))
                }
            })
            .delete({
                let service_name = Arc::clone(&service_name);
                move |State(state): State<ClinAxumState<R, P>>,
                      Extension(tenant): Extension<TenantContext>,
                      headers: HeaderMap,
                      Query(query): Query<std::collections::HashMap<String, String>>,
                      OriginalUri(uri): OriginalUri,
                      Path(id): Path<String>| async move {
                    let params = RestParams::from_parts("rest", &headers, query, "DELETE", &uri);
                    let params = P::from_rest_params(params);

                    let svc = state.app.service(&service_name)?;
                    ensure_allowed(&svc, ServiceMethodKind::Remove)?;
                    let res = svc.remove(&tenant, Some(&id), params).await?;
                    Ok::<_, ClinAxumError>(Json(res))
                }
            }),
        )
        .with_state(state)
}
