use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clin_core::errors::ClinError;

/// Full error chain of a failed request. Attached to 5xx responses as an
/// extension so the correlation layer can log it next to the request id;
/// never serialized to the client.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

#[derive(Debug)]
pub struct ClinAxumError(pub anyhow::Error);

impl From<anyhow::Error> for ClinAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ClinAxumError {
    fn into_response(self) -> Response {
        let detail = format!("{:#}", self.0);

        // Structured errors keep their taxonomy; anything else is a 500.
        let clin = ClinError::normalize(self.0);
        let safe = clin.sanitize_for_client();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut res = (status, Json(safe.to_json())).into_response();
        if status.is_server_error() {
            res.extensions_mut().insert(ErrorDetail(detail));
        }
        res
    }
}
