use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::http::Request;
use clin_auth::credential::CredentialIssuer;
use clin_auth::options::AuthOptions;
use clin_auth::refresh::{MemoryRefreshStore, SessionManager};
use clin_axum::auth_routes::{auth_router, AuthRouterState, LoginHandler, LoginRequest};
use clin_axum::axum_app;
use clin_core::errors::ClinError;
use clin_core::{ClinApp, Principal, TenantId};
use clin_store::{MemoryService, MemoryStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Accepts any payload that names a subject; binds the principal to the
/// clinic named in the payload, if any.
struct DemoLogin;

#[async_trait::async_trait]
impl LoginHandler for DemoLogin {
    async fn verify(&self, request: &LoginRequest) -> Result<Principal> {
        let subject = request
            .data
            .get("subject")
            .and_then(Value::as_str)
            .ok_or_else(|| ClinError::not_authenticated("Invalid login").into_anyhow())?;

        let mut principal = Principal::new(subject);
        if let Some(clinic) = request.data.get("clinicId").and_then(Value::as_str) {
            principal = principal.with_clinic(TenantId(clinic.to_string()));
        }
        Ok(principal)
    }
}

struct Fixture {
    router: axum::Router,
    issuer: Arc<CredentialIssuer>,
    store: Arc<MemoryStore>,
}

fn fixture() -> Fixture {
    let options = AuthOptions::builder().secret("flow-test-secret").build();
    let issuer = Arc::new(CredentialIssuer::new(options).unwrap());
    let session = Arc::new(SessionManager::new(
        Arc::clone(&issuer),
        Arc::new(MemoryRefreshStore::new()),
    ));

    let store = Arc::new(MemoryStore::new());
    let service = MemoryService::new(Arc::clone(&store));

    let ax = axum_app(ClinApp::<Value, ()>::new())
        .use_router(
            "/authentication",
            auth_router(AuthRouterState {
                session,
                login: Arc::new(DemoLogin),
            }),
        )
        .use_protected_service("/patients", Arc::new(service), Arc::clone(&issuer));

    Fixture {
        router: ax.router(),
        issuer,
        store,
    }
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn login(fx: &Fixture, subject: &str, clinic: &str) -> (String, String) {
    let res = fx
        .router
        .clone()
        .oneshot(post_json(
            "/authentication",
            json!({"subject": subject, "clinicId": clinic}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let body = json_body(res).await;
    (
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn login_issues_a_clinic_bound_credential_pair() {
    let fx = fixture();
    let (access, refresh) = login(&fx, "u1", "C1").await;

    assert_ne!(access, refresh);
    let principal = fx
        .issuer
        .validate(&access, Some(&TenantId("C1".into())))
        .unwrap();
    assert_eq!(principal.subject, "u1");
    assert_eq!(principal.clinic_id, Some(TenantId("C1".into())));
}

#[tokio::test]
async fn refresh_exchanges_the_token_for_a_new_access_credential() {
    let fx = fixture();
    let (access, refresh) = login(&fx, "u1", "C1").await;

    let res = fx
        .router
        .clone()
        .oneshot(post_json(
            "/authentication/refresh",
            json!({"refreshToken": refresh}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let body = json_body(res).await;
    let new_access = body["accessToken"].as_str().unwrap();
    assert_ne!(new_access, access);
    assert!(fx
        .issuer
        .validate(new_access, Some(&TenantId("C1".into())))
        .is_ok());
}

#[tokio::test]
async fn invalid_refresh_token_is_session_expired() {
    let fx = fixture();

    let res = fx
        .router
        .clone()
        .oneshot(post_json(
            "/authentication/refresh",
            json!({"refreshToken": "not-a-token"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotAuthenticated");
    assert_eq!(body["message"], "Session expired");
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let fx = fixture();
    let (access, refresh) = login(&fx, "u1", "C1").await;

    let res = fx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authentication/logout")
                .header("authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await["loggedOut"], json!(true));

    let res = fx
        .router
        .clone()
        .oneshot(post_json(
            "/authentication/refresh",
            json!({"refreshToken": refresh}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_route_without_a_credential_is_unauthorized() {
    let fx = fixture();

    let res = fx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/patients")
                .header("x-clinic-id", "C1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
    assert_eq!(json_body(res).await["name"], "NotAuthenticated");
}

#[tokio::test]
async fn credential_bound_to_another_clinic_is_forbidden() {
    let fx = fixture();
    let (access, _) = login(&fx, "u1", "C1").await;

    let res = fx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/patients")
                .header("x-clinic-id", "C2")
                .header("authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 403);
    let body = json_body(res).await;
    assert_eq!(body["name"], "Forbidden");
    assert!(body["message"].as_str().unwrap().contains("C2"));
}

#[tokio::test]
async fn matching_clinic_credential_reaches_its_own_partition() {
    let fx = fixture();
    fx.store
        .save(&TenantId("C1".into()), json!({"id": "p1"}))
        .unwrap();
    fx.store
        .save(&TenantId("C2".into()), json!({"id": "p2"}))
        .unwrap();

    let (access, _) = login(&fx, "u1", "C1").await;

    let res = fx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/patients")
                .header("x-clinic-id", "C1")
                .header("authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let records = json_body(res).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["clinicId"], json!("C1"));
}

#[tokio::test]
async fn credential_clinic_fills_in_when_no_header_names_one() {
    let fx = fixture();
    fx.store
        .save(&TenantId("C1".into()), json!({"id": "p1"}))
        .unwrap();

    let (access, _) = login(&fx, "u1", "C1").await;

    // No x-clinic-id: the guard falls back to the credential's binding.
    let res = fx
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/patients")
                .header("authorization", format!("Bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);
}
