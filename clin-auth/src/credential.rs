// Credential issuer/validator.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clin_core::errors::ClinError;
use clin_core::{Principal, TenantId};
use jsonwebtoken::{decode, decode_header, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::options::{AuthOptions, JwtAlgorithm, JwtOptions, JwtOverrides, TokenType};

/// Claims carried by a signed credential.
///
/// `clinicId` is the optional tenant binding. `roles` is canonical; a
/// legacy scalar `role` claim is still accepted and normalized by
/// [`Claims::role_set`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "clinicId", skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iss: String,
    pub aud: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Claims {
    /// Normalized role set: prefers `roles`, falls back to a scalar `role`.
    pub fn role_set(&self) -> Vec<String> {
        if let Some(roles) = &self.roles {
            return roles.clone();
        }
        self.role.clone().map(|r| vec![r]).unwrap_or_default()
    }

    pub fn into_principal(self) -> Principal {
        let roles = self.role_set();
        Principal {
            subject: self.sub,
            roles,
            clinic_id: self.clinic_id.map(TenantId),
        }
    }
}

/// Parsing options for bearer-style token transport.
#[derive(Clone, Debug)]
pub struct TokenHeaderOptions {
    pub header: String,
    pub schemes: Vec<String>,
}

impl Default for TokenHeaderOptions {
    fn default() -> Self {
        Self {
            header: "authorization".to_string(),
            schemes: vec!["Bearer".to_string(), "JWT".to_string()],
        }
    }
}

impl TokenHeaderOptions {
    /// Pull a token out of a header map. Header-name lookup is
    /// case-insensitive; scheme matching is case-insensitive against the
    /// allow-list. A header without a scheme is treated as a raw token.
    pub fn parse(&self, headers: &HashMap<String, String>) -> Option<String> {
        let hv = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&self.header))
            .map(|(_, v)| v)?;

        let hv = hv.trim();
        if hv.is_empty() {
            return None;
        }

        if let Some((scheme, token)) = hv.split_once(' ') {
            let scheme = scheme.trim();
            let token = token.trim();
            if token.is_empty() {
                return None;
            }

            let allowed = self.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme));
            if allowed {
                return Some(token.to_string());
            }

            return None;
        }

        Some(hv.to_string())
    }
}

/// Extract a `Bearer` token from an `authorization` header.
pub fn extract_bearer_token(headers: &HashMap<String, String>) -> Option<String> {
    TokenHeaderOptions::default().parse(headers)
}

/// Issues and validates signed credentials.
///
/// Holds the process-wide signing configuration, passed in at startup.
/// No module-level state: tests construct issuers with distinct secrets.
#[derive(Debug)]
pub struct CredentialIssuer {
    options: AuthOptions,
}

impl CredentialIssuer {
    pub fn new(options: AuthOptions) -> Result<Self> {
        options
            .validate()
            .map_err(|e| ClinError::general_error(e).into_anyhow())?;
        Ok(Self { options })
    }

    pub fn configuration(&self) -> &AuthOptions {
        &self.options
    }

    fn algorithm(alg: &JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    // A missing secret is a server misconfiguration, not a caller fault.
    fn secret(jwt: &JwtOptions) -> Result<&str> {
        jwt.secret
            .as_deref()
            .ok_or_else(|| ClinError::general_error("JWT secret is not configured").into_anyhow())
    }

    fn sign(&self, claims: &Claims, token_type: TokenType) -> Result<String> {
        let jwt = &self.options.jwt;
        let secret = Self::secret(jwt)?;

        let mut header = Header::new(Self::algorithm(&jwt.algorithm));
        header.typ = Some(token_type.as_str().to_string());

        // Signing happens on the issue path: a failure here is a
        // downstream fault, never an authentication outcome.
        encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| ClinError::general_error(e.to_string()).into_anyhow())
    }

    fn build_claims(
        &self,
        principal: &Principal,
        tenant: Option<&TenantId>,
        overrides: Option<&JwtOverrides>,
        token_type: TokenType,
    ) -> Claims {
        let jwt = &self.options.jwt;

        let issuer = overrides
            .and_then(|o| o.issuer.clone())
            .unwrap_or_else(|| jwt.issuer.clone());
        let audience = overrides
            .and_then(|o| o.audience.clone())
            .unwrap_or_else(|| jwt.audience.clone());
        let expires_in_seconds = overrides
            .and_then(|o| o.expires_in_seconds)
            .unwrap_or_else(|| match token_type {
                TokenType::Access => jwt.access_token_expires_in.as_secs(),
                TokenType::Refresh => jwt.refresh_token_expires_in.as_secs(),
            });

        let now = Utc::now().timestamp();
        let clinic = tenant
            .map(|t| t.0.clone())
            .or_else(|| principal.clinic_id.as_ref().map(|t| t.0.clone()));
        let roles = (!principal.roles.is_empty()).then(|| principal.roles.clone());

        Claims {
            sub: principal.subject.clone(),
            clinic_id: clinic,
            roles,
            role: None,
            iss: issuer,
            aud: audience,
            iat: now,
            exp: now + expires_in_seconds as i64,
            jti: Uuid::new_v4().to_string(),
            // Config claims override anything the caller put in the payload.
            extra: jwt.custom_claims.clone().into_iter().collect(),
        }
    }

    /// Issue an access credential for a principal, optionally bound to a
    /// tenant. When `tenant` is absent, the principal's own clinic binding
    /// (if any) is embedded instead.
    pub fn issue(&self, principal: &Principal, tenant: Option<&TenantId>) -> Result<String> {
        self.issue_with(principal, tenant, None)
    }

    pub fn issue_with(
        &self,
        principal: &Principal,
        tenant: Option<&TenantId>,
        overrides: Option<&JwtOverrides>,
    ) -> Result<String> {
        let claims = self.build_claims(principal, tenant, overrides, TokenType::Access);
        self.sign(&claims, TokenType::Access)
    }

    /// Issue a long-lived refresh credential.
    pub fn issue_refresh(&self, principal: &Principal, tenant: Option<&TenantId>) -> Result<String> {
        let claims = self.build_claims(principal, tenant, None, TokenType::Refresh);
        self.sign(&claims, TokenType::Refresh)
    }

    fn validation(&self, validate_exp: bool) -> Result<Validation> {
        let jwt = &self.options.jwt;
        let mut validation = Validation::new(Self::algorithm(&jwt.algorithm));
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&jwt.audience.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        // No clock grace: a token at its exp is expired.
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        Ok(validation)
    }

    fn decode_claims(&self, token: &str, expected_type: TokenType, validate_exp: bool) -> Result<Claims> {
        let jwt = &self.options.jwt;
        let secret = Self::secret(jwt)?;

        let header = decode_header(token)
            .map_err(|e| ClinError::not_authenticated(e.to_string()).into_anyhow())?;
        if header.typ.as_deref() != Some(expected_type.as_str()) {
            return Err(ClinError::not_authenticated(format!(
                "Expected a {} token",
                expected_type.as_str()
            ))
            .into_anyhow());
        }

        let validation = self.validation(validate_exp)?;
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ClinError::not_authenticated(e.to_string()).into_anyhow())?;

        Ok(decoded.claims)
    }

    /// Verify signature, expiry, issuer, and audience, then (when
    /// `expected_tenant` is supplied) demand an exact match against the
    /// embedded clinic binding. A mismatch is an authorization error, not
    /// an authentication error: the credential is genuine, just not for
    /// this clinic.
    pub fn validate(&self, token: &str, expected_tenant: Option<&TenantId>) -> Result<Principal> {
        let claims = self.decode_claims(token, TokenType::Access, true)?;

        if let Some(expected) = expected_tenant {
            match claims.clinic_id.as_deref() {
                Some(embedded) if embedded == expected.as_str() => {}
                _ => {
                    return Err(ClinError::forbidden(format!(
                        "Credential is not valid for clinic `{}`",
                        expected
                    ))
                    .into_anyhow());
                }
            }
        }

        Ok(claims.into_principal())
    }

    /// Verify a refresh credential and return its principal.
    pub fn validate_refresh(&self, token: &str) -> Result<Principal> {
        let claims = self.decode_claims(token, TokenType::Refresh, true)?;
        Ok(claims.into_principal())
    }

    /// Whether an access credential is within `buffer` of its expiry (or
    /// past it, or unreadable). Callers treat `true` as "refresh before
    /// using" to avoid a token expiring mid-flight.
    pub fn needs_refresh(&self, token: &str, buffer: Duration) -> bool {
        let claims = match self.decode_claims(token, TokenType::Access, false) {
            Ok(c) => c,
            Err(_) => return true,
        };

        let now = Utc::now().timestamp();
        claims.exp - now <= buffer.as_secs() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clin_core::errors::ErrorKind;

    fn issuer() -> CredentialIssuer {
        let options = AuthOptions::builder().secret("unit-test-secret").build();
        CredentialIssuer::new(options).unwrap()
    }

    fn clinic(id: &str) -> TenantId {
        TenantId(id.to_string())
    }

    #[test]
    fn issue_and_validate_round_trip() {
        let iss = issuer();
        let principal = Principal::new("u1").with_roles(vec!["admin".into()]);

        let token = iss.issue(&principal, Some(&clinic("C1"))).unwrap();
        let validated = iss.validate(&token, Some(&clinic("C1"))).unwrap();

        assert_eq!(validated.subject, "u1");
        assert_eq!(validated.clinic_id, Some(clinic("C1")));
        assert_eq!(validated.roles, vec!["admin".to_string()]);
    }

    #[test]
    fn tenant_mismatch_is_forbidden() {
        let iss = issuer();
        let token = iss.issue(&Principal::new("u1"), Some(&clinic("C1"))).unwrap();

        let err = iss.validate(&token, Some(&clinic("C2"))).unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::Forbidden);
    }

    #[test]
    fn unbound_credential_fails_when_a_tenant_is_expected() {
        let iss = issuer();
        let token = iss.issue(&Principal::new("u1"), None).unwrap();

        let err = iss.validate(&token, Some(&clinic("C1"))).unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::Forbidden);
    }

    #[test]
    fn tampered_token_is_not_authenticated() {
        let iss = issuer();
        let token = iss.issue(&Principal::new("u1"), Some(&clinic("C1"))).unwrap();

        let mut tampered = token.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        let err = iss.validate(&tampered, None).unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::NotAuthenticated);
    }

    #[test]
    fn expired_token_is_not_authenticated() {
        let iss = issuer();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u1".into(),
            clinic_id: Some("C1".into()),
            roles: None,
            role: None,
            iss: "clinrs-auth".into(),
            aud: vec!["clinrs-api".into()],
            iat: now - 240,
            exp: now - 120,
            jti: "expired".into(),
            extra: HashMap::new(),
        };
        let mut header = Header::new(jsonwebtoken::Algorithm::HS256);
        header.typ = Some("access".into());
        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();

        let err = iss.validate(&token, None).unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::NotAuthenticated);
    }

    #[test]
    fn misconfigured_signer_is_a_server_error_not_an_auth_failure() {
        let err = CredentialIssuer::new(AuthOptions::default()).unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::GeneralError);
    }

    #[test]
    fn wrong_secret_rejects_the_token() {
        let iss_a = issuer();
        let iss_b =
            CredentialIssuer::new(AuthOptions::builder().secret("other-secret").build()).unwrap();

        let token = iss_a.issue(&Principal::new("u1"), None).unwrap();
        assert!(iss_b.validate(&token, None).is_err());
    }

    #[test]
    fn refresh_token_is_rejected_on_the_access_path() {
        let iss = issuer();
        let refresh = iss.issue_refresh(&Principal::new("u1"), None).unwrap();

        let err = iss.validate(&refresh, None).unwrap_err();
        let clin = ClinError::from_anyhow(&err).unwrap();
        assert_eq!(clin.kind, ErrorKind::NotAuthenticated);
    }

    #[test]
    fn needs_refresh_inside_the_buffer_window() {
        let iss = issuer();
        let soon = JwtOverrides {
            expires_in_seconds: Some(30),
            ..JwtOverrides::default()
        };
        let token = iss
            .issue_with(&Principal::new("u1"), None, Some(&soon))
            .unwrap();

        assert!(iss.needs_refresh(&token, Duration::from_secs(60)));
        assert!(!iss.needs_refresh(&token, Duration::from_secs(5)));
    }

    #[test]
    fn unreadable_token_always_needs_refresh() {
        let iss = issuer();
        assert!(iss.needs_refresh("not-a-jwt", Duration::from_secs(60)));
    }

    #[test]
    fn legacy_scalar_role_claim_is_normalized() {
        let claims = Claims {
            sub: "u1".into(),
            clinic_id: None,
            roles: None,
            role: Some("doctor".into()),
            iss: "i".into(),
            aud: vec!["a".into()],
            iat: 0,
            exp: 0,
            jti: "j".into(),
            extra: HashMap::new(),
        };
        assert_eq!(claims.role_set(), vec!["doctor".to_string()]);
    }

    #[test]
    fn bearer_extraction_accepts_schemes_case_insensitively() {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "bearer abc.def.ghi".to_string());
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi".to_string()));

        headers.insert("authorization".to_string(), "Basic dXNlcg==".to_string());
        let only_basic: HashMap<_, _> = [("authorization".to_string(), "Basic dXNlcg==".to_string())]
            .into_iter()
            .collect();
        assert_eq!(extract_bearer_token(&only_basic), None);
    }
}
