use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    identity::{CustomerIdentity, Identity, StaffIdentity, StaffRole},
    session::SessionRegistry,
};

/// Claims
///
/// Payload structure of the staff JWTs minted by the dealer backend. Signed
/// with the shared secret and validated on every staff request. The role,
/// name and email ride in the claims so no profile lookup is needed here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the staff member's UUID.
    pub sub: Uuid,
    pub role: StaffRole,
    pub name: String,
    pub email: String,
    /// Expiration time. Tokens past this point are rejected.
    pub exp: usize,
    /// Issued-at time.
    pub iat: usize,
}

/// Decodes and validates a staff JWT against the shared secret.
/// Returns None on any failure (expired, malformed, bad signature); the
/// caller decides whether that means 401 or `Unauthenticated`.
pub fn decode_staff_token(token: &str, secret: &str) -> Option<StaffIdentity> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &decoding_key, &validation).ok()?;

    Some(StaffIdentity {
        id: data.claims.sub,
        role: data.claims.role,
        name: data.claims.name,
        email: data.claims.email,
    })
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Local Development Bypass
///
/// In `Env::Local` only, a synthetic staff identity can be injected via the
/// `x-staff-role` header (`super-admin` or `branch-admin`), optionally with
/// `x-staff-id`. Accelerates development and integration tests; guarded by
/// the Env check so it is inert in production.
fn staff_from_bypass(parts: &Parts, config: &AppConfig) -> Option<StaffIdentity> {
    if config.env != Env::Local {
        return None;
    }
    let role = match parts.headers.get("x-staff-role")?.to_str().ok()? {
        "super-admin" => StaffRole::SuperAdmin,
        "branch-admin" => StaffRole::BranchAdmin,
        _ => return None,
    };
    let id = parts
        .headers
        .get("x-staff-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or(Uuid::nil());

    Some(StaffIdentity {
        id,
        role,
        name: "Local Dev".to_string(),
        email: "dev@localhost".to_string(),
    })
}

/// Resolves the request's identity without ever rejecting.
///
/// Resolution order:
/// 1. Local bypass headers (Env::Local only).
/// 2. A bearer that parses as a UUID is a customer session id, looked up in
///    the registry.
/// 3. Any other bearer is treated as a staff JWT and validated.
/// 4. Everything else is `Unauthenticated`.
async fn resolve_identity(
    parts: &Parts,
    config: &AppConfig,
    sessions: &SessionRegistry,
) -> Identity {
    if let Some(staff) = staff_from_bypass(parts, config) {
        return Identity::Staff(staff);
    }

    let Some(bearer) = bearer_token(parts) else {
        return Identity::Unauthenticated;
    };

    if let Ok(session_id) = Uuid::parse_str(bearer) {
        // A UUID bearer is a customer session handle, valid or not; it is
        // never also a JWT, so no fallthrough.
        return sessions.identity(session_id).await;
    }

    match decode_staff_token(bearer, &config.jwt_secret) {
        Some(staff) => Identity::Staff(staff),
        None => Identity::Unauthenticated,
    }
}

/// Identity Extractor
///
/// Resolves the current identity for any handler or middleware. Never
/// rejects: authentication failures resolve to `Identity::Unauthenticated`
/// and the route guard decides what that means for the path.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    SessionRegistry: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let sessions = SessionRegistry::from_ref(state);
        Ok(resolve_identity(parts, &config, &sessions).await)
    }
}

/// StaffUser Extractor Result
///
/// The resolved identity of an authenticated staff request, plus the raw
/// bearer so proxy handlers can forward it upstream unchanged. Second layer
/// of defense behind the route guard: a handler taking `StaffUser` cannot be
/// reached by a customer session even if the guard table were misrouted.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub identity: StaffIdentity,
    pub bearer: String,
}

impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if let Some(identity) = staff_from_bypass(parts, &config) {
            return Ok(StaffUser {
                identity,
                bearer: "local-bypass".to_string(),
            });
        }

        let bearer = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;
        let identity =
            decode_staff_token(bearer, &config.jwt_secret).ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(StaffUser {
            identity,
            bearer: bearer.to_string(),
        })
    }
}

/// CustomerUser Extractor Result
///
/// The resolved customer behind a session-id bearer, together with the
/// session id itself so handlers can reach the session store (token
/// snapshots, logout).
#[derive(Debug, Clone)]
pub struct CustomerUser {
    pub session_id: Uuid,
    pub identity: CustomerIdentity,
}

impl<S> FromRequestParts<S> for CustomerUser
where
    S: Send + Sync,
    SessionRegistry: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionRegistry::from_ref(state);

        let bearer = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;
        let session_id = Uuid::parse_str(bearer).map_err(|_| StatusCode::UNAUTHORIZED)?;

        match sessions.identity(session_id).await {
            Identity::Customer(identity) => Ok(CustomerUser {
                session_id,
                identity,
            }),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
