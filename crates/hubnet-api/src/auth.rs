//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! Bearer tokens encode role and actor identity:
//!
//! ```text
//! Bearer {role}:{actor_id}:{secret}   (new format)
//! Bearer {secret}                      (legacy format, treated as admin)
//! ```
//!
//! Roles are the domain roles from `hubnet-state`: `user`, `hubManager`,
//! `admin`. The actor segment may be empty, yielding an identity with no
//! actor binding; only admin identities may then name an acting actor
//! explicitly in request bodies.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into
//! the request extensions. Handlers extract it via the
//! `FromRequestParts` impl. Relational checks (shipment party, hub
//! scope) stay in the handlers and the approval gate where the records
//! live; this module only establishes who is calling.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use hubnet_core::ActorId;
use hubnet_state::ActorRole;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, extracted from the auth context
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role in the system.
    pub role: ActorRole,
    /// The actor the token is bound to. `None` for legacy admin tokens
    /// and when auth is disabled.
    pub actor: Option<ActorId>,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    ///
    /// `ActorRole` derives `Ord` with `User < HubManager < Admin`, so
    /// this is a single comparison.
    pub fn has_role(&self, minimum: ActorRole) -> bool {
        self.role >= minimum
    }

    /// Whether the caller carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    /// Resolve the actor performing a domain operation.
    ///
    /// The acting actor defaults to the token's binding. A body may name
    /// an acting actor explicitly; that override is honored only when it
    /// matches the binding or the caller is an admin. Unbound non-admin
    /// identities cannot act at all.
    pub fn acting_actor(&self, named: Option<&ActorId>) -> Result<ActorId, AppError> {
        match (&self.actor, named) {
            (Some(bound), None) => Ok(bound.clone()),
            (Some(bound), Some(named)) if bound == named => Ok(bound.clone()),
            (Some(_), Some(named)) | (None, Some(named)) => {
                if self.is_admin() {
                    Ok(named.clone())
                } else {
                    Err(AppError::Forbidden(
                        "cannot act on behalf of another actor".into(),
                    ))
                }
            }
            (None, None) => Err(AppError::Validation(
                "an acting actor is required: bind one in the token or name one in the body".into(),
            )),
        }
    }
}

/// Axum `FromRequestParts` implementation for `CallerIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: ActorRole) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// Prevents timing side-channels that could reveal token length or prefix.
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Dummy comparison to keep timing constant regardless of length match.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse the bearer token in format `{role}:{actor_id}:{secret}` or `{secret}` (legacy).
///
/// Legacy tokens (without role prefix) are treated as `admin` for backward
/// compatibility with existing deployments.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.len() {
        // Legacy format: just the secret. Treated as admin for backward compat.
        1 => {
            if constant_time_token_eq(provided, expected_secret) {
                Ok(CallerIdentity {
                    role: ActorRole::Admin,
                    actor: None,
                })
            } else {
                Err("invalid bearer token".into())
            }
        }
        // New format: role:actor_id:secret (actor_id may be empty)
        3 => {
            let role_str = parts[0];
            let actor_str = parts[1];
            let secret = parts[2];

            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role = ActorRole::from_name(role_str)
                .ok_or_else(|| format!("unknown role: {role_str}"))?;

            let actor = if actor_str.is_empty() {
                None
            } else {
                Some(ActorId::from_uuid(
                    actor_str
                        .parse::<Uuid>()
                        .map_err(|e| format!("invalid actor_id: {e}"))?,
                ))
            };

            Ok(CallerIdentity { role, actor })
        }
        _ => Err("invalid token format: expected {role}:{actor_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header.
///
/// Parses the token to extract `CallerIdentity` (role + actor binding) and
/// injects it into request extensions for downstream handlers.
///
/// When `AuthConfig.token` is `None`, all requests are allowed with an
/// unbound `admin` identity (auth disabled / development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled: inject an unbound admin identity for full access.
            request.extensions_mut().insert(CallerIdentity {
                role: ActorRole::Admin,
                actor: None,
            });
            next.run(request).await
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
