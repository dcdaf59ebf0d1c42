//! Authentication Middleware
//! Mission: Protect route groups with a statically declared scope set

use crate::auth::models::{AuthError, IdentityContext};
use crate::auth::scopes::scope_set;
use crate::auth::verifier::CredentialVerifier;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Verifier plus the scopes (and optionally the role) a route group requires
#[derive(Clone)]
pub struct ScopeGate {
    verifier: Arc<CredentialVerifier>,
    required: Arc<BTreeSet<String>>,
    role: Option<Arc<str>>,
}

impl ScopeGate {
    pub fn new<I, S>(verifier: Arc<CredentialVerifier>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verifier,
            required: Arc::new(scope_set(scopes)),
            role: None,
        }
    }

    /// Also require the token's `role` claim to equal `role`, checked after scopes.
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(Arc::from(role));
        self
    }
}

/// Validates the bearer token against the gate's scopes and stores the
/// resulting `IdentityContext` in the request extensions.
pub async fn require_scopes(
    State(gate): State<ScopeGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let identity = gate.verifier.verify_bearer(header, &gate.required)?;
    if let Some(role) = gate.role.as_deref() {
        if identity.role != role {
            debug!(user_id = identity.user_id, role = %identity.role, "Role mismatch");
            return Err(AuthError::wrong_role(role));
        }
    }

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Extractor for the identity placed by `require_scopes`
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityContext);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Identity)
            .ok_or_else(|| AuthError::invalid_token(&BTreeSet::new()))
    }
}

fn challenge_header(scopes: &[String]) -> HeaderValue {
    if scopes.is_empty() {
        return HeaderValue::from_static("Bearer");
    }
    HeaderValue::from_str(&format!("Bearer scope=\"{}\"", scopes.join(" ")))
        .unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized { detail, challenge } => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, challenge_header(&challenge))],
                Json(json!({ "detail": detail })),
            )
                .into_response(),
            AuthError::Forbidden { .. } | AuthError::WrongRole { .. } => (
                StatusCode::FORBIDDEN,
                Json(json!({ "detail": self.to_string() })),
            )
                .into_response(),
            AuthError::SigningFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": self.to_string() })),
            )
                .into_response(),
        }
    }
}
