//! Authentication Models
//! Mission: Typed claims, identities and auth failures shared by the auth core

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Account categories assigned at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    #[serde(rename = "rider")]
    Rider, // Requests and manages rides
    #[serde(rename = "driver")]
    Driver, // Accepts and completes rides
    #[serde(rename = "admin")]
    Admin, // Manages users and drivers
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Rider => "rider",
            UserRole::Driver => "driver",
            UserRole::Admin => "admin",
        }
    }

    /// Exact, case-sensitive match against the stored user type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rider" => Some(UserRole::Rider),
            "driver" => Some(UserRole::Driver),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Claim set handed to the codec for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub scopes: BTreeSet<String>,
}

/// JWT payload as it travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    pub exp: i64, // expiration timestamp (seconds)
}

impl Claims {
    pub fn claim_set(&self) -> ClaimSet {
        ClaimSet {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

/// Verified caller identity, inserted into request extensions by the scope gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub scopes: BTreeSet<String>,
}

impl IdentityContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

impl From<Claims> for IdentityContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
            scopes: claims.scopes,
        }
    }
}

/// Result of a successful identity lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
    pub user_type: String,
}

/// Login response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64, // seconds until expiration
}

/// OAuth2 password-grant shaped login form (username carries the email)
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

pub const INVALID_TOKEN_DETAIL: &str = "Could not validate credentials";
pub const INVALID_CREDENTIALS_DETAIL: &str = "Invalid credentials";

/// Auth decisions surfaced to the HTTP boundary.
///
/// `Unauthorized` never carries the underlying cause; `challenge` is the
/// required scope set of the route, echoed in `WWW-Authenticate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    Unauthorized {
        detail: &'static str,
        challenge: Vec<String>,
    },
    Forbidden {
        missing_scope: String,
    },
    WrongRole {
        required_role: String,
    },
    /// Token could not be signed
    SigningFailed,
}

impl AuthError {
    pub fn invalid_token(required: &BTreeSet<String>) -> Self {
        AuthError::Unauthorized {
            detail: INVALID_TOKEN_DETAIL,
            challenge: required.iter().cloned().collect(),
        }
    }

    pub fn invalid_credentials() -> Self {
        AuthError::Unauthorized {
            detail: INVALID_CREDENTIALS_DETAIL,
            challenge: Vec::new(),
        }
    }

    pub fn missing_scope(scope: impl Into<String>) -> Self {
        AuthError::Forbidden {
            missing_scope: scope.into(),
        }
    }

    pub fn wrong_role(role: impl Into<String>) -> Self {
        AuthError::WrongRole {
            required_role: role.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Unauthorized { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            AuthError::Forbidden { .. } | AuthError::WrongRole { .. }
        )
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthorized { detail, .. } => write!(f, "{}", detail),
            AuthError::Forbidden { missing_scope } => {
                write!(f, "Missing required scope: {}", missing_scope)
            }
            AuthError::WrongRole { required_role } => {
                write!(f, "Only {}s can access this endpoint", required_role)
            }
            AuthError::SigningFailed => write!(f, "Could not issue access token"),
        }
    }
}

impl std::error::Error for AuthError {}
