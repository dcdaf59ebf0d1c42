//! Session Issuer
//! Mission: Turn a successful identity lookup into an access token

use crate::auth::jwt::TokenCodec;
use crate::auth::models::{AuthError, AuthenticatedUser, ClaimSet, IssuedToken};
use crate::auth::scopes::scopes_for_role;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Credential check backed by the user database.
///
/// Returns `None` for both an unknown email and a wrong password.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn authenticate(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<AuthenticatedUser>>;
}

pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
}

impl SessionIssuer {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn issue(&self, lookup: Option<AuthenticatedUser>) -> Result<IssuedToken, AuthError> {
        let Some(user) = lookup else {
            warn!("❌ Login rejected: invalid credentials");
            return Err(AuthError::invalid_credentials());
        };

        let scopes = scopes_for_role(&user.user_type);
        if scopes.is_empty() {
            warn!(
                user_id = user.user_id,
                user_type = %user.user_type,
                "Issuing token for a user type without scopes"
            );
        }

        let ttl = self.codec.default_ttl();
        let claims = ClaimSet {
            user_id: user.user_id,
            email: user.email,
            role: user.user_type,
            scopes,
        };

        let access_token = self.codec.encode(&claims, Some(ttl)).map_err(|e| {
            error!(user_id = claims.user_id, error = %e, "Failed to sign access token");
            AuthError::SigningFailed
        })?;

        info!(
            user_id = claims.user_id,
            role = %claims.role,
            "✅ Login successful"
        );

        Ok(IssuedToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: ttl.num_seconds(),
        })
    }

    /// Look the caller up and issue a token for the match.
    ///
    /// The outer error is a lookup failure; the inner one is the auth decision.
    pub async fn login(
        &self,
        lookup: &dyn IdentityLookup,
        email: &str,
        password_hash: &str,
    ) -> Result<Result<IssuedToken, AuthError>> {
        let user = lookup.authenticate(email, password_hash).await?;
        Ok(self.issue(user))
    }
}
