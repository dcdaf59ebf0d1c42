//! Credential Verifier
//! Mission: Single gate every protected operation passes through

use crate::auth::jwt::TokenCodec;
use crate::auth::models::{AuthError, IdentityContext};
use crate::auth::scopes::{missing_scopes, satisfies};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

pub struct CredentialVerifier {
    codec: Arc<TokenCodec>,
}

impl CredentialVerifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Authenticate `token`, then check it carries every scope in `required`.
    ///
    /// Authentication always runs first: a token that fails to decode is
    /// `Unauthorized` whatever `required` holds, and the decode cause is only
    /// logged.
    pub fn verify(
        &self,
        token: &str,
        required: &BTreeSet<String>,
    ) -> Result<IdentityContext, AuthError> {
        let claims = self.codec.decode(token).map_err(|e| {
            debug!(reason = %e, "Rejected access token");
            AuthError::invalid_token(required)
        })?;

        if !satisfies(&claims.scopes, required) {
            let missing = missing_scopes(&claims.scopes, required);
            debug!(
                user_id = claims.user_id,
                missing = ?missing,
                "Access token lacks required scopes"
            );
            // satisfies() failed, so at least one scope is missing
            let first = missing.into_iter().next().unwrap_or_default();
            return Err(AuthError::missing_scope(first));
        }

        Ok(IdentityContext::from(claims))
    }

    /// Verify the raw value of an `Authorization` header.
    pub fn verify_bearer(
        &self,
        header: Option<&str>,
        required: &BTreeSet<String>,
    ) -> Result<IdentityContext, AuthError> {
        let token = header
            .and_then(bearer_token)
            .ok_or_else(|| AuthError::invalid_token(required))?;
        self.verify(token, required)
    }
}

/// Token part of `Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::ManualClock;
    use crate::auth::models::ClaimSet;
    use crate::auth::scopes::{scope_set, scopes_for_role};
    use crate::config::AuthConfig;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Arc<TokenCodec>, CredentialVerifier, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        let config = AuthConfig::new("verifier-secret".to_string(), "HS256", 60).unwrap();
        let codec = Arc::new(TokenCodec::with_clock(&config, clock.clone()));
        (codec.clone(), CredentialVerifier::new(codec), clock)
    }

    fn token_for(codec: &TokenCodec, role: &str) -> String {
        codec
            .encode(
                &ClaimSet {
                    user_id: 42,
                    email: "rider@example.com".to_string(),
                    role: role.to_string(),
                    scopes: scopes_for_role(role),
                },
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_verify_success_returns_identity() {
        let (codec, verifier, _clock) = setup();
        let token = token_for(&codec, "rider");

        let identity = verifier.verify(&token, &scope_set(["rider"])).unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.email, "rider@example.com");
        assert_eq!(identity.role, "rider");
        assert!(identity.has_scope("rider"));
    }

    #[test]
    fn test_empty_requirement_only_authenticates() {
        let (codec, verifier, _clock) = setup();
        let token = token_for(&codec, "unknown-role");
        let identity = verifier.verify(&token, &BTreeSet::new()).unwrap();
        assert!(identity.scopes.is_empty());
    }

    #[test]
    fn test_insufficient_scope_is_forbidden() {
        let (codec, verifier, _clock) = setup();
        let token = token_for(&codec, "rider");

        let err = verifier.verify(&token, &scope_set(["admin"])).unwrap_err();
        assert_eq!(err, AuthError::missing_scope("admin"));
    }

    #[test]
    fn test_bad_token_is_unauthorized_regardless_of_scope() {
        let (_codec, verifier, _clock) = setup();
        for required in [BTreeSet::new(), scope_set(["admin"]), scope_set(["rider"])] {
            let err = verifier.verify("not-a-token", &required).unwrap_err();
            assert!(err.is_unauthorized());
        }
    }

    #[test]
    fn test_forged_token_never_reports_scope_mismatch() {
        let (_codec, verifier, clock) = setup();
        let other = AuthConfig::new("attacker-secret".to_string(), "HS256", 60).unwrap();
        let forger = TokenCodec::with_clock(&other, clock);
        let forged = token_for(&forger, "rider");

        let err = verifier.verify(&forged, &scope_set(["admin"])).unwrap_err();
        assert_eq!(err, AuthError::invalid_token(&scope_set(["admin"])));
    }

    #[test]
    fn test_signed_token_without_email_is_unauthorized() {
        let (_codec, verifier, _clock) = setup();
        let exp = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap().timestamp();
        let payload = serde_json::json!({
            "user_id": 42,
            "role": "rider",
            "scopes": ["rider"],
            "exp": exp,
        });
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &payload,
            &jsonwebtoken::EncodingKey::from_secret(b"verifier-secret"),
        )
        .unwrap();

        let required = scope_set(["rider"]);
        let err = verifier.verify(&token, &required).unwrap_err();
        assert_eq!(err, AuthError::invalid_token(&required));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let (codec, verifier, clock) = setup();
        let token = token_for(&codec, "rider");

        clock.advance(Duration::minutes(61));
        let err = verifier.verify(&token, &scope_set(["admin"])).unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let (codec, verifier, _clock) = setup();
        let err = verifier
            .verify_bearer(None, &scope_set(["rider"]))
            .unwrap_err();
        assert!(err.is_unauthorized());

        let token = token_for(&codec, "rider");
        let header = format!("Bearer {}", token);
        let identity = verifier
            .verify_bearer(Some(&header), &scope_set(["rider"]))
            .unwrap();
        assert_eq!(identity.user_id, 42);
    }
}
