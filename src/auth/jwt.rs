//! JWT Token Codec
//! Mission: Sign and authenticate time-bound credentials

use crate::auth::models::{ClaimSet, Claims};
use crate::config::AuthConfig;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Time source for issuance and expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write() = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Codec failures. Kept internal to the auth core; the verifier collapses
/// all of them into a single unauthorized decision.
#[derive(Debug)]
pub enum TokenError {
    InvalidSignature,
    Malformed,
    MissingClaims,
    Expired,
    Encoding(jsonwebtoken::errors::Error),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "Token signature mismatch"),
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::MissingClaims => write!(f, "Token is missing mandatory claims"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Encoding(e) => write!(f, "Failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::MissingRequiredClaim(_) => TokenError::MissingClaims,
            ErrorKind::Json(json) if json.is_data() => TokenError::MissingClaims,
            _ => TokenError::Malformed,
        }
    }
}

/// Signs and authenticates access tokens with a shared HMAC secret
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm: config.algorithm,
            default_ttl: config.token_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Sign `claims` with `exp = now + ttl` (configured lifetime when `ttl` is None).
    pub fn encode(&self, claims: &ClaimSet, ttl: Option<Duration>) -> Result<String, TokenError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let exp = (self.clock.now() + ttl).timestamp();

        let payload = Claims {
            user_id: claims.user_id,
            email: claims.email.clone(),
            role: claims.role.clone(),
            scopes: claims.scopes.clone(),
            exp,
        };

        debug!(
            user_id = claims.user_id,
            role = %claims.role,
            ttl_secs = ttl.num_seconds(),
            "Signing access token"
        );

        encode(&Header::new(self.algorithm), &payload, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Authenticate a token and return its claims. Expired when `now >= exp`.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
