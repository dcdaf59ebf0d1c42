//! Authentication Module
//! Mission: Issue bearer tokens and gate every protected route on their scopes

pub mod issuer;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod scopes;
pub mod verifier;

pub use issuer::{IdentityLookup, SessionIssuer};
pub use jwt::{Clock, ManualClock, SystemClock, TokenCodec};
pub use middleware::{require_scopes, Identity, ScopeGate};
pub use models::{AuthError, IdentityContext};
pub use verifier::CredentialVerifier;
