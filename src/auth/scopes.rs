//! Scope Policy
//! Mission: Map roles to scopes and decide scope admission

use crate::auth::models::UserRole;
use std::collections::BTreeSet;

pub const RIDER: &str = "rider";
pub const DRIVER: &str = "driver";
pub const ADMIN: &str = "admin";

/// Every scope the API knows about, with its description.
pub const SCOPE_DESCRIPTIONS: [(&str, &str); 3] = [
    (RIDER, "Request and manage rides"),
    (DRIVER, "Accept and complete rides"),
    (ADMIN, "Manage users and drivers"),
];

impl UserRole {
    pub fn scopes(&self) -> &'static [&'static str] {
        match self {
            UserRole::Rider => &[RIDER],
            UserRole::Driver => &[DRIVER],
            UserRole::Admin => &[ADMIN],
        }
    }
}

/// Scopes granted at issuance. Unknown roles get none.
pub fn scopes_for_role(role: &str) -> BTreeSet<String> {
    UserRole::parse(role)
        .map(|r| scope_set(r.scopes().iter().copied()))
        .unwrap_or_default()
}

/// `required ⊆ granted`
pub fn satisfies(granted: &BTreeSet<String>, required: &BTreeSet<String>) -> bool {
    required.is_subset(granted)
}

/// Required scopes not present in `granted`, in sorted order.
pub fn missing_scopes(granted: &BTreeSet<String>, required: &BTreeSet<String>) -> Vec<String> {
    required.difference(granted).cloned().collect()
}

pub fn scope_set<I, S>(scopes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scopes.into_iter().map(Into::into).collect()
}
