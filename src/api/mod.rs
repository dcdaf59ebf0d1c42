//! HTTP API
//! Mission: Route requests to the store behind per-group scope gates

pub mod drivers;
pub mod error;
pub mod payments;
pub mod rides;
pub mod users;

pub use error::ApiError;

use crate::auth::{require_scopes, scopes, CredentialVerifier, ScopeGate, SessionIssuer};
use crate::store::RideStore;
use axum::{
    extract::State,
    middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RideStore>,
    pub issuer: Arc<SessionIssuer>,
    pub verifier: Arc<CredentialVerifier>,
}

impl AppState {
    pub fn new(
        store: Arc<RideStore>,
        issuer: Arc<SessionIssuer>,
        verifier: Arc<CredentialVerifier>,
    ) -> Self {
        Self {
            store,
            issuer,
            verifier,
        }
    }

    fn gate(&self, scope: &str) -> ScopeGate {
        ScopeGate::new(self.verifier.clone(), [scope])
    }
}

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/users", get(users::list_users))
        .route("/drivers/:driver_id/verify", post(drivers::verify_driver))
        .route_layer(middleware::from_fn_with_state(
            state.gate(scopes::ADMIN),
            require_scopes,
        ));

    let rider_routes = Router::new()
        .route("/rides", post(rides::request_ride))
        .route_layer(middleware::from_fn_with_state(
            state.gate(scopes::RIDER),
            require_scopes,
        ));

    let driver_routes = Router::new()
        .route("/rides/:ride_id/accept", post(rides::accept_ride))
        .route_layer(middleware::from_fn_with_state(
            state.gate(scopes::DRIVER),
            require_scopes,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/test-db", get(test_db))
        .route("/users", post(users::register_user))
        .route("/users/login", post(users::login))
        .route(
            "/users/:user_id",
            get(users::get_user).patch(users::update_user_profile),
        )
        .route("/users/:user_id/rides/active", get(users::active_rides))
        .route("/users/:user_id/rides/completed", get(users::completed_rides))
        .route("/drivers/:driver_id", get(drivers::get_driver))
        .route("/drivers/:driver_id/status", put(drivers::update_driver_status))
        .route(
            "/drivers/:driver_id/documents",
            post(drivers::upload_driver_document),
        )
        .route(
            "/drivers/:driver_id/location",
            post(drivers::update_driver_location),
        )
        .route("/drivers/:driver_id/vehicles", post(drivers::register_vehicle))
        .route("/drivers/:driver_id/rides", get(drivers::driver_rides))
        .route("/rides/:ride_id", get(rides::get_ride))
        .route("/rides/:ride_id/complete", post(rides::complete_ride))
        .route("/rides/:ride_id/cancel", patch(rides::cancel_ride))
        .route(
            "/payments/:ride_id",
            get(payments::get_payment_status).put(payments::update_payment_status),
        );

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(rider_routes)
        .merge(driver_routes)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "🚕 Rideshare API operational"
}

async fn test_db(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let ok = state.store.ping()?;
    Ok(Json(json!({
        "database_connection": if ok { "successful" } else { "failed" }
    })))
}
