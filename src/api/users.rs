use super::{ApiError, AppState};
use crate::auth::middleware::Identity;
use crate::auth::models::{IssuedToken, LoginForm};
use crate::models::{NewUser, Ride, User, UserUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Form, Json,
};
use tracing::info;

/// Register - POST /users
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.store.register_user(&payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Login - POST /users/login (form: username = email, password = password hash)
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<IssuedToken>, ApiError> {
    info!("🔐 Login attempt");

    let issued = state
        .issuer
        .login(state.store.as_ref(), &form.username, &form.password)
        .await??;

    Ok(Json(issued))
}

/// List all users - GET /admin/users (admin scope)
pub async fn list_users(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<Json<Vec<User>>, ApiError> {
    info!(admin_id = identity.user_id, "Listing users");
    Ok(Json(state.store.list_users()?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    state
        .store
        .get_user(user_id)?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

pub async fn update_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    state
        .store
        .update_user_profile(user_id, &update)?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}

pub async fn active_rides(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Ride>>, ApiError> {
    Ok(Json(state.store.active_rides_for_rider(user_id)?))
}

pub async fn completed_rides(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Ride>>, ApiError> {
    Ok(Json(state.store.completed_rides_for_rider(user_id)?))
}
