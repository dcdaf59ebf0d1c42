use super::{ApiError, AppState};
use crate::auth::middleware::Identity;
use crate::models::{
    DocumentUpload, Driver, DriverDocument, DriverStatusUpdate, Location, NewVehicle, Ride,
    Vehicle, DRIVER_AVAILABLE,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

pub async fn get_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
) -> Result<Json<Driver>, ApiError> {
    state
        .store
        .get_driver(driver_id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Driver"))
}

pub async fn upload_driver_document(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
    Json(document): Json<DocumentUpload>,
) -> Result<(StatusCode, Json<Vec<DriverDocument>>), ApiError> {
    let documents = state.store.upload_driver_document(driver_id, &document)?;
    Ok((StatusCode::CREATED, Json(documents)))
}

pub async fn update_driver_location(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
    Json(location): Json<Location>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .store
        .update_driver_location(driver_id, location)?
        .ok_or(ApiError::NotFound("Driver"))?;
    Ok(Json(json!({ "status": status })))
}

pub async fn update_driver_status(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
    Json(update): Json<DriverStatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .store
        .update_driver_status(driver_id, &update.current_status)?
    {
        return Err(ApiError::NotFound("Driver"));
    }
    Ok(Json(json!({
        "driver_id": driver_id,
        "new_status": update.current_status,
    })))
}

pub async fn register_vehicle(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
    Json(vehicle): Json<NewVehicle>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    let vehicle = state.store.register_vehicle(driver_id, &vehicle)?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Verify a driver - POST /drivers/:driver_id/verify (admin scope)
pub async fn verify_driver(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(driver_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.store.verify_driver(driver_id)?;
    info!(admin_id = identity.user_id, driver_id, "Driver verified by admin");
    Ok(Json(json!({
        "message": "Driver verified successfully",
        "new_status": DRIVER_AVAILABLE,
    })))
}

pub async fn driver_rides(
    State(state): State<AppState>,
    Path(driver_id): Path<i64>,
) -> Result<Json<Vec<Ride>>, ApiError> {
    Ok(Json(state.store.rides_for_driver(driver_id)?))
}
