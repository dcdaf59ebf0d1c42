use super::{ApiError, AppState};
use crate::auth::middleware::Identity;
use crate::models::{
    CancelRideRequest, CompleteRideRequest, Ride, RideAccept, RideRequest, RideRequestOutcome,
};
use crate::store::StoreError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// Request a ride - POST /rides (rider scope, own account only)
pub async fn request_ride(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(ride): Json<RideRequest>,
) -> Result<(StatusCode, Json<RideRequestOutcome>), ApiError> {
    if ride.rider_id != identity.user_id {
        return Err(ApiError::Forbidden("Cannot request ride for another user"));
    }

    let outcome = state.store.request_ride(&ride)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<i64>,
) -> Result<Json<Ride>, ApiError> {
    state
        .store
        .get_ride(ride_id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Ride"))
}

/// Accept a ride - POST /rides/:ride_id/accept (driver scope, own account only)
pub async fn accept_ride(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Path(ride_id): Path<i64>,
    Json(accept): Json<RideAccept>,
) -> Result<Json<Ride>, ApiError> {
    if accept.driver_id != identity.user_id {
        return Err(ApiError::Forbidden("Cannot accept rides for another driver"));
    }

    Ok(Json(state.store.accept_ride(ride_id, accept.driver_id)?))
}

pub async fn complete_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<i64>,
    Json(request): Json<CompleteRideRequest>,
) -> Result<Json<Value>, ApiError> {
    if !request.actual_fare.is_finite() || request.actual_fare < 0.0 {
        return Err(ApiError::Validation(
            "actual_fare must be a non-negative number".to_string(),
        ));
    }

    state.store.complete_ride(
        ride_id,
        request.actual_fare,
        request.payment_method.as_deref(),
    )?;
    Ok(Json(json!({ "message": "Ride completed successfully" })))
}

pub async fn cancel_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<i64>,
    Json(request): Json<CancelRideRequest>,
) -> Result<Json<Value>, ApiError> {
    if !matches!(request.cancelled_by.as_str(), "rider" | "driver") {
        return Err(ApiError::Validation(
            "cancelled_by must be \"rider\" or \"driver\"".to_string(),
        ));
    }

    let cancelled =
        state
            .store
            .cancel_ride(ride_id, &request.cancelled_by, request.reason.as_deref())?;
    if !cancelled {
        return Err(ApiError::Store(StoreError::Rejected(
            "Ride not found or cannot be cancelled".to_string(),
        )));
    }

    Ok(Json(json!({
        "message": format!("Ride {} cancelled successfully", ride_id)
    })))
}
