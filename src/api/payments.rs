use super::{ApiError, AppState};
use crate::models::{Payment, PaymentUpdate};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

pub async fn get_payment_status(
    State(state): State<AppState>,
    Path(ride_id): Path<i64>,
) -> Result<Json<Payment>, ApiError> {
    state
        .store
        .get_payment(ride_id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Payment record"))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(ride_id): Path<i64>,
    Json(update): Json<PaymentUpdate>,
) -> Result<Json<Value>, ApiError> {
    if !state
        .store
        .update_payment_status(ride_id, &update.payment_status)?
    {
        return Err(ApiError::NotFound("Payment record"));
    }
    Ok(Json(json!({
        "ride_id": ride_id,
        "payment_status": update.payment_status,
    })))
}
