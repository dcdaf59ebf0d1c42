use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Ride statuses
pub const RIDE_REQUESTED: &str = "requested";
pub const RIDE_ACCEPTED: &str = "accepted";
pub const RIDE_IN_PROGRESS: &str = "in_progress";
pub const RIDE_COMPLETED: &str = "completed";
pub const RIDE_CANCELLED: &str = "cancelled";

/// Driver statuses
pub const DRIVER_OFFLINE: &str = "offline";
pub const DRIVER_AVAILABLE: &str = "available";
pub const DRIVER_ON_TRIP: &str = "on_trip";

pub const PAYMENT_PENDING: &str = "pending";
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub profile_picture_url: Option<String>,
    pub user_type: String,
    pub account_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration body. The password arrives already hashed.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    pub user_type: String,
}

/// Partial profile update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub driver_id: i64,
    pub is_verified: bool,
    pub current_status: String,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: i64,
    pub driver_id: i64,
    pub make: String,
    pub model: String,
    pub plate_number: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub plate_number: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDocument {
    pub document_id: i64,
    pub driver_id: i64,
    pub document_type: String,
    pub document_number: String,
    pub document_front_url: String,
    pub document_back_url: Option<String>,
    pub expiry_date: Option<String>,
    pub verification_status: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentUpload {
    pub document_type: String,
    pub document_number: String,
    pub document_front_url: String,
    #[serde(default)]
    pub document_back_url: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverStatusUpdate {
    pub current_status: String,
}

/// A ride through its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub ride_id: i64,
    pub rider_id: i64,
    pub driver_id: Option<i64>,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub ride_type: String,
    pub ride_status: String,
    pub actual_fare: Option<f64>,
    pub cancelled_by: Option<String>,
    pub cancel_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

fn default_ride_type() -> String {
    "standard".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RideRequest {
    pub rider_id: i64,
    pub pickup_location: Location,
    pub dropoff_location: Location,
    pub pickup_address: String,
    pub dropoff_address: String,
    #[serde(default = "default_ride_type")]
    pub ride_type: String,
}

/// Driver offered to the rider when a ride is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedDriver {
    pub driver_id: i64,
    pub first_name: String,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RideRequestOutcome {
    pub ride: Ride,
    pub matched_drivers: Vec<MatchedDriver>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RideAccept {
    pub driver_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRideRequest {
    pub actual_fare: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelRideRequest {
    pub cancelled_by: String, // "rider" or "driver"
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub ride_id: i64,
    pub amount: f64,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: String, // e.g. "paid", "failed"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ride_request_defaults_to_standard() {
        let req: RideRequest = serde_json::from_str(
            r#"{
                "rider_id": 3,
                "pickup_location": {"latitude": 1.0, "longitude": 2.0},
                "dropoff_location": {"latitude": 3.0, "longitude": 4.0},
                "pickup_address": "A",
                "dropoff_address": "B"
            }"#,
        )
        .unwrap();
        assert_eq!(req.ride_type, "standard");
    }

    #[test]
    fn test_user_update_fields_are_optional() {
        let update: UserUpdate = serde_json::from_str(r#"{"first_name": "Ann"}"#).unwrap();
        assert_eq!(update.first_name.as_deref(), Some("Ann"));
        assert!(update.email.is_none());
    }
}
