use super::drivers::has_vehicle;
use super::{RideStore, StoreError, StoreResult};
use crate::models::{
    MatchedDriver, Payment, Ride, RideRequest, RideRequestOutcome, DEFAULT_PAYMENT_METHOD,
    DRIVER_AVAILABLE, DRIVER_ON_TRIP, PAYMENT_PENDING, RIDE_ACCEPTED, RIDE_CANCELLED,
    RIDE_COMPLETED, RIDE_IN_PROGRESS, RIDE_REQUESTED,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

/// Upper bound on drivers offered for a new ride
const MATCH_LIMIT: usize = 10;

const RIDE_COLUMNS: &str = "ride_id, rider_id, driver_id, pickup_lat, pickup_lng, dropoff_lat, \
     dropoff_lng, pickup_address, dropoff_address, ride_type, ride_status, actual_fare, \
     cancelled_by, cancel_reason, requested_at, accepted_at, completed_at, cancelled_at";

const PAYMENT_COLUMNS: &str =
    "payment_id, ride_id, amount, payment_method, payment_status, created_at, updated_at";

fn ride_from_row(row: &Row<'_>) -> rusqlite::Result<Ride> {
    Ok(Ride {
        ride_id: row.get("ride_id")?,
        rider_id: row.get("rider_id")?,
        driver_id: row.get("driver_id")?,
        pickup_lat: row.get("pickup_lat")?,
        pickup_lng: row.get("pickup_lng")?,
        dropoff_lat: row.get("dropoff_lat")?,
        dropoff_lng: row.get("dropoff_lng")?,
        pickup_address: row.get("pickup_address")?,
        dropoff_address: row.get("dropoff_address")?,
        ride_type: row.get("ride_type")?,
        ride_status: row.get("ride_status")?,
        actual_fare: row.get("actual_fare")?,
        cancelled_by: row.get("cancelled_by")?,
        cancel_reason: row.get("cancel_reason")?,
        requested_at: row.get("requested_at")?,
        accepted_at: row.get("accepted_at")?,
        completed_at: row.get("completed_at")?,
        cancelled_at: row.get("cancelled_at")?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        payment_id: row.get("payment_id")?,
        ride_id: row.get("ride_id")?,
        amount: row.get("amount")?,
        payment_method: row.get("payment_method")?,
        payment_status: row.get("payment_status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_ride(conn: &Connection, ride_id: i64) -> rusqlite::Result<Option<Ride>> {
    conn.query_row(
        &format!("SELECT {} FROM rides WHERE ride_id = ?1", RIDE_COLUMNS),
        params![ride_id],
        ride_from_row,
    )
    .optional()
}

fn query_rides(conn: &Connection, sql: &str, id: i64) -> rusqlite::Result<Vec<Ride>> {
    let mut stmt = conn.prepare(sql)?;
    let rides = stmt
        .query_map(params![id], ride_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rides)
}

impl RideStore {
    /// Create a ride in `requested` state and offer the currently available drivers.
    ///
    /// Candidates are verified, available drivers, most recently located first.
    pub fn request_ride(&self, request: &RideRequest) -> StoreResult<RideRequestOutcome> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let rider_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
            params![request.rider_id],
            |row| row.get(0),
        )?;
        if !rider_exists {
            return Err(StoreError::Rejected("Rider not found".to_string()));
        }

        tx.execute(
            "INSERT INTO rides (rider_id, pickup_lat, pickup_lng, dropoff_lat, dropoff_lng,
                 pickup_address, dropoff_address, ride_type, ride_status, requested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                request.rider_id,
                request.pickup_location.latitude,
                request.pickup_location.longitude,
                request.dropoff_location.latitude,
                request.dropoff_location.longitude,
                request.pickup_address,
                request.dropoff_address,
                request.ride_type,
                RIDE_REQUESTED,
                Utc::now(),
            ],
        )?;
        let ride_id = tx.last_insert_rowid();
        let ride = load_ride(&tx, ride_id)?.ok_or(StoreError::NotFound("Ride"))?;

        let matched_drivers = {
            let mut stmt = tx.prepare(
                "SELECT d.driver_id, u.first_name, d.current_latitude, d.current_longitude
                 FROM drivers d
                 JOIN users u ON u.user_id = d.driver_id
                 WHERE d.is_verified = 1 AND d.current_status = ?1
                 ORDER BY d.location_updated_at DESC, d.driver_id
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![DRIVER_AVAILABLE, MATCH_LIMIT as i64], |row| {
                Ok(MatchedDriver {
                    driver_id: row.get(0)?,
                    first_name: row.get(1)?,
                    current_latitude: row.get(2)?,
                    current_longitude: row.get(3)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;

        info!(
            "🚕 Ride {} requested by rider {} ({} drivers matched)",
            ride.ride_id,
            ride.rider_id,
            matched_drivers.len()
        );

        Ok(RideRequestOutcome {
            ride,
            matched_drivers,
        })
    }

    /// Assign a requested ride to a verified, available driver with a vehicle.
    pub fn accept_ride(&self, ride_id: i64, driver_id: i64) -> StoreResult<Ride> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let driver: Option<(bool, String)> = tx
            .query_row(
                "SELECT is_verified, current_status FROM drivers WHERE driver_id = ?1",
                params![driver_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((is_verified, current_status)) = driver else {
            return Err(StoreError::Rejected("Driver not found".to_string()));
        };
        if !is_verified {
            return Err(StoreError::Rejected(
                "Driver must be verified before accepting rides".to_string(),
            ));
        }
        if current_status != DRIVER_AVAILABLE {
            return Err(StoreError::Rejected(format!(
                "Driver is currently {}",
                current_status
            )));
        }
        if !has_vehicle(&tx, driver_id)? {
            return Err(StoreError::Rejected(
                "Driver has no registered vehicle".to_string(),
            ));
        }

        let rows = tx.execute(
            "UPDATE rides SET driver_id = ?2, ride_status = ?3, accepted_at = ?4
             WHERE ride_id = ?1 AND ride_status = ?5",
            params![ride_id, driver_id, RIDE_ACCEPTED, Utc::now(), RIDE_REQUESTED],
        )?;
        if rows == 0 {
            return Err(StoreError::Rejected(
                "Ride not found or no longer available".to_string(),
            ));
        }

        tx.execute(
            "UPDATE drivers SET current_status = ?2 WHERE driver_id = ?1",
            params![driver_id, DRIVER_ON_TRIP],
        )?;

        let ride = load_ride(&tx, ride_id)?.ok_or(StoreError::NotFound("Ride"))?;
        tx.commit()?;

        info!("✅ Ride {} accepted by driver {}", ride_id, driver_id);
        Ok(ride)
    }

    /// Close an accepted ride, free its driver and open a pending payment.
    pub fn complete_ride(
        &self,
        ride_id: i64,
        actual_fare: f64,
        payment_method: Option<&str>,
    ) -> StoreResult<Ride> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let rows = tx.execute(
            "UPDATE rides SET ride_status = ?2, completed_at = ?3, actual_fare = ?4
             WHERE ride_id = ?1 AND ride_status = ?5",
            params![ride_id, RIDE_COMPLETED, now, actual_fare, RIDE_ACCEPTED],
        )?;
        if rows == 0 {
            return Err(StoreError::Rejected(
                "Ride not found or not in completable state".to_string(),
            ));
        }

        tx.execute(
            "UPDATE drivers SET current_status = ?2
             WHERE driver_id = (SELECT driver_id FROM rides WHERE ride_id = ?1)",
            params![ride_id, DRIVER_AVAILABLE],
        )?;

        tx.execute(
            "INSERT INTO payments (ride_id, amount, payment_method, payment_status,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                ride_id,
                actual_fare,
                payment_method.unwrap_or(DEFAULT_PAYMENT_METHOD),
                PAYMENT_PENDING,
                now,
            ],
        )?;

        let ride = load_ride(&tx, ride_id)?.ok_or(StoreError::NotFound("Ride"))?;
        tx.commit()?;

        info!("🏁 Ride {} completed, fare {:.2}", ride_id, actual_fare);
        Ok(ride)
    }

    /// Cancel a requested or accepted ride. Returns false when nothing was cancellable.
    pub fn cancel_ride(
        &self,
        ride_id: i64,
        cancelled_by: &str,
        reason: Option<&str>,
    ) -> StoreResult<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE rides SET ride_status = ?2, cancelled_by = ?3, cancel_reason = ?4,
                              cancelled_at = ?5
             WHERE ride_id = ?1 AND ride_status IN (?6, ?7)",
            params![
                ride_id,
                RIDE_CANCELLED,
                cancelled_by,
                reason,
                Utc::now(),
                RIDE_REQUESTED,
                RIDE_ACCEPTED,
            ],
        )?;
        if rows == 0 {
            return Ok(false);
        }

        // An accepted ride held its driver on trip
        tx.execute(
            "UPDATE drivers SET current_status = ?2
             WHERE current_status = ?3
               AND driver_id = (SELECT driver_id FROM rides WHERE ride_id = ?1)",
            params![ride_id, DRIVER_AVAILABLE, DRIVER_ON_TRIP],
        )?;
        tx.commit()?;

        info!("🚫 Ride {} cancelled by {}", ride_id, cancelled_by);
        Ok(true)
    }

    pub fn get_ride(&self, ride_id: i64) -> StoreResult<Option<Ride>> {
        let conn = self.connect()?;
        Ok(load_ride(&conn, ride_id)?)
    }

    pub fn active_rides_for_rider(&self, rider_id: i64) -> StoreResult<Vec<Ride>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM rides
             WHERE rider_id = ?1 AND ride_status IN ('{}', '{}', '{}')
             ORDER BY requested_at DESC, ride_id DESC",
            RIDE_COLUMNS, RIDE_REQUESTED, RIDE_ACCEPTED, RIDE_IN_PROGRESS
        );
        Ok(query_rides(&conn, &sql, rider_id)?)
    }

    pub fn completed_rides_for_rider(&self, rider_id: i64) -> StoreResult<Vec<Ride>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM rides
             WHERE rider_id = ?1 AND ride_status = '{}'
             ORDER BY completed_at DESC, ride_id DESC",
            RIDE_COLUMNS, RIDE_COMPLETED
        );
        Ok(query_rides(&conn, &sql, rider_id)?)
    }

    pub fn rides_for_driver(&self, driver_id: i64) -> StoreResult<Vec<Ride>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM rides WHERE driver_id = ?1 ORDER BY requested_at DESC, ride_id DESC",
            RIDE_COLUMNS
        );
        Ok(query_rides(&conn, &sql, driver_id)?)
    }

    pub fn get_payment(&self, ride_id: i64) -> StoreResult<Option<Payment>> {
        let conn = self.connect()?;
        let payment = conn
            .query_row(
                &format!("SELECT {} FROM payments WHERE ride_id = ?1", PAYMENT_COLUMNS),
                params![ride_id],
                payment_from_row,
            )
            .optional()?;
        Ok(payment)
    }

    /// Returns false when the ride has no payment record
    pub fn update_payment_status(&self, ride_id: i64, status: &str) -> StoreResult<bool> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE payments SET payment_status = ?2, updated_at = ?3 WHERE ride_id = ?1",
            params![ride_id, status, Utc::now()],
        )?;
        Ok(rows > 0)
    }
}
