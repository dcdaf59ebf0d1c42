use super::{constraint_message, RideStore, StoreError, StoreResult};
use crate::models::{
    DocumentUpload, Driver, DriverDocument, Location, NewVehicle, Vehicle, DRIVER_AVAILABLE,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const DRIVER_COLUMNS: &str = "driver_id, is_verified, current_status, current_latitude, \
     current_longitude, location_updated_at";

const DOCUMENT_COLUMNS: &str = "document_id, driver_id, document_type, document_number, \
     document_front_url, document_back_url, expiry_date, verification_status, uploaded_at";

fn driver_from_row(row: &Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        driver_id: row.get("driver_id")?,
        is_verified: row.get("is_verified")?,
        current_status: row.get("current_status")?,
        current_latitude: row.get("current_latitude")?,
        current_longitude: row.get("current_longitude")?,
        location_updated_at: row.get("location_updated_at")?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DriverDocument> {
    Ok(DriverDocument {
        document_id: row.get("document_id")?,
        driver_id: row.get("driver_id")?,
        document_type: row.get("document_type")?,
        document_number: row.get("document_number")?,
        document_front_url: row.get("document_front_url")?,
        document_back_url: row.get("document_back_url")?,
        expiry_date: row.get("expiry_date")?,
        verification_status: row.get("verification_status")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}

pub(super) fn driver_exists(conn: &Connection, driver_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM drivers WHERE driver_id = ?1)",
        params![driver_id],
        |row| row.get(0),
    )
}

pub(super) fn has_vehicle(conn: &Connection, driver_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM vehicles WHERE driver_id = ?1)",
        params![driver_id],
        |row| row.get(0),
    )
}

impl RideStore {
    pub fn get_driver(&self, driver_id: i64) -> StoreResult<Option<Driver>> {
        let conn = self.connect()?;
        let driver = conn
            .query_row(
                &format!("SELECT {} FROM drivers WHERE driver_id = ?1", DRIVER_COLUMNS),
                params![driver_id],
                driver_from_row,
            )
            .optional()?;
        Ok(driver)
    }

    /// Record a position report; returns the driver's current status
    pub fn update_driver_location(
        &self,
        driver_id: i64,
        location: Location,
    ) -> StoreResult<Option<String>> {
        let conn = self.connect()?;
        let status = conn
            .query_row(
                "UPDATE drivers
                 SET current_latitude = ?2, current_longitude = ?3, location_updated_at = ?4
                 WHERE driver_id = ?1
                 RETURNING current_status",
                params![driver_id, location.latitude, location.longitude, Utc::now()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    /// Returns false when the driver does not exist
    pub fn update_driver_status(&self, driver_id: i64, status: &str) -> StoreResult<bool> {
        let conn = self.connect()?;
        let rows = conn.execute(
            "UPDATE drivers SET current_status = ?2 WHERE driver_id = ?1",
            params![driver_id, status],
        )?;
        Ok(rows > 0)
    }

    /// Store a document and return every document on file for the driver
    pub fn upload_driver_document(
        &self,
        driver_id: i64,
        document: &DocumentUpload,
    ) -> StoreResult<Vec<DriverDocument>> {
        let conn = self.connect()?;
        if !driver_exists(&conn, driver_id)? {
            return Err(StoreError::NotFound("Driver"));
        }

        conn.execute(
            "INSERT INTO driver_documents (driver_id, document_type, document_number,
                 document_front_url, document_back_url, expiry_date, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                driver_id,
                document.document_type,
                document.document_number,
                document.document_front_url,
                document.document_back_url,
                document.expiry_date,
                Utc::now(),
            ],
        )
        .map_err(|e| match constraint_message(&e) {
            Some(_) => StoreError::DocumentExists(document.document_type.clone()),
            None => StoreError::Database(e),
        })?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM driver_documents WHERE driver_id = ?1 ORDER BY document_id",
            DOCUMENT_COLUMNS
        ))?;
        let documents = stmt
            .query_map(params![driver_id], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    pub fn register_vehicle(&self, driver_id: i64, vehicle: &NewVehicle) -> StoreResult<Vehicle> {
        let conn = self.connect()?;
        if !driver_exists(&conn, driver_id)? {
            return Err(StoreError::NotFound("Driver"));
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO vehicles (driver_id, make, model, plate_number, color, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                driver_id,
                vehicle.make,
                vehicle.model,
                vehicle.plate_number,
                vehicle.color,
                created_at,
            ],
        )
        .map_err(|e| match constraint_message(&e) {
            Some(_) => StoreError::Rejected("Plate number is already registered".to_string()),
            None => StoreError::Database(e),
        })?;

        Ok(Vehicle {
            vehicle_id: conn.last_insert_rowid(),
            driver_id,
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            plate_number: vehicle.plate_number.clone(),
            color: vehicle.color.clone(),
            created_at,
        })
    }

    /// Mark a driver verified and available. Requires a registered vehicle.
    pub fn verify_driver(&self, driver_id: i64) -> StoreResult<()> {
        let conn = self.connect()?;
        if !driver_exists(&conn, driver_id)? {
            return Err(StoreError::NotFound("Driver"));
        }
        if !has_vehicle(&conn, driver_id)? {
            return Err(StoreError::Rejected(
                "Driver must register a vehicle before verification".to_string(),
            ));
        }

        conn.execute(
            "UPDATE drivers SET is_verified = 1, current_status = ?2 WHERE driver_id = ?1",
            params![driver_id, DRIVER_AVAILABLE],
        )?;

        info!("✅ Driver verified: {}", driver_id);
        Ok(())
    }
}
