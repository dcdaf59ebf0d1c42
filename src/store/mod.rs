//! Ride Storage
//! Mission: Persist users, drivers, rides and payments in SQLite
//!
//! Stands in for the relational database and its stored procedures. Every
//! call opens its own connection, so the store is shared by path only.

pub mod drivers;
pub mod rides;
pub mod users;

use crate::auth::issuer::IdentityLookup;
use crate::auth::models::AuthenticatedUser;
use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode};
use tracing::info;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT UNIQUE NOT NULL,
        phone_number TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        date_of_birth TEXT,
        profile_picture_url TEXT,
        user_type TEXT NOT NULL,
        account_status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS drivers (
        driver_id INTEGER PRIMARY KEY REFERENCES users(user_id),
        is_verified INTEGER NOT NULL DEFAULT 0,
        current_status TEXT NOT NULL DEFAULT 'offline',
        current_latitude REAL,
        current_longitude REAL,
        location_updated_at TEXT
    );

    CREATE TABLE IF NOT EXISTS vehicles (
        vehicle_id INTEGER PRIMARY KEY AUTOINCREMENT,
        driver_id INTEGER NOT NULL REFERENCES drivers(driver_id),
        make TEXT NOT NULL,
        model TEXT NOT NULL,
        plate_number TEXT UNIQUE NOT NULL,
        color TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS driver_documents (
        document_id INTEGER PRIMARY KEY AUTOINCREMENT,
        driver_id INTEGER NOT NULL REFERENCES drivers(driver_id),
        document_type TEXT NOT NULL,
        document_number TEXT NOT NULL,
        document_front_url TEXT NOT NULL,
        document_back_url TEXT,
        expiry_date TEXT,
        verification_status TEXT NOT NULL DEFAULT 'pending',
        uploaded_at TEXT NOT NULL,
        UNIQUE (driver_id, document_type)
    );

    CREATE TABLE IF NOT EXISTS rides (
        ride_id INTEGER PRIMARY KEY AUTOINCREMENT,
        rider_id INTEGER NOT NULL REFERENCES users(user_id),
        driver_id INTEGER REFERENCES drivers(driver_id),
        pickup_lat REAL NOT NULL,
        pickup_lng REAL NOT NULL,
        dropoff_lat REAL NOT NULL,
        dropoff_lng REAL NOT NULL,
        pickup_address TEXT NOT NULL,
        dropoff_address TEXT NOT NULL,
        ride_type TEXT NOT NULL,
        ride_status TEXT NOT NULL,
        actual_fare REAL,
        cancelled_by TEXT,
        cancel_reason TEXT,
        requested_at TEXT NOT NULL,
        accepted_at TEXT,
        completed_at TEXT,
        cancelled_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_rides_rider ON rides (rider_id, ride_status);
    CREATE INDEX IF NOT EXISTS idx_rides_driver ON rides (driver_id);

    CREATE TABLE IF NOT EXISTS payments (
        payment_id INTEGER PRIMARY KEY AUTOINCREMENT,
        ride_id INTEGER UNIQUE NOT NULL REFERENCES rides(ride_id),
        amount REAL NOT NULL,
        payment_method TEXT NOT NULL,
        payment_status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Store failures that the API turns into client-facing responses
#[derive(Debug)]
pub enum StoreError {
    EmailTaken,
    PhoneTaken,
    DocumentExists(String),
    NotFound(&'static str),
    Rejected(String),
    Database(rusqlite::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::EmailTaken => write!(f, "Email address is already registered"),
            StoreError::PhoneTaken => write!(f, "Phone number is already registered"),
            StoreError::DocumentExists(doc) => {
                write!(f, "Document of type {} already exists for this driver", doc)
            }
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::Rejected(reason) => write!(f, "{}", reason),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Message of a UNIQUE/constraint failure, e.g. "UNIQUE constraint failed: users.email"
fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation =>
        {
            Some(msg.as_str())
        }
        _ => None,
    }
}

pub struct RideStore {
    db_path: String,
}

impl RideStore {
    /// Create a store and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        info!(db_path, "🗄️  Ride store ready");
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Round-trip a trivial query
    pub fn ping(&self) -> StoreResult<bool> {
        let conn = self.connect()?;
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(one == 1)
    }
}

#[async_trait]
impl IdentityLookup for RideStore {
    async fn authenticate(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<AuthenticatedUser>> {
        Ok(self.find_by_credentials(email, password_hash)?)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_ping() {
        let (store, _temp) = create_test_store();
        assert!(store.ping().unwrap());
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let (store, temp) = create_test_store();
        let again = RideStore::new(temp.path().to_str().unwrap());
        assert!(again.is_ok());
        assert!(store.ping().unwrap());
    }

    #[tokio::test]
    async fn test_identity_lookup() {
        let (store, _temp) = create_test_store();
        let user = store
            .register_user(&new_user("a@b.com", "555-0001", "driver"))
            .unwrap();

        let found = store.authenticate("a@b.com", "hash-123").await.unwrap();
        assert_eq!(
            found,
            Some(AuthenticatedUser {
                user_id: user.user_id,
                email: "a@b.com".to_string(),
                user_type: "driver".to_string(),
            })
        );

        assert!(store.authenticate("a@b.com", "wrong").await.unwrap().is_none());
        assert!(store.authenticate("x@b.com", "hash-123").await.unwrap().is_none());
    }
}
