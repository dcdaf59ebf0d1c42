use super::{constraint_message, RideStore, StoreError, StoreResult};
use crate::auth::models::{AuthenticatedUser, UserRole};
use crate::models::{NewUser, User, UserUpdate, DRIVER_OFFLINE};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

const USER_COLUMNS: &str = "user_id, email, phone_number, first_name, last_name, date_of_birth, \
     profile_picture_url, user_type, account_status, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get("user_id")?,
        email: row.get("email")?,
        phone_number: row.get("phone_number")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        date_of_birth: row.get("date_of_birth")?,
        profile_picture_url: row.get("profile_picture_url")?,
        user_type: row.get("user_type")?,
        account_status: row.get("account_status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_unique(err: rusqlite::Error) -> StoreError {
    match constraint_message(&err) {
        Some(msg) if msg.contains("users.email") => StoreError::EmailTaken,
        Some(msg) if msg.contains("users.phone_number") => StoreError::PhoneTaken,
        _ => StoreError::Database(err),
    }
}

impl RideStore {
    /// Register an account; drivers also get an unverified, offline driver row.
    pub fn register_user(&self, user: &NewUser) -> StoreResult<User> {
        if UserRole::parse(&user.user_type).is_none() {
            return Err(StoreError::Rejected(format!(
                "Invalid user type: {}",
                user.user_type
            )));
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        tx.execute(
            "INSERT INTO users (email, phone_number, password_hash, first_name, last_name,
                                date_of_birth, profile_picture_url, user_type,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                user.email,
                user.phone_number,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.date_of_birth,
                user.profile_picture_url,
                user.user_type,
                now,
            ],
        )
        .map_err(map_unique)?;
        let user_id = tx.last_insert_rowid();

        if user.user_type == UserRole::Driver.as_str() {
            tx.execute(
                "INSERT INTO drivers (driver_id, is_verified, current_status) VALUES (?1, 0, ?2)",
                params![user_id, DRIVER_OFFLINE],
            )?;
        }

        let created = tx.query_row(
            &format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS),
            params![user_id],
            user_from_row,
        )?;
        tx.commit()?;

        info!(
            "✅ Registered user: {} ({})",
            created.user_id, created.user_type
        );

        Ok(created)
    }

    /// Match an email and pre-hashed password against active accounts
    pub fn find_by_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Option<AuthenticatedUser>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                "SELECT user_id, email, user_type FROM users
                 WHERE email = ?1 AND password_hash = ?2 AND account_status = 'active'",
                params![email, password_hash],
                |row| {
                    Ok(AuthenticatedUser {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        user_type: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users (admin only)
    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY user_id",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Apply the fields present in `update`; `None` when the user does not exist
    pub fn update_user_profile(
        &self,
        user_id: i64,
        update: &UserUpdate,
    ) -> StoreResult<Option<User>> {
        let conn = self.connect()?;
        let rows = conn
            .execute(
                "UPDATE users
                 SET email = COALESCE(?2, email),
                     phone_number = COALESCE(?3, phone_number),
                     first_name = COALESCE(?4, first_name),
                     last_name = COALESCE(?5, last_name),
                     profile_picture_url = COALESCE(?6, profile_picture_url),
                     updated_at = ?7
                 WHERE user_id = ?1",
                params![
                    user_id,
                    update.email,
                    update.phone_number,
                    update.first_name,
                    update.last_name,
                    update.profile_picture_url,
                    Utc::now(),
                ],
            )
            .map_err(map_unique)?;

        if rows == 0 {
            return Ok(None);
        }
        drop(conn);
        self.get_user(user_id)
    }
}
