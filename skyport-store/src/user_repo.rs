use sqlx::PgPool;
use uuid::Uuid;

use skyport_core::identity::{
    hash_password, normalize_email, validate_password, validate_person_name, User,
};
use skyport_core::{CoreError, CoreResult};

use crate::database::{db_err, is_unique_violation};

pub struct UserRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_staff: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            is_staff: row.is_staff,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct RegisterPayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct ProfilePayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

const COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, is_staff, created_at, updated_at";

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payload: &RegisterPayload) -> CoreResult<User> {
        let email = normalize_email(&payload.email)?;
        validate_person_name("first_name", &payload.first_name)?;
        validate_person_name("last_name", &payload.last_name)?;
        validate_password(&payload.password)?;

        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            COLUMNS
        ))
        .bind(&email)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(hash_password(&payload.password))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::Conflict("User with this email already exists".to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(row.into())
    }

    pub async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", COLUMNS))
                .bind(&email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(Into::into))
    }

    pub async fn update_profile(&self, id: Uuid, payload: &ProfilePayload) -> CoreResult<Option<User>> {
        let email = normalize_email(&payload.email)?;
        validate_person_name("first_name", &payload.first_name)?;
        validate_person_name("last_name", &payload.last_name)?;

        let password_hash = match &payload.password {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password))
            }
            None => None,
        };

        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET email = $1, first_name = $2, last_name = $3, \
             password_hash = COALESCE($4, password_hash), updated_at = NOW() \
             WHERE id = $5 RETURNING {}",
            COLUMNS
        ))
        .bind(&email)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::Conflict("User with this email already exists".to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(row.map(Into::into))
    }
}
