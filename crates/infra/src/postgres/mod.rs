//! Postgres-backed store.
//!
//! ## Error mapping
//!
//! | PostgreSQL error code | `AppError` | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique violation) | `Conflict` | duplicate email, code, role name, membership pair |
//! | `23503` (foreign key violation) | `Validation` | reference to a missing row |
//! | other database errors | `Internal` | everything else |
//!
//! `PostgresStore` is `Clone + Send + Sync`; all operations go through the
//! sqlx connection pool.

mod catalog;
mod members;
mod tenants;
mod users;

use sqlx::PgPool;

use akademi_core::AppError;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| AppError::internal(format!("failed to connect to postgres: {e}")))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => AppError::conflict(db_err.message().to_string()),
                Some("23503") => AppError::validation(msg),
                _ => {
                    tracing::error!(operation, error = %db_err, "database error");
                    AppError::internal(msg)
                }
            }
        }
        _ => {
            tracing::error!(operation, error = %err, "sqlx error");
            AppError::internal(format!("sqlx error in {operation}: {err}"))
        }
    }
}
