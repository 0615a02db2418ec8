use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, Row};

use akademi_core::{AppError, AppResult, UserId};
use akademi_registry::model::{ApprovalStatus, User};
use akademi_registry::store::{ApprovalStore, UserStore};

use super::{map_sqlx_error, PostgresStore};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, phone, is_super_admin, \
     is_active, last_login_at, created_at, updated_at, deleted_at";

struct UserRow(User);

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow(User {
            id: UserId::from_uuid(row.try_get("id")?),
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            is_super_admin: row.try_get("is_super_admin")?,
            is_active: row.try_get("is_active")?,
            last_login_at: row.try_get("last_login_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        }))
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(|e| AppError::internal(format!("failed to read user row: {e}")))
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_id", e))?;

        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(|e| AppError::internal(format!("failed to read user row: {e}")))
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, phone, is_super_admin,
                is_active, last_login_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.is_super_admin)
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("email already registered")
            } else {
                map_sqlx_error("insert_user", e)
            }
        })?;
        Ok(())
    }

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET last_login_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("touch_last_login", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ApprovalStore for PostgresStore {
    async fn approval_status(&self, user_id: UserId) -> AppResult<Option<ApprovalStatus>> {
        let row = sqlx::query(
            "SELECT status FROM registration_approvals WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("approval_status", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row
            .try_get("status")
            .map_err(|e| AppError::internal(format!("failed to read approval row: {e}")))?;
        match status.as_str() {
            "pending" => Ok(Some(ApprovalStatus::Pending)),
            "approved" => Ok(Some(ApprovalStatus::Approved)),
            "rejected" => Ok(Some(ApprovalStatus::Rejected)),
            other => Err(AppError::internal(format!("unknown approval status '{other}'"))),
        }
    }
}
