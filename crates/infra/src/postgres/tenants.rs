use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Row};

use akademi_core::{AppError, AppResult, OrgId, PageParams, Paginated, UnitId, UserId};
use akademi_registry::model::{Organization, Unit};
use akademi_registry::store::{OrgStore, OrganizationPatch, UnitPatch, UnitStore};

use super::{map_sqlx_error, PostgresStore};

const ORG_COLUMNS: &str = "id, owner_id, name, code, description, is_active, settings, \
     created_at, updated_at, deleted_at";

const UNIT_COLUMNS: &str = "id, organization_id, name, code, kind, is_active, settings, \
     created_at, updated_at, deleted_at";

struct OrgRow(Organization);

impl<'r> FromRow<'r, PgRow> for OrgRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrgRow(Organization {
            id: OrgId::from_uuid(row.try_get("id")?),
            owner_id: UserId::from_uuid(row.try_get("owner_id")?),
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
            settings: row.try_get("settings")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        }))
    }
}

struct UnitRow(Unit);

impl<'r> FromRow<'r, PgRow> for UnitRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UnitRow(Unit {
            id: UnitId::from_uuid(row.try_get("id")?),
            organization_id: OrgId::from_uuid(row.try_get("organization_id")?),
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            kind: row.try_get("kind")?,
            is_active: row.try_get("is_active")?,
            settings: row.try_get("settings")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        }))
    }
}

fn decode_orgs(rows: Vec<PgRow>) -> AppResult<Vec<Organization>> {
    rows.iter()
        .map(|r| {
            OrgRow::from_row(r)
                .map(|o| o.0)
                .map_err(|e| AppError::internal(format!("failed to read organization row: {e}")))
        })
        .collect()
}

fn decode_units(rows: Vec<PgRow>) -> AppResult<Vec<Unit>> {
    rows.iter()
        .map(|r| {
            UnitRow::from_row(r)
                .map(|u| u.0)
                .map_err(|e| AppError::internal(format!("failed to read unit row: {e}")))
        })
        .collect()
}

#[async_trait]
impl OrgStore for PostgresStore {
    async fn find(&self, id: OrgId) -> AppResult<Option<Organization>> {
        let row = sqlx::query(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_organization", e))?;

        Ok(decode_orgs(row.into_iter().collect())?.pop())
    }

    async fn list(&self, page: PageParams) -> AppResult<Paginated<Organization>> {
        let count_row =
            sqlx::query("SELECT COUNT(*) AS total FROM organizations WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("count_organizations", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| AppError::internal(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_organizations", e))?;

        Ok(Paginated::new(decode_orgs(rows)?, page, total as u64))
    }

    async fn insert(&self, org: &Organization) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations (
                id, owner_id, name, code, description, is_active, settings,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(org.id.as_uuid())
        .bind(org.owner_id.as_uuid())
        .bind(&org.name)
        .bind(&org.code)
        .bind(&org.description)
        .bind(org.is_active)
        .bind(&org.settings)
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("organization code already exists")
            } else {
                map_sqlx_error("insert_organization", e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, id: OrgId, patch: &OrganizationPatch) -> AppResult<Organization> {
        let row = sqlx::query(&format!(
            "UPDATE organizations SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 is_active = COALESCE($4, is_active), \
                 settings = COALESCE($5, settings), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {ORG_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.is_active)
        .bind(patch.settings.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_organization", e))?;

        decode_orgs(row.into_iter().collect())?
            .pop()
            .ok_or(AppError::NotFound)
    }

    async fn soft_delete(&self, id: OrgId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE organizations SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_organization", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UnitStore for PostgresStore {
    async fn find(&self, id: UnitId) -> AppResult<Option<Unit>> {
        let row = sqlx::query(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_unit", e))?;

        Ok(decode_units(row.into_iter().collect())?.pop())
    }

    async fn list(
        &self,
        organization_id: Option<OrgId>,
        page: PageParams,
    ) -> AppResult<Paginated<Unit>> {
        let org_param = organization_id.map(|o| *o.as_uuid());

        let count_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM units \
             WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR organization_id = $1)",
        )
        .bind(org_param)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_units", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| AppError::internal(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(&format!(
            "SELECT {UNIT_COLUMNS} FROM units \
             WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR organization_id = $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(org_param)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_units", e))?;

        Ok(Paginated::new(decode_units(rows)?, page, total as u64))
    }

    async fn insert(&self, unit: &Unit) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO units (
                id, organization_id, name, code, kind, is_active, settings,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(unit.id.as_uuid())
        .bind(unit.organization_id.as_uuid())
        .bind(&unit.name)
        .bind(&unit.code)
        .bind(&unit.kind)
        .bind(unit.is_active)
        .bind(&unit.settings)
        .bind(unit.created_at)
        .bind(unit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("unit code already exists")
            } else {
                map_sqlx_error("insert_unit", e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, id: UnitId, patch: &UnitPatch) -> AppResult<Unit> {
        let row = sqlx::query(&format!(
            "UPDATE units SET \
                 name = COALESCE($2, name), \
                 kind = COALESCE($3, kind), \
                 is_active = COALESCE($4, is_active), \
                 settings = COALESCE($5, settings), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {UNIT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(patch.name.as_deref())
        .bind(patch.kind.as_deref())
        .bind(patch.is_active)
        .bind(patch.settings.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_unit", e))?;

        decode_units(row.into_iter().collect())?
            .pop()
            .ok_or(AppError::NotFound)
    }

    async fn soft_delete(&self, id: UnitId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE units SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_unit", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
