use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Row};

use akademi_core::{
    AppError, AppResult, OrgId, PageParams, Paginated, PermissionId, RoleId,
};
use akademi_registry::model::{PermissionRecord, Role, RoleKind};
use akademi_registry::store::{
    PermissionFilter, PermissionStore, RoleFilter, RolePatch, RoleStore,
};

use super::{map_sqlx_error, PostgresStore};

const ROLE_COLUMNS: &str = "id, organization_id, name, display_name, kind, level, description, \
     is_default, created_at, updated_at, deleted_at";

const PERMISSION_COLUMNS: &str = "id, resource, action, name, description, created_at";

struct RoleRow(Role);

impl<'r> FromRow<'r, PgRow> for RoleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        let kind = RoleKind::parse(&kind).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;
        Ok(RoleRow(Role {
            id: RoleId::from_uuid(row.try_get("id")?),
            organization_id: row
                .try_get::<Option<uuid::Uuid>, _>("organization_id")?
                .map(OrgId::from_uuid),
            name: row.try_get("name")?,
            display_name: row.try_get("display_name")?,
            kind,
            level: row.try_get("level")?,
            description: row.try_get("description")?,
            is_default: row.try_get("is_default")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        }))
    }
}

struct PermissionRow(PermissionRecord);

impl<'r> FromRow<'r, PgRow> for PermissionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PermissionRow(PermissionRecord {
            id: PermissionId::from_uuid(row.try_get("id")?),
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

fn decode_roles(rows: Vec<PgRow>) -> AppResult<Vec<Role>> {
    rows.iter()
        .map(|r| {
            RoleRow::from_row(r)
                .map(|r| r.0)
                .map_err(|e| AppError::internal(format!("failed to read role row: {e}")))
        })
        .collect()
}

fn decode_permissions(rows: Vec<PgRow>) -> AppResult<Vec<PermissionRecord>> {
    rows.iter()
        .map(|r| {
            PermissionRow::from_row(r)
                .map(|r| r.0)
                .map_err(|e| AppError::internal(format!("failed to read permission row: {e}")))
        })
        .collect()
}

#[async_trait]
impl RoleStore for PostgresStore {
    async fn find(&self, id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_role", e))?;

        Ok(decode_roles(row.into_iter().collect())?.pop())
    }

    async fn find_by_name(
        &self,
        name: &str,
        organization_id: Option<OrgId>,
    ) -> AppResult<Option<Role>> {
        let row = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles \
             WHERE name = $1 AND organization_id IS NOT DISTINCT FROM $2 \
               AND deleted_at IS NULL"
        ))
        .bind(name)
        .bind(organization_id.map(|o| *o.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_role_by_name", e))?;

        Ok(decode_roles(row.into_iter().collect())?.pop())
    }

    async fn list(&self, filter: &RoleFilter, page: PageParams) -> AppResult<Paginated<Role>> {
        let org_param = filter.organization_id.map(|o| *o.as_uuid());
        let kind_param = filter.kind.map(|k| k.as_str());
        let name_param = filter.name.as_deref();

        let predicate = "deleted_at IS NULL \
             AND ($1::uuid IS NULL OR organization_id = $1) \
             AND ($2::text IS NULL OR name = $2) \
             AND ($3::text IS NULL OR kind = $3) \
             AND ($4::boolean IS NULL OR (organization_id IS NULL) = $4)";

        let count_row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM roles WHERE {predicate}"))
            .bind(org_param)
            .bind(name_param)
            .bind(kind_param)
            .bind(filter.is_global)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_roles", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| AppError::internal(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE {predicate} \
             ORDER BY level DESC, created_at DESC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(org_param)
        .bind(name_param)
        .bind(kind_param)
        .bind(filter.is_global)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_roles", e))?;

        Ok(Paginated::new(decode_roles(rows)?, page, total as u64))
    }

    async fn insert(&self, role: &Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (
                id, organization_id, name, display_name, kind, level,
                description, is_default, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.organization_id.map(|o| *o.as_uuid()))
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(role.kind.as_str())
        .bind(role.level)
        .bind(&role.description)
        .bind(role.is_default)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("role name already exists in organization")
            } else {
                map_sqlx_error("insert_role", e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, id: RoleId, patch: &RolePatch) -> AppResult<Role> {
        let row = sqlx::query(&format!(
            "UPDATE roles SET \
                 name = COALESCE($2, name), \
                 display_name = COALESCE($3, display_name), \
                 description = COALESCE($4, description), \
                 level = COALESCE($5, level), \
                 is_default = COALESCE($6, is_default), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {ROLE_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(patch.name.as_deref())
        .bind(patch.display_name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.level)
        .bind(patch.is_default)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?;

        decode_roles(row.into_iter().collect())?
            .pop()
            .ok_or(AppError::NotFound)
    }

    async fn soft_delete(&self, id: RoleId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE roles SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_role", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for PostgresStore {
    async fn find(&self, id: PermissionId) -> AppResult<Option<PermissionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_permission", e))?;

        Ok(decode_permissions(row.into_iter().collect())?.pop())
    }

    async fn list(
        &self,
        filter: &PermissionFilter,
        page: PageParams,
    ) -> AppResult<Paginated<PermissionRecord>> {
        let predicate = "($1::text IS NULL OR name = $1) \
             AND ($2::text IS NULL OR resource = $2) \
             AND ($3::text IS NULL OR action = $3)";

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM permissions WHERE {predicate}"
        ))
        .bind(filter.name.as_deref())
        .bind(filter.resource.as_deref())
        .bind(filter.action.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_permissions", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| AppError::internal(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE {predicate} \
             ORDER BY resource ASC, action ASC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.name.as_deref())
        .bind(filter.resource.as_deref())
        .bind(filter.action.as_deref())
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_permissions", e))?;

        Ok(Paginated::new(decode_permissions(rows)?, page, total as u64))
    }

    async fn insert(&self, permission: &PermissionRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions (id, resource, action, name, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.name)
        .bind(&permission.description)
        .bind(permission.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("permission already exists")
            } else {
                map_sqlx_error("insert_permission", e)
            }
        })?;
        Ok(())
    }

    async fn delete(&self, id: PermissionId) -> AppResult<()> {
        // ON DELETE CASCADE drops the role links with the row.
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_permission", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionRecord>> {
        let rows = sqlx::query(
            "SELECT p.id, p.resource, p.action, p.name, p.description, p.created_at \
             FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             WHERE rp.role_id = $1 \
             ORDER BY p.resource ASC, p.action ASC",
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("role_permissions", e))?;

        decode_permissions(rows)
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_set_role_permissions", e))?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_role_permissions", e))?;

        for permission_id in permission_ids {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(role_id.as_uuid())
            .bind(permission_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // FK violation means the permission id does not exist; the
                // whole replacement fails and the transaction rolls back.
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23503") {
                        return AppError::NotFound;
                    }
                }
                map_sqlx_error("insert_role_permission", e)
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_set_role_permissions", e))?;
        Ok(())
    }

    async fn clear_role_permissions(&self, role_id: RoleId) -> AppResult<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_role_permissions", e))?;
        Ok(())
    }

    async fn permission_names_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<String>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = role_ids.iter().map(|r| *r.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT DISTINCT p.name FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             WHERE rp.role_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("permission_names_for_roles", e))?;

        rows.iter()
            .map(|r| {
                r.try_get("name")
                    .map_err(|e| AppError::internal(format!("failed to read name: {e}")))
            })
            .collect()
    }
}
