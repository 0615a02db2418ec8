use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Row};

use akademi_core::{AppError, AppResult, MemberId, OrgId, PageParams, Paginated, RoleId, UnitId, UserId};
use akademi_registry::model::{
    OrgMemberRow, OrgMembershipSummary, OrganizationMember, UnitMember, UnitMemberRow,
    UnitMembershipSummary, UnitRole,
};
use akademi_registry::store::{
    OrgMemberFilter, OrgMemberPatch, OrgMemberStore, UnitMemberFilter, UnitMemberPatch,
    UnitMemberStore,
};

use super::{map_sqlx_error, PostgresStore};

const ORG_MEMBER_COLUMNS: &str = "id, user_id, organization_id, role_id, is_active, joined_at, \
     invited_by, created_at, updated_at, deleted_at";

const UNIT_MEMBER_COLUMNS: &str = "id, user_id, unit_id, role, is_active, joined_at, \
     invited_by, created_at, updated_at, deleted_at";

struct OrgMemberRecord(OrganizationMember);

impl<'r> FromRow<'r, PgRow> for OrgMemberRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrgMemberRecord(OrganizationMember {
            id: MemberId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            organization_id: OrgId::from_uuid(row.try_get("organization_id")?),
            role_id: RoleId::from_uuid(row.try_get("role_id")?),
            is_active: row.try_get("is_active")?,
            joined_at: row.try_get("joined_at")?,
            invited_by: row
                .try_get::<Option<uuid::Uuid>, _>("invited_by")?
                .map(UserId::from_uuid),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        }))
    }
}

struct UnitMemberRecord(UnitMember);

impl<'r> FromRow<'r, PgRow> for UnitMemberRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let role =
            UnitRole::parse(&role).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;
        Ok(UnitMemberRecord(UnitMember {
            id: MemberId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            unit_id: UnitId::from_uuid(row.try_get("unit_id")?),
            role,
            is_active: row.try_get("is_active")?,
            joined_at: row.try_get("joined_at")?,
            invited_by: row
                .try_get::<Option<uuid::Uuid>, _>("invited_by")?
                .map(UserId::from_uuid),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        }))
    }
}

fn read_err(e: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("failed to read member row: {e}"))
}

#[async_trait]
impl OrgMemberStore for PostgresStore {
    async fn find(&self, id: MemberId) -> AppResult<Option<OrganizationMember>> {
        let row = sqlx::query(&format!(
            "SELECT {ORG_MEMBER_COLUMNS} FROM organization_members \
             WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_org_member", e))?;

        row.map(|r| OrgMemberRecord::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(read_err)
    }

    async fn find_by_user_and_org(
        &self,
        user_id: UserId,
        organization_id: OrgId,
    ) -> AppResult<Option<OrganizationMember>> {
        let row = sqlx::query(&format!(
            "SELECT {ORG_MEMBER_COLUMNS} FROM organization_members \
             WHERE user_id = $1 AND organization_id = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_org_member_by_pair", e))?;

        row.map(|r| OrgMemberRecord::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(read_err)
    }

    async fn list(
        &self,
        filter: &OrgMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<OrgMemberRow>> {
        let org_param = filter.organization_id.map(|o| *o.as_uuid());
        let user_param = filter.user_id.map(|u| *u.as_uuid());
        let role_param = filter.role_id.map(|r| *r.as_uuid());

        let predicate = "m.deleted_at IS NULL \
             AND ($1::uuid IS NULL OR m.organization_id = $1) \
             AND ($2::uuid IS NULL OR m.user_id = $2) \
             AND ($3::uuid IS NULL OR m.role_id = $3) \
             AND ($4::boolean IS NULL OR m.is_active = $4)";

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM organization_members m WHERE {predicate}"
        ))
        .bind(org_param)
        .bind(user_param)
        .bind(role_param)
        .bind(filter.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_org_members", e))?;
        let total: i64 = count_row.try_get("total").map_err(read_err)?;

        let rows = sqlx::query(&format!(
            "SELECT m.id, m.user_id, m.organization_id, m.role_id, m.is_active, m.joined_at, \
                    m.invited_by, m.created_at, m.updated_at, m.deleted_at, \
                    u.full_name AS user_name, u.email AS user_email, \
                    o.name AS org_name, o.code AS org_code, \
                    r.name AS role_name \
             FROM organization_members m \
             JOIN users u ON u.id = m.user_id \
             JOIN organizations o ON o.id = m.organization_id \
             JOIN roles r ON r.id = m.role_id \
             WHERE {predicate} \
             ORDER BY m.joined_at DESC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(org_param)
        .bind(user_param)
        .bind(role_param)
        .bind(filter.is_active)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_org_members", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let member = OrgMemberRecord::from_row(row).map_err(read_err)?.0;
            items.push(OrgMemberRow {
                member,
                user_name: row.try_get("user_name").map_err(read_err)?,
                user_email: row.try_get("user_email").map_err(read_err)?,
                org_name: row.try_get("org_name").map_err(read_err)?,
                org_code: row.try_get("org_code").map_err(read_err)?,
                role_name: row.try_get("role_name").map_err(read_err)?,
            });
        }
        Ok(Paginated::new(items, page, total as u64))
    }

    async fn insert(&self, member: &OrganizationMember) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO organization_members (
                id, user_id, organization_id, role_id, is_active, joined_at,
                invited_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.user_id.as_uuid())
        .bind(member.organization_id.as_uuid())
        .bind(member.role_id.as_uuid())
        .bind(member.is_active)
        .bind(member.joined_at)
        .bind(member.invited_by.map(|u| *u.as_uuid()))
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("user is already a member")
            } else {
                map_sqlx_error("insert_org_member", e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, id: MemberId, patch: &OrgMemberPatch) -> AppResult<OrganizationMember> {
        let row = sqlx::query(&format!(
            "UPDATE organization_members SET \
                 role_id = COALESCE($2, role_id), \
                 is_active = COALESCE($3, is_active), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {ORG_MEMBER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(patch.role_id.map(|r| *r.as_uuid()))
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_org_member", e))?;

        row.map(|r| OrgMemberRecord::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(read_err)?
            .ok_or(AppError::NotFound)
    }

    async fn soft_delete(&self, id: MemberId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE organization_members SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_org_member", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn memberships_for_user(&self, user_id: UserId) -> AppResult<Vec<OrgMembershipSummary>> {
        let rows = sqlx::query(
            "SELECT m.organization_id, o.name AS org_name, m.role_id, r.name AS role_name \
             FROM organization_members m \
             JOIN organizations o ON o.id = m.organization_id \
             JOIN roles r ON r.id = m.role_id \
             WHERE m.user_id = $1 AND m.deleted_at IS NULL \
             ORDER BY o.name ASC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("memberships_for_user", e))?;

        rows.iter()
            .map(|row| {
                Ok(OrgMembershipSummary {
                    org_id: OrgId::from_uuid(row.try_get("organization_id").map_err(read_err)?),
                    org_name: row.try_get("org_name").map_err(read_err)?,
                    role_id: RoleId::from_uuid(row.try_get("role_id").map_err(read_err)?),
                    role_name: row.try_get("role_name").map_err(read_err)?,
                })
            })
            .collect()
    }

    async fn active_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        let rows = sqlx::query(
            "SELECT role_id FROM organization_members \
             WHERE user_id = $1 AND is_active AND deleted_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("active_role_ids_for_user", e))?;

        rows.iter()
            .map(|row| {
                Ok(RoleId::from_uuid(
                    row.try_get("role_id").map_err(read_err)?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl UnitMemberStore for PostgresStore {
    async fn find(&self, id: MemberId) -> AppResult<Option<UnitMember>> {
        let row = sqlx::query(&format!(
            "SELECT {UNIT_MEMBER_COLUMNS} FROM unit_members \
             WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_unit_member", e))?;

        row.map(|r| UnitMemberRecord::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(read_err)
    }

    async fn find_by_user_and_unit(
        &self,
        user_id: UserId,
        unit_id: UnitId,
    ) -> AppResult<Option<UnitMember>> {
        let row = sqlx::query(&format!(
            "SELECT {UNIT_MEMBER_COLUMNS} FROM unit_members \
             WHERE user_id = $1 AND unit_id = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id.as_uuid())
        .bind(unit_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_unit_member_by_pair", e))?;

        row.map(|r| UnitMemberRecord::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(read_err)
    }

    async fn list(
        &self,
        filter: &UnitMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<UnitMemberRow>> {
        let unit_param = filter.unit_id.map(|u| *u.as_uuid());
        let user_param = filter.user_id.map(|u| *u.as_uuid());
        let role_param = filter.role.map(|r| r.as_str());

        let predicate = "m.deleted_at IS NULL \
             AND ($1::uuid IS NULL OR m.unit_id = $1) \
             AND ($2::uuid IS NULL OR m.user_id = $2) \
             AND ($3::text IS NULL OR m.role = $3) \
             AND ($4::boolean IS NULL OR m.is_active = $4)";

        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM unit_members m WHERE {predicate}"
        ))
        .bind(unit_param)
        .bind(user_param)
        .bind(role_param)
        .bind(filter.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_unit_members", e))?;
        let total: i64 = count_row.try_get("total").map_err(read_err)?;

        let rows = sqlx::query(&format!(
            "SELECT m.id, m.user_id, m.unit_id, m.role, m.is_active, m.joined_at, \
                    m.invited_by, m.created_at, m.updated_at, m.deleted_at, \
                    u.full_name AS user_name, u.email AS user_email, \
                    s.name AS unit_name, s.code AS unit_code \
             FROM unit_members m \
             JOIN users u ON u.id = m.user_id \
             JOIN units s ON s.id = m.unit_id \
             WHERE {predicate} \
             ORDER BY m.joined_at DESC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(unit_param)
        .bind(user_param)
        .bind(role_param)
        .bind(filter.is_active)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_unit_members", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let member = UnitMemberRecord::from_row(row).map_err(read_err)?.0;
            items.push(UnitMemberRow {
                member,
                user_name: row.try_get("user_name").map_err(read_err)?,
                user_email: row.try_get("user_email").map_err(read_err)?,
                unit_name: row.try_get("unit_name").map_err(read_err)?,
                unit_code: row.try_get("unit_code").map_err(read_err)?,
            });
        }
        Ok(Paginated::new(items, page, total as u64))
    }

    async fn insert(&self, member: &UnitMember) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO unit_members (
                id, user_id, unit_id, role, is_active, joined_at,
                invited_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(member.id.as_uuid())
        .bind(member.user_id.as_uuid())
        .bind(member.unit_id.as_uuid())
        .bind(member.role.as_str())
        .bind(member.is_active)
        .bind(member.joined_at)
        .bind(member.invited_by.map(|u| *u.as_uuid()))
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                AppError::conflict("user is already a member")
            } else {
                map_sqlx_error("insert_unit_member", e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, id: MemberId, patch: &UnitMemberPatch) -> AppResult<UnitMember> {
        let row = sqlx::query(&format!(
            "UPDATE unit_members SET \
                 role = COALESCE($2, role), \
                 is_active = COALESCE($3, is_active), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {UNIT_MEMBER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_unit_member", e))?;

        row.map(|r| UnitMemberRecord::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(read_err)?
            .ok_or(AppError::NotFound)
    }

    async fn soft_delete(&self, id: MemberId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE unit_members SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_unit_member", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn active_memberships_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UnitMembershipSummary>> {
        let rows = sqlx::query(
            "SELECT m.id, m.unit_id, s.name AS unit_name, s.organization_id, \
                    o.name AS org_name, m.role, m.is_active \
             FROM unit_members m \
             JOIN units s ON s.id = m.unit_id \
             JOIN organizations o ON o.id = s.organization_id \
             WHERE m.user_id = $1 AND m.is_active AND m.deleted_at IS NULL \
             ORDER BY s.name ASC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("active_unit_memberships", e))?;

        rows.iter()
            .map(|row| {
                let role: String = row.try_get("role").map_err(read_err)?;
                Ok(UnitMembershipSummary {
                    member_id: MemberId::from_uuid(row.try_get("id").map_err(read_err)?),
                    unit_id: UnitId::from_uuid(row.try_get("unit_id").map_err(read_err)?),
                    unit_name: row.try_get("unit_name").map_err(read_err)?,
                    org_id: OrgId::from_uuid(
                        row.try_get("organization_id").map_err(read_err)?,
                    ),
                    org_name: row.try_get("org_name").map_err(read_err)?,
                    role: UnitRole::parse(&role)?,
                    is_active: row.try_get("is_active").map_err(read_err)?,
                })
            })
            .collect()
    }
}
