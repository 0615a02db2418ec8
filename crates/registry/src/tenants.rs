//! Tenant administration: organizations and their units.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::info;

use akademi_core::{AppError, AppResult, OrgId, PageParams, Paginated, UnitId, UserId};

use crate::model::{Organization, Unit};
use crate::store::{OrgStore, OrganizationPatch, UnitPatch, UnitStore};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganization {
    pub owner_id: UserId,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnit {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub settings: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUnit {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<JsonValue>,
}

#[derive(Clone)]
pub struct TenantService {
    orgs: Arc<dyn OrgStore>,
    units: Arc<dyn UnitStore>,
}

impl TenantService {
    pub fn new(orgs: Arc<dyn OrgStore>, units: Arc<dyn UnitStore>) -> Self {
        Self { orgs, units }
    }

    pub async fn create_org(&self, input: CreateOrganization) -> AppResult<Organization> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("organization name is required"));
        }
        if input.code.trim().is_empty() {
            return Err(AppError::validation("organization code is required"));
        }

        let now = chrono::Utc::now();
        let org = Organization {
            id: OrgId::new(),
            owner_id: input.owner_id,
            name: input.name,
            code: input.code,
            description: input.description,
            is_active: true,
            settings: input.settings.unwrap_or_else(|| JsonValue::Object(Default::default())),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.orgs.insert(&org).await?;
        info!(org_id = %org.id, code = %org.code, "organization created");
        Ok(org)
    }

    pub async fn get_org(&self, id: OrgId) -> AppResult<Organization> {
        self.orgs.find(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_orgs(&self, page: PageParams) -> AppResult<Paginated<Organization>> {
        self.orgs.list(page).await
    }

    pub async fn update_org(&self, id: OrgId, input: UpdateOrganization) -> AppResult<Organization> {
        self.orgs.find(id).await?.ok_or(AppError::NotFound)?;
        let patch = OrganizationPatch {
            name: input.name,
            description: input.description,
            is_active: input.is_active,
            settings: input.settings,
        };
        self.orgs.update(id, &patch).await
    }

    pub async fn delete_org(&self, id: OrgId) -> AppResult<()> {
        self.orgs.find(id).await?.ok_or(AppError::NotFound)?;
        self.orgs.soft_delete(id).await?;
        info!(org_id = %id, "organization deleted");
        Ok(())
    }

    /// Create a unit under an existing organization.
    pub async fn create_unit(&self, organization_id: OrgId, input: CreateUnit) -> AppResult<Unit> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("unit name is required"));
        }
        if input.code.trim().is_empty() {
            return Err(AppError::validation("unit code is required"));
        }
        self.orgs
            .find(organization_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = chrono::Utc::now();
        let unit = Unit {
            id: UnitId::new(),
            organization_id,
            name: input.name,
            code: input.code,
            kind: input.kind,
            is_active: true,
            settings: input.settings.unwrap_or_else(|| JsonValue::Object(Default::default())),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.units.insert(&unit).await?;
        info!(unit_id = %unit.id, code = %unit.code, "unit created");
        Ok(unit)
    }

    pub async fn get_unit(&self, id: UnitId) -> AppResult<Unit> {
        self.units.find(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_units(
        &self,
        organization_id: Option<OrgId>,
        page: PageParams,
    ) -> AppResult<Paginated<Unit>> {
        self.units.list(organization_id, page).await
    }

    pub async fn update_unit(&self, id: UnitId, input: UpdateUnit) -> AppResult<Unit> {
        self.units.find(id).await?.ok_or(AppError::NotFound)?;
        let patch = UnitPatch {
            name: input.name,
            kind: input.kind,
            is_active: input.is_active,
            settings: input.settings,
        };
        self.units.update(id, &patch).await
    }

    pub async fn delete_unit(&self, id: UnitId) -> AppResult<()> {
        self.units.find(id).await?.ok_or(AppError::NotFound)?;
        self.units.soft_delete(id).await?;
        info!(unit_id = %id, "unit deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn service() -> TenantService {
        let store = Arc::new(InMemoryStore::new());
        TenantService::new(store.clone(), store)
    }

    fn org_input(code: &str) -> CreateOrganization {
        CreateOrganization {
            owner_id: UserId::new(),
            name: "Yayasan Contoh".to_string(),
            code: code.to_string(),
            description: String::new(),
            settings: None,
        }
    }

    #[tokio::test]
    async fn duplicate_org_code_conflicts() {
        let svc = service();
        svc.create_org(org_input("YC-01")).await.unwrap();
        let err = svc.create_org(org_input("YC-01")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unit_requires_existing_org() {
        let svc = service();
        let err = svc
            .create_unit(
                OrgId::new(),
                CreateUnit {
                    name: "SD Contoh".to_string(),
                    code: "SD-01".to_string(),
                    kind: "sd".to_string(),
                    settings: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn unit_crud_under_org() {
        let svc = service();
        let org = svc.create_org(org_input("YC-01")).await.unwrap();
        let unit = svc
            .create_unit(
                org.id,
                CreateUnit {
                    name: "SD Contoh".to_string(),
                    code: "SD-01".to_string(),
                    kind: "sd".to_string(),
                    settings: None,
                },
            )
            .await
            .unwrap();

        let updated = svc
            .update_unit(
                unit.id,
                UpdateUnit {
                    name: Some("SD Contoh 1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "SD Contoh 1");
        assert_eq!(updated.kind, "sd");

        let listed = svc
            .list_units(Some(org.id), PageParams::default())
            .await
            .unwrap();
        assert_eq!(listed.total_data, 1);

        svc.delete_unit(unit.id).await.unwrap();
        assert!(matches!(svc.get_unit(unit.id).await.unwrap_err(), AppError::NotFound));
    }

    #[tokio::test]
    async fn soft_deleted_org_frees_its_code() {
        let svc = service();
        let org = svc.create_org(org_input("YC-01")).await.unwrap();
        svc.delete_org(org.id).await.unwrap();
        svc.create_org(org_input("YC-01")).await.unwrap();
    }
}
