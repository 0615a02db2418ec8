//! Credential & session manager: registration, the login state machine, and
//! refresh-token exchange.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use akademi_auth::{hash_password, verify_password, TokenIssuer, TokenPair};
use akademi_core::{AppError, AppResult, UserId};

use crate::model::{ApprovalStatus, User};
use crate::store::{ApprovalStore, UserStore};

/// One message for both unknown email and wrong password, so responses do
/// not reveal which emails are registered.
const GENERIC_CREDENTIALS_MSG: &str = "invalid email or password";

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Public view of a user. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_super_admin: bool,
    pub is_active: bool,
    pub last_login_at: Option<chrono::DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            is_super_admin: user.is_super_admin,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutput {
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserStore>,
    approvals: Arc<dyn ApprovalStore>,
    tokens: Arc<TokenIssuer>,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        approvals: Arc<dyn ApprovalStore>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            approvals,
            tokens,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> AppResult<UserProfile> {
        if input.email.trim().is_empty() || !input.email.contains('@') {
            return Err(AppError::validation("a valid email is required"));
        }
        if input.password.len() < 8 {
            return Err(AppError::validation("password must be at least 8 characters"));
        }
        if input.full_name.trim().is_empty() {
            return Err(AppError::validation("full name is required"));
        }

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::conflict("email already registered"));
        }

        let password_hash =
            hash_password(&input.password).map_err(|e| AppError::internal(e.to_string()))?;
        let mut user = User::new(input.email, password_hash, input.full_name);
        user.phone = input.phone;
        self.users.insert(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(UserProfile::from(&user))
    }

    /// The login state machine. Steps run strictly in order; credential
    /// failures are indistinguishable from unknown emails.
    pub async fn login(&self, input: LoginInput) -> AppResult<LoginOutput> {
        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or_else(|| AppError::unauthorized(GENERIC_CREDENTIALS_MSG))?;

        if !user.is_active {
            return Err(AppError::forbidden("account is not active"));
        }

        if !verify_password(&user.password_hash, &input.password) {
            return Err(AppError::unauthorized(GENERIC_CREDENTIALS_MSG));
        }

        match self.approvals.approval_status(user.id).await? {
            Some(ApprovalStatus::Pending) => {
                return Err(AppError::forbidden("account is awaiting verification"));
            }
            Some(ApprovalStatus::Rejected) => {
                return Err(AppError::forbidden("account registration was rejected"));
            }
            Some(ApprovalStatus::Approved) | None => {}
        }

        let tokens = self
            .tokens
            .issue_pair(user.id)
            .map_err(|e| AppError::internal(e.to_string()))?;

        // Best effort: a failed timestamp write must not fail the login.
        if let Err(e) = self.users.touch_last_login(user.id, Utc::now()).await {
            warn!(user_id = %user.id, error = %e, "failed to record last login");
        }

        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutput {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    /// Exchange a refresh token for a fresh pair. The submitted refresh
    /// token stays valid until its own expiry; there is no rotation.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self
            .tokens
            .verify(refresh_token)
            .map_err(|_| AppError::unauthorized("invalid refresh token"))?;

        let user = self
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !user.is_active {
            return Err(AppError::forbidden("account is not active"));
        }

        self.tokens
            .issue_pair(user.id)
            .map_err(|e| AppError::internal(e.to_string()))
    }

    pub async fn profile(&self, user_id: UserId) -> AppResult<UserProfile> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(UserProfile::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn service() -> (SessionService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(TokenIssuer::new(b"test-secret"));
        let svc = SessionService::new(store.clone(), store.clone(), tokens);
        (svc, store)
    }

    fn register_input() -> RegisterInput {
        RegisterInput {
            email: "guru@sekolah.test".to_string(),
            password: "password123".to_string(),
            full_name: "Guru Satu".to_string(),
            phone: None,
        }
    }

    fn login_input(password: &str) -> LoginInput {
        LoginInput {
            email: "guru@sekolah.test".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (svc, _) = service();
        let profile = svc.register(register_input()).await.unwrap();
        assert!(profile.is_active);
        assert!(!profile.is_super_admin);

        let out = svc.login(login_input("password123")).await.unwrap();
        assert_eq!(out.user.id, profile.id);
        assert!(!out.tokens.access_token.is_empty());
        // Last login is recorded on the stored user, not the login response.
        let stored = svc.profile(profile.id).await.unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (svc, _) = service();
        svc.register(register_input()).await.unwrap();
        let err = svc.register(register_input()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_password_rejected() {
        let (svc, _) = service();
        let mut input = register_input();
        input.password = "short".to_string();
        let err = svc.register(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let (svc, _) = service();
        svc.register(register_input()).await.unwrap();

        let unknown = svc
            .login(LoginInput {
                email: "nobody@sekolah.test".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap_err();
        let wrong = svc.login(login_input("password124")).await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn inactive_account_is_forbidden() {
        let (svc, store) = service();
        let profile = svc.register(register_input()).await.unwrap();
        store.with_user_mut(profile.id, |u| u.is_active = false);

        let err = svc.login(login_input("password123")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "account is not active"));

        // The active gate runs before password verification, so even a bad
        // password reads as Forbidden for a deactivated account.
        let err = svc.login(login_input("password124")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "account is not active"));
    }

    #[tokio::test]
    async fn approval_gate_blocks_pending_and_rejected() {
        let (svc, store) = service();
        let profile = svc.register(register_input()).await.unwrap();

        store.set_approval(profile.id, ApprovalStatus::Pending);
        let err = svc.login(login_input("password123")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m.contains("awaiting")));

        store.set_approval(profile.id, ApprovalStatus::Rejected);
        let err = svc.login(login_input("password123")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m.contains("rejected")));

        store.set_approval(profile.id, ApprovalStatus::Approved);
        svc.login(login_input("password123")).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_exchanges_without_rotation() {
        let (svc, _) = service();
        svc.register(register_input()).await.unwrap();
        let out = svc.login(login_input("password123")).await.unwrap();

        let pair = svc.refresh(&out.tokens.refresh_token).await.unwrap();
        assert!(!pair.access_token.is_empty());

        // The original refresh token still works.
        svc.refresh(&out.tokens.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_and_inactive_accounts() {
        let (svc, store) = service();
        let profile = svc.register(register_input()).await.unwrap();
        let out = svc.login(login_input("password123")).await.unwrap();

        let err = svc.refresh("not-a-token").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        store.with_user_mut(profile.id, |u| u.is_active = false);
        let err = svc.refresh(&out.tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
