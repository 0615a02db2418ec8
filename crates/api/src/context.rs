use akademi_core::UserId;

/// Authenticated identity for a request, inserted by the auth middleware.
///
/// Handlers receive this as a typed extension; there is no ambient or
/// string-keyed identity lookup anywhere.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
}

impl AuthContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
