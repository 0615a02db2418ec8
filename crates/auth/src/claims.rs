use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use akademi_core::UserId;

/// Session token claims (transport-agnostic).
///
/// Both token classes (access and refresh) carry the same minimal payload:
/// the subject's user id and a unix expiry. Validity is purely signature plus
/// expiry; there is no persisted token store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,

    /// Expiration as a unix timestamp (seconds).
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            exp: expires_at.timestamp(),
        }
    }

    /// Deterministic expiry check against a caller-supplied clock.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_inclusive_at_the_boundary() {
        let now = Utc::now();
        let claims = Claims::new(UserId::new(), now);
        assert!(claims.is_expired(now));
        let claims = Claims::new(UserId::new(), now + Duration::seconds(1));
        assert!(!claims.is_expired(now));
    }
}
