use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{Profile, Role};
use crate::error::{AppError, AppResult};

/// The authenticated caller, resolved from a session before any operation runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub is_premium: bool,
}

impl Identity {
    pub fn from_profile(profile: &Profile, now: DateTime<Utc>) -> Self {
        Self {
            user_id: profile.id.clone(),
            role: profile.role,
            is_premium: premium_active(profile.is_premium, profile.premium_expires_at, now),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may manage a resource.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Premium lapses once its expiry passes; no expiry means indefinite.
pub fn premium_active(
    is_premium: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    is_premium && expires_at.map_or(true, |at| at > now)
}

pub fn require_identity(identity: Option<&Identity>) -> AppResult<&Identity> {
    identity.ok_or(AppError::AuthenticationRequired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn premium_expires() {
        let now = Utc::now();
        assert!(premium_active(true, None, now));
        assert!(premium_active(true, Some(now + Duration::days(1)), now));
        assert!(!premium_active(true, Some(now - Duration::seconds(1)), now));
        assert!(!premium_active(false, None, now));
    }

    #[test]
    fn owner_or_admin_can_manage() {
        let user = Identity {
            user_id: "u1".into(),
            role: Role::User,
            is_premium: false,
        };
        assert!(user.can_manage("u1"));
        assert!(!user.can_manage("u2"));

        let admin = Identity {
            role: Role::Admin,
            ..user
        };
        assert!(admin.can_manage("u2"));
    }

    #[test]
    fn missing_identity_is_rejected() {
        assert!(matches!(
            require_identity(None),
            Err(AppError::AuthenticationRequired)
        ));
    }
}
