use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::{require_identity, Identity};
use crate::db::models::{Profile, ProfileUpdate, Role, WatchEntry};
use crate::error::{AppError, AppResult};
use crate::store::DocumentStore;

const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Longest premium grant an admin can issue in one call.
pub const MAX_PREMIUM_DAYS: u32 = 3650;

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, display_name: &str, role: Role) -> AppResult<Profile> {
        let now = Utc::now();
        let profile = Profile {
            id: uuid::Uuid::now_v7().to_string(),
            display_name: validate_display_name(display_name)?,
            avatar_url: None,
            role,
            is_premium: false,
            premium_expires_at: None,
            videos_watched: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_profile(&profile).await?;
        tracing::info!(id = %profile.id, role = role.as_str(), "profile created");
        Ok(profile)
    }

    pub async fn me(&self, identity: Option<&Identity>) -> AppResult<Profile> {
        let identity = require_identity(identity)?;
        self.store
            .get_profile(&identity.user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_me(
        &self,
        identity: Option<&Identity>,
        update: ProfileUpdate,
    ) -> AppResult<Profile> {
        let identity = require_identity(identity)?;
        let update = ProfileUpdate {
            display_name: update
                .display_name
                .as_deref()
                .map(validate_display_name)
                .transpose()?,
            avatar_url: update.avatar_url.map(|a| a.trim().to_string()),
        };
        self.store
            .update_profile(&identity.user_id, &update, Utc::now())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn history(
        &self,
        identity: Option<&Identity>,
        limit: usize,
    ) -> AppResult<Vec<WatchEntry>> {
        let identity = require_identity(identity)?;
        self.store.watch_history(&identity.user_id, limit).await
    }

    pub async fn set_role(
        &self,
        identity: Option<&Identity>,
        user_id: &str,
        role: Role,
    ) -> AppResult<Profile> {
        require_admin(identity)?;
        if !self.store.set_role(user_id, role, Utc::now()).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(user = user_id, role = role.as_str(), "role changed");
        self.store.get_profile(user_id).await?.ok_or(AppError::NotFound)
    }

    /// Grant or revoke premium. A grant with `days` expires after that many days.
    pub async fn set_premium(
        &self,
        identity: Option<&Identity>,
        user_id: &str,
        is_premium: bool,
        days: Option<u32>,
    ) -> AppResult<Profile> {
        require_admin(identity)?;
        let now = Utc::now();
        let expires_at = match (is_premium, days) {
            (true, Some(0)) => {
                return Err(AppError::BadRequest("days must be greater than 0".into()))
            }
            (true, Some(days)) if days > MAX_PREMIUM_DAYS => {
                return Err(AppError::BadRequest(format!(
                    "days must be at most {MAX_PREMIUM_DAYS}"
                )))
            }
            (true, Some(days)) => Some(
                now.checked_add_signed(Duration::days(i64::from(days)))
                    .ok_or_else(|| AppError::BadRequest("premium expiry out of range".into()))?,
            ),
            _ => None,
        };
        if !self
            .store
            .set_premium(user_id, is_premium, expires_at, now)
            .await?
        {
            return Err(AppError::NotFound);
        }
        tracing::info!(user = user_id, is_premium, "premium changed");
        self.store.get_profile(user_id).await?.ok_or(AppError::NotFound)
    }
}

fn require_admin(identity: Option<&Identity>) -> AppResult<&Identity> {
    let identity = require_identity(identity)?;
    if identity.is_admin() {
        Ok(identity)
    } else {
        Err(AppError::Forbidden)
    }
}

fn validate_display_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Display name cannot be empty".into()));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "Display name must be {MAX_DISPLAY_NAME_CHARS} characters or less"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn identity_of(profile: &Profile) -> Identity {
        Identity::from_profile(profile, Utc::now())
    }

    #[tokio::test]
    async fn me_and_update() {
        let svc = ProfileService::new(Arc::new(MemoryStore::new()));
        let profile = svc.create("Elif", Role::User).await.unwrap();
        let me = identity_of(&profile);

        assert_eq!(svc.me(Some(&me)).await.unwrap().display_name, "Elif");
        let updated = svc
            .update_me(
                Some(&me),
                ProfileUpdate {
                    display_name: Some(" Elif K. ".into()),
                    avatar_url: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Elif K.");
        assert!(matches!(svc.me(None).await, Err(AppError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn admin_actions_require_admin() {
        let svc = ProfileService::new(Arc::new(MemoryStore::new()));
        let admin = identity_of(&svc.create("Admin", Role::Admin).await.unwrap());
        let user_profile = svc.create("Can", Role::Free).await.unwrap();
        let user = identity_of(&user_profile);

        assert!(matches!(
            svc.set_role(Some(&user), &user_profile.id, Role::Admin).await,
            Err(AppError::Forbidden)
        ));

        let promoted = svc
            .set_role(Some(&admin), &user_profile.id, Role::User)
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::User);

        let premium = svc
            .set_premium(Some(&admin), &user_profile.id, true, Some(30))
            .await
            .unwrap();
        assert!(premium.is_premium);
        assert!(premium.premium_expires_at.unwrap() > Utc::now());
        assert!(identity_of(&premium).is_premium);

        let revoked = svc
            .set_premium(Some(&admin), &user_profile.id, false, None)
            .await
            .unwrap();
        assert!(!revoked.is_premium);
        assert!(revoked.premium_expires_at.is_none());

        assert!(matches!(
            svc.set_role(Some(&admin), "ghost", Role::User).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn premium_grant_length_is_bounded() {
        let svc = ProfileService::new(Arc::new(MemoryStore::new()));
        let admin = identity_of(&svc.create("Admin", Role::Admin).await.unwrap());
        let user = svc.create("Deniz", Role::User).await.unwrap();

        for days in [0, MAX_PREMIUM_DAYS + 1, u32::MAX] {
            assert!(
                matches!(
                    svc.set_premium(Some(&admin), &user.id, true, Some(days)).await,
                    Err(AppError::BadRequest(_))
                ),
                "days = {days}"
            );
        }
        let unchanged = svc.me(Some(&identity_of(&user))).await.unwrap();
        assert!(!unchanged.is_premium);

        let longest = svc
            .set_premium(Some(&admin), &user.id, true, Some(MAX_PREMIUM_DAYS))
            .await
            .unwrap();
        assert!(longest.premium_expires_at.unwrap() > Utc::now() + Duration::days(3600));
    }
}
