//! crates/chapterly_core/src/profile.rs
//!
//! User profiles: the daily reading goal, the public username, and the
//! onboarding flag. Validation happens before any store call.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::UserProfile;
use crate::ports::{PortError, ProfileChanges, ProfileStore};

pub const DEFAULT_DAILY_GOAL_MINUTES: u32 = 30;
pub const MIN_DAILY_GOAL_MINUTES: u32 = 5;
pub const MAX_DAILY_GOAL_MINUTES: u32 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("username must be 3-20 characters of letters, digits or underscores")]
    InvalidUsername,

    #[error(
        "daily goal must be between {MIN_DAILY_GOAL_MINUTES} and {MAX_DAILY_GOAL_MINUTES} minutes"
    )]
    InvalidGoal,

    #[error(transparent)]
    Persistence(#[from] PortError),
}

fn valid_username(name: &str) -> bool {
    (3..=20).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Fetches the profile, creating it with defaults on first sight.
    /// A concurrent first-create loses the race gracefully and reads back
    /// the winner's row.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<UserProfile, ProfileError> {
        if let Some(profile) = self.store.get_profile(user_id).await? {
            return Ok(profile);
        }
        match self
            .store
            .insert_profile(user_id, DEFAULT_DAILY_GOAL_MINUTES)
            .await
        {
            Ok(profile) => {
                info!(%user_id, "created profile with defaults");
                Ok(profile)
            }
            Err(PortError::Conflict(_)) => {
                let profile = self.store.get_profile(user_id).await?;
                profile.ok_or_else(|| {
                    PortError::NotFound(format!("profile for user {user_id}")).into()
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Applies a partial profile update. Username changes check availability
    /// first; goal changes are bounds-checked.
    pub async fn update(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<UserProfile, ProfileError> {
        if let Some(goal) = changes.daily_goal_minutes {
            if !(MIN_DAILY_GOAL_MINUTES..=MAX_DAILY_GOAL_MINUTES).contains(&goal) {
                return Err(ProfileError::InvalidGoal);
            }
        }
        if let Some(username) = &changes.username {
            if !valid_username(username) {
                return Err(ProfileError::InvalidUsername);
            }
            if self.store.username_taken(username, user_id).await? {
                return Err(ProfileError::UsernameTaken(username.clone()));
            }
        }

        let profile = self.store.update_profile(user_id, changes).await?;
        debug!(%user_id, "updated profile");
        Ok(profile)
    }

    /// The one-shot onboarding commit: username + goal + completed flag.
    pub async fn complete_onboarding(
        &self,
        user_id: Uuid,
        username: &str,
        daily_goal_minutes: u32,
    ) -> Result<UserProfile, ProfileError> {
        self.update(
            user_id,
            ProfileChanges {
                username: Some(username.trim().to_string()),
                daily_goal_minutes: Some(daily_goal_minutes),
                onboarding_completed: Some(true),
                avatar_url: None,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryProfileStore;

    fn service() -> (ProfileService, Arc<MemoryProfileStore>) {
        let store = Arc::new(MemoryProfileStore::new());
        (ProfileService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn first_read_creates_defaults() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        let profile = service.get_or_create(user).await.unwrap();
        assert_eq!(profile.daily_goal_minutes, DEFAULT_DAILY_GOAL_MINUTES);
        assert!(!profile.onboarding_completed);
        assert!(profile.username.is_none());
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        service.get_or_create(user).await.unwrap();
        service.get_or_create(user).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn goal_outside_bounds_is_rejected() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        service.get_or_create(user).await.unwrap();
        for goal in [0, 4, 301, 10_000] {
            let err = service
                .update(
                    user,
                    ProfileChanges {
                        daily_goal_minutes: Some(goal),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ProfileError::InvalidGoal), "goal {goal}");
        }
    }

    #[tokio::test]
    async fn malformed_usernames_are_rejected() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        service.get_or_create(user).await.unwrap();
        for name in ["ab", "has space", "way_too_long_a_username", "bad!chars"] {
            let err = service
                .update(
                    user,
                    ProfileChanges {
                        username: Some(name.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ProfileError::InvalidUsername), "name {name}");
        }
    }

    #[tokio::test]
    async fn taken_username_is_rejected() {
        let (service, _) = service();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        service.get_or_create(first).await.unwrap();
        service.get_or_create(second).await.unwrap();
        service
            .complete_onboarding(first, "bookworm", 30)
            .await
            .unwrap();
        let err = service
            .complete_onboarding(second, "bookworm", 30)
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::UsernameTaken(_)));
    }

    #[tokio::test]
    async fn keeping_your_own_username_is_not_a_conflict() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        service.get_or_create(user).await.unwrap();
        service
            .complete_onboarding(user, "bookworm", 30)
            .await
            .unwrap();
        let profile = service
            .update(
                user,
                ProfileChanges {
                    username: Some("bookworm".to_string()),
                    daily_goal_minutes: Some(45),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.daily_goal_minutes, 45);
    }

    #[tokio::test]
    async fn onboarding_sets_all_three_fields() {
        let (service, _) = service();
        let user = Uuid::new_v4();
        service.get_or_create(user).await.unwrap();
        let profile = service
            .complete_onboarding(user, "  bookworm  ", 60)
            .await
            .unwrap();
        assert_eq!(profile.username.as_deref(), Some("bookworm"));
        assert_eq!(profile.daily_goal_minutes, 60);
        assert!(profile.onboarding_completed);
    }
}
