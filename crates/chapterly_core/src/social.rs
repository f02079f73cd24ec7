//! crates/chapterly_core/src/social.rs
//!
//! Friends: request/accept bookkeeping over two relations, plus the derived
//! per-friend stats the leaderboard shows. No graph algorithms here; a
//! friendship is one row holding the two user ids in ascending order.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::try_join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Friend, FriendRequest, FriendRequestStatus, UserSearchResult};
use crate::ports::{PortError, ProfileStore, SessionStore, SocialStore, StreakStore};
use crate::streaks::streak_length;

const SEARCH_RESULT_LIMIT: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("cannot send a friend request to yourself")]
    SelfRequest,

    #[error(transparent)]
    Persistence(#[from] PortError),
}

/// The canonical storage order for a friendship pair.
fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Clone)]
pub struct SocialService {
    social: Arc<dyn SocialStore>,
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<dyn SessionStore>,
    streaks: Arc<dyn StreakStore>,
}

impl SocialService {
    pub fn new(
        social: Arc<dyn SocialStore>,
        profiles: Arc<dyn ProfileStore>,
        sessions: Arc<dyn SessionStore>,
        streaks: Arc<dyn StreakStore>,
    ) -> Self {
        Self {
            social,
            profiles,
            sessions,
            streaks,
        }
    }

    pub async fn send_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<FriendRequest, SocialError> {
        if sender_id == receiver_id {
            return Err(SocialError::SelfRequest);
        }
        let request = self.social.insert_request(sender_id, receiver_id).await?;
        info!(%sender_id, %receiver_id, "sent friend request");
        Ok(request)
    }

    /// Accepts or declines a pending request. Only the receiver may respond;
    /// accepting also records the friendship. Re-accepting an already-linked
    /// pair is harmless.
    pub async fn respond_to_request(
        &self,
        receiver_id: Uuid,
        request_id: Uuid,
        accepted: bool,
    ) -> Result<(), SocialError> {
        let status = if accepted {
            FriendRequestStatus::Accepted
        } else {
            FriendRequestStatus::Declined
        };
        let sender_id = self
            .social
            .set_request_status(request_id, receiver_id, status)
            .await?;

        if accepted {
            let (user1, user2) = ordered_pair(receiver_id, sender_id);
            match self.social.insert_friendship(user1, user2).await {
                Ok(()) | Err(PortError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
            info!(%receiver_id, %sender_id, "accepted friend request");
        }
        Ok(())
    }

    pub async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<(), SocialError> {
        let (user1, user2) = ordered_pair(user_id, friend_id);
        self.social.delete_friendship(user1, user2).await?;
        info!(%user_id, %friend_id, "removed friend");
        Ok(())
    }

    pub async fn pending_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequest>, SocialError> {
        Ok(self.social.pending_requests(user_id).await?)
    }

    /// Every friend with the stats the leaderboard shows, busiest reader
    /// first. The stat fetches run concurrently; a friend whose stats fail
    /// to load shows zeros rather than sinking the whole list.
    pub async fn friends_with_stats(&self, user_id: Uuid) -> Result<Vec<Friend>, SocialError> {
        let ids = self.social.friend_ids(user_id).await?;
        let now = Utc::now();
        let week_ago = now - Duration::days(7);

        let friends = try_join_all(
            ids.into_iter()
                .map(|friend_id| self.friend_with_stats(friend_id, week_ago, now)),
        )
        .await?;

        let mut friends: Vec<Friend> = friends.into_iter().flatten().collect();
        friends.sort_by(|a, b| b.weekly_minutes.cmp(&a.weekly_minutes));
        Ok(friends)
    }

    async fn friend_with_stats(
        &self,
        friend_id: Uuid,
        week_ago: chrono::DateTime<Utc>,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<Friend>, SocialError> {
        let Some(profile) = self.profiles.get_profile(friend_id).await? else {
            return Ok(None);
        };
        // A friend who never finished onboarding has nothing to show yet.
        let Some(username) = profile.username else {
            return Ok(None);
        };

        let weekly_minutes = match self.sessions.minutes_between(friend_id, week_ago, now).await {
            Ok(minutes) => minutes,
            Err(e) => {
                warn!(%friend_id, error = %e, "failed to load friend's weekly minutes");
                0
            }
        };
        let current_streak = match self.streaks.list_days(friend_id).await {
            Ok(records) => streak_length(&records, now.date_naive()),
            Err(e) => {
                warn!(%friend_id, error = %e, "failed to load friend's streak records");
                0
            }
        };

        Ok(Some(Friend {
            id: friend_id,
            username,
            avatar_url: profile.avatar_url,
            weekly_minutes,
            current_streak,
        }))
    }

    /// Username search annotated with the viewer's relationship to each hit.
    /// A blank term short-circuits to an empty list.
    pub async fn search_users(
        &self,
        viewer_id: Uuid,
        term: &str,
    ) -> Result<Vec<UserSearchResult>, SocialError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = self
            .profiles
            .search_by_username(term, viewer_id, SEARCH_RESULT_LIMIT)
            .await?;
        let friend_ids: HashSet<Uuid> =
            self.social.friend_ids(viewer_id).await?.into_iter().collect();

        let mut results = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let Some(username) = profile.username else {
                continue;
            };
            let request_status = self.social.request_between(viewer_id, profile.id).await?;
            results.push(UserSearchResult {
                id: profile.id,
                username,
                avatar_url: profile.avatar_url,
                is_friend: friend_ids.contains(&profile.id),
                request_status,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{DailyStreakUpsert, NewReadingSession, ProfileChanges};
    use crate::test_support::{
        MemoryProfileStore, MemorySessionStore, MemorySocialStore, MemoryStreakStore,
    };

    struct Fixture {
        service: SocialService,
        social: Arc<MemorySocialStore>,
        profiles: Arc<MemoryProfileStore>,
        sessions: Arc<MemorySessionStore>,
        streaks: Arc<MemoryStreakStore>,
    }

    fn fixture() -> Fixture {
        let social = Arc::new(MemorySocialStore::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let streaks = Arc::new(MemoryStreakStore::new());
        let service = SocialService::new(
            social.clone(),
            profiles.clone(),
            sessions.clone(),
            streaks.clone(),
        );
        Fixture {
            service,
            social,
            profiles,
            sessions,
            streaks,
        }
    }

    async fn named_user(f: &Fixture, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        f.profiles.insert_profile(id, 30).await.unwrap();
        f.profiles
            .update_profile(
                id,
                ProfileChanges {
                    username: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn requests_to_yourself_are_rejected() {
        let f = fixture();
        let user = Uuid::new_v4();
        let err = f.service.send_request(user, user).await.unwrap_err();
        assert!(matches!(err, SocialError::SelfRequest));
    }

    #[tokio::test]
    async fn accepting_creates_one_ordered_friendship() {
        let f = fixture();
        let alice = named_user(&f, "alice").await;
        let bob = named_user(&f, "bob").await;

        let request = f.service.send_request(alice, bob).await.unwrap();
        f.service
            .respond_to_request(bob, request.id, true)
            .await
            .unwrap();

        let (lo, hi) = ordered_pair(alice, bob);
        assert_eq!(f.social.friendships(), vec![(lo, hi)]);
        // Both sides see each other.
        assert_eq!(f.social.friend_ids(alice).await.unwrap(), vec![bob]);
        assert_eq!(f.social.friend_ids(bob).await.unwrap(), vec![alice]);
    }

    #[tokio::test]
    async fn declining_leaves_no_friendship() {
        let f = fixture();
        let alice = named_user(&f, "alice").await;
        let bob = named_user(&f, "bob").await;

        let request = f.service.send_request(alice, bob).await.unwrap();
        f.service
            .respond_to_request(bob, request.id, false)
            .await
            .unwrap();

        assert!(f.social.friendships().is_empty());
        assert!(f.service.pending_requests(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_receiver_can_respond() {
        let f = fixture();
        let alice = named_user(&f, "alice").await;
        let bob = named_user(&f, "bob").await;

        let request = f.service.send_request(alice, bob).await.unwrap();
        let err = f
            .service
            .respond_to_request(alice, request.id, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SocialError::Persistence(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn removed_friends_disappear_from_both_sides() {
        let f = fixture();
        let alice = named_user(&f, "alice").await;
        let bob = named_user(&f, "bob").await;
        let request = f.service.send_request(alice, bob).await.unwrap();
        f.service
            .respond_to_request(bob, request.id, true)
            .await
            .unwrap();

        f.service.remove_friend(bob, alice).await.unwrap();
        assert!(f.social.friend_ids(alice).await.unwrap().is_empty());
        assert!(f.social.friend_ids(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leaderboard_carries_stats_and_sorts_by_minutes() {
        let f = fixture();
        let me = named_user(&f, "me").await;
        let alice = named_user(&f, "alice").await;
        let bob = named_user(&f, "bob").await;
        for friend in [alice, bob] {
            let request = f.service.send_request(friend, me).await.unwrap();
            f.service
                .respond_to_request(me, request.id, true)
                .await
                .unwrap();
        }

        let now = Utc::now();
        f.sessions
            .insert_session(NewReadingSession {
                user_id: bob,
                book_id: Uuid::new_v4(),
                start_time: now - Duration::hours(2),
                end_time: now - Duration::hours(1),
                duration_minutes: 60,
                starting_page: 0,
                ending_page: 40,
            })
            .await
            .unwrap();
        f.streaks
            .upsert_day(DailyStreakUpsert {
                user_id: bob,
                date: now.date_naive(),
                minutes_read: 60,
                goal_met: true,
            })
            .await
            .unwrap();

        let friends = f.service.friends_with_stats(me).await.unwrap();
        assert_eq!(friends.len(), 2);
        assert_eq!(friends[0].username, "bob");
        assert_eq!(friends[0].weekly_minutes, 60);
        assert_eq!(friends[0].current_streak, 1);
        assert_eq!(friends[1].weekly_minutes, 0);
    }

    #[tokio::test]
    async fn search_reports_relationship_state() {
        let f = fixture();
        let me = named_user(&f, "me").await;
        let alice = named_user(&f, "alice_reads").await;
        let bob = named_user(&f, "bob_reads").await;

        let request = f.service.send_request(me, alice).await.unwrap();
        f.service
            .respond_to_request(alice, request.id, true)
            .await
            .unwrap();
        f.service.send_request(me, bob).await.unwrap();

        let mut results = f.service.search_users(me, "reads").await.unwrap();
        results.sort_by(|a, b| a.username.cmp(&b.username));
        assert_eq!(results.len(), 2);
        assert!(results[0].is_friend);
        assert!(!results[1].is_friend);
        assert_eq!(
            results[1].request_status,
            Some(FriendRequestStatus::Pending)
        );
    }

    #[tokio::test]
    async fn blank_search_terms_return_nothing() {
        let f = fixture();
        let me = named_user(&f, "me").await;
        assert!(f.service.search_users(me, "   ").await.unwrap().is_empty());
    }
}
