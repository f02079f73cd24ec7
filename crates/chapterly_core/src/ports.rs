//! crates/chapterly_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or the book catalog API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    BookMetadata, DailyStreakRecord, FriendRequest, FriendRequestStatus, LibraryEntry,
    ReadingSession, ReadingStatus, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g.,
/// database, network) behind the handful of conditions the core reacts to.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Partial-update carriers
//=========================================================================================
// The store ports take explicit field-set structs rather than whole records,
// so a mutation only touches the columns the core actually decided on. Any
// schema drift stays inside the adapter that maps these.

/// A library entry as the core wants it created; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewLibraryEntry {
    pub user_id: Uuid,
    pub book: BookMetadata,
    pub status: ReadingStatus,
    pub current_page: u32,
    pub progress: u8,
    pub date_added: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
}

/// Fields of a library entry a single mutation may change. `None` means
/// "leave as stored". Timestamps are only ever set, never cleared.
#[derive(Debug, Clone, Default)]
pub struct LibraryEntryChanges {
    pub status: Option<ReadingStatus>,
    pub current_page: Option<u32>,
    pub progress: Option<u8>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
}

/// A reading session as the core wants it persisted.
#[derive(Debug, Clone)]
pub struct NewReadingSession {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub starting_page: u32,
    pub ending_page: u32,
}

/// The per-day streak upsert payload. Keyed on (user_id, date); the stored
/// record is replaced wholesale, not incremented.
#[derive(Debug, Clone)]
pub struct DailyStreakUpsert {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub minutes_read: u32,
    pub goal_met: bool,
}

/// Fields of a profile a single mutation may change.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub daily_goal_minutes: Option<u32>,
    pub onboarding_completed: Option<bool>,
    pub avatar_url: Option<String>,
}

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Fails with [`PortError::Conflict`] when the user already has an entry
    /// for the same catalog book id.
    async fn insert_entry(&self, entry: NewLibraryEntry) -> PortResult<LibraryEntry>;

    async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<LibraryEntry>;

    async fn update_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        changes: LibraryEntryChanges,
    ) -> PortResult<()>;

    /// Hard delete. The entry's reading sessions are left in place.
    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<()>;

    /// Entries with the given status, newest first by date added.
    async fn list_by_status(
        &self,
        user_id: Uuid,
        status: ReadingStatus,
    ) -> PortResult<Vec<LibraryEntry>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: NewReadingSession) -> PortResult<ReadingSession>;

    /// Sum of `duration_minutes` over the user's sessions whose start time
    /// falls in `[from, to)`.
    async fn minutes_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<u32>;
}

#[async_trait]
pub trait StreakStore: Send + Sync {
    /// Insert-or-replace keyed on (user_id, date).
    async fn upsert_day(&self, record: DailyStreakUpsert) -> PortResult<()>;

    /// All of the user's daily records, newest first.
    async fn list_days(&self, user_id: Uuid) -> PortResult<Vec<DailyStreakRecord>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>>;

    /// Creates the profile row with the given goal and everything else at
    /// its defaults. Fails with [`PortError::Conflict`] if it already exists.
    async fn insert_profile(&self, user_id: Uuid, daily_goal_minutes: u32)
        -> PortResult<UserProfile>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> PortResult<UserProfile>;

    /// Whether any user other than `exclude` holds this username.
    async fn username_taken(&self, username: &str, exclude: Uuid) -> PortResult<bool>;

    /// Profiles whose username contains `term`, excluding the viewer's own.
    async fn search_by_username(
        &self,
        term: &str,
        exclude: Uuid,
        limit: u32,
    ) -> PortResult<Vec<UserProfile>>;
}

#[async_trait]
pub trait SocialStore: Send + Sync {
    async fn insert_request(&self, sender_id: Uuid, receiver_id: Uuid)
        -> PortResult<FriendRequest>;

    /// Pending requests involving the user (either direction), newest first,
    /// with usernames joined in.
    async fn pending_requests(&self, user_id: Uuid) -> PortResult<Vec<FriendRequest>>;

    /// Updates the request's status. Only the request's receiver may do this;
    /// anything else is NotFound. Returns the sender's id.
    async fn set_request_status(
        &self,
        request_id: Uuid,
        receiver_id: Uuid,
        status: FriendRequestStatus,
    ) -> PortResult<Uuid>;

    /// The most recent request between the two users, in either direction.
    async fn request_between(&self, a: Uuid, b: Uuid)
        -> PortResult<Option<FriendRequestStatus>>;

    /// The pair must already be in ascending order; one row per friendship.
    async fn insert_friendship(&self, user1_id: Uuid, user2_id: Uuid) -> PortResult<()>;

    async fn delete_friendship(&self, user1_id: Uuid, user2_id: Uuid) -> PortResult<()>;

    async fn friend_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;
}

//=========================================================================================
// Book Catalog Port
//=========================================================================================

#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Free-text search, best effort; may return an empty list.
    async fn search(&self, query: &str) -> PortResult<Vec<BookMetadata>>;

    /// Single-volume lookup; unknown ids map to `None`.
    async fn by_id(&self, volume_id: &str) -> PortResult<Option<BookMetadata>>;

    async fn by_isbn(&self, isbn: &str) -> PortResult<Option<BookMetadata>>;

    /// A short list of well-known books, optionally within a category.
    async fn popular(&self, category: Option<&str>) -> PortResult<Vec<BookMetadata>>;
}
