//! crates/chapterly_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Book metadata as returned by the catalog, copied into a library entry at
/// add time. The catalog is not re-queried afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    /// The catalog's volume id (an opaque string, not one of our uuids).
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_url: String,
    pub total_pages: u32,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub categories: Vec<String>,
    pub isbn: Option<String>,
}

/// Where a book sits in the user's reading life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingStatus {
    Reading,
    Read,
    WantToRead,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Reading => "reading",
            ReadingStatus::Read => "read",
            ReadingStatus::WantToRead => "want-to-read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reading" => Some(ReadingStatus::Reading),
            "read" => Some(ReadingStatus::Read),
            "want-to-read" => Some(ReadingStatus::WantToRead),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One book in one user's library, with status and page progress.
///
/// `progress` is always derived from `current_page` / `book.total_pages`;
/// the two are kept consistent on every mutation.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book: BookMetadata,
    pub status: ReadingStatus,
    pub current_page: u32,
    /// Whole percent, 0-100.
    pub progress: u8,
    pub date_added: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
}

/// One immutable timed interval of reading activity.
#[derive(Debug, Clone)]
pub struct ReadingSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// The library entry this session was read against. Sessions are kept
    /// as history even after the entry itself is removed.
    pub book_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub starting_page: u32,
    pub ending_page: u32,
}

/// The single per-user-per-day aggregate of minutes read and whether the
/// daily goal was met. `goal_met` is a snapshot against the goal in effect
/// when the record was written; it is not recomputed if the goal changes.
#[derive(Debug, Clone)]
pub struct DailyStreakRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub minutes_read: u32,
    pub goal_met: bool,
}

/// One slot of the seven-day streak strip shown on the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakDay {
    /// Single-letter day label, Sunday-first ('S', 'M', 'T', ...).
    pub label: char,
    pub date: NaiveDate,
    pub goal_reached: bool,
    pub minutes_read: u32,
}

/// A user's profile. `username` stays empty until onboarding completes.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: Option<String>,
    pub daily_goal_minutes: u32,
    pub onboarding_completed: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "pending",
            FriendRequestStatus::Accepted => "accepted",
            FriendRequestStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendRequestStatus::Pending),
            "accepted" => Some(FriendRequestStatus::Accepted),
            "declined" => Some(FriendRequestStatus::Declined),
            _ => None,
        }
    }
}

impl std::fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A friend request, with the usernames joined in for display.
#[derive(Debug, Clone)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub sender_username: Option<String>,
    pub receiver_username: Option<String>,
}

/// A confirmed friend together with the stats the leaderboard shows.
#[derive(Debug, Clone)]
pub struct Friend {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub weekly_minutes: u32,
    pub current_streak: u32,
}

/// A username search hit, annotated with the viewer's relationship to it.
#[derive(Debug, Clone)]
pub struct UserSearchResult {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub is_friend: bool,
    pub request_status: Option<FriendRequestStatus>,
}
