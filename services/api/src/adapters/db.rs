//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the store ports from the `core` crate (plus the
//! service-local `AuthStore`). It handles all interactions with the
//! PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use chapterly_core::domain::{
    BookMetadata, DailyStreakRecord, FriendRequest, FriendRequestStatus, LibraryEntry,
    ReadingSession, ReadingStatus, UserProfile,
};
use chapterly_core::ports::{
    DailyStreakUpsert, LibraryEntryChanges, LibraryStore, NewLibraryEntry, NewReadingSession,
    PortError, PortResult, ProfileChanges, ProfileStore, SessionStore, SocialStore, StreakStore,
};

use crate::web::auth::{AuthCredentials, AuthStore, AuthUser};

const UNIQUE_VIOLATION: &str = "23505";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps a unique-constraint violation to `Conflict`; everything else stays
/// an unexpected store failure.
fn conflict_or_unexpected(e: sqlx::Error, conflict_msg: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            PortError::Conflict(conflict_msg.to_string())
        }
        _ => unexpected(e),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_BOOK_COLUMNS: &str = "id, user_id, book_id, title, author, cover_url, total_pages, \
     current_page, progress, status, description, published_date, categories, isbn, \
     date_added, date_started, date_finished";

#[derive(FromRow)]
struct UserBookRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: String,
    title: String,
    author: String,
    cover_url: String,
    total_pages: i32,
    current_page: i32,
    progress: i32,
    status: String,
    description: Option<String>,
    published_date: Option<String>,
    categories: Vec<String>,
    isbn: Option<String>,
    date_added: DateTime<Utc>,
    date_started: Option<DateTime<Utc>>,
    date_finished: Option<DateTime<Utc>>,
}

impl UserBookRecord {
    fn to_domain(self) -> PortResult<LibraryEntry> {
        let status = ReadingStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown reading status '{}'", self.status))
        })?;
        Ok(LibraryEntry {
            id: self.id,
            user_id: self.user_id,
            book: BookMetadata {
                id: self.book_id,
                title: self.title,
                author: self.author,
                cover_url: self.cover_url,
                total_pages: self.total_pages as u32,
                description: self.description,
                published_date: self.published_date,
                categories: self.categories,
                isbn: self.isbn,
            },
            status,
            current_page: self.current_page as u32,
            progress: self.progress as u8,
            date_added: self.date_added,
            date_started: self.date_started,
            date_finished: self.date_finished,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i32,
    starting_page: i32,
    ending_page: i32,
}

impl SessionRecord {
    fn to_domain(self) -> ReadingSession {
        ReadingSession {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes as u32,
            starting_page: self.starting_page as u32,
            ending_page: self.ending_page as u32,
        }
    }
}

#[derive(FromRow)]
struct StreakRecord {
    id: Uuid,
    user_id: Uuid,
    date: NaiveDate,
    minutes_read: i32,
    goal_met: bool,
}

impl StreakRecord {
    fn to_domain(self) -> DailyStreakRecord {
        DailyStreakRecord {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            minutes_read: self.minutes_read as u32,
            goal_met: self.goal_met,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    username: Option<String>,
    daily_goal_minutes: i32,
    onboarding_completed: bool,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username,
            daily_goal_minutes: self.daily_goal_minutes as u32,
            onboarding_completed: self.onboarding_completed,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct FriendRequestRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    sender_username: Option<String>,
    receiver_username: Option<String>,
}

impl FriendRequestRecord {
    fn to_domain(self) -> PortResult<FriendRequest> {
        let status = FriendRequestStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("unknown request status '{}'", self.status))
        })?;
        Ok(FriendRequest {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            status,
            created_at: self.created_at,
            sender_username: self.sender_username,
            receiver_username: self.receiver_username,
        })
    }
}

//=========================================================================================
// `LibraryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LibraryStore for PgStore {
    async fn insert_entry(&self, entry: NewLibraryEntry) -> PortResult<LibraryEntry> {
        let sql = format!(
            "INSERT INTO user_books ({USER_BOOK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {USER_BOOK_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserBookRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.user_id)
            .bind(&entry.book.id)
            .bind(&entry.book.title)
            .bind(&entry.book.author)
            .bind(&entry.book.cover_url)
            .bind(entry.book.total_pages as i32)
            .bind(entry.current_page as i32)
            .bind(entry.progress as i32)
            .bind(entry.status.as_str())
            .bind(&entry.book.description)
            .bind(&entry.book.published_date)
            .bind(&entry.book.categories)
            .bind(&entry.book.isbn)
            .bind(entry.date_added)
            .bind(entry.date_started)
            .bind(entry.date_finished)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "book already in library"))?;
        record.to_domain()
    }

    async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<LibraryEntry> {
        let sql =
            format!("SELECT {USER_BOOK_COLUMNS} FROM user_books WHERE id = $1 AND user_id = $2");
        let record = sqlx::query_as::<_, UserBookRecord>(&sql)
            .bind(entry_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Library entry {} not found", entry_id))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn update_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        changes: LibraryEntryChanges,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE user_books SET \
                 status = COALESCE($3, status), \
                 current_page = COALESCE($4, current_page), \
                 progress = COALESCE($5, progress), \
                 date_started = COALESCE($6, date_started), \
                 date_finished = COALESCE($7, date_finished) \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.current_page.map(|p| p as i32))
        .bind(changes.progress.map(|p| p as i32))
        .bind(changes.date_started)
        .bind(changes.date_finished)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Library entry {} not found",
                entry_id
            )));
        }
        Ok(())
    }

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM user_books WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Library entry {} not found",
                entry_id
            )));
        }
        Ok(())
    }

    async fn list_by_status(
        &self,
        user_id: Uuid,
        status: ReadingStatus,
    ) -> PortResult<Vec<LibraryEntry>> {
        let sql = format!(
            "SELECT {USER_BOOK_COLUMNS} FROM user_books \
             WHERE user_id = $1 AND status = $2 ORDER BY date_added DESC"
        );
        let records = sqlx::query_as::<_, UserBookRecord>(&sql)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: NewReadingSession) -> PortResult<ReadingSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO reading_sessions \
                 (id, user_id, book_id, start_time, end_time, duration_minutes, \
                  starting_page, ending_page) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, user_id, book_id, start_time, end_time, duration_minutes, \
                 starting_page, ending_page",
        )
        .bind(Uuid::new_v4())
        .bind(session.user_id)
        .bind(session.book_id)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration_minutes as i32)
        .bind(session.starting_page as i32)
        .bind(session.ending_page as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn minutes_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<u32> {
        let minutes = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM reading_sessions \
             WHERE user_id = $1 AND start_time >= $2 AND start_time < $3",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(minutes.max(0) as u32)
    }
}

//=========================================================================================
// `StreakStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StreakStore for PgStore {
    async fn upsert_day(&self, record: DailyStreakUpsert) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_streaks (id, user_id, date, minutes_read, goal_met) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, date) DO UPDATE \
                 SET minutes_read = EXCLUDED.minutes_read, goal_met = EXCLUDED.goal_met",
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(record.date)
        .bind(record.minutes_read as i32)
        .bind(record.goal_met)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_days(&self, user_id: Uuid) -> PortResult<Vec<DailyStreakRecord>> {
        let records = sqlx::query_as::<_, StreakRecord>(
            "SELECT id, user_id, date, minutes_read, goal_met FROM user_streaks \
             WHERE user_id = $1 ORDER BY date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `ProfileStore` Trait Implementation
//=========================================================================================

const PROFILE_COLUMNS: &str =
    "id, username, daily_goal_minutes, onboarding_completed, avatar_url, created_at, updated_at";

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1");
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn insert_profile(
        &self,
        user_id: Uuid,
        daily_goal_minutes: u32,
    ) -> PortResult<UserProfile> {
        let sql = format!(
            "INSERT INTO user_profiles (id, daily_goal_minutes) VALUES ($1, $2) \
             RETURNING {PROFILE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .bind(daily_goal_minutes as i32)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "profile already exists"))?;
        Ok(record.to_domain())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> PortResult<UserProfile> {
        let sql = format!(
            "UPDATE user_profiles SET \
                 username = COALESCE($2, username), \
                 daily_goal_minutes = COALESCE($3, daily_goal_minutes), \
                 onboarding_completed = COALESCE($4, onboarding_completed), \
                 avatar_url = COALESCE($5, avatar_url), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .bind(changes.username)
            .bind(changes.daily_goal_minutes.map(|g| g as i32))
            .bind(changes.onboarding_completed)
            .bind(changes.avatar_url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Profile {} not found", user_id))
                }
                _ => conflict_or_unexpected(e, "username already taken"),
            })?;
        Ok(record.to_domain())
    }

    async fn username_taken(&self, username: &str, exclude: Uuid) -> PortResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_profiles WHERE username = $1 AND id <> $2)",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(taken)
    }

    async fn search_by_username(
        &self,
        term: &str,
        exclude: Uuid,
        limit: u32,
    ) -> PortResult<Vec<UserProfile>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles \
             WHERE username ILIKE '%' || $1 || '%' AND id <> $2 \
             ORDER BY username LIMIT $3"
        );
        let records = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(term)
            .bind(exclude)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `SocialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SocialStore for PgStore {
    async fn insert_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> PortResult<FriendRequest> {
        let record = sqlx::query_as::<_, FriendRequestRecord>(
            "INSERT INTO friend_requests (id, sender_id, receiver_id, status) \
             VALUES ($1, $2, $3, 'pending') \
             RETURNING id, sender_id, receiver_id, status, created_at, \
                 NULL::text AS sender_username, NULL::text AS receiver_username",
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn pending_requests(&self, user_id: Uuid) -> PortResult<Vec<FriendRequest>> {
        let records = sqlx::query_as::<_, FriendRequestRecord>(
            "SELECT fr.id, fr.sender_id, fr.receiver_id, fr.status, fr.created_at, \
                 s.username AS sender_username, r.username AS receiver_username \
             FROM friend_requests fr \
             LEFT JOIN user_profiles s ON s.id = fr.sender_id \
             LEFT JOIN user_profiles r ON r.id = fr.receiver_id \
             WHERE (fr.sender_id = $1 OR fr.receiver_id = $1) AND fr.status = 'pending' \
             ORDER BY fr.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn set_request_status(
        &self,
        request_id: Uuid,
        receiver_id: Uuid,
        status: FriendRequestStatus,
    ) -> PortResult<Uuid> {
        let sender_id = sqlx::query_scalar::<_, Uuid>(
            "UPDATE friend_requests SET status = $3 \
             WHERE id = $1 AND receiver_id = $2 RETURNING sender_id",
        )
        .bind(request_id)
        .bind(receiver_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        sender_id.ok_or_else(|| {
            PortError::NotFound(format!("Friend request {} not found", request_id))
        })
    }

    async fn request_between(
        &self,
        a: Uuid,
        b: Uuid,
    ) -> PortResult<Option<FriendRequestStatus>> {
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM friend_requests \
             WHERE (sender_id = $1 AND receiver_id = $2) \
                OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        match status {
            None => Ok(None),
            Some(s) => FriendRequestStatus::parse(&s)
                .map(Some)
                .ok_or_else(|| PortError::Unexpected(format!("unknown request status '{s}'"))),
        }
    }

    async fn insert_friendship(&self, user1_id: Uuid, user2_id: Uuid) -> PortResult<()> {
        sqlx::query("INSERT INTO friendships (id, user1_id, user2_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(user1_id)
            .bind(user2_id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "friendship already exists"))?;
        Ok(())
    }

    async fn delete_friendship(&self, user1_id: Uuid, user2_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM friendships WHERE user1_id = $1 AND user2_id = $2")
            .bind(user1_id)
            .bind(user2_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn friend_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT CASE WHEN user1_id = $1 THEN user2_id ELSE user1_id END \
             FROM friendships WHERE user1_id = $1 OR user2_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(ids)
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for PgStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<AuthUser> {
        let record = sqlx::query_as::<_, (Uuid, String)>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "email already registered"))?;
        Ok(AuthUser {
            user_id: record.0,
            email: record.1,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<AuthCredentials> {
        let record = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("User with email {} not found", email))
            }
            _ => unexpected(e),
        })?;
        Ok(AuthCredentials {
            user_id: record.0,
            email: record.1,
            hashed_password: record.2,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
