//! In-memory implementations of the store ports, shared by the service test
//! modules. Mutations happen under a plain mutex; the `fail_*` toggles let
//! tests exercise the degradation paths without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    BookMetadata, DailyStreakRecord, FriendRequest, FriendRequestStatus, LibraryEntry,
    ReadingSession, ReadingStatus, UserProfile,
};
use crate::ports::{
    DailyStreakUpsert, LibraryEntryChanges, LibraryStore, NewLibraryEntry, NewReadingSession,
    PortError, PortResult, ProfileChanges, ProfileStore, SessionStore, SocialStore, StreakStore,
};

pub(crate) fn sample_book(id: &str, total_pages: u32) -> BookMetadata {
    BookMetadata {
        id: id.to_string(),
        title: format!("Book {id}"),
        author: "Test Author".to_string(),
        cover_url: "https://covers.example/1.jpg".to_string(),
        total_pages,
        description: None,
        published_date: None,
        categories: Vec::new(),
        isbn: None,
    }
}

//=========================================================================================
// Library
//=========================================================================================

pub(crate) struct MemoryLibraryStore {
    entries: Mutex<Vec<LibraryEntry>>,
    fail_updates: AtomicBool,
}

impl MemoryLibraryStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub(crate) fn get(&self, entry_id: Uuid) -> Option<LibraryEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
    }

    pub(crate) fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LibraryStore for MemoryLibraryStore {
    async fn insert_entry(&self, entry: NewLibraryEntry) -> PortResult<LibraryEntry> {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .iter()
            .any(|e| e.user_id == entry.user_id && e.book.id == entry.book.id)
        {
            return Err(PortError::Conflict("duplicate library entry".to_string()));
        }
        let stored = LibraryEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            book: entry.book,
            status: entry.status,
            current_page: entry.current_page,
            progress: entry.progress,
            date_added: entry.date_added,
            date_started: entry.date_started,
            date_finished: entry.date_finished,
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn get_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<LibraryEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == entry_id && e.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("library entry {entry_id}")))
    }

    async fn update_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        changes: LibraryEntryChanges,
    ) -> PortResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("simulated update failure".to_string()));
        }
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == entry_id && e.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("library entry {entry_id}")))?;
        if let Some(status) = changes.status {
            entry.status = status;
        }
        if let Some(page) = changes.current_page {
            entry.current_page = page;
        }
        if let Some(progress) = changes.progress {
            entry.progress = progress;
        }
        if let Some(ts) = changes.date_started {
            entry.date_started = Some(ts);
        }
        if let Some(ts) = changes.date_finished {
            entry.date_finished = Some(ts);
        }
        Ok(())
    }

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<()> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.id == entry_id && e.user_id == user_id));
        if entries.len() == before {
            return Err(PortError::NotFound(format!("library entry {entry_id}")));
        }
        Ok(())
    }

    async fn list_by_status(
        &self,
        user_id: Uuid,
        status: ReadingStatus,
    ) -> PortResult<Vec<LibraryEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id && e.status == status)
            .cloned()
            .collect())
    }
}

//=========================================================================================
// Sessions
//=========================================================================================

pub(crate) struct MemorySessionStore {
    sessions: Mutex<Vec<ReadingSession>>,
    fail_reads: AtomicBool,
}

impl MemorySessionStore {
    pub(crate) fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub(crate) fn first_id(&self) -> Option<Uuid> {
        self.sessions.lock().unwrap().first().map(|s| s.id)
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_session(&self, session: NewReadingSession) -> PortResult<ReadingSession> {
        let stored = ReadingSession {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            book_id: session.book_id,
            start_time: session.start_time,
            end_time: session.end_time,
            duration_minutes: session.duration_minutes,
            starting_page: session.starting_page,
            ending_page: session.ending_page,
        };
        self.sessions.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn minutes_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<u32> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("simulated read failure".to_string()));
        }
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.start_time >= from && s.start_time < to)
            .map(|s| s.duration_minutes)
            .sum())
    }
}

//=========================================================================================
// Streaks
//=========================================================================================

pub(crate) struct MemoryStreakStore {
    days: Mutex<Vec<DailyStreakRecord>>,
    fail_reads: AtomicBool,
}

impl MemoryStreakStore {
    pub(crate) fn new() -> Self {
        Self {
            days: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub(crate) fn list(&self, user_id: Uuid) -> Vec<DailyStreakRecord> {
        self.days
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreakStore for MemoryStreakStore {
    async fn upsert_day(&self, record: DailyStreakUpsert) -> PortResult<()> {
        let mut days = self.days.lock().unwrap();
        if let Some(existing) = days
            .iter_mut()
            .find(|d| d.user_id == record.user_id && d.date == record.date)
        {
            existing.minutes_read = record.minutes_read;
            existing.goal_met = record.goal_met;
        } else {
            days.push(DailyStreakRecord {
                id: Uuid::new_v4(),
                user_id: record.user_id,
                date: record.date,
                minutes_read: record.minutes_read,
                goal_met: record.goal_met,
            });
        }
        Ok(())
    }

    async fn list_days(&self, user_id: Uuid) -> PortResult<Vec<DailyStreakRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("simulated read failure".to_string()));
        }
        let mut days: Vec<DailyStreakRecord> = self
            .days
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        days.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(days)
    }
}

//=========================================================================================
// Profiles
//=========================================================================================

pub(crate) struct MemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
}

impl MemoryProfileStore {
    pub(crate) fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<UserProfile>> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn insert_profile(
        &self,
        user_id: Uuid,
        daily_goal_minutes: u32,
    ) -> PortResult<UserProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        if profiles.contains_key(&user_id) {
            return Err(PortError::Conflict(format!("profile {user_id} exists")));
        }
        let now = Utc::now();
        let profile = UserProfile {
            id: user_id,
            username: None,
            daily_goal_minutes,
            onboarding_completed: false,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> PortResult<UserProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("profile {user_id}")))?;
        if let Some(username) = changes.username {
            profile.username = Some(username);
        }
        if let Some(goal) = changes.daily_goal_minutes {
            profile.daily_goal_minutes = goal;
        }
        if let Some(done) = changes.onboarding_completed {
            profile.onboarding_completed = done;
        }
        if let Some(avatar) = changes.avatar_url {
            profile.avatar_url = Some(avatar);
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn username_taken(&self, username: &str, exclude: Uuid) -> PortResult<bool> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .any(|p| p.id != exclude && p.username.as_deref() == Some(username)))
    }

    async fn search_by_username(
        &self,
        term: &str,
        exclude: Uuid,
        limit: u32,
    ) -> PortResult<Vec<UserProfile>> {
        let needle = term.to_lowercase();
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.id != exclude)
            .filter(|p| {
                p.username
                    .as_deref()
                    .map(|u| u.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

//=========================================================================================
// Social
//=========================================================================================

pub(crate) struct MemorySocialStore {
    requests: Mutex<Vec<FriendRequest>>,
    pairs: Mutex<Vec<(Uuid, Uuid)>>,
}

impl MemorySocialStore {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            pairs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn friendships(&self) -> Vec<(Uuid, Uuid)> {
        self.pairs.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialStore for MemorySocialStore {
    async fn insert_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> PortResult<FriendRequest> {
        let request = FriendRequest {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
            sender_username: None,
            receiver_username: None,
        };
        self.requests.lock().unwrap().push(request.clone());
        Ok(request)
    }

    async fn pending_requests(&self, user_id: Uuid) -> PortResult<Vec<FriendRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| {
                r.status == FriendRequestStatus::Pending
                    && (r.sender_id == user_id || r.receiver_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn set_request_status(
        &self,
        request_id: Uuid,
        receiver_id: Uuid,
        status: FriendRequestStatus,
    ) -> PortResult<Uuid> {
        let mut requests = self.requests.lock().unwrap();
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id && r.receiver_id == receiver_id)
            .ok_or_else(|| PortError::NotFound(format!("friend request {request_id}")))?;
        request.status = status;
        Ok(request.sender_id)
    }

    async fn request_between(&self, a: Uuid, b: Uuid) -> PortResult<Option<FriendRequestStatus>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| {
                (r.sender_id == a && r.receiver_id == b)
                    || (r.sender_id == b && r.receiver_id == a)
            })
            .map(|r| r.status))
    }

    async fn insert_friendship(&self, user1_id: Uuid, user2_id: Uuid) -> PortResult<()> {
        let mut pairs = self.pairs.lock().unwrap();
        if pairs.contains(&(user1_id, user2_id)) {
            return Err(PortError::Conflict("friendship exists".to_string()));
        }
        pairs.push((user1_id, user2_id));
        Ok(())
    }

    async fn delete_friendship(&self, user1_id: Uuid, user2_id: Uuid) -> PortResult<()> {
        self.pairs
            .lock()
            .unwrap()
            .retain(|pair| *pair != (user1_id, user2_id));
        Ok(())
    }

    async fn friend_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self
            .pairs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|&(a, b)| {
                if a == user_id {
                    Some(b)
                } else if b == user_id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect())
    }
}
