//! crates/chapterly_core/src/sessions.rs
//!
//! The session recorder: append-only reading sessions and the time
//! aggregates derived from them. Aggregate reads feed informational
//! displays only, so a failed fetch degrades to zero instead of erroring.

use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ReadingSession;
use crate::ports::{NewReadingSession, PortError, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Caller-supplied values violate the session's documented bounds.
    #[error("invalid reading session: {0}")]
    InvalidSession(&'static str),

    #[error(transparent)]
    Persistence(#[from] PortError),
}

/// Whole minutes elapsed between two instants, rounded down.
/// The caller guarantees `end >= start`.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    ((end - start).num_seconds() / 60) as u32
}

/// Validates the raw fields of a session before anything is persisted.
pub fn validate_session(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    starting_page: u32,
    ending_page: u32,
) -> Result<(), SessionError> {
    if end_time < start_time {
        return Err(SessionError::InvalidSession("end time precedes start time"));
    }
    if ending_page < starting_page {
        return Err(SessionError::InvalidSession(
            "ending page precedes starting page",
        ));
    }
    Ok(())
}

/// Owns the immutable reading-session log.
#[derive(Clone)]
pub struct SessionRecorder {
    store: Arc<dyn SessionStore>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Persists one timed reading interval. Validation happens before the
    /// store is touched; an invalid session persists nothing.
    pub async fn record_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        starting_page: u32,
        ending_page: u32,
    ) -> Result<ReadingSession, SessionError> {
        validate_session(start_time, end_time, starting_page, ending_page)?;

        let session = self
            .store
            .insert_session(NewReadingSession {
                user_id,
                book_id,
                start_time,
                end_time,
                duration_minutes: duration_minutes(start_time, end_time),
                starting_page,
                ending_page,
            })
            .await?;

        debug!(
            %user_id,
            %book_id,
            minutes = session.duration_minutes,
            "recorded reading session"
        );
        Ok(session)
    }

    /// Total minutes read in `[from, to)`. A failed fetch reports 0.
    pub async fn minutes_in_window(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> u32 {
        match self.store.minutes_between(user_id, from, to).await {
            Ok(minutes) => minutes,
            Err(e) => {
                warn!(%user_id, error = %e, "failed to sum reading minutes; reporting 0");
                0
            }
        }
    }

    /// Minutes read between midnight today and midnight tomorrow (UTC).
    pub async fn minutes_today(&self, user_id: Uuid) -> u32 {
        let today = Utc::now().date_naive();
        let start = today.and_time(NaiveTime::MIN).and_utc();
        let end = (today + Days::new(1)).and_time(NaiveTime::MIN).and_utc();
        self.minutes_in_window(user_id, start, end).await
    }

    /// Minutes read over the trailing seven days.
    pub async fn minutes_this_week(&self, user_id: Uuid) -> u32 {
        let now = Utc::now();
        self.minutes_in_window(user_id, now - Duration::days(7), now).await
    }
}
