//! crates/chapterly_core/src/tracker.rs
//!
//! The end-of-session composite: "record both the new page and the time
//! spent getting there", plus the streak refresh that follows. The steps
//! are not atomic with each other; the error type says exactly how far the
//! sequence got so a caller can retry the remainder instead of re-running
//! the whole thing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::{LibraryEntry, ReadingSession};
use crate::library::{LibraryError, LibraryLedger};
use crate::sessions::{self, SessionError, SessionRecorder};
use crate::streaks::{StreakEngine, StreakError};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The entry could not be loaded or the ending page is out of bounds.
    /// Nothing was persisted.
    #[error(transparent)]
    Book(#[from] LibraryError),

    /// The session was invalid or failed to persist. Nothing was persisted.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session row exists but the page-progress update failed.
    /// Retry with a plain progress update; do not re-log the session.
    #[error("session {session_id} was saved, but updating book progress failed: {source}")]
    Progress {
        session_id: Uuid,
        #[source]
        source: LibraryError,
    },

    /// The session and progress writes landed but the streak upsert failed.
    /// Retry with a plain streak upsert; do not re-log the session.
    #[error("session {session_id} was saved, but updating the streak failed: {source}")]
    Streak {
        session_id: Uuid,
        #[source]
        source: StreakError,
    },
}

/// What a completed log-reading call hands back to the display layer.
#[derive(Debug, Clone)]
pub struct ReadingLog {
    pub session: ReadingSession,
    pub entry: LibraryEntry,
    pub today_minutes: u32,
}

/// Ties the ledger, recorder and streak engine together for the one flow
/// that touches all three.
#[derive(Clone)]
pub struct ReadingTracker {
    ledger: LibraryLedger,
    recorder: SessionRecorder,
    streaks: StreakEngine,
}

impl ReadingTracker {
    pub fn new(ledger: LibraryLedger, recorder: SessionRecorder, streaks: StreakEngine) -> Self {
        Self {
            ledger,
            recorder,
            streaks,
        }
    }

    /// Records a finished reading session end to end: validate, persist the
    /// immutable session, move the book's page progress, then refresh
    /// today's streak record against the user's current goal.
    ///
    /// All validation happens before the first write. After that the steps
    /// run in order and a failure leaves the earlier writes in place; the
    /// returned error names the step to retry.
    #[allow(clippy::too_many_arguments)]
    pub async fn log_reading(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        starting_page: u32,
        ending_page: u32,
        daily_goal: u32,
    ) -> Result<ReadingLog, TrackerError> {
        let entry = self.ledger.entry(user_id, entry_id).await?;
        if ending_page > entry.book.total_pages {
            return Err(TrackerError::Book(LibraryError::InvalidPage {
                page: ending_page,
                total_pages: entry.book.total_pages,
            }));
        }
        sessions::validate_session(start_time, end_time, starting_page, ending_page)?;

        let session = self
            .recorder
            .record_session(
                user_id,
                entry_id,
                start_time,
                end_time,
                starting_page,
                ending_page,
            )
            .await?;

        let entry = self
            .ledger
            .update_progress(user_id, entry_id, ending_page)
            .await
            .map_err(|source| TrackerError::Progress {
                session_id: session.id,
                source,
            })?;

        // The streak record holds the day's cumulative total, not this
        // session's share, so recompute from the log before upserting.
        let today_minutes = self.recorder.minutes_today(user_id).await;
        self.streaks
            .upsert_today(user_id, today_minutes, daily_goal)
            .await
            .map_err(|source| TrackerError::Streak {
                session_id: session.id,
                source,
            })?;

        info!(
            %user_id,
            %entry_id,
            minutes = session.duration_minutes,
            today_minutes,
            "logged reading session"
        );
        Ok(ReadingLog {
            session,
            entry,
            today_minutes,
        })
    }
}
