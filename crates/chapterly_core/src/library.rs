//! crates/chapterly_core/src/library.rs
//!
//! The library ledger: the set of books a user has added, their reading
//! status, and page progress. Status transitions stamp the forward-looking
//! timestamps and keep the derived percent-complete consistent.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{BookMetadata, LibraryEntry, ReadingStatus};
use crate::ports::{LibraryEntryChanges, LibraryStore, NewLibraryEntry, PortError};

/// Errors surfaced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// The user already has a library entry for this catalog book.
    #[error("this book is already in the library")]
    DuplicateEntry,

    /// A page number past the end of the book.
    #[error("page {page} is past the end of a {total_pages}-page book")]
    InvalidPage { page: u32, total_pages: u32 },

    #[error(transparent)]
    Persistence(#[from] PortError),
}

/// Percent complete, derived from the page position.
///
/// Whole-number rounding; a book with no page count reports 0 regardless of
/// position. Capped at 100.
pub fn progress_percent(current_page: u32, total_pages: u32) -> u8 {
    if total_pages == 0 {
        return 0;
    }
    let pct = (current_page as f64 / total_pages as f64) * 100.0;
    pct.round().min(100.0) as u8
}

/// Owns the user's library entries. All operations take the acting user id
/// explicitly; the ledger holds no ambient user state.
#[derive(Clone)]
pub struct LibraryLedger {
    store: Arc<dyn LibraryStore>,
}

impl LibraryLedger {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Adds a catalog book to the user's library with an initial status.
    ///
    /// Page progress and timestamps are pre-populated consistently with the
    /// status: `read` enters fully finished, `reading` stamps the start date,
    /// `want-to-read` starts from zero. Fails with
    /// [`LibraryError::DuplicateEntry`] when the book is already present.
    pub async fn add_book(
        &self,
        user_id: Uuid,
        book: BookMetadata,
        status: ReadingStatus,
    ) -> Result<LibraryEntry, LibraryError> {
        let now = Utc::now();
        let (current_page, date_started, date_finished) = match status {
            ReadingStatus::Read => (book.total_pages, None, Some(now)),
            ReadingStatus::Reading => (0, Some(now), None),
            ReadingStatus::WantToRead => (0, None, None),
        };
        let progress = progress_percent(current_page, book.total_pages);

        let entry = self
            .store
            .insert_entry(NewLibraryEntry {
                user_id,
                book,
                status,
                current_page,
                progress,
                date_added: now,
                date_started,
                date_finished,
            })
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => LibraryError::DuplicateEntry,
                other => LibraryError::Persistence(other),
            })?;

        info!(%user_id, entry_id = %entry.id, %status, "added book to library");
        Ok(entry)
    }

    pub async fn entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
    ) -> Result<LibraryEntry, LibraryError> {
        Ok(self.store.get_entry(user_id, entry_id).await?)
    }

    /// Moves an entry to a new status.
    ///
    /// Entering `reading` from another status stamps the start date; entering
    /// `read` from another status stamps the finish date and forces the page
    /// position to the end of the book. Moving to `want-to-read` changes the
    /// status only: page progress and past timestamps are preserved.
    pub async fn update_status(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        new_status: ReadingStatus,
    ) -> Result<LibraryEntry, LibraryError> {
        let entry = self.store.get_entry(user_id, entry_id).await?;
        let now = Utc::now();

        let mut changes = LibraryEntryChanges {
            status: Some(new_status),
            ..Default::default()
        };
        match new_status {
            ReadingStatus::Reading if entry.status != ReadingStatus::Reading => {
                changes.date_started = Some(now);
            }
            ReadingStatus::Read if entry.status != ReadingStatus::Read => {
                changes.date_finished = Some(now);
                changes.current_page = Some(entry.book.total_pages);
                changes.progress = Some(progress_percent(
                    entry.book.total_pages,
                    entry.book.total_pages,
                ));
            }
            _ => {}
        }

        self.store.update_entry(user_id, entry_id, changes.clone()).await?;
        debug!(%user_id, %entry_id, %new_status, "updated reading status");
        Ok(apply_changes(entry, changes))
    }

    /// Records a new page position.
    ///
    /// Recomputes the derived percent and applies the transition side
    /// effects: reaching the last page completes the book, and the first
    /// page of a `want-to-read` book moves it to `reading`.
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        new_current_page: u32,
    ) -> Result<LibraryEntry, LibraryError> {
        let entry = self.store.get_entry(user_id, entry_id).await?;
        let total_pages = entry.book.total_pages;
        if new_current_page > total_pages {
            return Err(LibraryError::InvalidPage {
                page: new_current_page,
                total_pages,
            });
        }

        let now = Utc::now();
        let mut changes = LibraryEntryChanges {
            current_page: Some(new_current_page),
            progress: Some(progress_percent(new_current_page, total_pages)),
            ..Default::default()
        };
        if new_current_page >= total_pages {
            changes.status = Some(ReadingStatus::Read);
            changes.date_finished = Some(now);
        } else if entry.status == ReadingStatus::WantToRead && new_current_page > 0 {
            changes.status = Some(ReadingStatus::Reading);
            changes.date_started = Some(now);
        }

        self.store.update_entry(user_id, entry_id, changes.clone()).await?;
        debug!(%user_id, %entry_id, new_current_page, "updated page progress");
        Ok(apply_changes(entry, changes))
    }

    /// Hard-deletes the entry. Reading sessions recorded against it stay in
    /// the history.
    pub async fn remove_book(&self, user_id: Uuid, entry_id: Uuid) -> Result<(), LibraryError> {
        self.store.delete_entry(user_id, entry_id).await?;
        info!(%user_id, %entry_id, "removed book from library");
        Ok(())
    }

    pub async fn list_by_status(
        &self,
        user_id: Uuid,
        status: ReadingStatus,
    ) -> Result<Vec<LibraryEntry>, LibraryError> {
        Ok(self.store.list_by_status(user_id, status).await?)
    }
}

/// Mirrors the store's partial update onto an already-fetched entry, so
/// mutators can hand the updated record back without a second round trip.
fn apply_changes(mut entry: LibraryEntry, changes: LibraryEntryChanges) -> LibraryEntry {
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
    entry
}
