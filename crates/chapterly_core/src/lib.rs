pub mod domain;
pub mod library;
pub mod ports;
pub mod profile;
pub mod sessions;
pub mod social;
pub mod streaks;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use domain::{
    BookMetadata, DailyStreakRecord, Friend, FriendRequest, FriendRequestStatus, LibraryEntry,
    ReadingSession, ReadingStatus, StreakDay, UserProfile, UserSearchResult,
};
pub use library::{progress_percent, LibraryError, LibraryLedger};
pub use ports::{
    BookCatalog, LibraryStore, PortError, PortResult, ProfileStore, SessionStore, SocialStore,
    StreakStore,
};
pub use profile::{ProfileError, ProfileService};
pub use sessions::{SessionError, SessionRecorder};
pub use social::{SocialError, SocialService};
pub use streaks::{StreakEngine, StreakError};
pub use tracker::{ReadingLog, ReadingTracker, TrackerError};
