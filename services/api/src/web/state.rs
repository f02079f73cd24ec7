//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use chapterly_core::ports::BookCatalog;
use chapterly_core::{
    LibraryLedger, ProfileService, ReadingTracker, SessionRecorder, SocialService, StreakEngine,
};

use crate::config::Config;
use crate::web::auth::AuthStore;

/// The shared application state, created once at startup and passed to all
/// handlers. The core services carry their own store handles; the state is
/// just the wiring surface.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthStore>,
    pub catalog: Arc<dyn BookCatalog>,
    pub ledger: LibraryLedger,
    pub recorder: SessionRecorder,
    pub streaks: StreakEngine,
    pub tracker: ReadingTracker,
    pub profiles: ProfileService,
    pub social: SocialService,
}
