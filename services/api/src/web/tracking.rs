//! services/api/src/web/tracking.rs
//!
//! Axum handlers for reading sessions, time aggregates, and the daily
//! streak. The end-of-timer flow lands on `/sessions/log`, which drives the
//! core's composite operation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use chapterly_core::domain::{ReadingSession, StreakDay};
use chapterly_core::{LibraryError, PortError, SessionError, TrackerError};

use crate::web::library::LibraryEntryDto;
use crate::web::profile::map_profile_error;
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RecordSessionRequest {
    pub book_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub starting_page: u32,
    pub ending_page: u32,
}

#[derive(Serialize, ToSchema)]
pub struct SessionDto {
    pub id: Uuid,
    pub book_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub starting_page: u32,
    pub ending_page: u32,
}

impl From<ReadingSession> for SessionDto {
    fn from(session: ReadingSession) -> Self {
        Self {
            id: session.id,
            book_id: session.book_id,
            start_time: session.start_time,
            end_time: session.end_time,
            duration_minutes: session.duration_minutes,
            starting_page: session.starting_page,
            ending_page: session.ending_page,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ReadingLogDto {
    pub session: SessionDto,
    pub entry: LibraryEntryDto,
    pub today_minutes: u32,
}

#[derive(Serialize, ToSchema)]
pub struct StatsDto {
    pub today_minutes: u32,
    pub weekly_minutes: u32,
}

#[derive(Serialize, ToSchema)]
pub struct StreakDayDto {
    pub day: String,
    pub date: NaiveDate,
    pub goal_reached: bool,
    pub minutes_read: u32,
}

impl From<StreakDay> for StreakDayDto {
    fn from(day: StreakDay) -> Self {
        Self {
            day: day.label.to_string(),
            date: day.date,
            goal_reached: day.goal_reached,
            minutes_read: day.minutes_read,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StreaksDto {
    pub current_streak: u32,
    pub today_minutes: u32,
    pub weekly_minutes: u32,
    pub week: Vec<StreakDayDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpsertTodayRequest {
    pub minutes_read: u32,
}

fn map_session_error(e: SessionError) -> (StatusCode, String) {
    match e {
        SessionError::InvalidSession(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        SessionError::Persistence(e) => {
            error!("Session store failure: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save reading session".to_string(),
            )
        }
    }
}

fn map_tracker_error(e: TrackerError) -> (StatusCode, String) {
    match e {
        TrackerError::Book(LibraryError::InvalidPage { .. }) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        TrackerError::Book(LibraryError::Persistence(PortError::NotFound(_))) => {
            (StatusCode::NOT_FOUND, "Book not found".to_string())
        }
        TrackerError::Session(SessionError::InvalidSession(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        // Partially-applied composites: the message names the step to retry.
        TrackerError::Progress { .. } | TrackerError::Streak { .. } => {
            error!("Reading log partially applied: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        other => {
            error!("Reading log failed: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save reading session".to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Record a raw reading session.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = RecordSessionRequest,
    responses(
        (status = 201, description = "Session recorded", body = SessionDto),
        (status = 400, description = "Invalid session bounds")
    )
)]
pub async fn record_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<RecordSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .recorder
        .record_session(
            user_id,
            req.book_id,
            req.start_time,
            req.end_time,
            req.starting_page,
            req.ending_page,
        )
        .await
        .map_err(map_session_error)?;
    Ok((StatusCode::CREATED, Json(SessionDto::from(session))))
}

/// The end-of-timer composite: session + page progress + streak refresh.
#[utoipa::path(
    post,
    path = "/sessions/log",
    request_body = RecordSessionRequest,
    responses(
        (status = 200, description = "Session logged", body = ReadingLogDto),
        (status = 400, description = "Invalid session bounds or page"),
        (status = 404, description = "No such book"),
        (status = 500, description = "Partially applied; the message names the retry step")
    )
)]
pub async fn log_reading_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<RecordSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .profiles
        .get_or_create(user_id)
        .await
        .map_err(map_profile_error)?;

    let log = state
        .tracker
        .log_reading(
            user_id,
            req.book_id,
            req.start_time,
            req.end_time,
            req.starting_page,
            req.ending_page,
            profile.daily_goal_minutes,
        )
        .await
        .map_err(map_tracker_error)?;

    Ok(Json(ReadingLogDto {
        session: log.session.into(),
        entry: log.entry.into(),
        today_minutes: log.today_minutes,
    }))
}

/// Today's and the trailing week's reading minutes.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Reading-time aggregates", body = StatsDto)
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> impl IntoResponse {
    // These aggregates report 0 on store failure rather than erroring.
    let today_minutes = state.recorder.minutes_today(user_id).await;
    let weekly_minutes = state.recorder.minutes_this_week(user_id).await;
    Json(StatsDto {
        today_minutes,
        weekly_minutes,
    })
}

/// The streak summary for the home screen.
#[utoipa::path(
    get,
    path = "/streaks",
    responses(
        (status = 200, description = "Streak summary", body = StreaksDto)
    )
)]
pub async fn streaks_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let current_streak = state.streaks.current_streak(user_id).await.map_err(|e| {
        error!("Failed to compute streak: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load streaks".to_string(),
        )
    })?;
    let week = state.streaks.weekly_view(user_id).await.map_err(|e| {
        error!("Failed to load weekly view: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load streaks".to_string(),
        )
    })?;
    let today_minutes = state.streaks.today_minutes(user_id).await;
    let weekly_minutes = state.streaks.weekly_minutes(user_id).await;

    Ok(Json(StreaksDto {
        current_streak,
        today_minutes,
        weekly_minutes,
        week: week.into_iter().map(Into::into).collect(),
    }))
}

/// Replace today's streak record with a minute total.
#[utoipa::path(
    post,
    path = "/streaks/today",
    request_body = UpsertTodayRequest,
    responses(
        (status = 204, description = "Record upserted")
    )
)]
pub async fn upsert_today_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpsertTodayRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .profiles
        .get_or_create(user_id)
        .await
        .map_err(map_profile_error)?;
    state
        .streaks
        .upsert_today(user_id, req.minutes_read, profile.daily_goal_minutes)
        .await
        .map_err(|e| {
            error!("Failed to upsert streak: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update streak".to_string(),
            )
        })?;
    Ok(StatusCode::NO_CONTENT)
}
