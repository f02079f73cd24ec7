//! services/api/src/web/library.rs
//!
//! Axum handlers for the user's library: adding catalog books, moving them
//! between statuses, tracking page progress, and removing them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use chapterly_core::domain::{LibraryEntry, ReadingStatus};
use chapterly_core::{LibraryError, PortError};

use crate::web::rest::BookDto;
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct LibraryEntryDto {
    pub id: Uuid,
    pub book: BookDto,
    pub status: String,
    pub current_page: u32,
    pub progress: u8,
    pub date_added: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_finished: Option<DateTime<Utc>>,
}

impl From<LibraryEntry> for LibraryEntryDto {
    fn from(entry: LibraryEntry) -> Self {
        Self {
            id: entry.id,
            book: entry.book.into(),
            status: entry.status.as_str().to_string(),
            current_page: entry.current_page,
            progress: entry.progress,
            date_added: entry.date_added,
            date_started: entry.date_started,
            date_finished: entry.date_finished,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AddBookRequest {
    pub book: BookDto,
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProgressRequest {
    pub current_page: u32,
}

#[derive(Deserialize, IntoParams)]
pub struct ListQuery {
    /// One of `reading`, `read`, `want-to-read`.
    pub status: String,
}

fn parse_status(s: &str) -> Result<ReadingStatus, (StatusCode, String)> {
    ReadingStatus::parse(s).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a valid reading status", s),
        )
    })
}

fn map_library_error(e: LibraryError) -> (StatusCode, String) {
    match e {
        LibraryError::DuplicateEntry => (StatusCode::CONFLICT, e.to_string()),
        LibraryError::InvalidPage { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
        LibraryError::Persistence(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Book not found".to_string())
        }
        LibraryError::Persistence(e) => {
            error!("Library store failure: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update library".to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Add a catalog book to the library.
#[utoipa::path(
    post,
    path = "/library",
    request_body = AddBookRequest,
    responses(
        (status = 201, description = "Book added", body = LibraryEntryDto),
        (status = 400, description = "Unknown reading status"),
        (status = 409, description = "Book already in the library")
    )
)]
pub async fn add_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AddBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = parse_status(&req.status)?;
    let entry = state
        .ledger
        .add_book(user_id, req.book.into(), status)
        .await
        .map_err(map_library_error)?;
    Ok((StatusCode::CREATED, Json(LibraryEntryDto::from(entry))))
}

/// List the library entries with a given status.
#[utoipa::path(
    get,
    path = "/library",
    params(ListQuery),
    responses(
        (status = 200, description = "Entries with that status", body = [LibraryEntryDto]),
        (status = 400, description = "Unknown reading status")
    )
)]
pub async fn list_library_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = parse_status(&query.status)?;
    let entries = state
        .ledger
        .list_by_status(user_id, status)
        .await
        .map_err(map_library_error)?;
    let entries: Vec<LibraryEntryDto> = entries.into_iter().map(Into::into).collect();
    Ok(Json(entries))
}

/// Move an entry to a new reading status.
#[utoipa::path(
    patch,
    path = "/library/{id}/status",
    params(("id" = Uuid, Path, description = "Library entry id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated entry", body = LibraryEntryDto),
        (status = 404, description = "No such entry")
    )
)]
pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = parse_status(&req.status)?;
    let entry = state
        .ledger
        .update_status(user_id, entry_id, status)
        .await
        .map_err(map_library_error)?;
    Ok(Json(LibraryEntryDto::from(entry)))
}

/// Record a new page position for an entry.
#[utoipa::path(
    patch,
    path = "/library/{id}/progress",
    params(("id" = Uuid, Path, description = "Library entry id")),
    request_body = UpdateProgressRequest,
    responses(
        (status = 200, description = "Updated entry", body = LibraryEntryDto),
        (status = 400, description = "Page out of range"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entry = state
        .ledger
        .update_progress(user_id, entry_id, req.current_page)
        .await
        .map_err(map_library_error)?;
    Ok(Json(LibraryEntryDto::from(entry)))
}

/// Remove an entry from the library.
#[utoipa::path(
    delete,
    path = "/library/{id}",
    params(("id" = Uuid, Path, description = "Library entry id")),
    responses(
        (status = 204, description = "Entry removed"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn remove_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .ledger
        .remove_book(user_id, entry_id)
        .await
        .map_err(map_library_error)?;
    Ok(StatusCode::NO_CONTENT)
}
