//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the book-catalog endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

use chapterly_core::domain::BookMetadata;

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        search_books_handler,
        popular_books_handler,
        crate::web::library::add_book_handler,
        crate::web::library::list_library_handler,
        crate::web::library::update_status_handler,
        crate::web::library::update_progress_handler,
        crate::web::library::remove_book_handler,
        crate::web::tracking::record_session_handler,
        crate::web::tracking::log_reading_handler,
        crate::web::tracking::stats_handler,
        crate::web::tracking::streaks_handler,
        crate::web::tracking::upsert_today_handler,
        crate::web::profile::get_profile_handler,
        crate::web::profile::update_profile_handler,
        crate::web::profile::onboarding_handler,
        crate::web::social::list_friends_handler,
        crate::web::social::remove_friend_handler,
        crate::web::social::list_requests_handler,
        crate::web::social::send_request_handler,
        crate::web::social::respond_request_handler,
        crate::web::social::search_users_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::AuthResponse,
        BookDto,
        crate::web::library::LibraryEntryDto,
        crate::web::library::AddBookRequest,
        crate::web::library::UpdateStatusRequest,
        crate::web::library::UpdateProgressRequest,
        crate::web::tracking::RecordSessionRequest,
        crate::web::tracking::SessionDto,
        crate::web::tracking::ReadingLogDto,
        crate::web::tracking::StatsDto,
        crate::web::tracking::StreakDayDto,
        crate::web::tracking::StreaksDto,
        crate::web::tracking::UpsertTodayRequest,
        crate::web::profile::ProfileDto,
        crate::web::profile::UpdateProfileRequest,
        crate::web::profile::OnboardingRequest,
        crate::web::social::FriendDto,
        crate::web::social::FriendRequestDto,
        crate::web::social::SendRequestBody,
        crate::web::social::RespondRequestBody,
        crate::web::social::UserSearchDto,
    )),
    tags(
        (name = "Chapterly API", description = "API endpoints for the reading-habit tracker.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Book Payload
//=========================================================================================

/// A catalog book as it crosses the wire, both in search results and when
/// the client sends back the one it picked.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BookDto {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_url: String,
    pub total_pages: u32,
    pub description: Option<String>,
    pub published_date: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub isbn: Option<String>,
}

impl From<BookMetadata> for BookDto {
    fn from(book: BookMetadata) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            cover_url: book.cover_url,
            total_pages: book.total_pages,
            description: book.description,
            published_date: book.published_date,
            categories: book.categories,
            isbn: book.isbn,
        }
    }
}

impl From<BookDto> for BookMetadata {
    fn from(dto: BookDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            author: dto.author,
            cover_url: dto.cover_url,
            total_pages: dto.total_pages,
            description: dto.description,
            published_date: dto.published_date,
            categories: dto.categories,
            isbn: dto.isbn,
        }
    }
}

//=========================================================================================
// Catalog Handlers
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free-text search terms.
    pub q: String,
}

#[derive(Deserialize, IntoParams)]
pub struct PopularQuery {
    /// Optional subject to browse instead of general bestsellers.
    pub category: Option<String>,
}

/// Search the book catalog.
#[utoipa::path(
    get,
    path = "/books/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = [BookDto]),
        (status = 500, description = "Catalog lookup failed")
    )
)]
pub async fn search_books_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let books = state.catalog.search(&query.q).await.map_err(|e| {
        error!("Catalog search failed: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to search books. Please try again.".to_string(),
        )
    })?;
    let books: Vec<BookDto> = books.into_iter().map(BookDto::from).collect();
    Ok(Json(books))
}

/// A short list of popular books for the empty search screen.
#[utoipa::path(
    get,
    path = "/books/popular",
    params(PopularQuery),
    responses(
        (status = 200, description = "Popular books", body = [BookDto])
    )
)]
pub async fn popular_books_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> impl IntoResponse {
    // Best effort: the browse screen renders an empty shelf on failure.
    let books = match state.catalog.popular(query.category.as_deref()).await {
        Ok(books) => books,
        Err(e) => {
            error!("Popular books lookup failed: {:?}", e);
            Vec::new()
        }
    };
    let books: Vec<BookDto> = books.into_iter().map(BookDto::from).collect();
    Json(books)
}
