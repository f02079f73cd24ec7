//! services/api/src/web/social.rs
//!
//! Axum handlers for friends: requests, responses, removal, the stats
//! leaderboard, and username search.

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

use chapterly_core::domain::{Friend, FriendRequest, UserSearchResult};
use chapterly_core::{PortError, SocialError};

use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct FriendDto {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub weekly_minutes: u32,
    pub current_streak: u32,
}

impl From<Friend> for FriendDto {
    fn from(friend: Friend) -> Self {
        Self {
            id: friend.id,
            username: friend.username,
            avatar_url: friend.avatar_url,
            weekly_minutes: friend.weekly_minutes,
            current_streak: friend.current_streak,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct FriendRequestDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub sender_username: Option<String>,
    pub receiver_username: Option<String>,
}

impl From<FriendRequest> for FriendRequestDto {
    fn from(request: FriendRequest) -> Self {
        Self {
            id: request.id,
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            status: request.status.as_str().to_string(),
            created_at: request.created_at,
            sender_username: request.sender_username,
            receiver_username: request.receiver_username,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SendRequestBody {
    pub receiver_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
pub struct RespondRequestBody {
    /// `accepted` or `declined`.
    pub response: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserSearchDto {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub is_friend: bool,
    pub request_status: Option<String>,
}

impl From<UserSearchResult> for UserSearchDto {
    fn from(result: UserSearchResult) -> Self {
        Self {
            id: result.id,
            username: result.username,
            avatar_url: result.avatar_url,
            is_friend: result.is_friend,
            request_status: result.request_status.map(|s| s.as_str().to_string()),
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct UserSearchQuery {
    /// Username fragment to look for.
    pub q: String,
}

fn map_social_error(e: SocialError) -> (StatusCode, String) {
    match e {
        SocialError::SelfRequest => (StatusCode::BAD_REQUEST, e.to_string()),
        SocialError::Persistence(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Request not found".to_string())
        }
        SocialError::Persistence(PortError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
        SocialError::Persistence(e) => {
            error!("Social store failure: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update friends".to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The friends list with leaderboard stats, busiest reader first.
#[utoipa::path(
    get,
    path = "/friends",
    responses(
        (status = 200, description = "Friends with stats", body = [FriendDto])
    )
)]
pub async fn list_friends_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let friends = state
        .social
        .friends_with_stats(user_id)
        .await
        .map_err(map_social_error)?;
    let friends: Vec<FriendDto> = friends.into_iter().map(Into::into).collect();
    Ok(Json(friends))
}

/// Remove a friend.
#[utoipa::path(
    delete,
    path = "/friends/{id}",
    params(("id" = Uuid, Path, description = "The friend's user id")),
    responses(
        (status = 204, description = "Friend removed")
    )
)]
pub async fn remove_friend_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(friend_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .social
        .remove_friend(user_id, friend_id)
        .await
        .map_err(map_social_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pending friend requests in both directions.
#[utoipa::path(
    get,
    path = "/friends/requests",
    responses(
        (status = 200, description = "Pending requests", body = [FriendRequestDto])
    )
)]
pub async fn list_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let requests = state
        .social
        .pending_requests(user_id)
        .await
        .map_err(map_social_error)?;
    let requests: Vec<FriendRequestDto> = requests.into_iter().map(Into::into).collect();
    Ok(Json(requests))
}

/// Send a friend request.
#[utoipa::path(
    post,
    path = "/friends/requests",
    request_body = SendRequestBody,
    responses(
        (status = 201, description = "Request sent", body = FriendRequestDto),
        (status = 400, description = "Request to yourself")
    )
)]
pub async fn send_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SendRequestBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = state
        .social
        .send_request(user_id, req.receiver_id)
        .await
        .map_err(map_social_error)?;
    Ok((StatusCode::CREATED, Json(FriendRequestDto::from(request))))
}

/// Accept or decline a pending request (receiver only).
#[utoipa::path(
    post,
    path = "/friends/requests/{id}/respond",
    params(("id" = Uuid, Path, description = "Friend request id")),
    request_body = RespondRequestBody,
    responses(
        (status = 204, description = "Responded"),
        (status = 400, description = "Unknown response value"),
        (status = 404, description = "Not this user's pending request")
    )
)]
pub async fn respond_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<RespondRequestBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let accepted = match req.response.as_str() {
        "accepted" => true,
        "declined" => false,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("'{}' is not a valid response", other),
            ))
        }
    };
    state
        .social
        .respond_to_request(user_id, request_id, accepted)
        .await
        .map_err(map_social_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search users by username fragment.
#[utoipa::path(
    get,
    path = "/users/search",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Matching users", body = [UserSearchDto])
    )
)]
pub async fn search_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let results = state
        .social
        .search_users(user_id, &query.q)
        .await
        .map_err(map_social_error)?;
    let results: Vec<UserSearchDto> = results.into_iter().map(Into::into).collect();
    Ok(Json(results))
}
