//! services/api/src/web/profile.rs
//!
//! Axum handlers for the user's profile and the onboarding commit.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use chapterly_core::domain::UserProfile;
use chapterly_core::ports::ProfileChanges;
use chapterly_core::{PortError, ProfileError};

use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ProfileDto {
    pub id: Uuid,
    pub username: Option<String>,
    pub daily_goal_minutes: u32,
    pub onboarding_completed: bool,
    pub avatar_url: Option<String>,
}

impl From<UserProfile> for ProfileDto {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            daily_goal_minutes: profile.daily_goal_minutes,
            onboarding_completed: profile.onboarding_completed,
            avatar_url: profile.avatar_url,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub daily_goal_minutes: Option<u32>,
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct OnboardingRequest {
    pub username: String,
    pub daily_goal_minutes: u32,
}

pub(crate) fn map_profile_error(e: ProfileError) -> (StatusCode, String) {
    match e {
        ProfileError::UsernameTaken(_) => (StatusCode::CONFLICT, e.to_string()),
        ProfileError::InvalidUsername | ProfileError::InvalidGoal => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ProfileError::Persistence(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Profile not found".to_string())
        }
        ProfileError::Persistence(e) => {
            error!("Profile store failure: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update profile".to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The current user's profile, created with defaults on first read.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The profile", body = ProfileDto)
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .profiles
        .get_or_create(user_id)
        .await
        .map_err(map_profile_error)?;
    Ok(Json(ProfileDto::from(profile)))
}

/// Partial profile update.
#[utoipa::path(
    patch,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileDto),
        (status = 400, description = "Invalid username or goal"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .profiles
        .update(
            user_id,
            ProfileChanges {
                username: req.username,
                daily_goal_minutes: req.daily_goal_minutes,
                onboarding_completed: None,
                avatar_url: req.avatar_url,
            },
        )
        .await
        .map_err(map_profile_error)?;
    Ok(Json(ProfileDto::from(profile)))
}

/// Commit onboarding: username, daily goal, and the completed flag at once.
#[utoipa::path(
    post,
    path = "/profile/onboarding",
    request_body = OnboardingRequest,
    responses(
        (status = 200, description = "Onboarded profile", body = ProfileDto),
        (status = 400, description = "Invalid username or goal"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn onboarding_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<OnboardingRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .profiles
        .complete_onboarding(user_id, &req.username, req.daily_goal_minutes)
        .await
        .map_err(map_profile_error)?;
    Ok(Json(ProfileDto::from(profile)))
}
