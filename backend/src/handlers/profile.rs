use axum::{Json, extract::State};

use crate::{
    constants::is_valid_user_id,
    error::AppError,
    models::UserProfile,
    state::AppState,
};

/// Stores a profile for the user's next connection, or swaps the live one in place.
pub async fn submit_profile(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<&'static str, AppError> {
    if !is_valid_user_id(&profile.id) {
        return Err(AppError::BadRequest(format!("Invalid user id: {}", profile.id)));
    }

    tracing::debug!(
        user = %profile.id,
        likes = profile.likes.len(),
        dislikes = profile.dislikes.len(),
        "profile submitted"
    );
    state.hub.submit_profile(profile).await?;
    Ok("success")
}

/// Every interest submitted so far, for autocomplete.
pub async fn list_likes(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.hub.catalog().await?))
}
