use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use marketplace_shared::ReactionResponse;

use crate::error::{blocking, AppError, Result};
use crate::marketplace::Marketplace;
use crate::{auth, AppState};

/// POST /api/posts/{id}/reactions: toggles the caller's thumbs-up
pub async fn toggle_reaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ReactionResponse>> {
    let session = auth::extract_session(&headers, &state.jwt_secret)?;

    let market = state.market.clone();
    let resp = blocking(move || {
        let post = market
            .toggle_reaction(id, session.username())?
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

        Ok(ReactionResponse {
            thumbs_up: post.thumbs_up,
            reacted: Marketplace::has_reacted(&post, session.username()),
        })
    })
    .await?;

    Ok(Json(resp))
}
