use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use marketplace_shared::{Comment, CreateComment};

use crate::error::{blocking, AppError, Result};
use crate::marketplace::NewComment;
use crate::{auth, posts, AppState};

/// POST /api/posts/{id}/comments
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let session = auth::extract_session(&headers, &state.jwt_secret)?;
    let text = posts::plain_text(&payload.text).trim().to_string();

    if text.is_empty() {
        return Err(AppError::Validation("comment is empty".to_string()));
    }

    let market = state.market.clone();
    let comment = blocking(move || {
        market
            .add_comment(
                id,
                NewComment {
                    text,
                    posted_by: session.sub,
                },
            )?
            .ok_or_else(|| AppError::NotFound(format!("post {id}")))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
