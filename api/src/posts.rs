use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use marketplace_shared::{Catalog, CreatePost, Offer, Post, UpdateStatus};
use serde::Deserialize;

use crate::error::{blocking, AppError, Result};
use crate::{auth, AppState};

pub const TITLE_MAX: usize = 50;
pub const DESCRIPTION_MAX: usize = 100;

// ── Query params ──

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    search: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    status: String,
}

// ── Input checks ──

/// Drops any markup and keeps the remaining text as typed, so `&` and `<`
/// are stored literally rather than as entities.
pub fn plain_text(value: &str) -> String {
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(value)
        .to_string()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn required(field: &str, value: &str, max: Option<usize>) -> Result<String> {
    let value = value.trim();
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(AppError::Validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    let cleaned = plain_text(value).trim().to_string();
    if cleaned.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(cleaned)
}

/// Applies the form rules: required fields, length limits, a non-negative
/// numeric price for sales.
pub fn validate_listing(input: CreatePost) -> Result<CreatePost> {
    let title = required("title", &input.title, Some(TITLE_MAX))?;
    let description = required("description", &input.description, Some(DESCRIPTION_MAX))?;
    let offer = match input.offer {
        Offer::ForSale { price } => {
            let price = price.trim().to_string();
            match price.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => Offer::ForSale { price },
                _ => {
                    return Err(AppError::Validation(
                        "price must be a number of at least 0".to_string(),
                    ))
                }
            }
        }
        Offer::Service { time } => Offer::Service {
            time: required("time", &time, None)?,
        },
    };

    Ok(CreatePost {
        title,
        description,
        offer,
        tag: input.tag,
    })
}

// ── Handlers ──

/// GET /api/catalog
pub async fn catalog() -> Json<Catalog> {
    Json(Catalog::default())
}

/// GET /api/posts?search=chair&tag=goods&status=all
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Post>>> {
    let market = state.market.clone();
    let posts = blocking(move || {
        market.filter_posts(&params.search, &params.tag, &params.status)
    })
    .await?;

    Ok(Json(posts))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>)> {
    let session = auth::extract_session(&headers, &state.jwt_secret)?;
    let input = validate_listing(payload)?;

    let market = state.market.clone();
    let post = blocking(move || market.create_post(input, session.username())).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/{id}
pub async fn get_post(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Post>> {
    let market = state.market.clone();
    let post = blocking(move || market.get_post(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

    Ok(Json(post))
}

/// DELETE /api/posts/{id} (owner or admin only)
pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let session = auth::extract_session(&headers, &state.jwt_secret)?;

    let market = state.market.clone();
    blocking(move || {
        if market.get_post(id)?.is_none() {
            return Err(AppError::NotFound(format!("post {id}")));
        }
        if !market.can_modify_post(session.username(), id)? {
            return Err(AppError::Forbidden(format!(
                "{} may not delete post {id}",
                session.username()
            )));
        }
        if !market.delete_post(id, session.username())? {
            return Err(AppError::NotFound(format!("post {id}")));
        }
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

/// PATCH /api/posts/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatus>,
) -> Result<Json<Post>> {
    let session = auth::extract_session(&headers, &state.jwt_secret)?;

    let market = state.market.clone();
    let post =
        blocking(move || market.update_post_status(id, payload.status, session.username())).await?;

    Ok(Json(post))
}
