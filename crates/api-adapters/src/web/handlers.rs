use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use domains::models::{FeedPage, ProfileThoughts, Thought, ThoughtView};
use domains::validation::validate_thought_text;
use serde_json::{json, Value};
use services::{NewComment, NewThought};
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use super::AppState;
use crate::dto::{DeleteQuery, FeedQuery, ThoughtPayload};
use crate::error::{ApiError, ApiResult};
use crate::metrics::CONTENT_TYPE;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("metrics encoding: {e}")))?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}

pub async fn fetch_feed(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> ApiResult<Json<FeedPage>> {
    let result = state
        .thoughts
        .fetch_posts(query.page_request(state.feed))
        .await;
    state.metrics.observe("fetch_posts", &result);
    Ok(Json(result?))
}

pub async fn create_thought(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ThoughtPayload>,
) -> ApiResult<(StatusCode, Json<Thought>)> {
    validate_thought_text(&payload.text)?;

    let result = state
        .thoughts
        .create_thought(NewThought {
            text: payload.text,
            author_id: user.id,
            community_external_id: payload.community_id,
            path: payload.path,
        })
        .await;
    state.metrics.observe("create_thought", &result);
    Ok((StatusCode::CREATED, Json(result?)))
}

pub async fn fetch_thought(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ThoughtView>> {
    let result = state.thoughts.fetch_thought_by_id(id).await;
    state.metrics.observe("fetch_thought", &result);
    Ok(Json(result?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    ApiPath(parent_id): ApiPath<Uuid>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ThoughtPayload>,
) -> ApiResult<(StatusCode, Json<Thought>)> {
    validate_thought_text(&payload.text)?;

    let result = state
        .thoughts
        .add_comment(NewComment {
            parent_id,
            text: payload.text,
            author_id: user.id,
            path: payload.path,
        })
        .await;
    state.metrics.observe("add_comment", &result);
    Ok((StatusCode::CREATED, Json(result?)))
}

pub async fn delete_thought(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> ApiResult<StatusCode> {
    let result = state
        .thoughts
        .delete_thought_as(user.id, id, &query.path)
        .await;
    state.metrics.observe("delete_thought", &result);
    result?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_thoughts(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<ProfileThoughts>> {
    let result = state.profiles.fetch_user_thoughts(user_id).await;
    state.metrics.observe("fetch_user_thoughts", &result);
    Ok(Json(result?))
}

pub async fn community_thoughts(
    State(state): State<AppState>,
    ApiPath(community_id): ApiPath<Uuid>,
) -> ApiResult<Json<ProfileThoughts>> {
    let result = state.profiles.fetch_community_thoughts(community_id).await;
    state.metrics.observe("fetch_community_thoughts", &result);
    Ok(Json(result?))
}
