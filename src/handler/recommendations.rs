use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dtos::recommendationdtos::*,
    error::HttpError,
    service::places::PlaceQuery,
    AppState,
};

const DEFAULT_RADIUS_M: u32 = 2000;

pub fn recommendations_handler() -> Router {
    Router::new()
        .route("/refresh", post(refresh_recommendations))
        .route("/:place_id/interaction", post(record_interaction))
        .route("/:place_id/block", delete(unblock_place))
        .route("/blocked", get(get_blocked_places))
}

/// POST /api/recommendations/refresh
///
/// Runs one refresh round for the user. A denied request is still a 200:
/// the body carries `admitted: false` and the remaining cooldown so the
/// client can render a countdown instead of an error state.
pub async fn refresh_recommendations(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RefreshRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let query = PlaceQuery {
        latitude: body.latitude,
        longitude: body.longitude,
        radius_m: body.radius_m.unwrap_or(DEFAULT_RADIUS_M),
        category: body.category.clone(),
    };

    let outcome = app_state
        .recommendation_service
        .request_refresh(body.user_id, &query)
        .await?;

    let response = RefreshResponseDto {
        status: "success".to_string(),
        admitted: outcome.admitted,
        seconds_until_refresh: outcome.seconds_until_refresh,
        results: RecommendationDto::from_records(&outcome.results),
    };

    Ok(Json(response))
}

/// POST /api/recommendations/:place_id/interaction
pub async fn record_interaction(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(place_id): Path<String>,
    Json(body): Json<InteractionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let record = app_state
        .recommendation_service
        .record_interaction(body.user_id, &place_id, body.event, body.reason.as_deref())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "recommendation": record.as_ref().map(RecommendationDto::from_record),
    })))
}

/// DELETE /api/recommendations/:place_id/block
///
/// Removes the explicit block entry only. A place the user marked
/// not-interested stays suppressed until that response is changed.
pub async fn unblock_place(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(place_id): Path<String>,
    Query(query): Query<UserQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let (removed, still_suppressed) = app_state
        .recommendation_service
        .unblock(query.user_id, &place_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "removed": removed,
        "still_suppressed": still_suppressed,
    })))
}

/// GET /api/recommendations/blocked
pub async fn get_blocked_places(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<UserQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let blocked = app_state
        .recommendation_service
        .blocked_places(query.user_id)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "results": blocked.len(),
        "blocked": blocked,
    })))
}
