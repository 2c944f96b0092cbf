use std::sync::Arc;

use axum::{
    extract::Query,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dtos::{recommendationdtos::UserQueryDto, referraldtos::*},
    error::HttpError,
    service::referral_service::ReferralCompletion,
    AppState,
};

pub fn referrals_handler() -> Router {
    Router::new()
        .route("/redeem", post(redeem_referral_code))
        .route("/complete-onboarding", post(complete_onboarding))
        .route("/stats", get(get_referral_stats))
}

/// POST /api/referrals/redeem
pub async fn redeem_referral_code(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RedeemReferralDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;
    body.validate_code_format()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let referral = app_state
        .referral_service
        .redeem_code(body.user_id, &body.code, body.source.as_deref())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "referral_id": referral.id,
            "referrer_id": referral.referrer_id,
            "referral_status": referral.status,
        }
    })))
}

/// POST /api/referrals/complete-onboarding
///
/// Called on every onboarding finish. Most users were never referred, so
/// "nothing to settle" is a normal success response.
pub async fn complete_onboarding(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CompleteOnboardingDto>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .referral_service
        .complete_referral(body.user_id)
        .await?;

    let response = match outcome {
        ReferralCompletion::NoPendingReferral => json!({
            "status": "success",
            "data": {
                "referral_completed": false,
            }
        }),
        ReferralCompletion::Completed {
            referral,
            new_referral_count,
            rewards,
        } => json!({
            "status": "success",
            "data": {
                "referral_completed": true,
                "referral_id": referral.id,
                "referrer_referral_count": new_referral_count,
                "rewards_granted": rewards.len(),
            }
        }),
    };

    Ok(Json(response))
}

/// GET /api/referrals/stats
pub async fn get_referral_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<UserQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state
        .referral_service
        .referral_stats(query.user_id, &app_state.env.app_url)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": stats,
    })))
}
