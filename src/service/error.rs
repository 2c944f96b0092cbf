use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No recommendation found for user {0} and place {1}")]
    TrackingRecordNotFound(Uuid, String),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Referral code {0} is not valid")]
    InvalidReferralCode(String),

    #[error("You cannot redeem your own referral code")]
    SelfReferral,

    #[error("A referral has already been redeemed for this user")]
    DuplicateReferral,

    #[error("Conflicting concurrent update: {0}")]
    Conflict(String),

    #[error("Places provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::TrackingRecordNotFound(_, _)
            | ServiceError::UserNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::InvalidReferralCode(_)
            | ServiceError::SelfReferral => HttpError::bad_request(error.to_string()),

            ServiceError::DuplicateReferral
            | ServiceError::Conflict(_) => HttpError::conflict(error.to_string()),

            ServiceError::Provider(_) => HttpError::bad_gateway(error.to_string()),

            ServiceError::Database(_) => HttpError::server_error(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn not_found_family_maps_to_404() {
        let http: HttpError = ServiceError::UserNotFound(Uuid::nil()).into();
        assert_eq!(http.status, StatusCode::NOT_FOUND);

        let http: HttpError =
            ServiceError::TrackingRecordNotFound(Uuid::nil(), "p-1".into()).into();
        assert_eq!(http.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn redemption_rejections_map_to_400_and_409() {
        let http: HttpError = ServiceError::SelfReferral.into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert!(http.message.contains("your own referral code"));

        let http: HttpError = ServiceError::InvalidReferralCode("XYZ123".into()).into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);

        let http: HttpError = ServiceError::DuplicateReferral.into();
        assert_eq!(http.status, StatusCode::CONFLICT);
    }

    #[test]
    fn upstream_and_store_failures_map_to_5xx() {
        let http: HttpError = ServiceError::Provider("timeout".into()).into();
        assert_eq!(http.status, StatusCode::BAD_GATEWAY);

        let http: HttpError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
