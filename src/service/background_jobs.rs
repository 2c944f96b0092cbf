// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::{db::trackingdb::TrackingExt, AppState};

/// Hourly sweep moving pending recommendations past their deadline to
/// `expired`. The refresh path runs the same per-user sweep inline, so this
/// job only has to keep the long tail tidy.
pub async fn start_recommendation_expiry_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600));

    loop {
        interval.tick().await;

        tracing::info!("Running recommendation expiry job at {}", Utc::now());

        match app_state.db_client.expire_stale(Utc::now()).await {
            Ok(expired) => tracing::info!(
                "Recommendation expiry job completed: {} record(s) expired",
                expired
            ),
            Err(e) => tracing::error!("Recommendation expiry job failed: {}", e),
        }
    }
}
