mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::config::Config;
use crate::db::db::DBClient;
use crate::routes::create_router;
use crate::service::{
    places::{HttpPlacesProvider, PlacesProvider},
    recommendation_service::RecommendationService,
    referral_service::ReferralService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub recommendation_service: Arc<RecommendationService>,
    pub referral_service: Arc<ReferralService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config, places: Arc<dyn PlacesProvider>) -> Self {
        let db_client_arc = Arc::new(db_client);

        let recommendation_service = Arc::new(RecommendationService::new(
            db_client_arc.clone(),
            places,
            config.place_cache_ttl_seconds,
            config.max_refresh_results,
        ));

        let referral_service = Arc::new(ReferralService::new(db_client_arc.clone()));

        Self {
            env: config,
            db_client: db_client_arc,
            recommendation_service,
            referral_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    // Connect to PostgreSQL
    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    // Initialize DBClient with optional Redis
    let db_client = if let Some(ref redis_url) = config.redis_url {
        let client = DBClient::with_redis(pool, redis_url).await;
        if client.is_redis_available() {
            println!("✅ Redis caching is ACTIVE");
        } else {
            println!("⚠️  Redis connection failed - Running without cache");
        }
        client
    } else {
        println!("ℹ️  Redis not configured - Running without cache (set REDIS_URL to enable)");
        DBClient::new(pool)
    };

    let allowed_origins = vec![
        config
            .app_url
            .parse::<HeaderValue>()
            .expect("APP_URL must be a valid origin"),
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE]);

    let places: Arc<dyn PlacesProvider> = Arc::new(HttpPlacesProvider::new(&config));
    let app_state = Arc::new(AppState::new(db_client, config.clone(), places));

    let app = create_router(app_state.clone()).layer(cors);

    println!("🚀 Server is running on http://localhost:{}", config.port);
    println!("📊 Cache status: {}", app_state.db_client.cache_status());

    // Start background jobs
    let app_state_clone = app_state.clone();
    tokio::spawn(async move {
        service::background_jobs::start_recommendation_expiry_job(app_state_clone).await;
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
