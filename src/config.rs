// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub app_url: String,
    pub port: u16,
    // Places provider configuration
    pub places_api_url: String,
    pub places_api_key: String,
    // Tuning knobs for the recommendation engine
    pub place_cache_ttl_seconds: usize,
    pub max_refresh_results: usize,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        let redis_url = std::env::var("REDIS_URL").ok();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        // Places provider configuration (with dev defaults)
        let places_api_url = std::env::var("PLACES_API_URL")
            .unwrap_or_else(|_| "https://places.example.com/v1".to_string());
        let places_api_key = std::env::var("PLACES_API_KEY")
            .unwrap_or_else(|_| "test_api_key".to_string());

        let place_cache_ttl_seconds = std::env::var("PLACE_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(600);

        let max_refresh_results = std::env::var("MAX_REFRESH_RESULTS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(20);

        Config {
            database_url,
            redis_url,
            app_url,
            port,
            places_api_url,
            places_api_key,
            place_cache_ttl_seconds,
            max_refresh_results,
        }
    }
}
