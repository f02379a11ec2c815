use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    /// Minutes within which a repeated present mark for the same
    /// (student, session, direction) is rejected.
    pub duplicate_window_minutes: i64,

    // Identity resolver (external match service)
    pub resolver_url: String,
    pub resolver_timeout_secs: u64,
    pub confidence_threshold: f32,

    // Kiosk behavior
    pub kiosk_continuous_mode: bool,
    pub kiosk_auto_confirm_secs: u64,
    pub roster_cache_ttl_secs: u64,

    // Nightly sweep
    pub sweep_parallelism: usize,

    // Rate limiting
    pub rate_scan_per_min: u32,
    pub rate_api_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            duplicate_window_minutes: env::var("DUPLICATE_WINDOW_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap(),

            resolver_url: env::var("RESOLVER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8800".to_string()),
            resolver_timeout_secs: env::var("RESOLVER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap(),
            confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                .unwrap_or_else(|_| "40.0".to_string())
                .parse()
                .unwrap(),

            kiosk_continuous_mode: env::var("KIOSK_CONTINUOUS_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            kiosk_auto_confirm_secs: env::var("KIOSK_AUTO_CONFIRM_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap(),
            roster_cache_ttl_secs: env::var("ROSTER_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap(),

            sweep_parallelism: env::var("SWEEP_PARALLELISM")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap(),

            rate_scan_per_min: env::var("RATE_SCAN_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_api_per_min: env::var("RATE_API_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }
}
