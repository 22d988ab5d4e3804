use anyhow::{Context, Result};

const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
const DEFAULT_ITUNES_URL: &str = "https://itunes.apple.com";
const DEFAULT_STORE_PATH: &str = "saved_playlists.json";
const DEFAULT_GENRE: &str = "pop";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 12;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub lastfm_api_key: String,
    pub nominatim_url: String,
    pub osrm_url: String,
    pub itunes_url: String,
    pub store_path: String,
    pub default_genre: String,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();

    let lastfm_api_key =
        std::env::var("LASTFM_API_KEY").context("LASTFM_API_KEY must be set (see .env)")?;

    let fetch_timeout_secs = match std::env::var("FETCH_TIMEOUT_SECS") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("FETCH_TIMEOUT_SECS is not a number: '{raw}'"))?,
        Err(_) => DEFAULT_FETCH_TIMEOUT_SECS,
    };

    Ok(Config {
        lastfm_api_key,
        nominatim_url: env_or("NOMINATIM_URL", DEFAULT_NOMINATIM_URL),
        osrm_url: env_or("OSRM_URL", DEFAULT_OSRM_URL),
        itunes_url: env_or("ITUNES_URL", DEFAULT_ITUNES_URL),
        store_path: env_or("PLAYLIST_STORE", DEFAULT_STORE_PATH),
        default_genre: env_or("DEFAULT_GENRE", DEFAULT_GENRE),
        fetch_timeout_secs,
        user_agent: env_or(
            "USER_AGENT",
            concat!("roadtrip-playlist/", env!("CARGO_PKG_VERSION")),
        ),
    })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
