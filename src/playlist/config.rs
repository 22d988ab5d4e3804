use std::collections::HashMap;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Genres offered for genre and hybrid playlists
pub const ALL_GENRES: [&str; 9] = [
    "pop",
    "rock",
    "hip hop",
    "electronic",
    "indie",
    "country",
    "jazz",
    "metal",
    "classical",
];

/// How a waypoint is turned into a Last.fm tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistMode {
    /// Genre of the city the route passes through
    #[default]
    #[value(name = "location")]
    LocationOnly,
    /// The selected genre everywhere
    #[value(name = "genre")]
    GenreOnly,
    /// City genre combined with the selected genre
    #[value(name = "hybrid")]
    Hybrid,
}

impl PlaylistMode {
    pub fn label(&self) -> &'static str {
        match self {
            PlaylistMode::LocationOnly => "Location-Based",
            PlaylistMode::GenreOnly => "Genre-Based",
            PlaylistMode::Hybrid => "Location + Genre",
        }
    }
}

/// Settings for one playlist session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistPreferences {
    pub mode: PlaylistMode,
    pub selected_genre: String,
    pub max_tracks_per_waypoint: usize,
    pub minutes_per_track: f64, // only used for the duration estimate
    pub fetch_timeout_secs: u64,
    pub seed: Option<u64>, // fixed seed for reproducible sampling
}

impl Default for PlaylistPreferences {
    fn default() -> Self {
        Self {
            mode: PlaylistMode::LocationOnly,
            selected_genre: "pop".to_string(),
            max_tracks_per_waypoint: 7,
            minutes_per_track: 3.5,
            fetch_timeout_secs: 12,
            seed: None,
        }
    }
}

impl PlaylistPreferences {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Whether the selected genre is one of the offered genres
    pub fn has_known_genre(&self) -> bool {
        ALL_GENRES.contains(&self.selected_genre.as_str())
    }
}

/// Load city → tag overrides from a JSON object file, e.g. `{"Denver": "folk"}`
pub fn load_city_tags_from_file(
    path: &str,
) -> Result<HashMap<String, String>, Box<dyn std::error::Error + Send + Sync>> {
    let content = std::fs::read_to_string(path)?;
    let tags: HashMap<String, String> = serde_json::from_str(&content)?;
    Ok(tags)
}
