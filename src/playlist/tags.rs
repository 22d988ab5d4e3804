use std::collections::HashMap;

use super::PlaylistMode;

/// Tag used for cities missing from the table
pub const FALLBACK_TAG: &str = "pop";

const DEFAULT_CITY_TAGS: [(&str, &str); 8] = [
    ("New York", "hip-hop"),
    ("Los Angeles", "rock"),
    ("Chicago", "blues"),
    ("Nashville", "country"),
    ("Miami", "latin"),
    ("Austin", "indie"),
    ("Bakersfield", "country"),
    ("San Francisco", "pop"),
];

/// Maps waypoints to music service tags
#[derive(Debug, Clone)]
pub struct TagResolver {
    city_tags: HashMap<String, String>,
}

impl Default for TagResolver {
    fn default() -> Self {
        Self {
            city_tags: DEFAULT_CITY_TAGS
                .iter()
                .map(|(city, tag)| (city.to_string(), tag.to_string()))
                .collect(),
        }
    }
}

impl TagResolver {
    /// Default table with extra or replacement entries
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        let mut resolver = Self::default();
        resolver.city_tags.extend(overrides);
        resolver
    }

    /// Tag for the city part of a waypoint ("New Haven, CT" → "New Haven")
    pub fn location_tag(&self, waypoint: &str) -> &str {
        let city = waypoint.split(',').next().unwrap_or(waypoint).trim();
        self.city_tags
            .get(city)
            .map(String::as_str)
            .unwrap_or(FALLBACK_TAG)
    }

    /// Query tag for one waypoint under the given mode
    pub fn resolve_tag(&self, waypoint: &str, mode: PlaylistMode, selected_genre: &str) -> String {
        match mode {
            PlaylistMode::LocationOnly => self.location_tag(waypoint).to_string(),
            PlaylistMode::GenreOnly => selected_genre.to_string(),
            PlaylistMode::Hybrid => format!("{}+{}", self.location_tag(waypoint), selected_genre),
        }
    }
}
