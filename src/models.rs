use serde::{Deserialize, Serialize};

/// Fallback artwork when Last.fm returns no usable image
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/60";

/// A point on the map, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One maneuver of a driving route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub coordinate: Coordinate,
    pub instruction: String, // may be empty (departure step)
}

impl RouteStep {
    pub fn new(coordinate: Coordinate, instruction: impl Into<String>) -> Self {
        Self {
            coordinate,
            instruction: instruction.into(),
        }
    }
}

/// A track as shown in a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub image_url: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>, // filled in later by the artwork lookup
}

impl Track {
    /// Build a track, deriving its id from name and artist
    pub fn new(name: &str, artist: &str, image_url: &str, source_url: &str) -> Self {
        Track {
            id: Self::derive_id(name, artist),
            name: name.to_string(),
            artist: artist.to_string(),
            image_url: image_url.to_string(),
            source_url: source_url.to_string(),
            artwork_url: None,
        }
    }

    /// Stable identity: "name-artist" with every whitespace run replaced by a dash
    pub fn derive_id(name: &str, artist: &str) -> String {
        format!("{}-{}", name.trim(), artist.trim())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Artwork to display: the enriched artwork when known, the Last.fm image otherwise
    pub fn display_image(&self) -> &str {
        self.artwork_url.as_deref().unwrap_or(&self.image_url)
    }

    pub fn apple_music_search_url(&self) -> String {
        format!(
            "https://music.apple.com/us/search?term={}",
            urlencoding::encode(&self.search_term())
        )
    }

    pub fn spotify_search_url(&self) -> String {
        format!(
            "https://open.spotify.com/search/{}",
            urlencoding::encode(&self.search_term())
        )
    }

    fn search_term(&self) -> String {
        format!("{} {}", self.name, self.artist)
    }
}

/// Response structure for Last.fm tag.gettoptracks
#[derive(Debug, Deserialize)]
pub struct TopTracksResponse {
    pub tracks: TopTracks,
}

#[derive(Debug, Deserialize)]
pub struct TopTracks {
    #[serde(default)]
    pub track: Vec<LastFmTrack>,
}

/// Raw Last.fm track entry
#[derive(Debug, Clone, Deserialize)]
pub struct LastFmTrack {
    pub name: String,
    pub url: String,
    pub artist: LastFmArtist,
    #[serde(default)]
    pub image: Vec<LastFmImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastFmArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastFmImage {
    #[serde(rename = "#text")]
    pub text: String,
    pub size: String,
}

impl LastFmTrack {
    /// Pick the largest available image, upgraded to https, or the placeholder
    pub fn best_image_url(&self) -> String {
        let candidate = ["extralarge", "large", "medium", "small"]
            .iter()
            .find_map(|size| {
                self.image
                    .iter()
                    .find(|image| image.size == *size)
                    .map(|image| image.text.as_str())
            })
            .unwrap_or("");

        if candidate.is_empty() {
            return PLACEHOLDER_IMAGE_URL.to_string();
        }

        match candidate.strip_prefix("http://") {
            Some(rest) => format!("https://{rest}"),
            None => candidate.to_string(),
        }
    }

    pub fn into_track(self) -> Track {
        let image_url = self.best_image_url();
        Track::new(&self.name, &self.artist.name, &image_url, &self.url)
    }
}

/// Response structure for the iTunes search API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesSearchResponse {
    #[serde(default)]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<ItunesResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesResult {
    pub artwork_url100: Option<String>,
}
