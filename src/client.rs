use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use tracing::debug;
use ureq::{Agent, AgentBuilder};
use urlencoding::encode;

use crate::config::Config;
use crate::error::ServiceError;
use crate::models::{ItunesSearchResponse, TopTracksResponse, Track};
use crate::services::{ArtworkSource, TrackSource};

const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const TOP_TRACKS_LIMIT: u32 = 50;
const MAX_TOP_TRACKS_PAGE: u32 = 3;

/// Build the agent shared by every client
pub fn build_agent(config: &Config) -> Agent {
    AgentBuilder::new()
        .timeout_connect(Duration::from_secs(5))
        .timeout_read(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(&config.user_agent)
        .build()
}

/// GET `url` on a blocking worker and decode the JSON body
pub(crate) async fn get_json<T>(agent: &Agent, url: String) -> Result<T, ServiceError>
where
    T: DeserializeOwned + Send + 'static,
{
    let agent = agent.clone();
    tokio::task::spawn_blocking(move || -> Result<T, ServiceError> {
        let response = agent.get(&url).call()?;
        let body = response
            .into_string()
            .map_err(|e| ServiceError::Http(format!("failed to read body: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    })
    .await?
}

/// A Last.fm client for tag charts
pub struct LastFmClient {
    agent: Agent,
    base_url: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(agent: Agent, api_key: &str) -> Self {
        Self::with_base_url(agent, api_key, LASTFM_API_URL)
    }

    pub fn with_base_url(agent: Agent, api_key: &str, base_url: &str) -> Self {
        LastFmClient {
            agent,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn top_tracks_url(&self, tag: &str, page: u32) -> String {
        format!(
            "{}?method=tag.gettoptracks&tag={}&api_key={}&format=json&limit={}&page={}",
            self.base_url,
            encode(tag),
            encode(&self.api_key),
            TOP_TRACKS_LIMIT,
            page
        )
    }
}

#[async_trait]
impl TrackSource for LastFmClient {
    async fn fetch_top_tracks(&self, tag: &str) -> Result<Vec<Track>, ServiceError> {
        // A random page keeps refreshes from drawing on the same pool
        let page = rand::thread_rng().gen_range(1..=MAX_TOP_TRACKS_PAGE);
        let url = self.top_tracks_url(tag, page);
        debug!(tag, page, "fetching top tracks");

        let parsed: TopTracksResponse = get_json(&self.agent, url).await?;
        let tracks: Vec<Track> = parsed
            .tracks
            .track
            .into_iter()
            .map(|item| item.into_track())
            .collect();

        debug!(tag, count = tracks.len(), "received top tracks");
        Ok(tracks)
    }
}

/// iTunes search client used for album artwork
pub struct ItunesClient {
    agent: Agent,
    base_url: String,
}

impl ItunesClient {
    pub fn new(agent: Agent, base_url: &str) -> Self {
        ItunesClient {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, track_name: &str, artist_name: &str) -> String {
        format!(
            "{}/search?term={}&entity=song",
            self.base_url,
            encode(&format!("{track_name} {artist_name}"))
        )
    }
}

#[async_trait]
impl ArtworkSource for ItunesClient {
    async fn fetch_artwork(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> Result<Option<String>, ServiceError> {
        let url = self.search_url(track_name, artist_name);
        let parsed: ItunesSearchResponse = get_json(&self.agent, url).await?;

        if parsed.result_count == 0 {
            debug!(track_name, artist_name, "no iTunes match");
        }

        // Use the first result's artwork if available
        let artwork = parsed
            .results
            .into_iter()
            .next()
            .and_then(|result| result.artwork_url100)
            .filter(|url| !url.is_empty());

        if artwork.is_none() {
            debug!(track_name, artist_name, "iTunes returned no artwork");
        }
        Ok(artwork)
    }
}
