use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PlaylistPreferences, TagResolver, WaypointTrackSet};
use crate::models::Track;
use crate::services::TrackSource;

/// Fetches a track set for every waypoint of a route.
///
/// One request per distinct waypoint runs concurrently. A request that fails,
/// times out or returns garbage leaves its waypoint with no tracks and never
/// affects the others. The result is only produced once every request has settled.
pub struct TrackFetchOrchestrator {
    source: Arc<dyn TrackSource>,
    resolver: TagResolver,
    timeout: Duration,
}

impl TrackFetchOrchestrator {
    pub fn new(source: Arc<dyn TrackSource>, resolver: TagResolver, timeout: Duration) -> Self {
        Self {
            source,
            resolver,
            timeout,
        }
    }

    /// Fetch, deduplicate and sample tracks for `waypoints`. The random source is
    /// only locked for sampling, after every fetch has settled.
    pub async fn fetch_playlist<R: Rng + Send>(
        &self,
        waypoints: &[String],
        preferences: &PlaylistPreferences,
        rng: &Mutex<R>,
    ) -> WaypointTrackSet {
        let fetched = self.fetch_unique_tracks(waypoints, preferences).await;
        let mut rng = rng.lock().await;
        sample_tracks(fetched, preferences.max_tracks_per_waypoint, &mut *rng)
    }

    /// Fan out one request per distinct waypoint and wait for all of them.
    /// Returns each waypoint with its tracks, deduplicated by id, in route order.
    pub async fn fetch_unique_tracks(
        &self,
        waypoints: &[String],
        preferences: &PlaylistPreferences,
    ) -> Vec<(String, Vec<Track>)> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = waypoints
            .iter()
            .filter(|waypoint| seen.insert(waypoint.as_str()))
            .collect();

        let requests = distinct.iter().map(|waypoint| {
            let tag = self
                .resolver
                .resolve_tag(waypoint, preferences.mode, &preferences.selected_genre);
            async move {
                let tracks = self.fetch_for_tag(waypoint, &tag).await;
                (waypoint.to_string(), dedup_by_id(tracks))
            }
        });
        let results = join_all(requests).await;

        let empty = results.iter().filter(|(_, tracks)| tracks.is_empty()).count();
        info!(
            waypoints = results.len(),
            empty, "track fetch finished for all waypoints"
        );
        results
    }

    async fn fetch_for_tag(&self, waypoint: &str, tag: &str) -> Vec<Track> {
        debug!(waypoint, tag, "fetching tracks");
        match tokio::time::timeout(self.timeout, self.source.fetch_top_tracks(tag)).await {
            Ok(Ok(tracks)) => tracks,
            Ok(Err(e)) => {
                warn!(waypoint, tag, error = %e, "track fetch failed, waypoint left empty");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    waypoint,
                    tag,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "track fetch timed out, waypoint left empty"
                );
                Vec::new()
            }
        }
    }
}

/// Keep the first track for each id
pub fn dedup_by_id(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect()
}

/// Randomly pick at most `max_tracks` tracks for each waypoint.
///
/// Waypoints are visited in order so a seeded `rng` always gives the same picks.
pub fn sample_tracks<R: Rng + ?Sized>(
    fetched: Vec<(String, Vec<Track>)>,
    max_tracks: usize,
    rng: &mut R,
) -> WaypointTrackSet {
    fetched
        .into_iter()
        .map(|(waypoint, mut tracks)| {
            tracks.shuffle(rng);
            tracks.truncate(max_tracks);
            (waypoint, tracks)
        })
        .collect()
}
