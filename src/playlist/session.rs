use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::artwork::{ArtworkEnricher, ArtworkUpdate};
use super::orchestrator::TrackFetchOrchestrator;
use super::waypoints::extract_route_waypoints;
use super::{Playlist, PlaylistPreferences, StagingPlaylist, TagResolver, WaypointTrackSet};
use crate::error::PipelineError;
use crate::models::{Coordinate, RouteStep};
use crate::services::{ArtworkSource, DirectionsProvider, Geocoder, TrackSource};
use crate::store::PlaylistStore;

/// External services a session depends on
#[derive(Clone)]
pub struct PlaylistServices {
    pub geocoder: Arc<dyn Geocoder>,
    pub directions: Arc<dyn DirectionsProvider>,
    pub tracks: Arc<dyn TrackSource>,
    pub artwork: Arc<dyn ArtworkSource>,
}

/// One user's playlist-building session.
///
/// Every generate, refresh or restage takes a new generation number. Results are
/// only written to the staged playlist while their generation is still the latest,
/// so a slow request can never overwrite the outcome of a newer one.
pub struct PlaylistSession {
    geocoder: Arc<dyn Geocoder>,
    directions: Arc<dyn DirectionsProvider>,
    orchestrator: TrackFetchOrchestrator,
    enricher: ArtworkEnricher,
    preferences: PlaylistPreferences,
    rng: Mutex<StdRng>,
    generation: AtomicU64,
    staging: Mutex<Option<StagingPlaylist>>,
}

impl PlaylistSession {
    pub fn new(
        services: PlaylistServices,
        resolver: TagResolver,
        preferences: PlaylistPreferences,
    ) -> Self {
        if !preferences.has_known_genre() {
            warn!(genre = %preferences.selected_genre, "genre is not in the offered list");
        }
        let timeout = preferences.fetch_timeout();
        let rng = match preferences.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        PlaylistSession {
            geocoder: services.geocoder,
            directions: services.directions,
            orchestrator: TrackFetchOrchestrator::new(services.tracks, resolver, timeout),
            enricher: ArtworkEnricher::new(services.artwork, timeout),
            preferences,
            rng: Mutex::new(rng),
            generation: AtomicU64::new(0),
            staging: Mutex::new(None),
        }
    }

    /// Snapshot of the staged playlist
    pub async fn staging(&self) -> Option<StagingPlaylist> {
        self.staging.lock().await.clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn ensure_current(&self, generation: u64) -> Result<(), PipelineError> {
        if self.current_generation() == generation {
            Ok(())
        } else {
            Err(PipelineError::Superseded { generation })
        }
    }

    /// Build a fresh playlist for a trip from `start` to `end`
    pub async fn generate(&self, start: &str, end: &str) -> Result<StagingPlaylist, PipelineError> {
        let generation = self.begin();
        {
            let mut staging = self.staging.lock().await;
            self.ensure_current(generation)?;
            *staging = None;
        }
        info!(generation, start, end, "generating playlist");

        let preferences = &self.preferences;
        let timeout = preferences.fetch_timeout();

        let (origin, destination) =
            tokio::try_join!(self.locate(start, timeout), self.locate(end, timeout))?;
        let steps = self.route(origin, destination, start, end, timeout).await?;

        let waypoints =
            extract_route_waypoints(&steps, self.geocoder.as_ref(), start, end, timeout).await;
        // No point fetching tracks for a request nobody is waiting for
        self.ensure_current(generation)?;

        let tracks_by_waypoint = self
            .orchestrator
            .fetch_playlist(&waypoints, preferences, &self.rng)
            .await;
        let staged = StagingPlaylist {
            generation,
            start_location: start.to_string(),
            end_location: end.to_string(),
            waypoint_order: waypoints,
            tracks_by_waypoint,
        };

        let mut staging = self.staging.lock().await;
        self.ensure_current(generation)?;
        *staging = Some(staged.clone());
        info!(
            generation,
            waypoints = staged.waypoint_order.len(),
            tracks = staged.total_tracks(),
            "playlist ready"
        );
        Ok(staged)
    }

    /// Draw a new set of tracks for the staged waypoints.
    ///
    /// The current tracks are discarded right away; the staged playlist has no
    /// tracks until the new fetch completes.
    pub async fn refresh_tracks(&self) -> Result<WaypointTrackSet, PipelineError> {
        let (generation, waypoints) = {
            let mut staging = self.staging.lock().await;
            let staged = staging.as_mut().ok_or(PipelineError::NoActivePlaylist)?;
            // Only a refresh that replaces something may invalidate older requests
            let generation = self.begin();
            staged.generation = generation;
            staged.tracks_by_waypoint.clear();
            (generation, staged.waypoint_order.clone())
        };
        info!(generation, waypoints = waypoints.len(), "refreshing tracks");

        let tracks_by_waypoint = self
            .orchestrator
            .fetch_playlist(&waypoints, &self.preferences, &self.rng)
            .await;

        let mut staging = self.staging.lock().await;
        self.ensure_current(generation)?;
        let staged = staging.as_mut().ok_or(PipelineError::NoActivePlaylist)?;
        staged.tracks_by_waypoint = tracks_by_waypoint.clone();
        Ok(tracks_by_waypoint)
    }

    /// Make a saved playlist the staged one, e.g. to refresh its tracks
    pub async fn restage(&self, playlist: &Playlist) -> StagingPlaylist {
        let mut staging = self.staging.lock().await;
        let generation = self.begin();
        let staged = playlist.to_staging(generation);
        *staging = Some(staged.clone());
        debug!(generation, playlist = %playlist.id, "restaged saved playlist");
        staged
    }

    /// Freeze the staged playlist for `owner_id` and save it
    pub async fn download(
        &self,
        owner_id: &str,
        store: &dyn PlaylistStore,
    ) -> Result<Playlist, PipelineError> {
        let staged = self.staging().await.ok_or(PipelineError::NothingToSave)?;
        let playlist = Playlist::from_staging(&staged, owner_id)?;
        store.save(&playlist)?;
        info!(playlist = %playlist.id, owner = owner_id, "playlist saved");
        Ok(playlist)
    }

    /// Start background artwork lookups for the staged tracks
    pub async fn start_artwork_enrichment(&self) -> Option<mpsc::UnboundedReceiver<ArtworkUpdate>> {
        let staging = self.staging.lock().await;
        staging.as_ref().map(|staged| self.enricher.spawn(staged))
    }

    /// Attach artwork to a staged track. Ignored when the update belongs to an
    /// older generation or the track is gone.
    pub async fn apply_artwork(&self, update: ArtworkUpdate) -> bool {
        let mut staging = self.staging.lock().await;
        let Some(staged) = staging.as_mut() else {
            return false;
        };
        if staged.generation != update.generation {
            debug!(update = update.generation, current = staged.generation, "stale artwork dropped");
            return false;
        }

        let track = staged
            .tracks_by_waypoint
            .get_mut(&update.waypoint)
            .and_then(|tracks| tracks.iter_mut().find(|t| t.id == update.track_id));
        match track {
            Some(track) => {
                track.artwork_url = Some(update.artwork_url);
                true
            }
            None => false,
        }
    }

    /// Apply artwork updates until the lookups finish or `budget` runs out.
    /// Returns how many tracks got artwork.
    pub async fn collect_artwork(
        &self,
        mut updates: mpsc::UnboundedReceiver<ArtworkUpdate>,
        budget: Duration,
    ) -> usize {
        let mut applied = 0;
        let drain = async {
            while let Some(update) = updates.recv().await {
                if self.apply_artwork(update).await {
                    applied += 1;
                }
            }
        };
        if tokio::time::timeout(budget, drain).await.is_err() {
            debug!("artwork budget exhausted, remaining lookups ignored");
        }
        applied
    }

    async fn locate(&self, address: &str, timeout: Duration) -> Result<Coordinate, PipelineError> {
        let failure = || PipelineError::Geocode {
            address: address.to_string(),
        };
        match tokio::time::timeout(timeout, self.geocoder.geocode(address)).await {
            Ok(Ok(Some(coordinate))) => Ok(coordinate),
            Ok(Ok(None)) => {
                warn!(address, "address not found");
                Err(failure())
            }
            Ok(Err(e)) => {
                warn!(address, error = %e, "geocoding failed");
                Err(failure())
            }
            Err(_) => {
                warn!(address, "geocoding timed out");
                Err(failure())
            }
        }
    }

    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        start: &str,
        end: &str,
        timeout: Duration,
    ) -> Result<Vec<RouteStep>, PipelineError> {
        let unavailable = || PipelineError::RouteUnavailable {
            start: start.to_string(),
            end: end.to_string(),
        };
        match tokio::time::timeout(timeout, self.directions.directions(origin, destination)).await {
            Ok(Ok(Some(steps))) => {
                debug!(steps = steps.len(), "route found");
                Ok(steps)
            }
            Ok(Ok(None)) => {
                warn!(start, end, "no route found");
                Err(unavailable())
            }
            Ok(Err(e)) => {
                warn!(start, end, error = %e, "directions failed");
                Err(unavailable())
            }
            Err(_) => {
                warn!(start, end, "directions timed out");
                Err(unavailable())
            }
        }
    }
}
