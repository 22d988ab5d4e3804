use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::StagingPlaylist;
use crate::services::ArtworkSource;

const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Artwork found for one staged track
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkUpdate {
    pub generation: u64,
    pub waypoint: String,
    pub track_id: String,
    pub artwork_url: String,
}

struct ArtworkJob {
    waypoint: String,
    track_id: String,
    name: String,
    artist: String,
}

/// Looks up album artwork in the background, after a playlist is already usable
pub struct ArtworkEnricher {
    source: Arc<dyn ArtworkSource>,
    timeout: Duration,
}

impl ArtworkEnricher {
    pub fn new(source: Arc<dyn ArtworkSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Start lookups for every track of `staging`.
    ///
    /// Updates arrive on the returned channel as lookups succeed; the channel closes
    /// once all lookups are done. Failed lookups produce nothing.
    pub fn spawn(&self, staging: &StagingPlaylist) -> mpsc::UnboundedReceiver<ArtworkUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = staging.generation;
        let mut seen = HashSet::new();
        let jobs: Vec<ArtworkJob> = staging
            .waypoint_order
            .iter()
            .filter(|waypoint| seen.insert(waypoint.as_str()))
            .flat_map(|waypoint| {
                staging.tracks_for(waypoint).iter().map(move |track| ArtworkJob {
                    waypoint: waypoint.clone(),
                    track_id: track.id.clone(),
                    name: track.name.clone(),
                    artist: track.artist.clone(),
                })
            })
            .collect();

        info!(generation, tracks = jobs.len(), "starting artwork lookups");
        let source = Arc::clone(&self.source);
        let timeout = self.timeout;

        tokio::spawn(async move {
            futures::stream::iter(jobs)
                .for_each_concurrent(MAX_CONCURRENT_LOOKUPS, |job| {
                    let source = Arc::clone(&source);
                    let tx = tx.clone();
                    async move {
                        let lookup = source.fetch_artwork(&job.name, &job.artist);
                        let artwork_url = match tokio::time::timeout(timeout, lookup).await {
                            Ok(Ok(Some(url))) => url,
                            Ok(Ok(None)) => return,
                            Ok(Err(e)) => {
                                debug!(track = %job.track_id, error = %e, "artwork lookup failed");
                                return;
                            }
                            Err(_) => {
                                debug!(track = %job.track_id, "artwork lookup timed out");
                                return;
                            }
                        };
                        // The receiver may be gone already, nobody cares about the artwork then
                        let _ = tx.send(ArtworkUpdate {
                            generation,
                            waypoint: job.waypoint,
                            track_id: job.track_id,
                            artwork_url,
                        });
                    }
                })
                .await;
        });

        rx
    }
}
