use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::Track;

/// Tracks picked for each waypoint label
pub type WaypointTrackSet = HashMap<String, Vec<Track>>;

/// The playlist being assembled for the current session. Rebuilt wholesale on every
/// generate or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingPlaylist {
    pub generation: u64,
    pub start_location: String,
    pub end_location: String,
    pub waypoint_order: Vec<String>,
    pub tracks_by_waypoint: WaypointTrackSet,
}

impl StagingPlaylist {
    pub fn tracks_for(&self, waypoint: &str) -> &[Track] {
        self.tracks_by_waypoint
            .get(waypoint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True once every waypoint has an entry, even an empty one
    pub fn is_complete(&self) -> bool {
        self.waypoint_order
            .iter()
            .all(|waypoint| self.tracks_by_waypoint.contains_key(waypoint))
    }

    pub fn total_tracks(&self) -> usize {
        self.tracks_by_waypoint.values().map(Vec::len).sum()
    }

    pub fn metadata(&self, minutes_per_track: f64) -> PlaylistMetadata {
        PlaylistMetadata::from_tracks(&self.waypoint_order, &self.tracks_by_waypoint, minutes_per_track)
    }
}

/// A downloaded playlist. Never modified after it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub owner_id: String,
    pub start_location: String,
    pub end_location: String,
    pub tracks_by_waypoint: WaypointTrackSet,
    pub waypoint_order: Vec<String>,
}

impl Playlist {
    /// Freeze a staged playlist for `owner_id`
    pub fn from_staging(staging: &StagingPlaylist, owner_id: &str) -> Result<Self, PipelineError> {
        if owner_id.trim().is_empty() {
            return Err(PipelineError::NotSignedIn);
        }
        if staging.waypoint_order.is_empty()
            || staging.tracks_by_waypoint.is_empty()
            || !staging.is_complete()
        {
            return Err(PipelineError::NothingToSave);
        }

        Ok(Playlist {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            owner_id: owner_id.to_string(),
            start_location: staging.start_location.clone(),
            end_location: staging.end_location.clone(),
            tracks_by_waypoint: staging.tracks_by_waypoint.clone(),
            waypoint_order: staging.waypoint_order.clone(),
        })
    }

    /// Title shown in playlist listings
    pub fn title(&self) -> String {
        format!("{} → {} Playlist", self.start_location, self.end_location)
    }

    /// Copy route and tracks back into a staging playlist
    pub fn to_staging(&self, generation: u64) -> StagingPlaylist {
        StagingPlaylist {
            generation,
            start_location: self.start_location.clone(),
            end_location: self.end_location.clone(),
            waypoint_order: self.waypoint_order.clone(),
            tracks_by_waypoint: self.tracks_by_waypoint.clone(),
        }
    }

    pub fn metadata(&self, minutes_per_track: f64) -> PlaylistMetadata {
        PlaylistMetadata::from_tracks(&self.waypoint_order, &self.tracks_by_waypoint, minutes_per_track)
    }
}

/// Metadata about the playlist composition
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMetadata {
    pub waypoint_count: usize,
    pub total_tracks: usize,
    pub artist_count: usize,
    pub empty_waypoints: usize,
    pub estimated_minutes: f64, // display only
}

impl PlaylistMetadata {
    pub fn from_tracks(
        waypoint_order: &[String],
        tracks_by_waypoint: &WaypointTrackSet,
        minutes_per_track: f64,
    ) -> Self {
        let total_tracks = tracks_by_waypoint.values().map(Vec::len).sum::<usize>();
        let artist_count = tracks_by_waypoint
            .values()
            .flatten()
            .map(|track| track.artist.to_lowercase())
            .collect::<HashSet<_>>()
            .len();
        let empty_waypoints = waypoint_order
            .iter()
            .filter(|waypoint| tracks_by_waypoint.get(*waypoint).is_none_or(Vec::is_empty))
            .count();

        PlaylistMetadata {
            waypoint_count: waypoint_order.len(),
            total_tracks,
            artist_count,
            empty_waypoints,
            estimated_minutes: total_tracks as f64 * minutes_per_track,
        }
    }

    /// "🎶 12 Tracks • ⏱ ~42 min"
    pub fn summary_line(&self) -> String {
        format!(
            "🎶 {} Tracks • ⏱ ~{} min",
            self.total_tracks,
            self.estimated_minutes as u64
        )
    }
}
