//! Interfaces to the external services the playlist pipeline talks to.
//!
//! Production implementations live in `client` (music) and `geo` (maps); tests
//! substitute mocks or fakes.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{Coordinate, RouteStep, Track};

/// Forward and reverse geocoding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free text to a coordinate, `None` when nothing matches
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ServiceError>;

    /// Label for a coordinate, preferring "City, State" and falling back to
    /// city, state, then the raw place name
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<Option<String>, ServiceError>;
}

/// Driving directions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Ordered steps of the first driving route, `None` when no route exists
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<Vec<RouteStep>>, ServiceError>;
}

/// Music metadata service queried by tag
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn fetch_top_tracks(&self, tag: &str) -> Result<Vec<Track>, ServiceError>;
}

/// Best-effort album artwork lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn fetch_artwork(&self, track_name: &str, artist_name: &str)
    -> Result<Option<String>, ServiceError>;
}
