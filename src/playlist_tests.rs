// End-to-end scenarios for a playlist session, with every external service faked

#[cfg(test)]
mod tests {
    use std::ops::Range;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{PipelineError, ServiceError};
    use crate::models::{Coordinate, RouteStep, Track};
    use crate::playlist::artwork::ArtworkUpdate;
    use crate::playlist::{
        PlaylistMode, PlaylistPreferences, PlaylistServices, PlaylistSession, TagResolver,
    };
    use crate::services::{
        ArtworkSource, DirectionsProvider, Geocoder, MockArtworkSource, MockDirectionsProvider,
        MockGeocoder, TrackSource,
    };
    use crate::store::{JsonFileStore, PlaylistStore};

    const NEW_HAVEN: Coordinate = Coordinate {
        latitude: 41.31,
        longitude: -72.93,
    };
    const STAMFORD: Coordinate = Coordinate {
        latitude: 41.05,
        longitude: -73.54,
    };

    /// Knows the two trip endpoints and labels route steps by latitude
    struct FakeGeocoder;

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ServiceError> {
            Ok(match address {
                "New Haven" => Some(NEW_HAVEN),
                "Stamford" => Some(STAMFORD),
                _ => None,
            })
        }

        async fn reverse_geocode(&self, c: Coordinate) -> Result<Option<String>, ServiceError> {
            let label = if c.latitude > 41.3 {
                "New Haven, CT"
            } else if c.latitude > 41.15 {
                "Bridgeport, CT"
            } else {
                "Stamford, CT"
            };
            Ok(Some(label.to_string()))
        }
    }

    struct FakeDirections;

    #[async_trait]
    impl DirectionsProvider for FakeDirections {
        async fn directions(
            &self,
            _origin: Coordinate,
            _destination: Coordinate,
        ) -> Result<Option<Vec<RouteStep>>, ServiceError> {
            Ok(Some(vec![
                RouteStep::new(NEW_HAVEN, ""),
                RouteStep::new(Coordinate::new(41.31, -72.95), "Turn left onto I 95"),
                RouteStep::new(Coordinate::new(41.18, -73.19), "Continue onto I 95"),
                RouteStep::new(Coordinate::new(41.17, -73.20), "Keep left"),
                RouteStep::new(STAMFORD, "Arrive at destination"),
            ]))
        }
    }

    /// Returns ten tracks named after the call number. Calls whose number falls in
    /// `slow` are delayed, which lets a later request overtake an earlier one.
    struct NumberedTracks {
        calls: AtomicUsize,
        slow: Range<usize>,
        delay: Duration,
    }

    impl NumberedTracks {
        fn fast() -> Self {
            Self::slow(0..0, Duration::ZERO)
        }

        fn slow(slow: Range<usize>, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                slow,
                delay,
            }
        }
    }

    #[async_trait]
    impl TrackSource for NumberedTracks {
        async fn fetch_top_tracks(&self, tag: &str) -> Result<Vec<Track>, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow.contains(&call) {
                tokio::time::sleep(self.delay).await;
            }
            Ok((0..10)
                .map(|i| Track::new(&format!("call{call} {tag} {i}"), "Band", "", ""))
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingTracks {
        tags: tokio::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TrackSource for RecordingTracks {
        async fn fetch_top_tracks(&self, tag: &str) -> Result<Vec<Track>, ServiceError> {
            self.tags.lock().await.push(tag.to_string());
            Ok(vec![Track::new("Take Five", "Dave Brubeck", "", "")])
        }
    }

    fn no_artwork() -> Arc<dyn ArtworkSource> {
        let mut artwork = MockArtworkSource::new();
        artwork.expect_fetch_artwork().returning(|_, _| Ok(None));
        Arc::new(artwork)
    }

    fn services(tracks: Arc<dyn TrackSource>, artwork: Arc<dyn ArtworkSource>) -> PlaylistServices {
        PlaylistServices {
            geocoder: Arc::new(FakeGeocoder),
            directions: Arc::new(FakeDirections),
            tracks,
            artwork,
        }
    }

    fn new_session(services: PlaylistServices) -> PlaylistSession {
        let preferences = PlaylistPreferences {
            seed: Some(11),
            ..PlaylistPreferences::default()
        };
        PlaylistSession::new(services, TagResolver::default(), preferences)
    }

    fn call_prefix(track: &Track) -> &str {
        track.name.split(' ').next().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_generate_builds_ordered_waypoints_and_tracks() {
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));

        let staged = session.generate("New Haven", "Stamford").await.unwrap();
        assert_eq!(
            staged.waypoint_order,
            vec!["New Haven, CT", "Bridgeport, CT", "Stamford, CT"]
        );
        assert_eq!(staged.tracks_by_waypoint.len(), 3);
        assert!(staged.is_complete());
        for tracks in staged.tracks_by_waypoint.values() {
            assert_eq!(tracks.len(), 7);
        }
        assert_eq!(session.staging().await, Some(staged));
    }

    #[tokio::test]
    async fn test_unknown_address_is_a_geocode_failure() {
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));

        let err = session.generate("Atlantis", "Stamford").await.unwrap_err();
        assert!(matches!(err, PipelineError::Geocode { ref address } if address == "Atlantis"));
        assert!(session.staging().await.is_none());
    }

    #[tokio::test]
    async fn test_geocoder_error_aborts_before_directions() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_geocode()
            .returning(|_| Err(ServiceError::Http("connection refused".to_string())));
        let mut directions = MockDirectionsProvider::new();
        directions.expect_directions().never();

        let session = new_session(PlaylistServices {
            geocoder: Arc::new(geocoder),
            directions: Arc::new(directions),
            tracks: Arc::new(NumberedTracks::fast()),
            artwork: no_artwork(),
        });

        assert!(matches!(
            session.generate("New Haven", "Stamford").await,
            Err(PipelineError::Geocode { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_route_is_route_unavailable() {
        let mut directions = MockDirectionsProvider::new();
        directions.expect_directions().times(1).returning(|_, _| Ok(None));
        let tracks = Arc::new(NumberedTracks::fast());

        let session = new_session(PlaylistServices {
            geocoder: Arc::new(FakeGeocoder),
            directions: Arc::new(directions),
            tracks: tracks.clone(),
            artwork: no_artwork(),
        });

        let err = session.generate("New Haven", "Stamford").await.unwrap_err();
        assert!(matches!(err, PipelineError::RouteUnavailable { .. }));
        assert_eq!(tracks.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_tracks_wholesale() {
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));
        let first = session.generate("New Haven", "Stamford").await.unwrap();
        let refreshed = session.refresh_tracks().await.unwrap();

        assert_eq!(refreshed.len(), first.waypoint_order.len());
        for (waypoint, tracks) in &refreshed {
            assert!(first.tracks_by_waypoint.contains_key(waypoint));
            // calls 0..=2 served the first pass
            assert!(
                tracks
                    .iter()
                    .all(|t| !["call0", "call1", "call2"].contains(&call_prefix(t)))
            );
        }
        let staged = session.staging().await.unwrap();
        assert_eq!(staged.tracks_by_waypoint, refreshed);
        assert_eq!(staged.waypoint_order, first.waypoint_order);
    }

    #[tokio::test]
    async fn test_refresh_without_playlist() {
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));
        assert!(matches!(
            session.refresh_tracks().await,
            Err(PipelineError::NoActivePlaylist)
        ));
    }

    #[tokio::test]
    async fn test_stale_refresh_cannot_overwrite_newer_one() {
        // generate uses calls 0..3, the first refresh 3..6
        let tracks = NumberedTracks::slow(3..6, Duration::from_millis(300));
        let session = new_session(services(Arc::new(tracks), no_artwork()));
        session.generate("New Haven", "Stamford").await.unwrap();

        let (older, newer) = tokio::join!(session.refresh_tracks(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.refresh_tracks().await
        });

        assert!(matches!(older, Err(PipelineError::Superseded { generation: 2 })));
        let newer = newer.unwrap();
        let staged = session.staging().await.unwrap();
        assert_eq!(staged.tracks_by_waypoint, newer);
        assert!(
            newer
                .values()
                .flatten()
                .all(|t| ["call6", "call7", "call8"].contains(&call_prefix(t)))
        );
    }

    #[tokio::test]
    async fn test_rejected_refresh_leaves_generate_running() {
        let tracks = NumberedTracks::slow(0..3, Duration::from_millis(300));
        let session = new_session(services(Arc::new(tracks), no_artwork()));

        let (generated, refreshed) = tokio::join!(session.generate("New Haven", "Stamford"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.refresh_tracks().await
        });

        assert!(matches!(refreshed, Err(PipelineError::NoActivePlaylist)));
        let generated = generated.unwrap();
        assert_eq!(generated.generation, 1);
        assert_eq!(session.current_generation(), 1);
        assert_eq!(session.staging().await, Some(generated));
    }

    #[tokio::test]
    async fn test_restage_supersedes_generate_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("saved.json"));
        let first = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));
        first.generate("New Haven", "Stamford").await.unwrap();
        let saved = first.download("amy@example.com", &store).await.unwrap();

        let tracks = NumberedTracks::slow(0..3, Duration::from_millis(300));
        let session = new_session(services(Arc::new(tracks), no_artwork()));
        let (generated, restaged) = tokio::join!(session.generate("New Haven", "Stamford"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.restage(&saved).await
        });

        assert!(matches!(generated, Err(PipelineError::Superseded { generation: 1 })));
        assert_eq!(restaged.generation, 2);
        assert_eq!(restaged.tracks_by_waypoint, saved.tracks_by_waypoint);
        assert_eq!(session.staging().await, Some(restaged));
    }

    #[tokio::test]
    async fn test_newer_generate_supersedes_older_one() {
        let tracks = NumberedTracks::slow(0..3, Duration::from_millis(300));
        let session = new_session(services(Arc::new(tracks), no_artwork()));

        let (older, newer) = tokio::join!(session.generate("New Haven", "Stamford"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.generate("New Haven", "Stamford").await
        });

        assert!(matches!(older, Err(PipelineError::Superseded { generation: 1 })));
        let newer = newer.unwrap();
        assert_eq!(newer.generation, 2);
        assert_eq!(session.staging().await, Some(newer));
    }

    #[tokio::test]
    async fn test_artwork_arrives_after_playlist_and_is_applied() {
        let mut artwork = MockArtworkSource::new();
        artwork.expect_fetch_artwork().returning(|name: &str, _: &str| {
            if name.ends_with(" 0") {
                Err(ServiceError::Status(500))
            } else {
                Ok(Some(format!("https://art/{}.jpg", name.replace(' ', "_"))))
            }
        });
        let session = new_session(services(Arc::new(NumberedTracks::fast()), Arc::new(artwork)));

        let staged = session.generate("New Haven", "Stamford").await.unwrap();
        assert!(staged.tracks_by_waypoint.values().flatten().all(|t| t.artwork_url.is_none()));

        let updates = session.start_artwork_enrichment().await.unwrap();
        let applied = session.collect_artwork(updates, Duration::from_secs(5)).await;

        let enriched = session.staging().await.unwrap();
        let with_art = enriched
            .tracks_by_waypoint
            .values()
            .flatten()
            .filter(|t| t.artwork_url.is_some())
            .count();
        assert_eq!(applied, with_art);
        // failed lookups keep the track, just without artwork
        assert_eq!(enriched.total_tracks(), staged.total_tracks());
        for track in enriched.tracks_by_waypoint.values().flatten() {
            assert_eq!(track.artwork_url.is_some(), !track.name.ends_with(" 0"));
        }
    }

    #[tokio::test]
    async fn test_artwork_for_old_generation_is_ignored() {
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));
        let staged = session.generate("New Haven", "Stamford").await.unwrap();
        let waypoint = staged.waypoint_order[0].clone();
        let track_id = staged.tracks_for(&waypoint)[0].id.clone();

        session.refresh_tracks().await.unwrap();
        let applied = session
            .apply_artwork(ArtworkUpdate {
                generation: staged.generation,
                waypoint,
                track_id,
                artwork_url: "https://art/old.jpg".to_string(),
            })
            .await;

        assert!(!applied);
        let current = session.staging().await.unwrap();
        assert!(current.tracks_by_waypoint.values().flatten().all(|t| t.artwork_url.is_none()));
    }

    #[tokio::test]
    async fn test_download_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("saved.json"));
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));

        assert!(matches!(
            session.download("amy@example.com", &store).await,
            Err(PipelineError::NothingToSave)
        ));

        session.generate("New Haven", "Stamford").await.unwrap();
        assert!(matches!(
            session.download("", &store).await,
            Err(PipelineError::NotSignedIn)
        ));

        let saved = session.download("amy@example.com", &store).await.unwrap();
        assert_eq!(saved.start_location, "New Haven");
        assert_eq!(saved.end_location, "Stamford");
        assert_eq!(store.load_for_owner("amy@example.com").unwrap(), vec![saved]);
        assert!(store.load_for_owner("sam@example.com").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restaged_playlist_can_be_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("saved.json"));
        let session = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));
        session.generate("New Haven", "Stamford").await.unwrap();
        let saved = session.download("amy@example.com", &store).await.unwrap();

        let other = new_session(services(Arc::new(NumberedTracks::fast()), no_artwork()));
        let staged = other.restage(&saved).await;
        assert_eq!(staged.waypoint_order, saved.waypoint_order);

        let refreshed = other.refresh_tracks().await.unwrap();
        assert_eq!(refreshed.len(), saved.waypoint_order.len());
    }

    #[tokio::test]
    async fn test_genre_mode_queries_selected_genre() {
        let tracks = Arc::new(RecordingTracks::default());
        let preferences = PlaylistPreferences {
            mode: PlaylistMode::GenreOnly,
            selected_genre: "jazz".to_string(),
            ..PlaylistPreferences::default()
        };
        let session = PlaylistSession::new(
            services(tracks.clone(), no_artwork()),
            TagResolver::default(),
            preferences,
        );

        session.generate("New Haven", "Stamford").await.unwrap();
        assert_eq!(*tracks.tags.lock().await, vec!["jazz", "jazz", "jazz"]);
    }
}
