use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod client;
mod config;
mod error;
mod geo;
mod models;
mod playlist;
mod services;
mod store;

#[cfg(test)]
mod playlist_tests;

use crate::client::{ItunesClient, LastFmClient, build_agent};
use crate::config::{Config, load_config};
use crate::error::PipelineError;
use crate::geo::{NominatimClient, OsrmClient};
use crate::playlist::utils::{PlaylistFormatting, ToTitleCase};
use crate::playlist::{
    PlaylistMode, PlaylistPreferences, PlaylistServices, PlaylistSession, TagResolver,
    WaypointTrackSet, load_city_tags_from_file,
};
use crate::store::{JsonFileStore, PlaylistStore};

#[derive(Parser)]
#[command(name = "roadtrip-playlist")]
#[command(about = "Build a playlist for a road trip from the places along the route")]
#[command(version)]
struct Args {
    /// Quiet mode - only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a playlist for a trip
    Generate {
        /// Where the trip starts, e.g. "New Haven"
        #[arg(long = "from")]
        from: String,

        /// Where the trip ends
        #[arg(long = "to")]
        to: String,

        #[arg(short = 'm', long = "mode", value_enum, default_value_t = PlaylistMode::LocationOnly)]
        mode: PlaylistMode,

        /// Genre used by the genre and hybrid modes (defaults to DEFAULT_GENRE)
        #[arg(short = 'g', long = "genre")]
        genre: Option<String>,

        /// Save the playlist for this user
        #[arg(short = 'o', long = "owner")]
        owner: Option<String>,

        /// Seed for track sampling, for reproducible playlists
        #[arg(long = "seed")]
        seed: Option<u64>,

        /// JSON file mapping city names to Last.fm tags
        #[arg(long = "city-tags")]
        city_tags: Option<String>,

        /// Print the playlist without saving it
        #[arg(short = 'd', long = "debug")]
        debug: bool,
    },
    /// List a user's saved playlists
    Saved {
        #[arg(short = 'o', long = "owner")]
        owner: String,
    },
    /// Show one saved playlist
    Show {
        #[arg(short = 'o', long = "owner")]
        owner: String,

        #[arg(long = "id")]
        id: Uuid,
    },
    /// Draw new tracks for a saved playlist's waypoints
    Refresh {
        #[arg(short = 'o', long = "owner")]
        owner: String,

        #[arg(long = "id")]
        id: Uuid,

        #[arg(short = 'm', long = "mode", value_enum, default_value_t = PlaylistMode::LocationOnly)]
        mode: PlaylistMode,

        #[arg(short = 'g', long = "genre")]
        genre: Option<String>,

        /// JSON file mapping city names to Last.fm tags
        #[arg(long = "city-tags")]
        city_tags: Option<String>,

        /// Save the refreshed playlist as a new entry
        #[arg(short = 's', long = "save")]
        save: bool,
    },
    /// Delete a saved playlist
    Delete {
        #[arg(short = 'o', long = "owner")]
        owner: String,

        #[arg(long = "id")]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    // Load configuration from .env
    let config = load_config()?;
    let store = JsonFileStore::new(&config.store_path);

    match args.command {
        Command::Generate {
            from,
            to,
            mode,
            genre,
            owner,
            seed,
            city_tags,
            debug,
        } => {
            let preferences = preferences(&config, mode, genre, seed);
            let session = PlaylistSession::new(
                services(&config),
                resolver(city_tags.as_deref())?,
                preferences.clone(),
            );

            match preferences.mode {
                PlaylistMode::LocationOnly => println!(
                    "\n🚗 Building a {} playlist from {from} to {to}...",
                    preferences.mode.label()
                ),
                _ => println!(
                    "\n🚗 Building a {} ({}) playlist from {from} to {to}...",
                    preferences.mode.label(),
                    preferences.selected_genre.to_title_case()
                ),
            }
            let mut staged = session.generate(&from, &to).await?;
            let mut found = 0;
            if let Some(updates) = session.start_artwork_enrichment().await {
                let budget = Duration::from_secs(config.fetch_timeout_secs);
                found = session.collect_artwork(updates, budget).await;
            }
            if let Some(enriched) = session.staging().await {
                staged = enriched;
            }

            print_tracks(&staged.waypoint_order, &staged.tracks_by_waypoint);
            println!(
                "\n{}",
                staged.metadata(preferences.minutes_per_track).summary_line()
            );
            println!("Found artwork for {found}/{} tracks", staged.total_tracks());

            if debug {
                println!("\n🔍 DEBUG MODE: playlist not saved");
                return Ok(());
            }
            match session
                .download(owner.as_deref().unwrap_or_default(), &store)
                .await
            {
                Ok(saved) => println!("✓ Saved '{}' with ID: {}", saved.title(), saved.id),
                Err(PipelineError::NotSignedIn) => {
                    println!("Pass --owner to save this playlist");
                }
                Err(e) => {
                    eprintln!("✗ Failed to save playlist: {e}");
                    return Err(e.into());
                }
            }
        }
        Command::Saved { owner } => {
            let playlists = store.load_for_owner(&owner)?;
            if playlists.is_empty() {
                println!("No saved playlists for {owner}");
            }
            for saved in &playlists {
                let metadata = saved.metadata(PlaylistPreferences::default().minutes_per_track);
                println!("{}  {}", saved.id, saved.title());
                println!(
                    "   {} | {}",
                    PlaylistFormatting::created_label(&saved.created_at),
                    metadata.summary_line()
                );
            }
        }
        Command::Show { owner, id } => {
            let saved = store.find(&owner, id)?;
            println!("{}", saved.title());
            println!("{}", "=".repeat(saved.title().chars().count()));
            println!(
                "Created {}",
                PlaylistFormatting::created_label(&saved.created_at)
            );
            print_tracks(&saved.waypoint_order, &saved.tracks_by_waypoint);

            let first = saved
                .waypoint_order
                .iter()
                .filter_map(|waypoint| saved.tracks_by_waypoint.get(waypoint))
                .flatten()
                .next();
            if let Some(cover) = first {
                println!("\nCover: {}", cover.display_image());
            }
        }
        Command::Refresh {
            owner,
            id,
            mode,
            genre,
            city_tags,
            save,
        } => {
            let saved = store.find(&owner, id)?;
            let preferences = preferences(&config, mode, genre, None);
            let session = PlaylistSession::new(
                services(&config),
                resolver(city_tags.as_deref())?,
                preferences,
            );
            session.restage(&saved).await;

            println!("\n🔄 Refreshing tracks for {}...", saved.title());
            let tracks_by_waypoint = session.refresh_tracks().await?;
            print_tracks(&saved.waypoint_order, &tracks_by_waypoint);

            if save {
                let refreshed = session.download(&owner, &store).await?;
                println!("✓ Saved refreshed playlist with ID: {}", refreshed.id);
            }
        }
        Command::Delete { owner, id } => {
            store.delete(&owner, id)?;
            println!("✓ Deleted playlist {id}");
        }
    }

    Ok(())
}

fn services(config: &Config) -> PlaylistServices {
    let agent = build_agent(config);
    PlaylistServices {
        geocoder: Arc::new(NominatimClient::new(agent.clone(), &config.nominatim_url)),
        directions: Arc::new(OsrmClient::new(agent.clone(), &config.osrm_url)),
        tracks: Arc::new(LastFmClient::new(agent.clone(), &config.lastfm_api_key)),
        artwork: Arc::new(ItunesClient::new(agent, &config.itunes_url)),
    }
}

fn preferences(
    config: &Config,
    mode: PlaylistMode,
    genre: Option<String>,
    seed: Option<u64>,
) -> PlaylistPreferences {
    PlaylistPreferences {
        mode,
        selected_genre: genre.unwrap_or_else(|| config.default_genre.clone()),
        fetch_timeout_secs: config.fetch_timeout_secs,
        seed,
        ..PlaylistPreferences::default()
    }
}

fn resolver(city_tags: Option<&str>) -> Result<TagResolver> {
    let Some(path) = city_tags else {
        return Ok(TagResolver::default());
    };
    let overrides = load_city_tags_from_file(path)
        .map_err(|e| anyhow!("Failed to load city tags from '{path}': {e}"))?;
    println!("Loaded {} city tags from {path}", overrides.len());
    Ok(TagResolver::with_overrides(overrides))
}

fn print_tracks(waypoint_order: &[String], tracks_by_waypoint: &WaypointTrackSet) {
    print!("{}", track_listing(waypoint_order, tracks_by_waypoint));
}

fn track_listing(waypoint_order: &[String], tracks_by_waypoint: &WaypointTrackSet) -> String {
    let mut listing = String::new();
    for waypoint in waypoint_order {
        let tracks = tracks_by_waypoint
            .get(waypoint)
            .map(Vec::as_slice)
            .unwrap_or_default();
        listing.push_str(&format!(
            "\n{}\n",
            PlaylistFormatting::waypoint_heading(waypoint, tracks.len())
        ));
        for (i, track) in tracks.iter().enumerate() {
            listing.push_str(&format!(
                "   {}\n",
                PlaylistFormatting::track_line(i + 1, track)
            ));
            listing.push_str(&format!(
                "      {} | {}\n      Art: {}\n",
                track.apple_music_search_url(),
                track.spotify_search_url(),
                track.display_image()
            ));
        }
    }
    listing
}
