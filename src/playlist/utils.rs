use chrono::{DateTime, Local, Utc};

use crate::models::Track;

/// Helper trait for string formatting
pub trait ToTitleCase {
    fn to_title_case(&self) -> String;
}

impl ToTitleCase for str {
    fn to_title_case(&self) -> String {
        self.split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Text rendering for playlists printed to the terminal
pub struct PlaylistFormatting;

impl PlaylistFormatting {
    /// Creation time in local time, e.g. "Saturday Oct 17 2026, 14:05"
    pub fn created_label(created_at: &DateTime<Utc>) -> String {
        created_at
            .with_timezone(&Local)
            .format("%A %b %-d %Y, %H:%M")
            .to_string()
    }

    /// One numbered line per track
    pub fn track_line(position: usize, track: &Track) -> String {
        format!("{}. \"{}\" by {}", position, track.name, track.artist)
    }

    /// Heading for a waypoint section, with its track count
    pub fn waypoint_heading(waypoint: &str, track_count: usize) -> String {
        match track_count {
            0 => format!("📍 {waypoint} (no tracks available)"),
            1 => format!("📍 {waypoint} (1 track)"),
            n => format!("📍 {waypoint} ({n} tracks)"),
        }
    }
}
