use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::playlist::Playlist;

/// Saved playlists, keyed by owner
pub trait PlaylistStore: Send + Sync {
    /// Add or replace a playlist (matched by id)
    fn save(&self, playlist: &Playlist) -> Result<(), StoreError>;

    fn load_all(&self) -> Result<Vec<Playlist>, StoreError>;

    /// Playlists of one owner, in the order they were saved
    fn load_for_owner(&self, owner_id: &str) -> Result<Vec<Playlist>, StoreError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|playlist| playlist.owner_id == owner_id)
            .collect())
    }

    fn find(&self, owner_id: &str, id: Uuid) -> Result<Playlist, StoreError> {
        self.load_for_owner(owner_id)?
            .into_iter()
            .find(|playlist| playlist.id == id)
            .ok_or(StoreError::NotFound { id })
    }

    /// Remove one of the owner's playlists
    fn delete(&self, owner_id: &str, id: Uuid) -> Result<(), StoreError>;
}

/// All playlists in a single JSON file. Every write rewrites the file, so the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn write_all(&self, playlists: &[Playlist]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(playlists)?;
        // Write next to the target first so a crash never leaves half a file
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), count = playlists.len(), "wrote playlist store");
        Ok(())
    }
}

impl PlaylistStore for JsonFileStore {
    fn save(&self, playlist: &Playlist) -> Result<(), StoreError> {
        let mut playlists = self.load_all()?;
        match playlists.iter_mut().find(|p| p.id == playlist.id) {
            Some(existing) => *existing = playlist.clone(),
            None => playlists.push(playlist.clone()),
        }
        self.write_all(&playlists)
    }

    fn load_all(&self) -> Result<Vec<Playlist>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn delete(&self, owner_id: &str, id: Uuid) -> Result<(), StoreError> {
        let mut playlists = self.load_all()?;
        let before = playlists.len();
        playlists.retain(|p| !(p.id == id && p.owner_id == owner_id));
        if playlists.len() == before {
            return Err(StoreError::NotFound { id });
        }
        self.write_all(&playlists)
    }
}
