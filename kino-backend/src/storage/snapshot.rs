//! JSON snapshot of the screening store
use anyhow::{Context, Result};
use kino_common::{Screening, Storage};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Persists the full store contents to a single JSON file
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot file. A missing file is an empty snapshot.
    pub async fn load(&self) -> Result<Vec<Screening>> {
        if !self.path.exists() {
            debug!("Snapshot file does not exist: {:?}", self.path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read snapshot file")?;

        let screenings: Vec<Screening> =
            serde_json::from_str(&content).context("Failed to parse snapshot file")?;

        info!("Loaded {} screenings from {:?}", screenings.len(), self.path);
        Ok(screenings)
    }

    /// Load the snapshot into `storage`, returning how many records were accepted.
    pub async fn restore(&self, storage: &dyn Storage) -> Result<usize> {
        let mut restored = 0;

        for screening in self.load().await? {
            if !screening.identity_matches() {
                warn!("Skipping snapshot record with mismatched ID {}", screening.id());
                continue;
            }

            match storage.upsert(screening).await {
                Ok(()) => restored += 1,
                Err(e) => warn!("Failed to restore screening: {}", e),
            }
        }

        Ok(restored)
    }

    /// Write every screening in `storage` to the snapshot file.
    pub async fn save(&self, storage: &dyn Storage) -> Result<usize> {
        let screenings = storage
            .fetch(&[])
            .await
            .context("Failed to read screenings for snapshot")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create snapshot directory")?;
                info!("Created snapshot directory: {:?}", parent);
            }
        }

        let content =
            serde_json::to_string_pretty(&screenings).context("Failed to serialize snapshot")?;

        // Write next to the target and rename so a crash never leaves a torn file.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .context("Failed to write snapshot file")?;
        fs::rename(&tmp_path, &self.path)
            .await
            .context("Failed to replace snapshot file")?;

        debug!("Saved {} screenings to {:?}", screenings.len(), self.path);
        Ok(screenings.len())
    }
}
