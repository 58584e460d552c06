// src/sink.rs
//! Persistence of finalized hikes

use crate::{
    error::{Result, TrackerError},
    export::{render, ExportFormat},
    tracking::result::FinalizedHike,
};
use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::info;

/// Receives every hike finalized by a stop.
pub trait PersistenceSink {
    fn persist(&mut self, hike: &FinalizedHike) -> impl Future<Output = Result<()>> + Send;
}

/// Writes each hike to its own file in a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    format: ExportFormat,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<user>-<start>.<ext>`, with the user id reduced to filename-safe characters
    pub fn file_name(&self, hike: &FinalizedHike) -> String {
        let user: String = hike
            .meta
            .user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let user = if user.is_empty() { "anonymous".to_string() } else { user };

        format!(
            "{}-{}.{}",
            user,
            hike.started_at.format("%Y%m%dT%H%M%SZ"),
            self.format.extension()
        )
    }
}

impl PersistenceSink for FileSink {
    async fn persist(&mut self, hike: &FinalizedHike) -> Result<()> {
        let contents = render(hike, self.format)
            .map_err(|e| TrackerError::Persistence(format!("Failed to render hike: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            TrackerError::Persistence(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.dir.join(self.file_name(hike));
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| TrackerError::Persistence(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Saved hike to {}", path.display());
        Ok(())
    }
}

/// Keeps hikes in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    hikes: Arc<Mutex<Vec<FinalizedHike>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hikes(&self) -> Vec<FinalizedHike> {
        self.hikes.lock().map(|hikes| hikes.clone()).unwrap_or_default()
    }
}

impl PersistenceSink for MemorySink {
    async fn persist(&mut self, hike: &FinalizedHike) -> Result<()> {
        self.hikes
            .lock()
            .map_err(|_| TrackerError::Persistence("memory sink poisoned".to_string()))?
            .push(hike.clone());
        Ok(())
    }
}
