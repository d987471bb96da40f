//! Host player interface
//!
//! The media center owns playback; the tracker only observes it through
//! [`PlayerHost`] and reads sidecar/cache files through [`MediaFs`].
//! Host lifecycle callbacks reach the tracker as [`HostEvent`]s.

use crate::error::Result;
use crate::types::{StreamProperties, VolumeState};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lifecycle notifications fired by the host player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Started,
    Paused,
    Resumed,
    Seek { time: f64, offset: f64 },
    Stopped,
    Ended,
    /// Periodic tick from the service loop
    Tick,
}

impl std::fmt::Display for HostEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostEvent::Started => write!(f, "started"),
            HostEvent::Paused => write!(f, "paused"),
            HostEvent::Resumed => write!(f, "resumed"),
            HostEvent::Seek { .. } => write!(f, "seek"),
            HostEvent::Stopped => write!(f, "stopped"),
            HostEvent::Ended => write!(f, "ended"),
            HostEvent::Tick => write!(f, "tick"),
        }
    }
}

/// Player and UI calls on the host.
///
/// Getters may fail while the host is between states (e.g. right after
/// playback starts); callers treat every error as transient.
#[async_trait]
pub trait PlayerHost: Send + Sync {
    /// Path or URL of the playing file
    fn playing_file(&self) -> Result<String>;

    /// Elapsed playback time in seconds
    fn time(&self) -> Result<f64>;

    /// Total duration in seconds
    fn total_time(&self) -> Result<f64>;

    /// Application volume and mute state
    fn application_volume(&self) -> Result<VolumeState>;

    /// Currently selected audio/subtitle streams
    fn stream_properties(&self) -> Result<StreamProperties>;

    fn audio_stream_count(&self) -> usize;

    fn subtitle_stream_count(&self) -> usize;

    fn set_audio_stream(&self, index: i32);

    fn set_subtitle_stream(&self, index: i32);

    fn show_subtitles(&self, visible: bool);

    /// Yes/no dialog closing itself after `autoclose`; a timeout counts as "no"
    async fn confirm(&self, heading: &str, message: &str, autoclose: Duration) -> bool;
}

/// Filesystem view used for sidecar EDL files and the temp cache
#[async_trait]
pub trait MediaFs: Send + Sync {
    /// Read a whole file, `None` when it does not exist
    async fn read_to_string_if_exists(&self, path: &str) -> Result<Option<String>>;

    /// File names (not paths) directly inside `dir`; empty when `dir` is missing
    async fn list_files(&self, dir: &Path) -> Result<Vec<String>>;

    async fn remove_file(&self, path: &Path) -> Result<()>;
}

/// [`MediaFs`] over the local filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

#[async_trait]
impl MediaFs for LocalFs {
    async fn read_to_string_if_exists(&self, path: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();

        Ok(files)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

/// Remove every file in `dir` whose name contains `item_id`.
///
/// Returns the removed paths. A failure on one file does not stop the sweep.
pub async fn remove_cached_files(fs: &dyn MediaFs, dir: &Path, item_id: &str) -> Vec<PathBuf> {
    let files = match fs.list_files(dir).await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to list temp directory");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for name in files.into_iter().filter(|name| name.contains(item_id)) {
        let path = dir.join(&name);
        match fs.remove_file(&path).await {
            Ok(()) => removed.push(path),
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "Failed to delete cached file"),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_fs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.edl");

        let fs = LocalFs;
        let text = fs
            .read_to_string_if_exists(missing.to_str().unwrap())
            .await
            .unwrap();
        assert!(text.is_none());
        assert!(fs.list_files(&dir.path().join("absent")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_cached_files_by_item_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123-subs.srt"), "x").unwrap();
        std::fs::write(dir.path().join("abc123.strm"), "x").unwrap();
        std::fs::write(dir.path().join("other.srt"), "x").unwrap();

        let removed = remove_cached_files(&LocalFs, dir.path(), "abc123").await;

        assert_eq!(removed.len(), 2);
        let left = LocalFs.list_files(dir.path()).await.unwrap();
        assert_eq!(left, vec!["other.srt".to_string()]);
    }
}
