use crate::youtube::constants::PART_SUFFIX;
use crate::youtube::error::{AppError, Result};
use crate::youtube::models::{MediaKind, Track, VideoId};
use crate::youtube::ytdlp::{DownloadRequest, ResolverClient};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk media cache: one file per video id, hit/miss decided by the
/// filesystem at every call. The cache never evicts.
#[derive(Debug, Clone)]
pub struct MediaCache {
    dir: PathBuf,
}

impl MediaCache {
    /// Opens the cache, creating the directory if absent. Failure here is
    /// fatal to the calling operation but not to the process.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic mapping from identifier to cache file. Ids are already
    /// filesystem-safe (see `VideoId::from_location`), so distinct ids can
    /// never collide.
    pub fn path_for(&self, video_id: &VideoId, kind: MediaKind) -> PathBuf {
        self.dir.join(format!("{}.{}", video_id.as_str(), kind.extension()))
    }

    /// Returns the cached path only if the file still exists and is
    /// non-empty. A vanished or truncated file is a miss.
    pub fn lookup(&self, video_id: &VideoId, kind: MediaKind) -> Option<PathBuf> {
        let path = self.path_for(video_id, kind);
        match fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Downloads media for `track` through the resolver and commits it under
    /// the deterministic path. The download lands in a `.part` staging file
    /// which is only renamed over the final name once a non-empty file is
    /// confirmed, so an aborted download never registers as a cache entry.
    pub async fn store<C: ResolverClient + ?Sized>(
        &self,
        client: &C,
        track: &Track,
        kind: MediaKind,
        format: String,
    ) -> Result<PathBuf> {
        let final_path = self.path_for(&track.video_id, kind);
        if let Some(existing) = self.lookup(&track.video_id, kind) {
            log::debug!("Cache hit for {}, skipping download", track.video_id);
            return Ok(existing);
        }

        let part_path =
            final_path.with_extension(format!("{}.{PART_SUFFIX}", kind.extension()));

        let request =
            DownloadRequest { link: track.link.clone(), dest: part_path.clone(), format };

        if let Err(e) = client.download(request).await {
            let _ = fs::remove_file(&part_path);
            return Err(e);
        }

        let produced = fs::metadata(&part_path).map(|m| m.len()).unwrap_or(0);
        if produced == 0 {
            let _ = fs::remove_file(&part_path);
            return Err(AppError::Fetch(format!(
                "resolver reported success but wrote no data for {}",
                track.video_id
            )));
        }

        fs::rename(&part_path, &final_path)?;
        Ok(final_path)
    }
}
