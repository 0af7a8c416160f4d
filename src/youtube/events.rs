use crate::youtube::models::{MediaKind, SearchResult, Track, VideoId};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum AppEvent {
    // Search
    SearchRequest { query: String, limit: usize },
    SearchStarted,
    SearchResult(SearchResult),
    SearchFinished,
    SearchError(String),
    CancelSearch,

    // Downloads
    Download { track: Track, kind: MediaKind, max_height: u32 },
    DownloadMany { tracks: Arc<[Track]>, kind: MediaKind, max_height: u32 },
    DownloadStarted(VideoId),
    DownloadFinished { video_id: VideoId, path: PathBuf },
    DownloadFailed { video_id: VideoId, message: String },
}
