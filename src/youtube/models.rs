use crate::youtube::constants::WATCH_URL_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Stable key for a piece of media. Usually the 11 character YouTube video
/// id; for locations no id can be extracted from, a sanitized form of the
/// source URL is used instead so that every playlist entry keys the cache.
#[derive(
    Debug,
    Clone,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    derive_more::Display,
    derive_more::AsRef,
    derive_more::Deref,
)]
#[as_ref(str)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_any(s: &str) -> Option<Self> {
        if s.len() == 11 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Some(Self(s.to_string()));
        }

        if let Ok(url) = url::Url::parse(s) {
            let host = url.host_str().unwrap_or_default();
            if host.contains("youtube.com") || host.contains("youtu.be") {
                if let Some(v) =
                    url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.to_string())
                {
                    return Some(Self(v));
                }
                if let Some(last) = url.path_segments().and_then(|mut s| s.next_back()) {
                    if last.len() == 11 {
                        return Some(Self(last.to_string()));
                    }
                }
            }
        }
        None
    }

    /// Derive an identifier from an arbitrary location, falling back to a
    /// filesystem-safe rendition of the location itself.
    pub fn from_location(s: &str) -> Self {
        Self::from_any(s).unwrap_or_else(|| {
            let sanitized: String = s
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect();
            Self(sanitized)
        })
    }

    pub fn watch_url(&self) -> String {
        format!("{WATCH_URL_PREFIX}{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl PartialEq<&str> for VideoId {
    fn eq(&self, other: &&str) -> bool {
        &self.0 == other
    }
}

impl PartialEq<VideoId> for &str {
    fn eq(&self, other: &VideoId) -> bool {
        *self == other.0
    }
}

/// A playlist entry. `local_path` is filled in from the media cache at use
/// time and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub video_id: VideoId,
    pub title: String,
    pub link: String,
    pub thumbnail_url: Option<String>,
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl Track {
    pub fn new(video_id: VideoId, title: impl Into<String>) -> Self {
        let link = video_id.watch_url();
        Self { video_id, title: title.into(), link, thumbnail_url: None, local_path: None }
    }
}

impl From<SearchResult> for Track {
    fn from(res: SearchResult) -> Self {
        let link = res.video_id.watch_url();
        Self {
            video_id: res.video_id,
            title: res.title,
            link,
            thumbnail_url: res.thumbnail_url,
            local_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub video_id: VideoId,
    pub title: String,
    pub channel: String,
    pub duration: Duration,
    pub thumbnail_url: Option<String>,
}

/// What the cache stores and mpv renders for a given invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
}

impl MediaKind {
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Audio => "m4a",
            MediaKind::Video => "webm",
        }
    }
}
