use crate::youtube::error::{AppError, Result};
use crate::youtube::models::{SearchResult, Track, VideoId};
use anyhow::Context;
use futures_lite::{AsyncBufReadExt, Stream, StreamExt, io::BufReader};
use serde::Deserialize;
use smol::process::Command;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

#[derive(Deserialize)]
struct YtdlpJson {
    id: Option<String>,
    display_id: Option<String>,
    track: Option<String>,
    title: Option<String>,
    fulltitle: Option<String>,
    alt_title: Option<String>,
    creator: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    uploader_id: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

/// One media fetch into the cache. `dest` is the exact output path handed to
/// yt-dlp, `format` the yt-dlp format selector.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub link: String,
    pub dest: PathBuf,
    pub format: String,
}

/// Seam between the application and the external search/extraction tool.
pub trait ResolverClient: Send + Sync {
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<SearchResult>> + Send>>>;
    fn resolve_stream_url(
        &self,
        video_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'static>>;
    fn fetch_metadata(
        &self,
        video_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Track>> + Send + 'static>>;
    fn download(
        &self,
        request: DownloadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;
}

pub struct YtdlpAdapter {
    bin: String,
}

impl Default for YtdlpAdapter {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl ResolverClient for YtdlpAdapter {
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<SearchResult>> + Send>>> {
        self.spawn_search(query, limit)
    }

    fn resolve_stream_url(
        &self,
        video_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'static>> {
        let bin = self.bin.clone();
        let video_id = video_id.to_string();
        Box::pin(async move { Self::stream_url(&bin, &video_id).await })
    }

    fn fetch_metadata(
        &self,
        video_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Track>> + Send + 'static>> {
        let bin = self.bin.clone();
        let video_id = video_id.to_string();
        Box::pin(async move { Self::metadata(&bin, &video_id).await })
    }

    fn download(
        &self,
        request: DownloadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>> {
        let bin = self.bin.clone();
        Box::pin(async move { Self::run_download(&bin, &request).await })
    }
}

impl YtdlpAdapter {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn parse_search_result(line: &str) -> Result<SearchResult> {
        log::trace!("yt-dlp search output line: {line}");
        let json: YtdlpJson = serde_json::from_str(line)?;

        let video_id = json.id.clone().or(json.display_id.clone()).unwrap_or_default();

        let title = json
            .track
            .clone()
            .or(json.title.clone())
            .or(json.fulltitle.clone())
            .or(json.alt_title.clone())
            .or(json.display_id.clone())
            .unwrap_or_else(|| "Unknown Title".to_string());

        let channel = json
            .creator
            .clone()
            .or(json.uploader.clone())
            .or(json.channel.clone())
            .or(json.uploader_id.clone())
            .unwrap_or_else(|| "Unknown Channel".to_string());

        Ok(SearchResult {
            video_id: VideoId::new(video_id),
            title,
            channel,
            duration: Duration::from_secs_f64(json.duration.unwrap_or(0.0)),
            thumbnail_url: json.thumbnail,
        })
    }

    fn spawn_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<SearchResult>> + Send>>> {
        let encoded_query = urlencoding::encode(query);
        let url = format!("https://www.youtube.com/results?search_query={encoded_query}");
        let limit_arg = format!("1:{limit}");

        log::debug!("Executing yt-dlp search with URL: {url} and limit: {limit}");
        let mut child = Command::new(&self.bin)
            .kill_on_drop(true)
            .args([
                "--no-warnings",
                "--quiet",
                "--dump-json",
                "--ignore-errors",
                "--no-check-formats",
                "--playlist-items",
                limit_arg.as_str(),
                &url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::SpawnFailed(format!("{}: {e}", self.bin)))?;

        let stdout =
            child.stdout.take().ok_or_else(|| AppError::CaptureFailed("stdout".to_string()))?;
        let stderr =
            child.stderr.take().ok_or_else(|| AppError::CaptureFailed("stderr".to_string()))?;

        // Drain stderr into the log so resolver diagnostics are not lost
        smol::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            while let Ok(n) = reader.read_line(&mut line).await {
                if n == 0 {
                    break;
                }
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    log::error!("yt-dlp stderr: {trimmed}");
                }
                line.clear();
            }
        })
        .detach();

        let reader = BufReader::new(stdout).lines();

        let stream =
            futures_lite::stream::unfold((child, reader), |(mut child, mut reader)| async move {
                match reader.next().await {
                    Some(Ok(line)) => {
                        let res = Self::parse_search_result(&line);
                        Some((res, (child, reader)))
                    }
                    Some(Err(e)) => Some((Err(e.into()), (child, reader))),
                    None => {
                        // Reap child status
                        let _ = child.status().await;
                        None
                    }
                }
            });

        Ok(Box::pin(stream))
    }

    async fn stream_url(bin: &str, video_id: &str) -> Result<String> {
        let output = Command::new(bin)
            .kill_on_drop(true)
            .args([
                "-g",
                "-f",
                "bestaudio[protocol^=https]/best[protocol^=https]",
                &format!("https://www.youtube.com/watch?v={video_id}"),
            ])
            .output()
            .await
            .context("Failed to spawn yt-dlp for stream URL")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Resolution(stderr.to_string()));
        }

        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if url.is_empty() {
            return Err(AppError::EmptyOutput);
        }

        Ok(url)
    }

    async fn metadata(bin: &str, video_id: &str) -> Result<Track> {
        let output = Command::new(bin)
            .kill_on_drop(true)
            .args(["--dump-json", &format!("https://www.youtube.com/watch?v={video_id}")])
            .output()
            .await
            .context("Failed to spawn yt-dlp for metadata")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Resolution(stderr.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_search_result(&stdout).map(Track::from)
    }

    async fn run_download(bin: &str, request: &DownloadRequest) -> Result<()> {
        let output = Command::new(bin)
            .kill_on_drop(true)
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("-f")
            .arg(&request.format)
            .arg("-o")
            .arg(&request.dest)
            .arg(&request.link)
            .output()
            .await
            .context("Failed to spawn yt-dlp for download")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Resolution(stderr.to_string()));
        }

        Ok(())
    }
}
