mod cli;
mod config;
mod youtube;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flexi_logger::{Duplicate, FileSpec, Logger};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cli::{Cli, Command};
use config::{Resolution, Settings};
use youtube::cache::MediaCache;
use youtube::events::AppEvent;
use youtube::manager::Manager;
use youtube::models::{MediaKind, Track, VideoId};
use youtube::player::{MpvPlayer, PlaybackMode};
use youtube::playlist::{self, PlaylistManager};
use youtube::ytdlp::YtdlpAdapter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("Failed to load configuration")?;
    settings.validate().map_err(anyhow::Error::msg)?;

    let _logger = init_logging(&settings, cli.verbose)?;

    check_dependencies(&cli.command, &settings)?;

    smol::block_on(run(cli.command, settings))
}

fn init_logging(settings: &Settings, verbose: u8) -> Result<flexi_logger::LoggerHandle> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let handle = Logger::try_with_env_or_str(level)?
        .log_to_file(FileSpec::default().directory(settings.log_dir()).basename("tubeplay"))
        .duplicate_to_stderr(Duplicate::Warn)
        .start()?;
    Ok(handle)
}

/// A missing external program is a configuration error reported at startup,
/// not something to discover mid-operation.
fn check_dependencies(command: &Command, settings: &Settings) -> Result<()> {
    let needs_resolver = matches!(
        command,
        Command::Search { .. }
            | Command::Add { .. }
            | Command::Download { .. }
            | Command::Play { .. }
            | Command::Url { .. }
    );
    let needs_player = matches!(command, Command::Play { .. });

    if needs_resolver && !binary_on_path(&settings.resolver.bin) {
        bail!("'{}' not found on PATH; install yt-dlp or set resolver.bin", settings.resolver.bin);
    }
    if needs_player && !binary_on_path(&settings.player.bin) {
        bail!("'{}' not found on PATH; install mpv or set player.bin", settings.player.bin);
    }
    Ok(())
}

fn binary_on_path(bin: &str) -> bool {
    let candidate = Path::new(bin);
    if candidate.components().count() > 1 {
        return is_executable(candidate);
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(bin)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

async fn run(command: Command, settings: Settings) -> Result<()> {
    match command {
        Command::Search { query, limit } => {
            run_search(&settings, query.join(" "), limit.unwrap_or(settings.resolver.search_limit))
                .await
        }
        Command::Add { target, title, download } => {
            run_add(&settings, &target, title, download).await
        }
        Command::Remove { id } => {
            let mut pm = open_playlist(&settings);
            match pm.remove(&VideoId::new(id.clone())) {
                Some(track) => println!("Removed: {}", track.title),
                None => println!("No entry with id {id}"),
            }
            Ok(())
        }
        Command::Move { id, index } => {
            let mut pm = open_playlist(&settings);
            if pm.move_to(&VideoId::new(id.clone()), index) {
                println!("Moved {id} to position {index}");
            } else {
                println!("No entry with id {id}");
            }
            Ok(())
        }
        Command::List => {
            let pm = open_playlist(&settings);
            let cache = MediaCache::open(settings.cache_dir())?;
            let kind = default_kind(&settings);
            for (idx, track) in pm.playlist().tracks().iter().enumerate() {
                let cached = if cache.lookup(&track.video_id, kind).is_some() { "*" } else { " " };
                println!("{idx:3} {cached} {}  {}", track.video_id, track.title);
            }
            Ok(())
        }
        Command::Play { index, video, resolution, no_fetch } => {
            run_play(&settings, index, video, resolution, no_fetch).await
        }
        Command::Download { ids, missing, video } => {
            run_download(&settings, ids, missing, video).await
        }
        Command::Save { path } => {
            let pm = open_playlist(&settings);
            pm.save_to(&path)?;
            println!("Saved {} entries to {}", pm.playlist().len(), path.display());
            Ok(())
        }
        Command::Load { path } => {
            let loaded = playlist::load(&path)?;
            let count = loaded.len();
            let mut pm = open_playlist(&settings);
            pm.replace(loaded);
            println!("Loaded {count} entries from {}", path.display());
            Ok(())
        }
        Command::Url { id } => {
            let (manager, _cache) = build_manager(&settings)?;
            let url = manager.resolve_stream_url(&VideoId::new(id)).await?;
            println!("{url}");
            Ok(())
        }
        Command::Pause => {
            mpv(&settings).toggle_pause()?;
            Ok(())
        }
        Command::Next => {
            mpv(&settings).next()?;
            Ok(())
        }
        Command::Stop => {
            mpv(&settings).stop()?;
            Ok(())
        }
    }
}

fn open_playlist(settings: &Settings) -> PlaylistManager {
    PlaylistManager::open(settings.autosave_path())
}

fn mpv(settings: &Settings) -> MpvPlayer {
    MpvPlayer::new(settings.player.bin.clone(), settings.ipc_socket_path())
}

fn default_kind(settings: &Settings) -> MediaKind {
    if settings.player.audio_only { MediaKind::Audio } else { MediaKind::Video }
}

fn build_manager(settings: &Settings) -> Result<(Manager<YtdlpAdapter>, MediaCache)> {
    let cache = MediaCache::open(settings.cache_dir())
        .context("Failed to create the media cache directory")?;
    let client = Arc::new(YtdlpAdapter::new(settings.resolver.bin.clone()));
    let manager = Manager::new(client, cache.clone(), settings.resolver.concurrency);
    manager.start();
    Ok((manager, cache))
}

async fn run_search(settings: &Settings, query: String, limit: usize) -> Result<()> {
    let (manager, _cache) = build_manager(settings)?;
    let sender = manager.sender();
    let receiver = manager.receiver();

    sender.send(AppEvent::SearchRequest { query, limit }).await?;

    while let Ok(event) = receiver.recv().await {
        match event {
            AppEvent::SearchStarted => {}
            AppEvent::SearchResult(result) => {
                println!(
                    "{}  {:>8}  {}  ({})",
                    result.video_id,
                    format_duration(result.duration),
                    result.title,
                    result.channel
                );
            }
            AppEvent::SearchFinished => break,
            AppEvent::SearchError(message) => {
                eprintln!("Search failed: {message}");
                break;
            }
            _ => {}
        }
    }
    Ok(())
}

async fn run_add(
    settings: &Settings,
    target: &str,
    title: Option<String>,
    download: bool,
) -> Result<()> {
    let video_id = VideoId::from_location(target);
    let link = if target.starts_with("http") {
        target.to_string()
    } else {
        video_id.watch_url()
    };

    let (manager, _cache) = build_manager(settings)?;

    let track = if let Some(title) = title {
        Track { video_id: video_id.clone(), title, link, thumbnail_url: None, local_path: None }
    } else {
        match manager.fetch_metadata(&video_id).await {
            Ok(mut track) => {
                track.link = link;
                track
            }
            Err(e) => {
                // Recoverable: keep the entry usable with the location as title
                log::error!("Metadata fetch for {video_id} failed: {e}");
                Track {
                    video_id: video_id.clone(),
                    title: target.to_string(),
                    link,
                    thumbnail_url: None,
                    local_path: None,
                }
            }
        }
    };

    let mut pm = open_playlist(settings);
    let replaced = pm.add(track.clone());
    if replaced {
        println!("Updated: {}", track.title);
    } else {
        println!("Added: {}", track.title);
    }

    if download {
        let kind = default_kind(settings);
        let max_height = settings.player.resolution.max_height();
        let sender = manager.sender();
        sender.send(AppEvent::Download { track, kind, max_height }).await?;
        await_downloads(&manager, 1).await;
    }
    Ok(())
}

async fn run_download(
    settings: &Settings,
    ids: Vec<String>,
    missing: bool,
    video: bool,
) -> Result<()> {
    let pm = open_playlist(settings);
    let (manager, cache) = build_manager(settings)?;
    let kind = if video { MediaKind::Video } else { default_kind(settings) };
    let max_height = settings.player.resolution.max_height();

    let tracks: Vec<Track> = if missing {
        pm.playlist()
            .tracks()
            .iter()
            .filter(|t| cache.lookup(&t.video_id, kind).is_none())
            .cloned()
            .collect()
    } else {
        ids.iter()
            .filter_map(|id| {
                let video_id = VideoId::new(id.clone());
                let found = pm
                    .playlist()
                    .position_of(&video_id)
                    .and_then(|idx| pm.playlist().get(idx))
                    .cloned();
                if found.is_none() {
                    eprintln!("No playlist entry with id {id}");
                }
                found
            })
            .collect()
    };

    if tracks.is_empty() {
        println!("Nothing to download");
        return Ok(());
    }

    let count = tracks.len();
    let sender = manager.sender();
    sender
        .send(AppEvent::DownloadMany { tracks: Arc::from(tracks), kind, max_height })
        .await?;
    await_downloads(&manager, count).await;
    Ok(())
}

async fn run_play(
    settings: &Settings,
    index: usize,
    video: bool,
    resolution: Option<String>,
    no_fetch: bool,
) -> Result<()> {
    let pm = open_playlist(settings);
    if pm.playlist().is_empty() {
        println!("Playlist is empty");
        return Ok(());
    }

    let kind = if video { MediaKind::Video } else { default_kind(settings) };
    let max_height = match resolution {
        Some(raw) => raw.parse::<Resolution>().map_err(anyhow::Error::msg)?.max_height(),
        None => settings.player.resolution.max_height(),
    };

    let cache = MediaCache::open(settings.cache_dir())?;

    // Prefer cached files; stream everything else and fill the cache in the
    // background for next time, like every other invocation will.
    let mut entries = Vec::with_capacity(pm.playlist().len());
    let mut misses = Vec::new();
    for track in pm.playlist().tracks() {
        match cache.lookup(&track.video_id, kind) {
            Some(path) => entries.push(path.display().to_string()),
            None => {
                entries.push(track.link.clone());
                misses.push(track.clone());
            }
        }
    }

    mpv(settings).play(&entries, index, PlaybackMode { kind, max_height })?;
    println!("Playing {} entries ({} cached)", entries.len(), entries.len() - misses.len());

    if !no_fetch && !misses.is_empty() {
        let count = misses.len();
        println!("Fetching {count} uncached entries in the background...");
        let (manager, _cache) = build_manager(settings)?;
        let sender = manager.sender();
        sender
            .send(AppEvent::DownloadMany { tracks: Arc::from(misses), kind, max_height })
            .await?;
        await_downloads(&manager, count).await;
    }
    Ok(())
}

/// Drains download events until `expected` downloads have finished or
/// failed. Individual failures are reported and do not abort the rest.
async fn await_downloads(manager: &Manager<YtdlpAdapter>, expected: usize) {
    let receiver = manager.receiver();
    let mut done = 0;
    while done < expected {
        match receiver.recv().await {
            Ok(AppEvent::DownloadFinished { video_id, path }) => {
                done += 1;
                println!("[{done}/{expected}] cached {video_id} -> {}", path.display());
            }
            Ok(AppEvent::DownloadFailed { video_id, message }) => {
                done += 1;
                eprintln!("[{done}/{expected}] download failed for {video_id}: {message}");
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
