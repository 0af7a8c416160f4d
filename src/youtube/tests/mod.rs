use crate::youtube::cache::MediaCache;
use crate::youtube::error::{AppError, Result as AppResult};
use crate::youtube::events::AppEvent;
use crate::youtube::manager::Manager;
use crate::youtube::models::{MediaKind, SearchResult, Track, VideoId};
#[cfg(unix)]
use crate::youtube::player::MpvPlayer;
use crate::youtube::playlist::{self, Playlist, PlaylistManager};
use crate::youtube::streaming::{ExpiringUrlCache, is_stream_url_expired, stream_url_expiry};
use crate::youtube::ytdlp::{DownloadRequest, ResolverClient, YtdlpAdapter};
use futures_lite::Stream;
use rstest::{fixture, rstest};
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct TestContext {
    temp_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let _ = flexi_logger::Logger::try_with_str("debug").map(|l| l.start().ok());
        let mut temp_dir = std::env::temp_dir();
        let random_suffix: u64 = rand::random();
        temp_dir.push(format!("tubeplay_test_{random_suffix}"));
        fs::create_dir_all(&temp_dir).expect("Failed to create temp dir");
        Self { temp_dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.join(name)
    }

    fn cache(&self) -> MediaCache {
        MediaCache::open(self.temp_dir.join("media")).expect("Failed to open cache")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.temp_dir);
    }
}

#[fixture]
fn ctx() -> TestContext {
    TestContext::new()
}

/// Resolver double that serves canned search results and writes a fixed
/// payload on download. Counts downloads and URL resolutions so cache
/// behaviour can be asserted.
struct MockClient {
    results: Vec<SearchResult>,
    payload: &'static [u8],
    stream_url: String,
    downloads: AtomicUsize,
    resolutions: AtomicUsize,
}

impl MockClient {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            payload: b"data",
            stream_url: "https://rr1---sn-1.googlevideo.com/videoplayback?id=x".to_string(),
            downloads: AtomicUsize::new(0),
            resolutions: AtomicUsize::new(0),
        }
    }

    fn with_results(results: Vec<SearchResult>) -> Self {
        Self { results, ..Self::new() }
    }

    fn with_payload(payload: &'static [u8]) -> Self {
        Self { payload, ..Self::new() }
    }

    fn with_stream_url(url: impl Into<String>) -> Self {
        Self { stream_url: url.into(), ..Self::new() }
    }

    fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

impl ResolverClient for MockClient {
    fn search(
        &self,
        _query: &str,
        limit: usize,
    ) -> AppResult<Pin<Box<dyn Stream<Item = AppResult<SearchResult>> + Send>>> {
        let results: Vec<_> = self.results.iter().take(limit).cloned().map(Ok).collect();
        Ok(Box::pin(futures_lite::stream::iter(results)))
    }

    fn resolve_stream_url(
        &self,
        _video_id: &str,
    ) -> Pin<Box<dyn Future<Output = AppResult<String>> + Send + 'static>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        let url = self.stream_url.clone();
        Box::pin(async move { Ok(url) })
    }

    fn fetch_metadata(
        &self,
        video_id: &str,
    ) -> Pin<Box<dyn Future<Output = AppResult<Track>> + Send + 'static>> {
        let track = Track::new(VideoId::new(video_id), format!("Title of {video_id}"));
        Box::pin(async move { Ok(track) })
    }

    fn download(
        &self,
        request: DownloadRequest,
    ) -> Pin<Box<dyn Future<Output = AppResult<()>> + Send + 'static>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let payload = self.payload;
        Box::pin(async move {
            fs::write(&request.dest, payload)?;
            Ok(())
        })
    }
}

/// Resolver double whose every operation fails.
struct FailingClient;

impl ResolverClient for FailingClient {
    fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> AppResult<Pin<Box<dyn Stream<Item = AppResult<SearchResult>> + Send>>> {
        Err(AppError::SpawnFailed("yt-dlp".to_string()))
    }

    fn resolve_stream_url(
        &self,
        _video_id: &str,
    ) -> Pin<Box<dyn Future<Output = AppResult<String>> + Send + 'static>> {
        Box::pin(async { Err(AppError::Resolution("boom".to_string())) })
    }

    fn fetch_metadata(
        &self,
        _video_id: &str,
    ) -> Pin<Box<dyn Future<Output = AppResult<Track>> + Send + 'static>> {
        Box::pin(async { Err(AppError::Resolution("boom".to_string())) })
    }

    fn download(
        &self,
        _request: DownloadRequest,
    ) -> Pin<Box<dyn Future<Output = AppResult<()>> + Send + 'static>> {
        Box::pin(async { Err(AppError::Resolution("boom".to_string())) })
    }
}

fn track(id: &str, title: &str) -> Track {
    Track::new(VideoId::new(id), title)
}

fn result(id: &str, title: &str) -> SearchResult {
    SearchResult {
        video_id: VideoId::new(id),
        title: title.to_string(),
        channel: "channel".to_string(),
        duration: Duration::from_secs(180),
        thumbnail_url: None,
    }
}

// Playlist

#[rstest]
fn test_playlist_add_replaces_in_place(_ctx: TestContext) {
    let mut playlist = Playlist::new();
    assert!(!playlist.add(track("aaaaaaaaaaa", "First")));
    assert!(!playlist.add(track("bbbbbbbbbbb", "Second")));

    // Same id again: position preserved, metadata updated, no duplicate
    assert!(playlist.add(track("aaaaaaaaaaa", "First, renamed")));
    assert_eq!(playlist.len(), 2);
    assert_eq!(playlist.position_of(&VideoId::new("aaaaaaaaaaa")), Some(0));
    assert_eq!(playlist.get(0).unwrap().title, "First, renamed");
}

#[rstest]
fn test_playlist_move_to_clamps_and_preserves_order() {
    let mut playlist = Playlist::new();
    playlist.add(track("aaaaaaaaaaa", "A"));
    playlist.add(track("bbbbbbbbbbb", "B"));
    playlist.add(track("ccccccccccc", "C"));

    assert!(playlist.move_to(&VideoId::new("ccccccccccc"), 0));
    let order: Vec<_> = playlist.tracks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(order, ["C", "A", "B"]);

    // Index past the end lands at the end
    assert!(playlist.move_to(&VideoId::new("ccccccccccc"), 99));
    let order: Vec<_> = playlist.tracks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(order, ["A", "B", "C"]);

    assert!(!playlist.move_to(&VideoId::new("zzzzzzzzzzz"), 0));
}

#[rstest]
fn test_playlist_remove() {
    let mut playlist = Playlist::new();
    playlist.add(track("aaaaaaaaaaa", "A"));
    playlist.add(track("bbbbbbbbbbb", "B"));

    let removed = playlist.remove(&VideoId::new("aaaaaaaaaaa"));
    assert_eq!(removed.unwrap().title, "A");
    assert_eq!(playlist.len(), 1);
    assert!(playlist.remove(&VideoId::new("aaaaaaaaaaa")).is_none());
}

#[rstest]
fn test_m3u_save_then_load_round_trip(ctx: TestContext) {
    let mut original = Playlist::new();
    original.add(track("dQw4w9WgXcQ", "Never Gonna Give You Up"));
    original.add(track("aaaaaaaaaaa", "Title, with a comma"));

    let path = ctx.path("list.m3u");
    playlist::save(&original, &path).unwrap();
    let loaded = playlist::load(&path).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get(0).unwrap().video_id, "dQw4w9WgXcQ");
    assert_eq!(loaded.get(0).unwrap().title, "Never Gonna Give You Up");
    assert_eq!(loaded.get(1).unwrap().title, "Title, with a comma");
}

#[rstest]
fn test_m3u_missing_file_is_empty_playlist(ctx: TestContext) {
    let loaded = playlist::load(&ctx.path("does_not_exist.m3u")).unwrap();
    assert!(loaded.is_empty());
}

#[rstest]
fn test_m3u_malformed_extinf_is_parse_error() {
    let err = playlist::parse_m3u("#EXTM3U\n#EXTINF:-1 no comma here\nhttps://youtu.be/x")
        .unwrap_err();
    match err {
        AppError::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected Parse error, got {other}"),
    }
}

#[rstest]
fn test_m3u_local_path_with_spaces_loads() {
    let content = "#EXTM3U\n#EXTINF:-1,My Song\n/home/user/My Music/song.mp3\n";
    let playlist = playlist::parse_m3u(content).unwrap();
    assert_eq!(playlist.len(), 1);
    let track = playlist.get(0).unwrap();
    assert_eq!(track.title, "My Song");
    assert_eq!(track.link, "/home/user/My Music/song.mp3");
}

#[rstest]
fn test_m3u_unknown_directives_are_ignored() {
    let content = "#EXTM3U\n#PLAYLIST:mine\n#EXTINF:240,Some Song\nhttps://www.youtube.com/watch?v=dQw4w9WgXcQ\n#EXTGRP:misc\n";
    let playlist = playlist::parse_m3u(content).unwrap();
    assert_eq!(playlist.len(), 1);
    assert_eq!(playlist.get(0).unwrap().title, "Some Song");
}

#[rstest]
fn test_m3u_legacy_title_comment() {
    let content = "# My Old Title\nhttps://www.youtube.com/watch?v=dQw4w9WgXcQ\n";
    let playlist = playlist::parse_m3u(content).unwrap();
    assert_eq!(playlist.get(0).unwrap().title, "My Old Title");
}

#[rstest]
fn test_m3u_bare_location_falls_back_to_location_title() {
    let playlist = playlist::parse_m3u("https://youtu.be/dQw4w9WgXcQ\n").unwrap();
    let track = playlist.get(0).unwrap();
    assert_eq!(track.video_id, "dQw4w9WgXcQ");
    assert_eq!(track.title, "https://youtu.be/dQw4w9WgXcQ");
}

#[rstest]
fn test_m3u_save_strips_newlines_from_titles(ctx: TestContext) {
    let mut original = Playlist::new();
    original.add(track("aaaaaaaaaaa", "Line\nbreak"));

    let path = ctx.path("newline.m3u");
    playlist::save(&original, &path).unwrap();
    let loaded = playlist::load(&path).unwrap();
    assert_eq!(loaded.get(0).unwrap().title, "Line break");
}

// Scenario from a full session: add two, reload, reorder, remove.
#[rstest]
fn test_playlist_session_round_trip(ctx: TestContext) {
    let path = ctx.path("session.m3u");

    let mut pm = PlaylistManager::open(path.clone());
    pm.add(track("vvvvvvvvvv1", "A"));
    pm.add(track("vvvvvvvvvv2", "B"));
    drop(pm);

    let mut pm = PlaylistManager::open(path.clone());
    let titles: Vec<_> = pm.playlist().tracks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["A", "B"]);

    assert!(pm.move_to(&VideoId::new("vvvvvvvvvv2"), 0));
    assert!(pm.remove(&VideoId::new("vvvvvvvvvv1")).is_some());
    drop(pm);

    let pm = PlaylistManager::open(path);
    let titles: Vec<_> = pm.playlist().tracks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["B"]);
}

#[rstest]
fn test_autosave_failure_does_not_lose_mutation(ctx: TestContext) {
    // Autosave target inside a directory that does not exist
    let mut pm = PlaylistManager::open(ctx.path("missing_dir").join("autosave.m3u"));
    pm.add(track("aaaaaaaaaaa", "A"));
    assert_eq!(pm.playlist().len(), 1);
}

#[rstest]
fn test_corrupt_autosave_starts_empty(ctx: TestContext) {
    let path = ctx.path("autosave.m3u");
    fs::write(&path, "#EXTINF:broken without comma\nhttps://youtu.be/x\n").unwrap();
    let pm = PlaylistManager::open(path);
    assert!(pm.playlist().is_empty());
}

// Media cache

#[rstest]
fn test_cache_path_is_deterministic(ctx: TestContext) {
    let cache = ctx.cache();
    let id = VideoId::new("dQw4w9WgXcQ");
    assert_eq!(cache.path_for(&id, MediaKind::Audio), cache.path_for(&id, MediaKind::Audio));
    assert_ne!(cache.path_for(&id, MediaKind::Audio), cache.path_for(&id, MediaKind::Video));
    assert!(
        cache.path_for(&id, MediaKind::Audio).to_string_lossy().ends_with("dQw4w9WgXcQ.m4a")
    );
}

#[rstest]
fn test_cache_lookup_misses_until_stored(ctx: TestContext) {
    smol::block_on(async {
        let cache = ctx.cache();
        let client = MockClient::new();
        let track = track("dQw4w9WgXcQ", "A");

        assert!(cache.lookup(&track.video_id, MediaKind::Audio).is_none());

        let path =
            cache.store(&client, &track, MediaKind::Audio, "fmt".to_string()).await.unwrap();
        assert_eq!(cache.lookup(&track.video_id, MediaKind::Audio), Some(path.clone()));
        assert_eq!(fs::read(&path).unwrap(), b"data");

        // Externally deleting the file turns the entry back into a miss
        fs::remove_file(&path).unwrap();
        assert!(cache.lookup(&track.video_id, MediaKind::Audio).is_none());
    });
}

#[rstest]
fn test_cache_store_skips_download_on_hit(ctx: TestContext) {
    smol::block_on(async {
        let cache = ctx.cache();
        let client = MockClient::new();
        let track = track("dQw4w9WgXcQ", "A");

        cache.store(&client, &track, MediaKind::Audio, "fmt".to_string()).await.unwrap();
        cache.store(&client, &track, MediaKind::Audio, "fmt".to_string()).await.unwrap();
        assert_eq!(client.download_count(), 1);
    });
}

#[rstest]
fn test_cache_failed_download_commits_nothing(ctx: TestContext) {
    smol::block_on(async {
        let cache = ctx.cache();
        let track = track("dQw4w9WgXcQ", "A");

        let err = cache.store(&FailingClient, &track, MediaKind::Audio, "fmt".to_string()).await;
        assert!(err.is_err());
        assert!(cache.lookup(&track.video_id, MediaKind::Audio).is_none());
        // No staging file left behind either
        let leftovers: Vec<_> = fs::read_dir(cache.dir()).unwrap().collect();
        assert!(leftovers.is_empty(), "cache dir should be empty: {leftovers:?}");
    });
}

#[rstest]
fn test_cache_empty_download_is_fetch_error(ctx: TestContext) {
    smol::block_on(async {
        let cache = ctx.cache();
        let client = MockClient::with_payload(b"");
        let track = track("dQw4w9WgXcQ", "A");

        let err =
            cache.store(&client, &track, MediaKind::Audio, "fmt".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
        assert!(cache.lookup(&track.video_id, MediaKind::Audio).is_none());
    });
}

// Identifiers

#[rstest]
#[case("dQw4w9WgXcQ", Some("dQw4w9WgXcQ"))]
#[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Some("dQw4w9WgXcQ"))]
#[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42", Some("dQw4w9WgXcQ"))]
#[case("https://youtu.be/dQw4w9WgXcQ", Some("dQw4w9WgXcQ"))]
#[case("https://example.com/watch?v=dQw4w9WgXcQ", None)]
#[case("short", None)]
fn test_video_id_from_any(#[case] input: &str, #[case] expected: Option<&str>) {
    let parsed = VideoId::from_any(input);
    match expected {
        Some(id) => assert_eq!(parsed.unwrap(), id),
        None => assert!(parsed.is_none()),
    }
}

#[rstest]
fn test_video_id_from_location_sanitizes() {
    let id = VideoId::from_location("https://example.com/some song.mp3");
    assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

// Resolver output parsing

#[rstest]
fn test_parse_search_result_field_priorities() {
    let line = r#"{"id":"dQw4w9WgXcQ","track":"Track Field","title":"Title Field","creator":"Creator","uploader":"Uploader","duration":212.5,"thumbnail":"https://i.ytimg.com/vi/x/hq.jpg"}"#;
    let result = YtdlpAdapter::parse_search_result(line).unwrap();
    assert_eq!(result.video_id, "dQw4w9WgXcQ");
    assert_eq!(result.title, "Track Field");
    assert_eq!(result.channel, "Creator");
    assert_eq!(result.duration, Duration::from_secs_f64(212.5));
    assert_eq!(result.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/x/hq.jpg"));
}

#[rstest]
fn test_parse_search_result_fallbacks() {
    let line = r#"{"id":"dQw4w9WgXcQ"}"#;
    let result = YtdlpAdapter::parse_search_result(line).unwrap();
    assert_eq!(result.title, "Unknown Title");
    assert_eq!(result.channel, "Unknown Channel");
    assert_eq!(result.duration, Duration::ZERO);

    assert!(YtdlpAdapter::parse_search_result("not json").is_err());
}

// Stream URL expiry

#[rstest]
fn test_stream_url_expiry_extraction() {
    let url = "https://rr1---sn-1.googlevideo.com/videoplayback?expire=1700000000&id=x";
    assert_eq!(stream_url_expiry(url), Some(1_700_000_000));
    assert_eq!(stream_url_expiry("https://example.com/no-expiry"), None);
}

#[rstest]
fn test_expiring_url_cache_drops_stale_entries() {
    let mut cache: ExpiringUrlCache<VideoId, String> =
        ExpiringUrlCache::new(NonZeroUsize::new(4).unwrap());
    let id = VideoId::new("dQw4w9WgXcQ");

    // Already expired
    cache.put(id.clone(), "https://g.test/videoplayback?expire=1000&id=x".to_string());
    assert!(cache.get(&id).is_none());

    // Far in the future
    let fresh = "https://g.test/videoplayback?expire=9999999999&id=x".to_string();
    cache.put(id.clone(), fresh.clone());
    assert_eq!(cache.get(&id), Some(&fresh));

    // No expire parameter: never treated as stale
    let local = "https://example.com/static.m4a".to_string();
    cache.put(id.clone(), local.clone());
    assert_eq!(cache.get(&id), Some(&local));
    assert!(!is_stream_url_expired(&local));
}

// Player IPC

#[cfg(unix)]
fn fake_mpv_ipc(socket: &std::path::Path) -> std::thread::JoinHandle<String> {
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;

    let listener = UnixListener::bind(socket).expect("Failed to bind fake mpv socket");
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("No IPC connection");
        let mut line = String::new();
        BufReader::new(stream.try_clone().unwrap()).read_line(&mut line).unwrap();
        stream.write_all(b"{\"error\":\"success\"}\n").unwrap();
        line
    })
}

#[cfg(unix)]
#[rstest]
fn test_player_next_sends_playlist_next(ctx: TestContext) {
    let socket = ctx.path("mpv.sock");
    let server = fake_mpv_ipc(&socket);

    MpvPlayer::new("mpv", socket).next().unwrap();

    let received: serde_json::Value =
        serde_json::from_str(&server.join().unwrap()).unwrap();
    assert_eq!(received["command"], serde_json::json!(["playlist-next"]));
}

#[cfg(unix)]
#[rstest]
fn test_player_pause_sends_cycle_pause(ctx: TestContext) {
    let socket = ctx.path("mpv.sock");
    let server = fake_mpv_ipc(&socket);

    MpvPlayer::new("mpv", socket).toggle_pause().unwrap();

    let received: serde_json::Value =
        serde_json::from_str(&server.join().unwrap()).unwrap();
    assert_eq!(received["command"], serde_json::json!(["cycle", "pause"]));
}

// Services through the manager

fn collect_search_events(manager: &Manager<MockClient>, query: &str) -> Vec<AppEvent> {
    smol::block_on(async {
        let sender = manager.sender();
        let receiver = manager.receiver();
        sender
            .send(AppEvent::SearchRequest { query: query.to_string(), limit: 10 })
            .await
            .unwrap();

        let mut events = Vec::new();
        loop {
            let event = receiver.recv().await.unwrap();
            let done = matches!(event, AppEvent::SearchFinished | AppEvent::SearchError(_));
            events.push(event);
            if done {
                break;
            }
        }
        events
    })
}

#[rstest]
fn test_search_event_sequence(ctx: TestContext) {
    let client = MockClient::with_results(vec![result("aaaaaaaaaaa", "A"), result("bbbbbbbbbbb", "B")]);
    let manager = Manager::new(Arc::new(client), ctx.cache(), 2);
    manager.start();

    let events = collect_search_events(&manager, "two results");

    assert!(matches!(events.first(), Some(AppEvent::SearchStarted)));
    assert!(matches!(events.last(), Some(AppEvent::SearchFinished)));
    let titles: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SearchResult(r) => Some(r.title.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(titles, ["A", "B"]);
}

#[rstest]
fn test_repeated_searches_each_complete(ctx: TestContext) {
    let client = MockClient::with_results(vec![result("aaaaaaaaaaa", "A")]);
    let manager = Manager::new(Arc::new(client), ctx.cache(), 2);
    manager.start();

    // The second request replaces the first task; both must run to
    // completion with a full Started..Finished sequence
    for _ in 0..2 {
        let events = collect_search_events(&manager, "repeat");
        assert!(matches!(events.first(), Some(AppEvent::SearchStarted)));
        assert!(matches!(events.last(), Some(AppEvent::SearchFinished)));
        assert_eq!(
            events.iter().filter(|e| matches!(e, AppEvent::SearchResult(_))).count(),
            1
        );
    }
}

#[rstest]
fn test_search_failure_reports_error_event(ctx: TestContext) {
    let manager = Manager::new(Arc::new(FailingClient), ctx.cache(), 2);
    manager.start();

    smol::block_on(async {
        let sender = manager.sender();
        let receiver = manager.receiver();
        sender
            .send(AppEvent::SearchRequest { query: "anything".to_string(), limit: 5 })
            .await
            .unwrap();

        loop {
            match receiver.recv().await.unwrap() {
                AppEvent::SearchError(message) => {
                    assert!(message.contains("yt-dlp"));
                    break;
                }
                AppEvent::SearchFinished => panic!("search should not finish cleanly"),
                _ => {}
            }
        }
    });
}

#[rstest]
fn test_download_events_and_cache_commit(ctx: TestContext) {
    let cache = ctx.cache();
    let manager = Manager::new(Arc::new(MockClient::new()), cache.clone(), 2);
    manager.start();

    smol::block_on(async {
        let sender = manager.sender();
        let receiver = manager.receiver();
        let tracks: Arc<[Track]> =
            Arc::from([track("aaaaaaaaaaa", "A"), track("bbbbbbbbbbb", "B")]);
        sender
            .send(AppEvent::DownloadMany { tracks, kind: MediaKind::Audio, max_height: 480 })
            .await
            .unwrap();

        let mut finished = Vec::new();
        while finished.len() < 2 {
            match receiver.recv().await.unwrap() {
                AppEvent::DownloadFinished { video_id, path } => {
                    assert!(path.exists());
                    finished.push(video_id);
                }
                AppEvent::DownloadFailed { video_id, message } => {
                    panic!("download of {video_id} failed: {message}");
                }
                _ => {}
            }
        }

        assert!(cache.lookup(&VideoId::new("aaaaaaaaaaa"), MediaKind::Audio).is_some());
        assert!(cache.lookup(&VideoId::new("bbbbbbbbbbb"), MediaKind::Audio).is_some());
    });
}

#[rstest]
fn test_download_failure_reports_event(ctx: TestContext) {
    let manager = Manager::new(Arc::new(FailingClient), ctx.cache(), 2);
    manager.start();

    smol::block_on(async {
        let sender = manager.sender();
        let receiver = manager.receiver();
        sender
            .send(AppEvent::Download {
                track: track("aaaaaaaaaaa", "A"),
                kind: MediaKind::Audio,
                max_height: 480,
            })
            .await
            .unwrap();

        loop {
            match receiver.recv().await.unwrap() {
                AppEvent::DownloadFailed { video_id, .. } => {
                    assert_eq!(video_id, "aaaaaaaaaaa");
                    break;
                }
                AppEvent::DownloadFinished { .. } => panic!("download should fail"),
                _ => {}
            }
        }
    });
}

#[rstest]
fn test_manager_reuses_fresh_stream_url(ctx: TestContext) {
    let client = Arc::new(MockClient::with_stream_url(
        "https://g.test/videoplayback?expire=9999999999&id=x",
    ));
    let manager = Manager::new(client.clone(), ctx.cache(), 2);

    smol::block_on(async {
        let id = VideoId::new("dQw4w9WgXcQ");
        let first = manager.resolve_stream_url(&id).await.unwrap();
        let second = manager.resolve_stream_url(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.resolution_count(), 1);
    });
}

#[rstest]
fn test_manager_rerequests_expired_stream_url(ctx: TestContext) {
    let client = Arc::new(MockClient::with_stream_url(
        "https://g.test/videoplayback?expire=1000&id=x",
    ));
    let manager = Manager::new(client.clone(), ctx.cache(), 2);

    smol::block_on(async {
        let id = VideoId::new("dQw4w9WgXcQ");
        manager.resolve_stream_url(&id).await.unwrap();
        manager.resolve_stream_url(&id).await.unwrap();
        assert_eq!(client.resolution_count(), 2);
    });
}
