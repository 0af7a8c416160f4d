use crate::youtube::cache::MediaCache;
use crate::youtube::constants::URL_CACHE_SIZE;
use crate::youtube::download::DownloadService;
use crate::youtube::error::Result;
use crate::youtube::events::AppEvent;
use crate::youtube::models::{Track, VideoId};
use crate::youtube::search::SearchService;
use crate::youtube::streaming::ExpiringUrlCache;
use crate::youtube::ytdlp::ResolverClient;
use async_channel::{Receiver, Sender, bounded};
use parking_lot::{Mutex, RwLock};
use std::fmt::Formatter;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Wires the background services together: requests go in through
/// `sender()`, results come back out through `receiver()`. Mutations of
/// playlist and cache state stay with the caller; the manager only runs the
/// non-blocking fetch work.
pub struct Manager<C: ResolverClient> {
    request_tx: Sender<AppEvent>,
    request_rx: Receiver<AppEvent>,
    event_tx: Sender<AppEvent>,
    event_rx: Receiver<AppEvent>,
    client: Arc<C>,
    url_cache: Arc<RwLock<ExpiringUrlCache<VideoId, String>>>,
    tasks: Arc<Mutex<Vec<smol::Task<()>>>>,

    search: Arc<SearchService<C>>,
    download: Arc<DownloadService<C>>,
}

impl<C: ResolverClient> std::fmt::Debug for Manager<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("request_tx", &self.request_tx)
            .field("event_tx", &self.event_tx)
            .finish_non_exhaustive()
    }
}

impl<C: ResolverClient + 'static> Manager<C> {
    pub fn new(client: Arc<C>, cache: MediaCache, concurrency: usize) -> Self {
        let (request_tx, request_rx) = bounded(100);
        let (event_tx, event_rx) = bounded(100);
        let url_cache = Arc::new(RwLock::new(ExpiringUrlCache::new(
            NonZeroUsize::new(URL_CACHE_SIZE).expect("URL_CACHE_SIZE is non-zero"),
        )));

        // Limit concurrent yt-dlp processes to avoid system strain
        let concurrency = concurrency.max(1);
        let (permit_tx, permit_rx) = bounded(concurrency);
        for _ in 0..concurrency {
            let _ = permit_tx.send_blocking(());
        }

        let search = Arc::new(SearchService::new(event_tx.clone(), client.clone()));
        let download = Arc::new(DownloadService::new(
            event_tx.clone(),
            cache,
            client.clone(),
            permit_tx,
            permit_rx,
        ));

        Self {
            request_tx,
            request_rx,
            event_tx,
            event_rx,
            client,
            url_cache,
            tasks: Arc::new(Mutex::new(Vec::new())),
            search,
            download,
        }
    }

    pub fn start(&self) {
        let request_rx_clone = self.request_rx.clone();
        let event_tx_clone = self.event_tx.clone();

        let search = self.search.clone();
        let download = self.download.clone();

        let mut tasks = self.tasks.lock();

        tasks.push(smol::spawn(async move {
            log::debug!("Event router started");
            while let Ok(event) = request_rx_clone.recv().await {
                log::trace!("Routing request: {event:?}");
                match event {
                    AppEvent::SearchRequest { query, limit } => {
                        search.start(query, limit).await;
                    }
                    AppEvent::CancelSearch => {
                        search.cancel().await;
                    }
                    event @ (AppEvent::Download { .. } | AppEvent::DownloadMany { .. }) => {
                        download.handle_event(event).await;
                    }
                    event => {
                        let _ = event_tx_clone.send(event).await;
                    }
                }
            }
            log::debug!("Event router stopped");
        }));
    }

    pub fn sender(&self) -> Sender<AppEvent> {
        self.request_tx.clone()
    }

    pub fn receiver(&self) -> Receiver<AppEvent> {
        self.event_rx.clone()
    }

    /// Resolves a direct stream URL, reusing a cached one while it is still
    /// fresh. Resolved googlevideo URLs expire; the cache treats those as
    /// misses (see `streaming`).
    pub async fn resolve_stream_url(&self, video_id: &VideoId) -> Result<String> {
        if let Some(url) = self.url_cache.write().get(video_id) {
            log::debug!("Stream URL cache hit for {video_id}");
            return Ok(url.clone());
        }

        let url = self.client.resolve_stream_url(video_id.as_str()).await?;
        self.url_cache.write().put(video_id.clone(), url.clone());
        Ok(url)
    }

    pub async fn fetch_metadata(&self, video_id: &VideoId) -> Result<Track> {
        self.client.fetch_metadata(video_id.as_str()).await
    }
}
