use crate::youtube::error::Result;
use crate::youtube::events::AppEvent;
use crate::youtube::models::SearchResult;
use crate::youtube::ytdlp::ResolverClient;
use async_channel::Sender;
use futures_lite::{Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;

type ResultStream = Pin<Box<dyn Stream<Item = Result<SearchResult>> + Send>>;

/// Runs at most one search at a time. Starting a new query replaces and
/// cancels whatever is still in flight, which also tears down the backing
/// yt-dlp process via `kill_on_drop`.
pub struct SearchService<C: ResolverClient> {
    event_tx: Sender<AppEvent>,
    client: Arc<C>,
    current: Mutex<Option<smol::Task<()>>>,
}

impl<C: ResolverClient + 'static> SearchService<C> {
    pub fn new(event_tx: Sender<AppEvent>, client: Arc<C>) -> Self {
        Self { event_tx, client, current: Mutex::new(None) }
    }

    pub async fn start(&self, query: String, limit: usize) {
        self.cancel().await;

        let event_tx = self.event_tx.clone();
        let stream = self.client.search(&query, limit);
        *self.current.lock() = Some(smol::spawn(run_search(stream, event_tx, query)));
    }

    pub async fn cancel(&self) {
        let task = self.current.lock().take();
        if let Some(task) = task {
            task.cancel().await;
        }
    }
}

/// Drains one search stream into events. Unparsable individual results are
/// skipped; only a failure to start the search at all is surfaced as
/// `SearchError`.
async fn run_search(stream: Result<ResultStream>, event_tx: Sender<AppEvent>, query: String) {
    let _ = event_tx.send(AppEvent::SearchStarted).await;

    let mut stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = event_tx.send(AppEvent::SearchError(e.to_string())).await;
            return;
        }
    };

    let mut sent = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(result) => {
                sent += 1;
                let _ = event_tx.send(AppEvent::SearchResult(result)).await;
            }
            Err(e) => {
                log::warn!("Skipping unparsable search result: {e}");
            }
        }
    }

    log::debug!("Search for {query:?} yielded {sent} results");
    let _ = event_tx.send(AppEvent::SearchFinished).await;
}
