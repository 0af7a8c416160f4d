use crate::youtube::cache::MediaCache;
use crate::youtube::constants::AUDIO_FORMAT;
use crate::youtube::constants::video_format;
use crate::youtube::events::AppEvent;
use crate::youtube::models::{MediaKind, Track};
use crate::youtube::ytdlp::ResolverClient;
use async_channel::{Receiver, Sender};
use std::sync::Arc;

/// Fetches media into the cache in the background. Concurrent yt-dlp
/// processes are capped by the shared permit channel.
pub struct DownloadService<C: ResolverClient> {
    event_tx: Sender<AppEvent>,
    cache: MediaCache,
    client: Arc<C>,
    permit_tx: Sender<()>,
    permit_rx: Receiver<()>,
}

impl<C: ResolverClient + 'static> DownloadService<C> {
    pub fn new(
        event_tx: Sender<AppEvent>,
        cache: MediaCache,
        client: Arc<C>,
        permit_tx: Sender<()>,
        permit_rx: Receiver<()>,
    ) -> Self {
        Self { event_tx, cache, client, permit_tx, permit_rx }
    }

    pub async fn handle_event(self: &Arc<Self>, event: AppEvent) {
        let inner = self.clone();
        match event {
            AppEvent::Download { track, kind, max_height } => {
                smol::spawn(async move {
                    inner.handle_download(Arc::from([track]), kind, max_height).await;
                })
                .detach();
            }
            AppEvent::DownloadMany { tracks, kind, max_height } => {
                smol::spawn(async move {
                    inner.handle_download(tracks, kind, max_height).await;
                })
                .detach();
            }
            _ => {}
        }
        smol::future::yield_now().await;
    }

    async fn handle_download(&self, tracks: Arc<[Track]>, kind: MediaKind, max_height: u32) {
        for track in tracks.iter() {
            let format = match kind {
                MediaKind::Audio => AUDIO_FORMAT.to_string(),
                MediaKind::Video => video_format(max_height),
            };

            if let Ok(()) = self.permit_rx.recv().await {
                log::info!("Starting download for: {}", track.title);
                let _ = self.event_tx.send(AppEvent::DownloadStarted(track.video_id.clone())).await;

                let res = self.cache.store(self.client.as_ref(), track, kind, format).await;

                let _ = self.permit_tx.send(()).await;

                match res {
                    Ok(path) => {
                        log::info!("Download finished for: {}", track.title);
                        let _ = self
                            .event_tx
                            .send(AppEvent::DownloadFinished {
                                video_id: track.video_id.clone(),
                                path,
                            })
                            .await;
                    }
                    Err(e) => {
                        log::error!("Download failed for {}: {e}", track.title);
                        let _ = self
                            .event_tx
                            .send(AppEvent::DownloadFailed {
                                video_id: track.video_id.clone(),
                                message: e.to_string(),
                            })
                            .await;
                    }
                }
            }
        }
    }
}
