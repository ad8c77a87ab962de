use crate::core::config::LoaderConfig;
use crate::prelude::HashMap;
use crate::tiles::tile::TileKey;
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// A tile image the drawer wants fetched
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub key: TileKey,
    pub url: String,
    /// Drawer time (ms) at which the load was issued
    pub issued_at: f64,
}

/// Outcome of an image load; `image` is `None` on failure or timeout
#[derive(Debug)]
pub struct ImageResponse<I> {
    pub key: TileKey,
    pub url: String,
    pub issued_at: f64,
    pub image: Option<I>,
}

impl<I> ImageResponse<I> {
    fn failed(request: &ImageRequest) -> Self {
        Self {
            key: request.key,
            url: request.url.clone(),
            issued_at: request.issued_at,
            image: None,
        }
    }
}

/// Asynchronous source of decoded tile images.
///
/// `load_image` returns immediately; finished loads come back through
/// `poll_completed`. Loads that outlive the timeout are reported as failures
/// and their late results are dropped.
pub trait ImageLoader {
    type Image;

    /// Starts a load, or refuses it when the concurrency limit is reached
    fn load_image(&mut self, request: ImageRequest) -> bool;

    /// Drains finished loads, failing any that timed out before `now`
    fn poll_completed(&mut self, now: f64) -> Vec<ImageResponse<Self::Image>>;

    /// Number of loads in flight
    fn downloading(&self) -> usize;
}

/// Bookkeeping shared by the loaders: in-flight requests and their timeouts
#[derive(Debug)]
struct InFlight {
    config: LoaderConfig,
    requests: HashMap<TileKey, ImageRequest>,
}

impl InFlight {
    fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            requests: HashMap::default(),
        }
    }

    fn try_start(&mut self, request: &ImageRequest) -> bool {
        if !self.config.has_capacity(self.requests.len()) {
            log::debug!(
                "refusing tile {}: {} loads in flight",
                request.key,
                self.requests.len()
            );
            return false;
        }
        self.requests.insert(request.key, request.clone());
        true
    }

    /// Removes and returns the matching request if it is still outstanding
    fn finish(&mut self, key: &TileKey, issued_at: f64) -> Option<ImageRequest> {
        match self.requests.get(key) {
            Some(request) if request.issued_at == issued_at => self.requests.remove(key),
            _ => None,
        }
    }

    fn expire<I>(&mut self, now: f64, out: &mut Vec<ImageResponse<I>>) {
        let timeout = self.config.timeout_ms as f64;
        let expired: Vec<TileKey> = self
            .requests
            .values()
            .filter(|r| now - r.issued_at >= timeout)
            .map(|r| r.key)
            .collect();

        for key in expired {
            if let Some(request) = self.requests.remove(&key) {
                log::debug!("tile {} timed out: {}", request.key, request.url);
                out.push(ImageResponse::failed(&request));
            }
        }
    }
}

/// Fetches and decodes one image, blocking the calling thread
pub trait ImageFetcher: Send + Sync + 'static {
    type Image: Send + 'static;

    fn fetch(&self, url: &str) -> Result<Self::Image>;
}

struct Completion<I> {
    key: TileKey,
    issued_at: f64,
    result: Result<I>,
}

/// Runs every fetch on its own thread and collects results over a channel
pub struct ThreadedImageLoader<F: ImageFetcher> {
    fetcher: Arc<F>,
    in_flight: InFlight,
    result_tx: Sender<Completion<F::Image>>,
    result_rx: Receiver<Completion<F::Image>>,
}

impl<F: ImageFetcher> ThreadedImageLoader<F> {
    pub fn new(fetcher: F, config: LoaderConfig) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            fetcher: Arc::new(fetcher),
            in_flight: InFlight::new(config),
            result_tx,
            result_rx,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.in_flight.config
    }
}

impl<F: ImageFetcher> ImageLoader for ThreadedImageLoader<F> {
    type Image = F::Image;

    fn load_image(&mut self, request: ImageRequest) -> bool {
        if !self.in_flight.try_start(&request) {
            return false;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.result_tx.clone();
        let ImageRequest {
            key,
            url,
            issued_at,
        } = request;

        log::debug!("fetch tile {} from {}", key, url);
        thread::spawn(move || {
            let result = fetcher.fetch(&url);
            // the loader may have been dropped with the image it belonged to
            let _ = tx.send(Completion {
                key,
                issued_at,
                result,
            });
        });
        true
    }

    fn poll_completed(&mut self, now: f64) -> Vec<ImageResponse<F::Image>> {
        let mut responses = Vec::new();

        while let Ok(done) = self.result_rx.try_recv() {
            let request = match self.in_flight.finish(&done.key, done.issued_at) {
                Some(request) => request,
                None => {
                    log::debug!("dropping late result for tile {}", done.key);
                    continue;
                }
            };
            let image = match done.result {
                Ok(image) => Some(image),
                Err(e) => {
                    log::warn!("tile {} failed to load from {}: {}", request.key, request.url, e);
                    None
                }
            };
            responses.push(ImageResponse {
                key: request.key,
                url: request.url,
                issued_at: request.issued_at,
                image,
            });
        }

        self.in_flight.expire(now, &mut responses);
        responses
    }

    fn downloading(&self) -> usize {
        self.in_flight.requests.len()
    }
}

/// A loader whose fetches are performed by the host: requests are taken with
/// `take_requests` and answered with `complete`
#[derive(Debug)]
pub struct DeferredImageLoader<I> {
    in_flight: InFlight,
    pending: Vec<ImageRequest>,
    completed: Vec<ImageResponse<I>>,
}

impl<I> DeferredImageLoader<I> {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            in_flight: InFlight::new(config),
            pending: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Requests issued since the last call
    pub fn take_requests(&mut self) -> Vec<ImageRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Requests that have not been answered yet
    pub fn outstanding(&self) -> impl Iterator<Item = &ImageRequest> {
        self.in_flight.requests.values()
    }

    /// Answers an outstanding request; `None` reports a failed load.
    /// Returns false when the request is unknown or already timed out.
    pub fn complete(&mut self, key: TileKey, image: Option<I>) -> bool {
        let issued_at = match self.in_flight.requests.get(&key) {
            Some(request) => request.issued_at,
            None => return false,
        };
        match self.in_flight.finish(&key, issued_at) {
            Some(request) => {
                self.completed.push(ImageResponse {
                    key,
                    url: request.url,
                    issued_at,
                    image,
                });
                true
            }
            None => false,
        }
    }
}

impl<I> Default for DeferredImageLoader<I> {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl<I> ImageLoader for DeferredImageLoader<I> {
    type Image = I;

    fn load_image(&mut self, request: ImageRequest) -> bool {
        if !self.in_flight.try_start(&request) {
            return false;
        }
        self.pending.push(request);
        true
    }

    fn poll_completed(&mut self, now: f64) -> Vec<ImageResponse<I>> {
        let mut responses = std::mem::take(&mut self.completed);
        self.in_flight.expire(now, &mut responses);
        responses
    }

    fn downloading(&self) -> usize {
        self.in_flight.requests.len()
    }
}
