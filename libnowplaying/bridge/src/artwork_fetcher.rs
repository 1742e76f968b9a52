use std::sync::Arc;

use async_trait::async_trait;
use derivative::Derivative;
use reqwest::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use tap::TapFallible;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dto::artwork::Artwork;
use crate::dto::command::FetchCompletion;
use crate::dto::fetch_error::FetchError;
use crate::settings::Settings;

/// Resolves an artwork URL into a decoded image.
#[async_trait]
pub trait ArtworkFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<Artwork, FetchError>;
}

/// Fetches `http(s)` artwork with retries and reads `file://` artwork from disk.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct HttpArtworkFetcher {
    #[derivative(Debug = "ignore")]
    client: ClientWithMiddleware,
    max_bytes: usize,
}

impl HttpArtworkFetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(settings.fetch_timeout)
            .build()?;
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(settings.fetch_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            max_bytes: settings.max_artwork_bytes,
        })
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        if let Some(content_length) = response.content_length()
            && content_length > self.max_bytes as u64
        {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.len() > self.max_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(bytes.to_vec())
    }

    async fn read_file(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = url.to_file_path().map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_owned(),
        })?;
        if tokio::fs::metadata(&path).await?.len() > self.max_bytes as u64 {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(tokio::fs::read(&path).await?)
    }
}

#[async_trait]
impl ArtworkFetcher for HttpArtworkFetcher {
    async fn fetch(&self, url: &str) -> Result<Artwork, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        let encoded = match parsed.scheme() {
            "http" | "https" => self.download(parsed).await?,
            "file" => self.read_file(&parsed).await?,
            scheme => return Err(FetchError::UnsupportedScheme(scheme.to_owned())),
        };
        debug!("Downloaded {} bytes of artwork from {url}", encoded.len());

        let url = url.to_owned();
        tokio::task::spawn_blocking(move || Artwork::decode(url, encoded)).await?
    }
}

struct InFlightFetch {
    url: String,
    cancellation_token: CancellationToken,
}

/// Spawns artwork fetches and funnels their tagged results back to the event loop.
pub(crate) struct ArtworkScheduler {
    fetcher: Arc<dyn ArtworkFetcher>,
    completion_tx: mpsc::UnboundedSender<FetchCompletion>,
    completion_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    in_flight: Option<InFlightFetch>,
    cancel_stale: bool,
    dedupe_in_flight: bool,
}

impl ArtworkScheduler {
    pub(crate) fn new(fetcher: Arc<dyn ArtworkFetcher>, settings: &Settings) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            completion_tx,
            completion_rx,
            in_flight: None,
            cancel_stale: settings.cancel_stale_fetches,
            dedupe_in_flight: settings.reuse_resolved_artwork,
        }
    }

    /// Brings fetches in line with the current record after a publish or clear.
    ///
    /// `current_key` is the current record's artwork URL, `pending_url` is set when that
    /// artwork still needs to be resolved.
    pub(crate) fn sync(&mut self, current_key: Option<&str>, pending_url: Option<String>) {
        if let Some(in_flight) = &self.in_flight
            && current_key != Some(in_flight.url.as_str())
        {
            self.cancel_in_flight();
        }

        let Some(url) = pending_url else {
            return;
        };
        if self.dedupe_in_flight
            && let Some(in_flight) = &self.in_flight
            && in_flight.url == url
        {
            debug!("Artwork fetch for {url} is already in flight");
            return;
        }
        self.cancel_in_flight();
        self.spawn(url);
    }

    pub(crate) fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            if self.cancel_stale {
                info!("Cancelling artwork fetch for {}", in_flight.url);
                in_flight.cancellation_token.cancel();
            } else {
                debug!("Letting superseded artwork fetch for {} finish", in_flight.url);
            }
        }
    }

    pub(crate) async fn next_completion(&mut self) -> Option<FetchCompletion> {
        let completion = self.completion_rx.recv().await?;
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.url == completion.url)
        {
            self.in_flight = None;
        }
        Some(completion)
    }

    fn spawn(&mut self, url: String) {
        info!("Fetching artwork from {url}");
        let cancellation_token = CancellationToken::new();
        let fetcher = self.fetcher.clone();
        let completion_tx = self.completion_tx.clone();
        let task_token = cancellation_token.clone();
        let task_url = url.clone();

        tokio::spawn(async move {
            let artwork = tokio::select! {
                _ = task_token.cancelled() => {
                    debug!("Artwork fetch for {task_url} cancelled");
                    return;
                }
                result = fetcher.fetch(&task_url) => result
                    .tap_err(|e| warn!("Error fetching artwork from {task_url}: {e}"))
                    .ok(),
            };
            completion_tx
                .send(FetchCompletion {
                    url: task_url,
                    artwork,
                })
                .ok();
        });

        self.in_flight = Some(InFlightFetch {
            url,
            cancellation_token,
        });
    }
}
