use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid artwork URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Unsupported artwork URL scheme {0}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Request(#[from] reqwest_middleware::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Artwork request returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Artwork is larger than the {limit} byte limit")]
    TooLarge { limit: usize },
    #[error("Error reading artwork file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error decoding artwork: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Artwork decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
