use std::sync::Arc;

use derivative::Derivative;
use image::DynamicImage;

use super::fetch_error::FetchError;

/// A decoded artwork image along with the URL it was resolved from.
#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct Artwork {
    source_url: String,
    width: u32,
    height: u32,
    #[derivative(Debug = "ignore")]
    image: Arc<DynamicImage>,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    encoded: Arc<[u8]>,
}

impl Artwork {
    pub fn decode(source_url: impl Into<String>, encoded: Vec<u8>) -> Result<Self, FetchError> {
        let image = image::load_from_memory(&encoded)?;
        Ok(Self {
            source_url: source_url.into(),
            width: image.width(),
            height: image.height(),
            image: Arc::new(image),
            encoded: encoded.into(),
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// The original bytes, for platforms that take encoded images.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}
