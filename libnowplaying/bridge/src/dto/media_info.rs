use serde_json::Value;

use super::artwork::Artwork;
use super::bridge_error::BridgeError;

/// The record currently shown on the OS now-playing surface.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork_url: Option<String>,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub(crate) artwork: Option<Artwork>,
}

impl MediaInfo {
    pub fn artwork(&self) -> Option<&Artwork> {
        self.artwork.as_ref()
    }

    /// The URL artwork should be fetched from, ignoring empty strings.
    pub(crate) fn artwork_key(&self) -> Option<&str> {
        self.artwork_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// A partial update sent by the application. Only `title` and `artist` are required.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub is_playing: Option<bool>,
    pub position_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl MediaUpdate {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: Some(artist.into()),
            ..Default::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork_url(mut self, artwork_url: impl Into<String>) -> Self {
        self.artwork_url = Some(artwork_url.into());
        self
    }

    pub fn with_playing(mut self, is_playing: bool) -> Self {
        self.is_playing = Some(is_playing);
        self
    }

    pub fn with_position_ms(mut self, position_ms: u64) -> Self {
        self.position_ms = Some(position_ms);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Reads an update from loosely typed channel arguments.
    ///
    /// Fields with an unexpected type are treated as missing so optional values
    /// fall back to their defaults. Negative times are clamped to zero.
    pub fn from_args(args: &Value) -> Self {
        let string = |key: &str| args.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            title: string("title"),
            artist: string("artist"),
            album: string("album"),
            artwork_url: string("artworkUrl"),
            is_playing: args.get("isPlaying").and_then(Value::as_bool),
            position_ms: millis(args.get("position")),
            duration_ms: millis(args.get("duration")),
        }
    }
}

fn millis(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    value
        .as_u64()
        .or_else(|| value.as_i64().map(|millis| millis.max(0) as u64))
        .or_else(|| {
            value
                .as_f64()
                .filter(|millis| millis.is_finite())
                .map(|millis| millis.max(0.0) as u64)
        })
}

impl TryFrom<MediaUpdate> for MediaInfo {
    type Error = BridgeError;

    fn try_from(update: MediaUpdate) -> Result<Self, Self::Error> {
        let (title, artist) = match (update.title, update.artist) {
            (Some(title), Some(artist)) => (title, artist),
            (None, Some(_)) => {
                return Err(BridgeError::InvalidArguments(
                    "title is required".to_owned(),
                ));
            }
            (Some(_), None) => {
                return Err(BridgeError::InvalidArguments(
                    "artist is required".to_owned(),
                ));
            }
            (None, None) => {
                return Err(BridgeError::InvalidArguments(
                    "title and artist are required".to_owned(),
                ));
            }
        };

        Ok(Self {
            title,
            artist,
            album: update.album.unwrap_or_default(),
            artwork_url: update.artwork_url,
            is_playing: update.is_playing.unwrap_or(false),
            position_ms: update.position_ms.unwrap_or(0),
            duration_ms: update.duration_ms.unwrap_or(0),
            artwork: None,
        })
    }
}
