use std::time::Duration;

use super::artwork::Artwork;
use super::media_info::MediaInfo;

/// The fields handed to the OS now-playing surface.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub elapsed_secs: f64,
    pub duration_secs: f64,
    pub playback_rate: f64,
    pub artwork: Option<Artwork>,
}

impl DisplayState {
    pub fn is_playing(&self) -> bool {
        self.playback_rate > 0.0
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }
}

impl From<&MediaInfo> for DisplayState {
    fn from(info: &MediaInfo) -> Self {
        Self {
            title: info.title.clone(),
            artist: info.artist.clone(),
            album: info.album.clone(),
            elapsed_secs: info.position_ms as f64 / 1000.0,
            duration_secs: info.duration_ms as f64 / 1000.0,
            playback_rate: if info.is_playing { 1.0 } else { 0.0 },
            artwork: info.artwork.clone(),
        }
    }
}
