use tap::TapFallible;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::dto::bridge_event::BridgeEvent;
use crate::dto::command::FetchCompletion;
use crate::dto::display_state::DisplayState;
use crate::dto::media_info::MediaInfo;
use crate::platform::NowPlayingDisplay;

/// Owns the single current now-playing record and mirrors it to the display.
///
/// Only the event loop holds this, so every mutation is serialized.
pub(crate) struct NowPlayingStore<D: NowPlayingDisplay> {
    current: Option<MediaInfo>,
    display: D,
    event_tx: broadcast::Sender<BridgeEvent>,
    reuse_resolved_artwork: bool,
}

impl<D: NowPlayingDisplay> NowPlayingStore<D> {
    pub(crate) fn new(
        display: D,
        event_tx: broadcast::Sender<BridgeEvent>,
        reuse_resolved_artwork: bool,
    ) -> Self {
        Self {
            current: None,
            display,
            event_tx,
            reuse_resolved_artwork,
        }
    }

    /// Replaces the current record and publishes its text fields right away.
    /// Returns the artwork URL that still needs to be fetched, if any.
    pub(crate) fn publish(&mut self, mut info: MediaInfo) -> Option<String> {
        if self.reuse_resolved_artwork
            && let Some(previous) = &self.current
            && previous.artwork_key().is_some()
            && previous.artwork_key() == info.artwork_key()
        {
            info.artwork = previous.artwork.clone();
        }

        let state = DisplayState::from(&info);
        self.show(Some(&state));
        info!(
            "Published {} - {} (playing: {})",
            state.artist,
            state.title,
            state.is_playing()
        );

        let pending_url = match (info.artwork_key(), &info.artwork) {
            (Some(url), None) => Some(url.to_owned()),
            _ => None,
        };
        self.current = Some(info);
        self.event_tx.send(BridgeEvent::Published(state)).ok();
        pending_url
    }

    /// Always clears the display, even if there was no record, so a retried clear
    /// reaches the OS after a failed one. Returns false if there was nothing to clear.
    pub(crate) fn clear(&mut self) -> bool {
        let had_record = self.current.take().is_some();
        self.show(None);
        if !had_record {
            debug!("Now playing info is already clear");
            return false;
        }
        info!("Cleared now playing info");
        self.event_tx.send(BridgeEvent::Cleared).ok();
        true
    }

    /// Applies fetched artwork if its URL still matches the current record.
    pub(crate) fn complete_fetch(&mut self, completion: FetchCompletion) -> bool {
        let FetchCompletion { url, artwork } = completion;
        let Some(artwork) = artwork else {
            self.event_tx
                .send(BridgeEvent::ArtworkUnavailable { url })
                .ok();
            return false;
        };

        let Some(current) = self
            .current
            .as_mut()
            .filter(|current| current.artwork_key() == Some(url.as_str()))
        else {
            info!("Discarding stale artwork for {url}");
            self.event_tx
                .send(BridgeEvent::ArtworkDiscarded { url })
                .ok();
            return false;
        };

        current.artwork = Some(artwork);
        let state = DisplayState::from(&*current);
        self.show(Some(&state));
        info!("Applied artwork from {url}");
        self.event_tx.send(BridgeEvent::ArtworkApplied(state)).ok();
        true
    }

    pub(crate) fn display_state(&self) -> Option<DisplayState> {
        self.current.as_ref().map(DisplayState::from)
    }

    pub(crate) fn current_artwork_key(&self) -> Option<&str> {
        self.current.as_ref().and_then(MediaInfo::artwork_key)
    }

    fn show(&mut self, state: Option<&DisplayState>) {
        // Errors are logged only; the next publish overwrites whatever the OS shows
        self.display
            .publish(state)
            .tap_err(|e| error!("Error updating now playing display: {e}"))
            .ok();
    }

    pub(crate) fn event_tx(&self) -> &broadcast::Sender<BridgeEvent> {
        &self.event_tx
    }
}

impl<D: NowPlayingDisplay> Drop for NowPlayingStore<D> {
    fn drop(&mut self) {
        if self.current.is_some() {
            warn!("Store dropped while now playing info was still set, clearing display");
            self.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dto::artwork::Artwork;
    use crate::dto::media_info::MediaUpdate;
    use crate::platform::MockDisplay;

    fn store(reuse: bool) -> (NowPlayingStore<MockDisplay>, MockDisplay) {
        let display = MockDisplay::new();
        let (event_tx, _) = broadcast::channel(16);
        (NowPlayingStore::new(display.clone(), event_tx, reuse), display)
    }

    fn info(update: MediaUpdate) -> MediaInfo {
        MediaInfo::try_from(update).unwrap()
    }

    fn artwork(url: &str) -> Artwork {
        let mut encoded = vec![];
        image::DynamicImage::new_rgba8(3, 2)
            .write_to(
                &mut std::io::Cursor::new(&mut encoded),
                image::ImageFormat::Png,
            )
            .unwrap();
        Artwork::decode(url, encoded).unwrap()
    }

    #[test]
    fn publish_requests_fetch_only_for_artwork() {
        let (mut store, _) = store(true);
        assert_eq!(None, store.publish(info(MediaUpdate::new("A", "B"))));
        assert_eq!(
            Some("http://a/1.png".to_owned()),
            store.publish(info(
                MediaUpdate::new("A", "B").with_artwork_url("http://a/1.png")
            ))
        );
    }

    #[test]
    fn merge_keeps_newer_text_fields() {
        let (mut store, display) = store(true);
        store.publish(info(
            MediaUpdate::new("A", "B").with_artwork_url("http://a/1.png"),
        ));
        store.publish(info(
            MediaUpdate::new("A", "B")
                .with_artwork_url("http://a/1.png")
                .with_playing(true)
                .with_position_ms(2000),
        ));

        assert!(store.complete_fetch(FetchCompletion {
            url: "http://a/1.png".to_owned(),
            artwork: Some(artwork("http://a/1.png")),
        }));

        let current = display.current().unwrap();
        assert_eq!(2.0, current.elapsed_secs);
        assert_eq!(1.0, current.playback_rate);
        assert_eq!(
            Some("http://a/1.png"),
            current.artwork.as_ref().map(Artwork::source_url)
        );
    }

    #[test]
    fn reuses_resolved_artwork_for_same_url() {
        let (mut store, display) = store(true);
        store.publish(info(
            MediaUpdate::new("A", "B").with_artwork_url("http://a/1.png"),
        ));
        store.complete_fetch(FetchCompletion {
            url: "http://a/1.png".to_owned(),
            artwork: Some(artwork("http://a/1.png")),
        });

        let pending = store.publish(info(
            MediaUpdate::new("A", "B")
                .with_artwork_url("http://a/1.png")
                .with_position_ms(5000),
        ));

        assert_eq!(None, pending);
        assert!(display.current().unwrap().artwork.is_some());
    }

    #[test]
    fn refetches_when_reuse_disabled() {
        let (mut store, display) = store(false);
        store.publish(info(
            MediaUpdate::new("A", "B").with_artwork_url("http://a/1.png"),
        ));
        store.complete_fetch(FetchCompletion {
            url: "http://a/1.png".to_owned(),
            artwork: Some(artwork("http://a/1.png")),
        });

        let pending = store.publish(info(
            MediaUpdate::new("A", "B").with_artwork_url("http://a/1.png"),
        ));

        assert_eq!(Some("http://a/1.png".to_owned()), pending);
        assert_eq!(None, display.current().unwrap().artwork);
    }

    #[test]
    fn failed_fetch_leaves_display_untouched() {
        let (mut store, display) = store(true);
        store.publish(info(
            MediaUpdate::new("A", "B").with_artwork_url("http://a/1.png"),
        ));
        assert!(!store.complete_fetch(FetchCompletion {
            url: "http://a/1.png".to_owned(),
            artwork: None,
        }));
        assert_eq!(1, display.history().len());
    }

    /// Records whether each call carried a state and fails the first clear.
    #[derive(Clone, Default)]
    struct FailingClearDisplay {
        calls: std::sync::Arc<std::sync::Mutex<Vec<bool>>>,
        failed_clear: bool,
    }

    impl NowPlayingDisplay for FailingClearDisplay {
        fn publish(
            &mut self,
            state: Option<&DisplayState>,
        ) -> Result<(), crate::dto::bridge_error::BridgeError> {
            self.calls.lock().unwrap().push(state.is_some());
            if state.is_none() && !self.failed_clear {
                self.failed_clear = true;
                return Err(crate::dto::bridge_error::BridgeError::Platform(
                    "media service unavailable".to_owned(),
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn repeated_clear_reaches_display_after_failure() {
        let display = FailingClearDisplay::default();
        let calls = display.calls.clone();
        let (event_tx, mut events) = broadcast::channel(16);
        let mut store = NowPlayingStore::new(display, event_tx, true);

        store.publish(info(MediaUpdate::new("A", "B")));
        assert!(store.clear());
        assert!(!store.clear());

        assert_eq!(vec![true, false, false], *calls.lock().unwrap());
        assert_matches!(events.try_recv(), Ok(BridgeEvent::Published(_)));
        assert_matches!(events.try_recv(), Ok(BridgeEvent::Cleared));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn drop_clears_display() {
        let (mut store, display) = store(true);
        store.publish(info(MediaUpdate::new("A", "B")));
        drop(store);
        assert_eq!(None, display.current());
        assert_eq!(2, display.history().len());
    }
}
