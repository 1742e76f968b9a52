use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use derivative::Derivative;
use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, MediaPosition, PlatformConfig,
};
use tracing::{debug, info, warn};

use super::{NowPlayingDisplay, TransportHandler, TransportSource};
use crate::dto::bridge_error::BridgeError;
use crate::dto::display_state::DisplayState;
use crate::dto::transport_command::TransportCommand;

type Registrations = HashMap<TransportCommand, (TransportHandler, bool)>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn platform_error(e: impl Debug) -> BridgeError {
    BridgeError::Platform(format!("{e:?}"))
}

/// OS media controls (MPRIS, SMTC, MPNowPlayingInfoCenter) through souvlaki.
///
/// One instance serves as both the display and the transport source; clones share
/// the same underlying controls.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct SouvlakiPlatform {
    #[derivative(Debug = "ignore")]
    controls: Arc<Mutex<MediaControls>>,
    #[derivative(Debug = "ignore")]
    registrations: Arc<Mutex<Registrations>>,
    playing: Arc<AtomicBool>,
    attached: Arc<AtomicBool>,
}

impl SouvlakiPlatform {
    pub fn new(dbus_name: &str, display_name: &str) -> Result<Self, BridgeError> {
        let config = PlatformConfig {
            dbus_name,
            display_name,
            hwnd: None,
        };
        let controls = MediaControls::new(config).map_err(platform_error)?;
        info!("Created media controls for {display_name}");

        Ok(Self {
            controls: Arc::new(Mutex::new(controls)),
            registrations: Default::default(),
            playing: Default::default(),
            attached: Default::default(),
        })
    }

    fn ensure_attached(&self) -> Result<(), BridgeError> {
        if self.attached.load(Ordering::SeqCst) {
            return Ok(());
        }
        let registrations = self.registrations.clone();
        let playing = self.playing.clone();

        lock(&self.controls)
            .attach(move |event: MediaControlEvent| {
                let command = match event {
                    MediaControlEvent::Play => TransportCommand::Play,
                    MediaControlEvent::Pause => TransportCommand::Pause,
                    MediaControlEvent::Next => TransportCommand::Next,
                    MediaControlEvent::Previous => TransportCommand::Previous,
                    MediaControlEvent::Toggle => {
                        if playing.load(Ordering::SeqCst) {
                            TransportCommand::Pause
                        } else {
                            TransportCommand::Play
                        }
                    }
                    other => {
                        debug!("Ignoring media control event {other:?}");
                        return;
                    }
                };

                let handler = lock(&registrations)
                    .get(&command)
                    .filter(|(_, enabled)| *enabled)
                    .map(|(handler, _)| handler.clone());
                match handler {
                    Some(handler) => {
                        let status = handler();
                        debug!("Handled {command} with status {status}");
                    }
                    None => debug!("No enabled handler for {command}"),
                }
            })
            .map_err(platform_error)?;

        self.attached.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl NowPlayingDisplay for SouvlakiPlatform {
    fn publish(&mut self, state: Option<&DisplayState>) -> Result<(), BridgeError> {
        // Metadata is rejected until the controls are attached
        self.ensure_attached()?;
        let mut controls = lock(&self.controls);
        match state {
            Some(state) => {
                controls
                    .set_metadata(MediaMetadata {
                        title: Some(&state.title),
                        album: Some(&state.album),
                        artist: Some(&state.artist),
                        cover_url: state.artwork.as_ref().map(|a| a.source_url()),
                        duration: Some(state.duration()),
                    })
                    .map_err(platform_error)?;

                let progress = Some(MediaPosition(state.elapsed()));
                let playback = if state.is_playing() {
                    MediaPlayback::Playing { progress }
                } else {
                    MediaPlayback::Paused { progress }
                };
                controls.set_playback(playback).map_err(platform_error)?;
                self.playing.store(state.is_playing(), Ordering::SeqCst);
            }
            None => {
                controls
                    .set_metadata(MediaMetadata::default())
                    .map_err(platform_error)?;
                controls
                    .set_playback(MediaPlayback::Stopped)
                    .map_err(platform_error)?;
                self.playing.store(false, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

impl TransportSource for SouvlakiPlatform {
    fn set_handler(
        &mut self,
        command: TransportCommand,
        handler: TransportHandler,
    ) -> Result<(), BridgeError> {
        {
            let mut registrations = lock(&self.registrations);
            let enabled = registrations.get(&command).is_some_and(|(_, e)| *e);
            registrations.insert(command, (handler, enabled));
        }
        self.ensure_attached()
    }

    fn set_enabled(
        &mut self,
        command: TransportCommand,
        enabled: bool,
    ) -> Result<(), BridgeError> {
        match lock(&self.registrations).get_mut(&command) {
            Some((_, current)) => {
                *current = enabled;
                Ok(())
            }
            None => {
                warn!("Tried to toggle {command} before registering a handler");
                Err(BridgeError::Platform(format!(
                    "No handler registered for {command}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::media_info::{MediaInfo, MediaUpdate};

    #[test]
    #[ignore = "needs a session D-Bus with an MPRIS host"]
    fn publish_before_handlers_are_registered() {
        let mut platform = SouvlakiPlatform::new("nowplaying_test", "Now Playing Test").unwrap();
        let info = MediaInfo::try_from(MediaUpdate::new("A", "B").with_playing(true)).unwrap();

        platform
            .publish(Some(&DisplayState::from(&info)))
            .unwrap();
        platform.publish(None).unwrap();
        assert!(platform.attached.load(Ordering::SeqCst));
    }
}
