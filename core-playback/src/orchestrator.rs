//! Unified playback orchestration over the local media backend and the
//! remote streaming device.
//!
//! All mutable state lives in one `Inner` behind a mutex. Starts are
//! asynchronous; a generation counter stamps each start so that a
//! superseded one (the user already moved on) commits nothing when it
//! finally finishes.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{LocalMediaBackend, MediaEvent};
use core_remote::{RemoteError, RemoteSessionController};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::types::{
    PhaseKind, PlaybackPhase, PlaybackStatus, PlaybackTarget, SoundButton, Track, TrackSource,
};

/// Initial volume level.
pub const DEFAULT_VOLUME: f32 = 0.7;

/// How long a recorded error stays visible before auto-clearing.
const ERROR_CLEAR_DELAY: Duration = Duration::from_secs(5);

/// What to do with the loaded target when a start fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    /// Forget the target (a fresh play that never got going).
    ClearTarget,
    /// Keep the target paused so the user can skip past the bad track.
    KeepTarget,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

struct Inner {
    phase: PlaybackPhase,
    volume: f32,
    muted: bool,
    position_secs: f64,
    duration_secs: Option<f64>,
    last_error: Option<String>,
    /// Stamps in-flight starts; a mismatch on commit means superseded.
    generation: u64,
    /// Stamps recorded errors so a delayed clear never wipes a newer one.
    error_epoch: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            volume: DEFAULT_VOLUME,
            muted: false,
            position_secs: 0.0,
            duration_secs: None,
            last_error: None,
            generation: 0,
            error_epoch: 0,
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

/// Single entry point for all playback commands.
pub struct PlaybackOrchestrator {
    local: Arc<dyn LocalMediaBackend>,
    remote: Arc<RemoteSessionController>,
    events: EventBus,
    inner: Arc<Mutex<Inner>>,
    error_clear_delay: Duration,
}

impl PlaybackOrchestrator {
    pub fn new(
        local: Arc<dyn LocalMediaBackend>,
        remote: Arc<RemoteSessionController>,
        events: EventBus,
    ) -> Self {
        Self {
            local,
            remote,
            events,
            inner: Arc::new(Mutex::new(Inner::new())),
            error_clear_delay: ERROR_CLEAR_DELAY,
        }
    }

    /// Override the error auto-clear delay (tests).
    pub fn with_error_clear_delay(mut self, delay: Duration) -> Self {
        self.error_clear_delay = delay;
        self
    }

    /// Press a button.
    ///
    /// Pressing the playing button pauses it; pressing the paused
    /// button resumes it; anything else loads the button and starts its
    /// first track.
    pub async fn play(&self, button: &SoundButton) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let phase = std::mem::replace(&mut inner.phase, PlaybackPhase::Idle);

        match phase {
            PlaybackPhase::Playing { target } if target.button_id == button.id => {
                let track = target.current_track().clone();
                let button_id = target.button_id.to_string();
                match self.pause_backend(&track).await {
                    Ok(()) => {
                        debug!(button = %target.button_name, "Paused");
                        inner.phase = PlaybackPhase::Paused { target };
                        self.events
                            .emit(CoreEvent::Playback(PlaybackEvent::Paused { button_id }))
                            .ok();
                        Ok(())
                    }
                    Err(e) => {
                        inner.phase = PlaybackPhase::Playing { target };
                        self.record_error(&mut inner, e.to_string());
                        Err(e)
                    }
                }
            }
            PlaybackPhase::Paused { target } if target.button_id == button.id => {
                let track = target.current_track().clone();
                let button_id = target.button_id.to_string();
                match self.resume_backend(&track).await {
                    Ok(()) => {
                        debug!(button = %target.button_name, "Resumed");
                        inner.phase = PlaybackPhase::Playing { target };
                        self.events
                            .emit(CoreEvent::Playback(PlaybackEvent::Resumed { button_id }))
                            .ok();
                        Ok(())
                    }
                    Err(e) => {
                        inner.phase = PlaybackPhase::Paused { target };
                        self.record_error(&mut inner, e.to_string());
                        Err(e)
                    }
                }
            }
            other => {
                let target = match PlaybackTarget::from_button(button) {
                    Some(t) => t,
                    None => {
                        // An empty button must not disturb what plays.
                        inner.phase = other;
                        return Err(PlaybackError::NoTracks);
                    }
                };

                let previous = other.target().map(|t| t.current_track().clone());
                inner.generation += 1;
                let generation = inner.generation;
                inner.phase = PlaybackPhase::Loading {
                    target: target.clone(),
                };
                inner.position_secs = 0.0;
                inner.duration_secs = None;
                drop(inner);

                if let Some(track) = previous {
                    self.halt_backend(&track).await;
                }
                self.start_track(target, generation, FailureMode::ClearTarget)
                    .await
            }
        }
    }

    /// Stop playback and clear the loaded target. Both backends are
    /// torn down regardless of which one was active: a remote track
    /// paused behind a local one must not stay resumable.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.phase = PlaybackPhase::Idle;
        inner.position_secs = 0.0;
        inner.duration_secs = None;
        drop(inner);

        if let Err(e) = self.local.pause().await {
            warn!(error = %e, "Local backend failed to stop");
        }
        if let Err(e) = self.local.set_position(0.0).await {
            warn!(error = %e, "Local backend failed to rewind");
        }
        // Forgetting the remote snapshot makes the next play a full
        // restart instead of a resume.
        match self.remote.stop_remote().await {
            Ok(()) | Err(RemoteError::NotReady) => {}
            Err(e) => warn!(error = %e, "Remote stop failed"),
        }

        info!("Playback stopped");
        self.events
            .emit(CoreEvent::Playback(PlaybackEvent::Stopped))
            .ok();
        Ok(())
    }

    /// Skip to the next track, wrapping past the end.
    pub async fn next(&self) -> Result<()> {
        self.skip(Direction::Next).await
    }

    /// Skip to the previous track, wrapping before the start.
    pub async fn previous(&self) -> Result<()> {
        self.skip(Direction::Previous).await
    }

    async fn skip(&self, direction: Direction) -> Result<()> {
        let mut inner = self.inner.lock().await;

        // Nothing loaded, or nowhere to skip to on a single track.
        let track_count = inner.phase.target().map(|t| t.track_count()).unwrap_or(0);
        if track_count <= 1 {
            return Ok(());
        }

        let phase = std::mem::replace(&mut inner.phase, PlaybackPhase::Idle);
        let mut target = match phase {
            PlaybackPhase::Playing { target }
            | PlaybackPhase::Paused { target }
            | PlaybackPhase::Loading { target } => target,
            PlaybackPhase::Idle => return Ok(()),
        };

        let previous_track = target.current_track().clone();
        match direction {
            Direction::Next => target.advance(),
            Direction::Previous => target.retreat(),
        }
        debug!(index = target.current_index(), "Track changed");

        inner.generation += 1;
        let generation = inner.generation;
        inner.phase = PlaybackPhase::Loading {
            target: target.clone(),
        };
        inner.position_secs = 0.0;
        inner.duration_secs = None;
        self.events
            .emit(CoreEvent::Playback(PlaybackEvent::TrackChanged {
                button_id: target.button_id.to_string(),
                index: target.current_index(),
            }))
            .ok();
        drop(inner);

        self.halt_backend(&previous_track).await;
        // A bad track must not eject the whole button; on failure the
        // target stays loaded so the user can skip again.
        self.start_track(target, generation, FailureMode::KeepTarget)
            .await
    }

    /// Seek within the current local track. Remote tracks ignore seeks.
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let is_local = inner
            .phase
            .target()
            .map(|t| t.current_track().is_local())
            .unwrap_or(false);
        if !is_local {
            return Ok(());
        }

        self.local.set_position(seconds).await?;
        inner.position_secs = seconds;
        Ok(())
    }

    /// Set the volume level, clamped to `0.0..=1.0`, and apply it to
    /// both backends. Backend failures are logged, not propagated.
    pub async fn set_volume(&self, level: f32) {
        let effective = {
            let mut inner = self.inner.lock().await;
            inner.volume = level.clamp(0.0, 1.0);
            inner.effective_volume()
        };
        self.fan_out_volume(effective).await;
    }

    /// Flip mute. Returns the new muted state.
    pub async fn toggle_mute(&self) -> bool {
        let (muted, effective) = {
            let mut inner = self.inner.lock().await;
            inner.muted = !inner.muted;
            (inner.muted, inner.effective_volume())
        };
        self.fan_out_volume(effective).await;
        muted
    }

    /// Snapshot the current playback state.
    pub async fn status(&self) -> PlaybackStatus {
        let inner = self.inner.lock().await;
        let phase = match inner.phase {
            PlaybackPhase::Idle => PhaseKind::Idle,
            PlaybackPhase::Loading { .. } => PhaseKind::Loading,
            PlaybackPhase::Playing { .. } => PhaseKind::Playing,
            PlaybackPhase::Paused { .. } => PhaseKind::Paused,
        };
        let target = inner.phase.target();

        PlaybackStatus {
            phase,
            button_id: target.map(|t| t.button_id),
            button_name: target.map(|t| t.button_name.clone()),
            track_index: target.map(|t| t.current_index()),
            track_name: target.map(|t| t.current_track().name.clone()),
            volume: inner.volume,
            muted: inner.muted,
            position_secs: inner.position_secs,
            duration_secs: inner.duration_secs,
            last_error: inner.last_error.clone(),
        }
    }

    /// Feed a local backend event into the state machine.
    pub async fn handle_media_event(&self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate { seconds } => {
                self.inner.lock().await.position_secs = seconds;
            }
            MediaEvent::DurationKnown { seconds } => {
                self.inner.lock().await.duration_secs = Some(seconds);
            }
            MediaEvent::Ended => self.handle_track_ended().await,
            MediaEvent::Error { error } => {
                warn!(error = %error, "Local backend reported an error");
                let mut inner = self.inner.lock().await;
                let phase = std::mem::replace(&mut inner.phase, PlaybackPhase::Idle);
                inner.phase = match phase {
                    PlaybackPhase::Playing { target } | PlaybackPhase::Loading { target } => {
                        PlaybackPhase::Paused { target }
                    }
                    other => other,
                };
                self.record_error(&mut inner, error.to_string());
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Error {
                        message: error.to_string(),
                    }))
                    .ok();
            }
        }
    }

    async fn handle_track_ended(&self) {
        let mut inner = self.inner.lock().await;
        let phase = std::mem::replace(&mut inner.phase, PlaybackPhase::Idle);

        match phase {
            PlaybackPhase::Playing { mut target }
                if target.track_count() > 1 && target.current_track().is_local() =>
            {
                target.advance();
                debug!(index = target.current_index(), "Auto-advancing to next track");

                inner.generation += 1;
                let generation = inner.generation;
                inner.phase = PlaybackPhase::Loading {
                    target: target.clone(),
                };
                inner.position_secs = 0.0;
                inner.duration_secs = None;
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::TrackChanged {
                        button_id: target.button_id.to_string(),
                        index: target.current_index(),
                    }))
                    .ok();
                drop(inner);

                if let Err(e) = self
                    .start_track(target, generation, FailureMode::KeepTarget)
                    .await
                {
                    warn!(error = %e, "Auto-advance failed");
                }
            }
            PlaybackPhase::Playing { target } | PlaybackPhase::Loading { target } => {
                // The button stays loaded so pressing it again replays
                // from the top instead of reloading from scratch.
                inner.position_secs = 0.0;
                let button_id = target.button_id.to_string();
                inner.phase = PlaybackPhase::Paused { target };
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Paused { button_id }))
                    .ok();
            }
            other => inner.phase = other,
        }
    }

    /// Start the target's current track and commit the outcome, unless
    /// a newer command superseded this start in the meantime.
    async fn start_track(
        &self,
        target: PlaybackTarget,
        generation: u64,
        mode: FailureMode,
    ) -> Result<()> {
        let track = target.current_track().clone();
        let result = match &track.source {
            TrackSource::Local { url } if url.is_empty() => Err(PlaybackError::MissingLocalUrl),
            TrackSource::Local { url } => match self.local.set_source(url).await {
                Ok(()) => self.local.play().await.map_err(PlaybackError::from),
                Err(e) => Err(e.into()),
            },
            TrackSource::Remote { uri, .. } => self
                .remote
                .play_remote(uri)
                .await
                .map_err(PlaybackError::from),
        };

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!("Discarding superseded start");
            return Ok(());
        }

        match result {
            Ok(()) => {
                info!(button = %target.button_name, track = %track.name, "Playback started");
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Started {
                        button_id: target.button_id.to_string(),
                        track: track.name.clone(),
                    }))
                    .ok();
                inner.phase = PlaybackPhase::Playing { target };
                self.clear_error(&mut inner);
                Ok(())
            }
            Err(e) => {
                warn!(track = %track.name, error = %e, "Failed to start track");
                self.record_error(&mut inner, e.to_string());
                inner.phase = match mode {
                    FailureMode::ClearTarget => PlaybackPhase::Idle,
                    FailureMode::KeepTarget => PlaybackPhase::Paused { target },
                };
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::Error {
                        message: e.to_string(),
                    }))
                    .ok();
                Err(e)
            }
        }
    }

    async fn pause_backend(&self, track: &Track) -> Result<()> {
        match &track.source {
            TrackSource::Local { .. } => self.local.pause().await.map_err(PlaybackError::from),
            TrackSource::Remote { .. } => self
                .remote
                .pause_remote()
                .await
                .map_err(PlaybackError::from),
        }
    }

    async fn resume_backend(&self, track: &Track) -> Result<()> {
        match &track.source {
            TrackSource::Local { .. } => self.local.play().await.map_err(PlaybackError::from),
            TrackSource::Remote { .. } => self
                .remote
                .resume_remote()
                .await
                .map_err(PlaybackError::from),
        }
    }

    /// Best-effort halt of whatever was playing before a switch.
    async fn halt_backend(&self, track: &Track) {
        let result = self.pause_backend(track).await;
        if let Err(e) = result {
            debug!(error = %e, "Previous track did not pause cleanly");
        }
    }

    async fn fan_out_volume(&self, effective: f32) {
        if let Err(e) = self.local.set_volume(effective).await {
            warn!(error = %e, "Failed to set local volume");
        }
        self.remote.set_remote_volume(effective).await;
    }

    /// Clear the recorded error immediately (a successful operation
    /// makes it stale). Bumping the epoch voids any pending clear.
    fn clear_error(&self, inner: &mut Inner) {
        inner.last_error = None;
        inner.error_epoch += 1;
    }

    /// Record an error and schedule its auto-clear. A newer error bumps
    /// the epoch so the older clear becomes a no-op.
    fn record_error(&self, inner: &mut Inner, message: String) {
        inner.last_error = Some(message);
        inner.error_epoch += 1;
        let epoch = inner.error_epoch;

        let shared = Arc::clone(&self.inner);
        let delay = self.error_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = shared.lock().await;
            if inner.error_epoch == epoch {
                inner.last_error = None;
            }
        });
    }
}

impl std::fmt::Debug for PlaybackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackOrchestrator")
            .field("error_clear_delay", &self.error_clear_delay)
            .finish()
    }
}
