//! Remote device session lifecycle and playback control.
//!
//! The embedded player connects asynchronously and reports its state
//! through [`RemotePlayerEvent`]s. The controller tracks that lifecycle,
//! remembers what was last loaded on the device, and decides between a
//! cheap resume and a full transfer-and-start when playback is
//! requested.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{RemotePlayerEvent, RemotePlayerHandle};
use core_auth::TokenStore;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::RemoteCatalogClient;
use crate::error::{RemoteError, Result};

/// Wait after a transfer before issuing the play command; the service
/// needs a moment to activate the new device.
const TRANSFER_SETTLE: Duration = Duration::from_millis(500);

/// Lifecycle of the remote device session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// `connect` has not been called.
    Uninitialized,
    /// The player is connecting; no device yet.
    Initializing,
    /// The device is online and can accept playback.
    Ready { device_id: String },
    /// The device dropped off; it may come back.
    Offline,
    /// Terminal failure. Carries the error so callers learn the real
    /// reason instead of a generic "not ready".
    Errored { error: RemoteError },
}

/// What the controller last told the device to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub device_id: String,
    pub last_loaded_uri: Option<String>,
    pub paused: bool,
}

/// Owns the remote session: player lifecycle, resume-vs-restart
/// decisions, and auth teardown on credential rejection.
pub struct RemoteSessionController {
    client: RemoteCatalogClient,
    player: Arc<dyn RemotePlayerHandle>,
    tokens: TokenStore,
    events: EventBus,
    state: Mutex<SessionState>,
    snapshot: Mutex<Option<RemoteSnapshot>>,
    /// Serializes playback commands so transfer/start sequences from
    /// different callers never interleave.
    control: Mutex<()>,
    settle: Duration,
}

impl RemoteSessionController {
    pub fn new(
        client: RemoteCatalogClient,
        player: Arc<dyn RemotePlayerHandle>,
        tokens: TokenStore,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            player,
            tokens,
            events,
            state: Mutex::new(SessionState::Uninitialized),
            snapshot: Mutex::new(None),
            control: Mutex::new(()),
            settle: TRANSFER_SETTLE,
        }
    }

    /// Override the post-transfer settle delay (tests).
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub fn catalog(&self) -> &RemoteCatalogClient {
        &self.client
    }

    /// Start connecting the embedded player. Readiness arrives later
    /// through [`Self::handle_player_event`].
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            *state = SessionState::Initializing;
        }
        info!("Connecting remote player");

        match self.player.connect().await {
            Ok(true) => Ok(()),
            Ok(false) => {
                let error = RemoteError::Player("Player refused to connect".to_string());
                self.enter_errored(error.clone()).await;
                Err(error)
            }
            Err(e) => {
                let error = RemoteError::Player(e.to_string());
                self.enter_errored(error.clone()).await;
                Err(error)
            }
        }
    }

    /// Feed a player lifecycle event into the session state machine.
    pub async fn handle_player_event(&self, event: RemotePlayerEvent) {
        match event {
            RemotePlayerEvent::Ready { device_id } => {
                info!(device_id, "Remote device ready");
                *self.state.lock().await = SessionState::Ready {
                    device_id: device_id.clone(),
                };
                self.events
                    .emit(CoreEvent::Session(SessionEvent::DeviceReady { device_id }))
                    .ok();
            }
            RemotePlayerEvent::NotReady { device_id } => {
                warn!(device_id, "Remote device went offline");
                *self.state.lock().await = SessionState::Offline;
                // Whatever was loaded is gone with the device.
                *self.snapshot.lock().await = None;
                self.events
                    .emit(CoreEvent::Session(SessionEvent::DeviceOffline {
                        device_id,
                    }))
                    .ok();
            }
            RemotePlayerEvent::InitializationError { message } => {
                self.enter_errored(RemoteError::Player(message)).await;
            }
            RemotePlayerEvent::AuthenticationError { message } => {
                warn!(message, "Player rejected credentials, clearing stored token");
                if let Err(e) = self.tokens.clear().await {
                    warn!(error = %e, "Failed to clear stored token");
                }
                self.enter_errored(RemoteError::AuthExpired).await;
            }
            RemotePlayerEvent::AccountError { message } => {
                warn!(message, "Account cannot stream");
                self.enter_errored(RemoteError::PremiumRequired).await;
            }
            RemotePlayerEvent::PlaybackError { message } => {
                // Playback failures don't kill the session; surface them
                // and let the next command try again.
                warn!(message, "Remote playback error");
                self.events
                    .emit(CoreEvent::Session(SessionEvent::SessionErrored { message }))
                    .ok();
            }
            RemotePlayerEvent::StateChanged { paused } => {
                if let Some(snapshot) = self.snapshot.lock().await.as_mut() {
                    snapshot.paused = paused;
                }
            }
        }
    }

    /// The device id if the session is ready, otherwise the most
    /// specific error available.
    pub async fn ensure_ready(&self) -> Result<String> {
        match &*self.state.lock().await {
            SessionState::Ready { device_id } => Ok(device_id.clone()),
            SessionState::Errored { error } => Err(error.clone()),
            _ => Err(RemoteError::NotReady),
        }
    }

    /// Play a URI on the remote device.
    ///
    /// If the same URI is already loaded and merely paused, resume in
    /// place. Otherwise transfer the session to our device, wait for it
    /// to settle, and start the URI from the top.
    pub async fn play_remote(&self, uri: &str) -> Result<()> {
        let _guard = self.control.lock().await;
        let device_id = self.ensure_ready().await?;

        let can_resume = {
            let snapshot = self.snapshot.lock().await;
            matches!(
                snapshot.as_ref(),
                Some(s) if s.device_id == device_id
                    && s.last_loaded_uri.as_deref() == Some(uri)
                    && s.paused
            )
        };

        if can_resume {
            debug!(uri, "Resuming already-loaded track");
            match self.player.resume().await {
                Ok(()) => {
                    if let Some(snapshot) = self.snapshot.lock().await.as_mut() {
                        snapshot.paused = false;
                    }
                    return Ok(());
                }
                // A failed resume falls through to a full restart.
                Err(e) => warn!(error = %e, "Resume failed, restarting playback"),
            }
        }

        debug!(uri, device_id, "Starting fresh remote playback");
        let result = self.transfer_and_start(&device_id, uri).await;
        match result {
            Ok(()) => {
                // Snapshot only advances once the whole sequence
                // succeeded; a half-done transfer leaves it untouched.
                *self.snapshot.lock().await = Some(RemoteSnapshot {
                    device_id,
                    last_loaded_uri: Some(uri.to_string()),
                    paused: false,
                });
                Ok(())
            }
            Err(e) => Err(self.classify_failure(e).await),
        }
    }

    async fn transfer_and_start(&self, device_id: &str, uri: &str) -> Result<()> {
        self.client.transfer_playback(device_id).await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        self.client.start_playback(device_id, uri).await
    }

    /// Pause playback through the embedded player.
    pub async fn pause_remote(&self) -> Result<()> {
        let _guard = self.control.lock().await;
        self.ensure_ready().await?;
        self.player
            .pause()
            .await
            .map_err(|e| RemoteError::Player(e.to_string()))?;
        if let Some(snapshot) = self.snapshot.lock().await.as_mut() {
            snapshot.paused = true;
        }
        Ok(())
    }

    /// Resume paused playback through the embedded player.
    pub async fn resume_remote(&self) -> Result<()> {
        let _guard = self.control.lock().await;
        self.ensure_ready().await?;
        self.player
            .resume()
            .await
            .map_err(|e| RemoteError::Player(e.to_string()))?;
        if let Some(snapshot) = self.snapshot.lock().await.as_mut() {
            snapshot.paused = false;
        }
        Ok(())
    }

    /// Stop remote playback and forget the loaded track, so the next
    /// play starts from the top.
    pub async fn stop_remote(&self) -> Result<()> {
        let _guard = self.control.lock().await;
        self.ensure_ready().await?;

        let result = self.client.pause_playback().await;
        *self.snapshot.lock().await = None;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.classify_failure(e).await),
        }
    }

    /// Best-effort volume change. The device applies what it can; a
    /// failure here should never fail the caller's operation.
    pub async fn set_remote_volume(&self, level: f32) {
        if let Err(e) = self.player.set_volume(level).await {
            warn!(level, error = %e, "Failed to set remote volume");
        }
    }

    /// Map an API failure onto session state: a rejected credential
    /// tears the session down and clears the stored token.
    async fn classify_failure(&self, error: RemoteError) -> RemoteError {
        if error == RemoteError::AuthExpired {
            warn!("API rejected access token, clearing stored credential");
            if let Err(e) = self.tokens.clear().await {
                warn!(error = %e, "Failed to clear stored token");
            }
            self.enter_errored(RemoteError::AuthExpired).await;
        }
        error
    }

    async fn enter_errored(&self, error: RemoteError) {
        warn!(error = %error, "Remote session errored");
        *self.state.lock().await = SessionState::Errored {
            error: error.clone(),
        };
        self.events
            .emit(CoreEvent::Session(SessionEvent::SessionErrored {
                message: error.to_string(),
            }))
            .ok();
    }
}

impl std::fmt::Debug for RemoteSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSessionController")
            .field("settle", &self.settle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::SystemClock;
    use chrono::Utc;
    use core_auth::Credential;

    use super::*;
    use crate::client::test_support::{MemoryStore, ScriptedHttpClient};

    #[derive(Default)]
    struct FakePlayer {
        connects: AtomicUsize,
        pauses: AtomicUsize,
        resumes: AtomicUsize,
        volume_calls: AtomicUsize,
        fail_resume: std::sync::atomic::AtomicBool,
    }

    impl FakePlayer {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    #[async_trait]
    impl RemotePlayerHandle for FakePlayer {
        async fn connect(&self) -> BridgeResult<bool> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn pause(&self) -> BridgeResult<()> {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self) -> BridgeResult<()> {
            if self.fail_resume.load(Ordering::SeqCst) {
                return Err(BridgeError::OperationFailed("resume failed".to_string()));
            }
            self.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn set_volume(&self, _level: f32) -> BridgeResult<()> {
            self.volume_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        controller: RemoteSessionController,
        player: Arc<FakePlayer>,
        http: Arc<ScriptedHttpClient>,
        store: Arc<MemoryStore>,
    }

    async fn fixture(http: Arc<ScriptedHttpClient>) -> Fixture {
        let store = MemoryStore::new();
        let tokens = TokenStore::new(store.clone(), Arc::new(SystemClock));
        tokens
            .save(&Credential::new("tok", 3600, Utc::now()))
            .await
            .unwrap();

        let client = RemoteCatalogClient::new(http.clone(), tokens.clone())
            .with_base_url("https://api.test/v1");
        let player = FakePlayer::new();
        let controller =
            RemoteSessionController::new(client, player.clone(), tokens, EventBus::default())
                .with_settle_delay(Duration::ZERO);

        Fixture {
            controller,
            player,
            http,
            store,
        }
    }

    async fn ready_fixture(http: Arc<ScriptedHttpClient>) -> Fixture {
        let f = fixture(http).await;
        f.controller
            .handle_player_event(RemotePlayerEvent::Ready {
                device_id: "device-1".to_string(),
            })
            .await;
        f
    }

    #[tokio::test]
    async fn test_ensure_ready_before_connect_fails() {
        let f = fixture(ScriptedHttpClient::always(204, "")).await;
        assert_eq!(
            f.controller.ensure_ready().await.unwrap_err(),
            RemoteError::NotReady
        );
    }

    #[tokio::test]
    async fn test_ready_event_unlocks_playback() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        assert_eq!(f.controller.ensure_ready().await.unwrap(), "device-1");
        assert_eq!(
            f.controller.state().await,
            SessionState::Ready {
                device_id: "device-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fresh_play_transfers_then_starts() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();

        let urls = f.http.request_urls().await;
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("/me/player"));
        assert!(urls[1].contains("/me/player/play"));
        assert_eq!(f.player.resumes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_paused_same_track_resumes_without_http() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        f.controller.pause_remote().await.unwrap();
        let calls_before = f.http.call_count();

        f.controller.play_remote("spotify:track:t1").await.unwrap();

        assert_eq!(f.http.call_count(), calls_before);
        assert_eq!(f.player.resumes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_resume_falls_back_to_restart() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        f.controller.pause_remote().await.unwrap();
        f.player.fail_resume.store(true, Ordering::SeqCst);

        f.controller.play_remote("spotify:track:t1").await.unwrap();

        // Resume failed, so a fresh transfer/start pair ran instead.
        assert_eq!(f.http.call_count(), 4);
    }

    #[tokio::test]
    async fn test_different_track_restarts_instead_of_resuming() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        f.controller.pause_remote().await.unwrap();

        f.controller.play_remote("spotify:track:t2").await.unwrap();

        // Two transfer/start pairs, no resume.
        assert_eq!(f.http.call_count(), 4);
        assert_eq!(f.player.resumes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_forgets_loaded_track() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        f.controller.pause_remote().await.unwrap();
        f.controller.stop_remote().await.unwrap();

        // Same track again must restart from the top, not resume.
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        assert_eq!(f.player.resumes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transfer_failure_leaves_snapshot_untouched() {
        // First play succeeds (2 calls), then the transfer for the next
        // track fails with a server error.
        let f = ready_fixture(ScriptedHttpClient::new(vec![
            (204, ""),
            (204, ""),
            (503, ""),
        ]))
        .await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        f.controller.pause_remote().await.unwrap();

        let err = f
            .controller
            .play_remote("spotify:track:t2")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Unavailable { status: 503 });

        // The old paused track is still resumable.
        assert_eq!(f.http.call_count(), 3);
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        assert_eq!(f.player.resumes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_token_tears_down_session() {
        let f = ready_fixture(ScriptedHttpClient::always(401, "")).await;
        let err = f
            .controller
            .play_remote("spotify:track:t1")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::AuthExpired);

        // Token cleared and session errored with the specific cause.
        assert!(f
            .store
            .data
            .lock()
            .await
            .get("spotify_access_token")
            .is_none());
        assert_eq!(
            f.controller.ensure_ready().await.unwrap_err(),
            RemoteError::AuthExpired
        );
    }

    #[tokio::test]
    async fn test_account_error_reports_premium_required() {
        let f = fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller
            .handle_player_event(RemotePlayerEvent::AccountError {
                message: "premium required".to_string(),
            })
            .await;

        assert_eq!(
            f.controller.ensure_ready().await.unwrap_err(),
            RemoteError::PremiumRequired
        );
    }

    #[tokio::test]
    async fn test_device_offline_clears_snapshot() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        f.controller.pause_remote().await.unwrap();

        f.controller
            .handle_player_event(RemotePlayerEvent::NotReady {
                device_id: "device-1".to_string(),
            })
            .await;
        assert_eq!(f.controller.state().await, SessionState::Offline);

        // Coming back online, the same track must restart.
        f.controller
            .handle_player_event(RemotePlayerEvent::Ready {
                device_id: "device-1".to_string(),
            })
            .await;
        f.controller.play_remote("spotify:track:t1").await.unwrap();
        assert_eq!(f.player.resumes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_set_remote_volume_is_best_effort() {
        let f = ready_fixture(ScriptedHttpClient::always(204, "")).await;
        f.controller.set_remote_volume(0.5).await;
        assert_eq!(f.player.volume_calls.load(Ordering::SeqCst), 1);
    }
}
