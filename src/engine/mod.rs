//! Game engine: shared state, intent dispatch, matching, timing, and the
//! session/loop drivers.

pub mod clock;
pub mod dispatcher;
pub mod game_loop;
pub mod matcher;
pub mod session;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::player_store::PlayerStore, error::ServiceError};

pub use self::sse::SseHub;
use self::{dispatcher::Dispatcher, state_machine::SessionPhase};

/// Cheaply cloneable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Point-in-time view of the active session exposed to routes and SSE
/// consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSnapshot {
    /// Current phase of the active session.
    pub phase: SessionPhase,
    /// Total round count of the active session, when one is running.
    pub total_rounds: Option<usize>,
    /// Identifier of the active play session, when one is running.
    pub session: Option<Uuid>,
}

impl Default for PhaseSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Registering,
            total_rounds: None,
            session: None,
        }
    }
}

/// Central application state storing configuration, the storage handle, the
/// intent dispatcher, and the public event hub.
pub struct AppState {
    config: AppConfig,
    player_store: RwLock<Option<Arc<dyn PlayerStore>>>,
    sse: SseHub,
    dispatcher: Dispatcher,
    snapshot: RwLock<PhaseSnapshot>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            player_store: RwLock::new(None),
            sse: SseHub::new(16),
            dispatcher: Dispatcher::new(),
            snapshot: RwLock::new(PhaseSnapshot::default()),
            degraded: degraded_tx,
        })
    }

    /// Process-wide configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current player store, if one is installed.
    pub async fn player_store(&self) -> Option<Arc<dyn PlayerStore>> {
        let guard = self.player_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the player store or fail with a degraded-mode error.
    pub async fn require_player_store(&self) -> Result<Arc<dyn PlayerStore>, ServiceError> {
        self.player_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new player store implementation and leave degraded mode.
    pub async fn install_player_store(&self, store: Arc<dyn PlayerStore>) {
        {
            let mut guard = self.player_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current player store and enter degraded mode.
    pub async fn clear_player_store(&self) {
        {
            let mut guard = self.player_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.player_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Registry routing UI intents into the active phase.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Snapshot of the active session's phase.
    pub async fn phase_snapshot(&self) -> PhaseSnapshot {
        *self.snapshot.read().await
    }

    /// Replace the phase snapshot; called by the loop and session drivers.
    pub async fn set_phase_snapshot(&self, snapshot: PhaseSnapshot) {
        let mut guard = self.snapshot.write().await;
        *guard = snapshot;
    }

    /// Update and broadcast the degraded flag when the value changes.
    async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
