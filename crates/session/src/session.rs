//! World session state container.
//!
//! Owns the phase machine around generation attempts. At most one attempt
//! runs at a time. Each attempt is tagged with an epoch so a reset can
//! orphan it: in-flight calls finish, but their results are dropped.

use std::sync::Arc;

use threshold_worldgen::NormalizedWorldAsset;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::orchestrator::GenerationOrchestrator;
use crate::presentation::{Presentation, PresentationSelector};
use crate::themes::random_theme;
use crate::types::{GenerationEvent, RecoveryAction, SessionEvent, SessionPhase, SessionSnapshot};

/// Generated worlds remembered per session; the oldest are dropped first.
pub const HISTORY_LIMIT: usize = 32;

/// The world currently on display.
#[derive(Debug, Clone)]
pub struct ActiveWorld {
    pub asset: NormalizedWorldAsset,
    pub presentation: Presentation,
}

struct SessionState {
    phase: SessionPhase,
    status: String,
    current: Option<ActiveWorld>,
    history: Vec<NormalizedWorldAsset>,
    epoch: u64,
    cancel: Option<CancellationToken>,
}

impl SessionState {
    fn record(&mut self, asset: NormalizedWorldAsset) {
        if self.history.len() >= HISTORY_LIMIT {
            let excess = self.history.len() + 1 - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        self.history.push(asset);
    }

    fn release_current(&mut self) {
        if let Some(old) = self.current.take() {
            debug!(
                world = %old.asset.id,
                bytes = old.presentation.held_bytes(),
                "released world buffers"
            );
        }
    }
}

/// Session driving world generation and presentation.
pub struct WorldSession {
    orchestrator: Arc<GenerationOrchestrator>,
    selector: PresentationSelector,
    state: Arc<RwLock<SessionState>>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<SessionEvent>>>,
}

impl WorldSession {
    pub fn new(orchestrator: Arc<GenerationOrchestrator>, selector: PresentationSelector) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            orchestrator,
            selector,
            state: Arc::new(RwLock::new(SessionState {
                phase: SessionPhase::Lobby,
                status: String::new(),
                current: None,
                history: Vec::new(),
                epoch: 0,
                cancel: None,
            })),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx.lock().await.take()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            phase: state.phase,
            status_message: state.status.clone(),
            current_world: state.current.as_ref().map(|w| w.asset.clone()),
            mode: state
                .current
                .as_ref()
                .and_then(|w| w.presentation.mode()),
            history: state.history.clone(),
        }
    }

    /// The world on display, if any.
    pub async fn active_world(&self) -> Option<ActiveWorld> {
        self.state.read().await.current.clone()
    }

    /// Leaves the lobby. Credentials are the caller's concern.
    pub async fn enter_staging(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let phase = state.phase;
        match phase {
            SessionPhase::Lobby => {
                state.phase = SessionPhase::Staging;
                drop(state);
                self.emit(SessionEvent::PhaseChanged(SessionPhase::Staging));
                Ok(())
            }
            SessionPhase::Staging => Ok(()),
            other => Err(SessionError::InvalidPhase(other)),
        }
    }

    /// Generates and presents a world. Picks a random theme when `theme` is
    /// `None`.
    ///
    /// Refuses with [`SessionError::Busy`] while another attempt runs.
    pub async fn generate(
        &self,
        theme: Option<&str>,
    ) -> Result<NormalizedWorldAsset, SessionError> {
        let (epoch, cancel) = {
            let mut state = self.state.write().await;
            match state.phase {
                SessionPhase::Staging => {}
                SessionPhase::Generating => return Err(SessionError::Busy),
                other => return Err(SessionError::InvalidPhase(other)),
            }
            let cancel = CancellationToken::new();
            state.epoch += 1;
            state.cancel = Some(cancel.clone());
            state.phase = SessionPhase::Generating;
            (state.epoch, cancel)
        };
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Generating));

        let theme = theme.map_or_else(|| random_theme().to_string(), str::to_string);
        self.set_status(epoch, format!("Opening a portal to {theme}..."))
            .await;

        let (tx, rx) = mpsc::channel(256);
        let forward = tokio::spawn(forward_events(
            rx,
            self.state.clone(),
            self.events_tx.clone(),
            epoch,
        ));
        let result = self.orchestrator.run(&theme, &tx, &cancel).await;
        drop(tx);
        let _ = forward.await;

        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    debug!(epoch, "discarding failure of a reset attempt");
                    return Err(SessionError::Discarded);
                }
                let message = e.user_message();
                state.phase = SessionPhase::Error;
                state.status = message.clone();
                state.cancel = None;
                drop(state);

                self.emit(SessionEvent::PhaseChanged(SessionPhase::Error));
                self.emit(SessionEvent::StatusChanged(message.clone()));
                self.emit(SessionEvent::Failed {
                    message,
                    recovery: RecoveryAction::Restart,
                });
                return Err(e.into());
            }
        };

        if !self.set_status(epoch, "Stabilizing reality...".into()).await {
            return Err(SessionError::Discarded);
        }
        let presentation = self.selector.select(&asset).await;
        self.commit(epoch, asset, presentation).await
    }

    /// Returns to staging, orphaning any running attempt and releasing the
    /// current world.
    pub async fn reset_to_staging(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        if state.phase == SessionPhase::Lobby {
            return Err(SessionError::InvalidPhase(SessionPhase::Lobby));
        }
        state.epoch += 1;
        if let Some(cancel) = state.cancel.take() {
            debug!("cancelling in-flight attempt");
            cancel.cancel();
        }
        state.release_current();
        state.phase = SessionPhase::Staging;
        state.status.clear();
        drop(state);

        info!("session reset to staging");
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Staging));
        Ok(())
    }

    async fn commit(
        &self,
        epoch: u64,
        asset: NormalizedWorldAsset,
        presentation: Presentation,
    ) -> Result<NormalizedWorldAsset, SessionError> {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!(world = %asset.id, "discarding world of a reset attempt");
            return Err(SessionError::Discarded);
        }

        let mode = presentation.mode();
        let status = match (&presentation, mode) {
            (_, Some(mode)) => format!("Welcome to {} ({}).", asset.theme, mode.label()),
            (p, None) if p.is_unstable() => "Reality is unstable. Nothing could be shown.".into(),
            _ => "Reality is unstable. Showing a glimpse.".into(),
        };

        state.release_current();
        state.record(asset.clone());
        state.current = Some(ActiveWorld {
            asset: asset.clone(),
            presentation,
        });
        state.phase = SessionPhase::Exploring;
        state.status = status.clone();
        state.cancel = None;
        drop(state);

        info!(world = %asset.id, mode = ?mode, "world on display");
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Exploring));
        self.emit(SessionEvent::StatusChanged(status));
        self.emit(SessionEvent::WorldReady {
            asset: asset.clone(),
            mode,
        });
        Ok(asset)
    }

    /// Updates the status if `epoch` is still current. Returns whether it was.
    async fn set_status(&self, epoch: u64, message: String) -> bool {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return false;
        }
        state.status = message.clone();
        drop(state);
        self.emit(SessionEvent::StatusChanged(message));
        true
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(error = %e, "session event dropped");
        }
    }
}

/// Relays one attempt's events, dropping them once the attempt is stale.
async fn forward_events(
    mut rx: mpsc::Receiver<GenerationEvent>,
    state: Arc<RwLock<SessionState>>,
    events_tx: mpsc::Sender<SessionEvent>,
    epoch: u64,
) {
    while let Some(event) = rx.recv().await {
        let status = match &event {
            GenerationEvent::Status { message, .. } => Some(message.clone()),
            GenerationEvent::Progress { update, .. } => Some(update.message.clone()),
            GenerationEvent::StateChanged { .. } => None,
        };

        {
            let mut state = state.write().await;
            if state.epoch != epoch {
                continue;
            }
            if let Some(message) = &status {
                state.status = message.clone();
            }
        }

        if let Some(message) = status {
            let _ = events_tx.try_send(SessionEvent::StatusChanged(message));
        }
        let _ = events_tx.try_send(SessionEvent::Generation(event));
    }
}
