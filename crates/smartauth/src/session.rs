//! Session state.
//!
//! The connected credential and contract live behind one mutex. Flows take
//! a snapshot once at entry and never hold the lock across network calls, so
//! a concurrent disconnect cannot corrupt an in-flight signature map. It can
//! only make a later [`Session::ensure_current`] fail.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use smartauth_core::Address;
use tokio::sync::Mutex;

use crate::error::{AuthError, Result};
use crate::events::{Event, EventBus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SessionState {
    credential_id: Option<String>,
    contract_id: Option<Address>,
    /// Unix seconds after which the session is no longer valid.
    expires_at: Option<u64>,
}

/// A consistent view of a connected session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub credential_id: Option<String>,
    pub contract_id: Address,
    pub expires_at: Option<u64>,
}

/// Guarded connection state with lifecycle events.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    events: Arc<EventBus>,
}

impl Session {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Replace the session with a new connection.
    pub async fn connect(
        &self,
        credential_id: Option<String>,
        contract_id: Address,
        expires_at: Option<u64>,
    ) {
        {
            let mut state = self.state.lock().await;
            *state = SessionState {
                credential_id: credential_id.clone(),
                contract_id: Some(contract_id),
                expires_at,
            };
        }
        tracing::info!(contract = %contract_id, "session connected");
        self.events.emit(Event::Connected {
            credential_id,
            contract: contract_id,
        });
    }

    /// Clear the session. Returns whether one was connected.
    pub async fn disconnect(&self) -> bool {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::take(&mut *state)
        };
        match previous.contract_id {
            Some(contract) => {
                tracing::info!(contract = %contract, "session disconnected");
                self.events.emit(Event::Disconnected { contract });
                true
            }
            None => false,
        }
    }

    /// Snapshot the connected session at the current time.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.snapshot_at(unix_now()).await
    }

    /// Snapshot the connected session at `now` (unix seconds).
    ///
    /// An expired session is cleared and reported as
    /// [`AuthError::SessionExpired`].
    pub async fn snapshot_at(&self, now: u64) -> Result<SessionSnapshot> {
        let expired = {
            let mut state = self.state.lock().await;
            let contract_id = state.contract_id.ok_or(AuthError::NotConnected)?;
            match state.expires_at {
                Some(exp) if now >= exp => {
                    *state = SessionState::default();
                    contract_id
                }
                _ => {
                    return Ok(SessionSnapshot {
                        credential_id: state.credential_id.clone(),
                        contract_id,
                        expires_at: state.expires_at,
                    })
                }
            }
        };
        tracing::info!(contract = %expired, "session expired");
        self.events.emit(Event::SessionExpired { contract: expired });
        Err(AuthError::SessionExpired)
    }

    /// Fail with [`AuthError::NotConnected`] unless `snapshot` still
    /// describes the connected session.
    pub async fn ensure_current(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let state = self.state.lock().await;
        if state.contract_id == Some(snapshot.contract_id)
            && state.credential_id == snapshot.credential_id
        {
            Ok(())
        } else {
            Err(AuthError::NotConnected)
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.contract_id.is_some()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
