//! # Session State Machine
//!
//! `Disconnected -> Pairing -> Connected -> Disconnected`, with `Pairing -> Disconnected`
//! on failure or timeout and a direct `Disconnected -> Connected` when a previous session
//! is restored. Every method returns the transition it performed, or `None` when the
//! input does not apply in the current state.

use crate::types::{ActiveAccount, ConnectorKind, WalletSession};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Pairing,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Pairing => "pairing",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub reason: &'static str,
}

/// A consistent view of the session, published to readers after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub session: WalletSession,
}

/// Owns the [`WalletSession`] and the state it is in.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: ConnectionState,
    session: WalletSession,
}

impl SessionMachine {
    pub fn new(connector_kind: ConnectorKind) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session: WalletSession::empty(connector_kind),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            session: self.session.clone(),
        }
    }

    fn transition(&mut self, to: ConnectionState, reason: &'static str) -> StateTransition {
        let from = std::mem::replace(&mut self.state, to);
        let transition = StateTransition { from, to, reason };
        tracing::debug!(%from, %to, reason, "Session state changed.");
        transition
    }

    pub fn begin_pairing(&mut self) -> Option<StateTransition> {
        match self.state {
            ConnectionState::Disconnected => {
                self.session.pairing_uri = None;
                Some(self.transition(ConnectionState::Pairing, "pairing started"))
            }
            _ => None,
        }
    }

    /// Records the URI the wallet must scan. Only meaningful while pairing.
    pub fn set_pairing_uri(&mut self, uri: String) -> bool {
        if self.state != ConnectionState::Pairing {
            return false;
        }
        self.session.pairing_uri = Some(uri);
        true
    }

    /// Binds the session to `account` after the wallet granted permissions.
    ///
    /// Applies while pairing, or while connected when the wallet switches accounts.
    pub fn connected(&mut self, account: ActiveAccount) -> Option<StateTransition> {
        match self.state {
            ConnectionState::Pairing | ConnectionState::Connected => {
                self.session = WalletSession::connected(self.session.connector_kind, account);
                Some(self.transition(ConnectionState::Connected, "permissions granted"))
            }
            ConnectionState::Disconnected => None,
        }
    }

    /// Adopts an account the transport already holds, skipping pairing.
    pub fn restore(&mut self, account: ActiveAccount) -> Option<StateTransition> {
        match self.state {
            ConnectionState::Disconnected => {
                self.session = WalletSession::connected(self.session.connector_kind, account);
                Some(self.transition(ConnectionState::Connected, "session restored"))
            }
            _ => None,
        }
    }

    pub fn abort_pairing(&mut self, reason: &'static str) -> Option<StateTransition> {
        match self.state {
            ConnectionState::Pairing => {
                self.session = WalletSession::empty(self.session.connector_kind);
                Some(self.transition(ConnectionState::Disconnected, reason))
            }
            _ => None,
        }
    }

    /// Clears the session from any state.
    pub fn disconnected(&mut self, reason: &'static str) -> Option<StateTransition> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        self.session = WalletSession::empty(self.session.connector_kind);
        Some(self.transition(ConnectionState::Disconnected, reason))
    }
}
