//! Connection registry and event fan-out.

use super::{ConnectionId, ServerEvent};
use crate::card::Seed;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One live connection
#[derive(Debug)]
pub struct Session {
    sender: mpsc::Sender<ServerEvent>,
    /// Username once the connection has registered
    pub username: Option<String>,
    /// Seed once the connection has registered
    pub seed: Option<Seed>,
}

impl Session {
    fn new(sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            sender,
            username: None,
            seed: None,
        }
    }
}

/// Maps live connections to their outbound channel and bound identity.
///
/// Sends never block: a full channel loses that one event, a closed
/// channel removes the session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, connection: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        self.sessions.insert(connection, Session::new(sender));
    }

    pub fn remove(&mut self, connection: &ConnectionId) -> Option<Session> {
        self.sessions.remove(connection)
    }

    pub fn get(&self, connection: &ConnectionId) -> Option<&Session> {
        self.sessions.get(connection)
    }

    pub fn contains(&self, connection: &ConnectionId) -> bool {
        self.sessions.contains_key(connection)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Record the player identity for a connection.
    ///
    /// Returns `false` if the connection is unknown.
    pub fn bind(&mut self, connection: &ConnectionId, username: &str, seed: Seed) -> bool {
        match self.sessions.get_mut(connection) {
            Some(session) => {
                session.username = Some(username.to_string());
                session.seed = Some(seed);
                true
            }
            None => false,
        }
    }

    pub fn unbind(&mut self, connection: &ConnectionId) {
        if let Some(session) = self.sessions.get_mut(connection) {
            session.username = None;
            session.seed = None;
        }
    }

    /// Send an event to one connection.
    ///
    /// Returns `true` if the event was queued.
    pub fn send_to(&mut self, connection: &ConnectionId, event: ServerEvent) -> bool {
        let Some(session) = self.sessions.get(connection) else {
            log::debug!("No session {} for {} event", connection, event.kind());
            return false;
        };

        match session.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                log::warn!(
                    "Session {} channel full, dropping {} event",
                    connection,
                    event.kind()
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Session {} disconnected, removing", connection);
                self.sessions.remove(connection);
                false
            }
        }
    }

    /// Send an event to every connection bound to `username`.
    ///
    /// Returns the number of sessions the event was queued for.
    pub fn send_to_username(&mut self, username: &str, event: &ServerEvent) -> usize {
        let targets: Vec<ConnectionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.username.as_deref() == Some(username))
            .map(|(connection, _)| *connection)
            .collect();

        targets
            .into_iter()
            .filter(|connection| self.send_to(connection, event.clone()))
            .count()
    }

    /// Send an event to every live connection
    pub fn broadcast(&mut self, event: &ServerEvent) {
        self.sessions.retain(|connection, session| {
            match session.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Session {} channel full, dropping {} event",
                        connection,
                        event.kind()
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Session {} disconnected, removing", connection);
                    false
                }
            }
        });
    }
}
