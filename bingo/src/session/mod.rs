//! Live connections and the events pushed to them.
//!
//! Every WebSocket connection gets a [`ConnectionId`] and an outbound
//! channel. The round actor owns the [`SessionRegistry`] and uses it both
//! for targeted replies and for fan-out to everyone.

pub mod events;
pub mod registry;

pub use events::ServerEvent;
pub use registry::{Session, SessionRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-assigned identifier of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
