use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{RoomCode, msg::ServerMsg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Sending half of a connection's outbound queue. Never blocks; frames sent
/// after the connection is gone are dropped.
#[derive(Debug, Clone)]
pub struct Outbox(mpsc::UnboundedSender<ServerMsg>);

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn send(&self, msg: ServerMsg) {
        if self.0.send(msg).is_err() {
            tracing::trace!("dropping frame for closed connection");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    Connected,
    InRoom(RoomCode),
    Closed,
}

/// One client's side of the relay. Only the task serving the socket holds it;
/// rooms refer to it by [`ConnId`] through a cloned [`Outbox`].
#[derive(Debug)]
pub struct Connection {
    id: ConnId,
    username: Option<String>,
    state: ConnState,
    outbox: Outbox,
}

impl Connection {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: ConnId::new(),
            username: None,
            state: ConnState::Connected,
            outbox,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn state(&self) -> &ConnState {
        &self.state
    }

    pub fn room(&self) -> Option<&RoomCode> {
        match &self.state {
            ConnState::InRoom(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnState::Closed
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn reply(&self, msg: ServerMsg) {
        self.outbox.send(msg);
    }

    pub(crate) fn set_username(&mut self, username: String) {
        self.username = Some(username);
    }

    pub(crate) fn set_state(&mut self, state: ConnState) {
        self.state = state;
    }
}
