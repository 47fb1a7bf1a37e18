use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RelayError, RoomCode, conn::ConnId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Create {
        username: String,
    },
    Join {
        username: String,
        code: String,
    },
    Signal {
        target_id: ConnId,
        kind: SignalKind,
        #[serde(default)]
        payload: Value,
    },
    Leave,
}

impl ClientMsg {
    pub fn decode(frame: &[u8]) -> Result<Self, RelayError> {
        Ok(serde_json::from_slice(frame)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub id: ConnId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    Welcome {
        id: ConnId,
    },
    Created {
        code: RoomCode,
    },
    Joined {
        code: RoomCode,
        members: Vec<Peer>,
    },
    PeerJoined {
        id: ConnId,
        username: String,
    },
    PeerLeft {
        id: ConnId,
        username: String,
    },
    Signal {
        from_id: ConnId,
        from_username: String,
        kind: SignalKind,
        payload: Value,
    },
    Left {
        code: RoomCode,
    },
    Error {
        reason: &'static str,
        message: String,
    },
}

impl From<&RelayError> for ServerMsg {
    fn from(err: &RelayError) -> Self {
        ServerMsg::Error {
            reason: err.reason(),
            message: err.to_string(),
        }
    }
}
