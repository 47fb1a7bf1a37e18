use thiserror::Error;

/// Failures reported back to the client that caused them. None of these close
/// the connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("room not found, check the code and try again")]
    RoomNotFound,

    #[error("room is full")]
    RoomFull,

    #[error("join or create a room first")]
    NotInRoom,

    #[error("target is not a member of your room")]
    InvalidTarget,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("could not allocate a free room code")]
    CodeSpaceExhausted,
}

impl RelayError {
    /// Stable name sent as `reason` in error replies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "RoomNotFound",
            Self::RoomFull => "RoomFull",
            Self::NotInRoom => "NotInRoom",
            Self::InvalidTarget => "InvalidTarget",
            Self::MalformedMessage(_) => "MalformedMessage",
            Self::CodeSpaceExhausted => "CodeSpaceExhausted",
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}
