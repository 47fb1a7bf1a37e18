use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::RelayError;

/// Uppercase letters and digits without the easily confused ones (I, O, 0, 1).
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 6;
pub const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Codes typed by users are matched case-insensitively.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..CODE_LEN)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Draws codes until one is not `taken`, giving up after [`MAX_ATTEMPTS`].
    pub fn unique<R, F>(rng: &mut R, taken: F) -> Result<Self, RelayError>
    where
        R: Rng + ?Sized,
        F: Fn(&RoomCode) -> bool,
    {
        for _ in 0..MAX_ATTEMPTS {
            let code = Self::random(rng);
            if !taken(&code) {
                return Ok(code);
            }
            tracing::debug!(%code, "room code collision");
        }

        Err(RelayError::CodeSpaceExhausted)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
