use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a remote peer.
///
/// Opaque to the monitor: the string is the stable text encoding of the
/// peer's cryptographic ID and is only ever compared, hashed, and displayed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One run of a peer's snapshot log.
///
/// A peer issues a new session whenever it restarts or resets its log;
/// sequence numbers are only meaningful within a single session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Session(pub u64);

impl Session {
    /// Sentinel for "no session observed yet". Never issued by a peer; the
    /// wire layer rejects it in the session preamble.
    pub const INVALID: Session = Session(u64::MAX);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Session({})", self.0)
        } else {
            write!(f, "Session(invalid)")
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Session {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Position within one session's snapshot log.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SeqN(pub u64);

impl SeqN {
    pub const ZERO: SeqN = SeqN(0);
}

impl fmt::Debug for SeqN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqN({})", self.0)
    }
}

impl fmt::Display for SeqN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SeqN {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
