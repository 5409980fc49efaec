use peermon_net::NetError;
use thiserror::Error;

/// Errors from encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// A transport error underneath the codec.
    #[error("net error: {0}")]
    Net(#[from] NetError),

    /// A body failed to serialize or deserialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The declared frame length exceeds the protocol ceiling.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The declared frame length cannot hold a type word.
    #[error("short frame: declared length {len}")]
    ShortFrame { len: usize },

    /// The stream closed in the middle of a frame.
    #[error("truncated frame")]
    TruncatedFrame,

    /// A request frame carried an unknown type value.
    #[error("invalid request type: {0}")]
    InvalidRequestType(u32),

    /// A response frame carried an unknown type value.
    #[error("invalid response type: {0}")]
    InvalidResponseType(u32),

    /// The session preamble carried the invalid-session sentinel.
    #[error("peer announced an invalid session")]
    InvalidSession,
}
