use peermon_types::PeerId;
use thiserror::Error;

/// Errors from the transport layer.
#[derive(Debug, Error)]
pub enum NetError {
    /// The stream was closed by the remote peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// The host has no route to the requested peer.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// Establishing a stream to the peer failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// An I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
