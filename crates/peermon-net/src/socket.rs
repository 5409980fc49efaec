use async_trait::async_trait;
use bytes::Bytes;
use peermon_types::PeerId;

use crate::error::NetError;

/// An abstract byte stream to one remote peer.
///
/// Implementations may be TCP, QUIC, or in-memory channels for testing.
/// The framing layer above this trait only needs ordered byte delivery.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Write all of `data` to the stream.
    async fn send(&self, data: Bytes) -> Result<(), NetError>;

    /// Read exactly `len` bytes from the stream.
    ///
    /// Returns `NetError::ConnectionClosed` if the peer closes the stream
    /// before `len` bytes arrive; the caller decides whether a close at this
    /// point is an orderly end of stream or a protocol violation.
    async fn recv_exact(&self, len: usize) -> Result<Bytes, NetError>;

    /// Close the stream. Pending and subsequent reads on the remote side
    /// observe `ConnectionClosed` once buffered data is drained.
    async fn close(&self);
}

impl std::fmt::Debug for dyn Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn Socket").finish_non_exhaustive()
    }
}

/// Capability to open streams to peers by identity.
///
/// The monitor shares one host among all collectors; how a `PeerId` resolves
/// to a transport endpoint is the implementation's concern.
#[async_trait]
pub trait Host: Send + Sync {
    async fn open(&self, peer: &PeerId) -> Result<Box<dyn Socket>, NetError>;
}
