//! In-memory transport.
//!
//! Backs the test suites of the wire, client, and monitor crates: a
//! [`MemHost`] hands out connected [`MemSocket`] pairs without touching the
//! network, and a [`MemListener`] plays the peer side.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use peermon_types::PeerId;
use tokio::sync::mpsc;

use crate::error::NetError;
use crate::socket::{Host, Socket};

/// One end of an in-memory duplex stream.
pub struct MemSocket {
    tx: parking_lot::Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    rx: tokio::sync::Mutex<RecvHalf>,
}

struct RecvHalf {
    chan: mpsc::UnboundedReceiver<Bytes>,
    buf: BytesMut,
}

/// Create a connected pair of in-memory sockets.
pub fn socket_pair() -> (MemSocket, MemSocket) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (MemSocket::new(a_tx, a_rx), MemSocket::new(b_tx, b_rx))
}

impl MemSocket {
    fn new(tx: mpsc::UnboundedSender<Bytes>, rx: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            tx: parking_lot::Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(RecvHalf {
                chan: rx,
                buf: BytesMut::new(),
            }),
        }
    }
}

#[async_trait]
impl Socket for MemSocket {
    async fn send(&self, data: Bytes) -> Result<(), NetError> {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.send(data).map_err(|_| NetError::ConnectionClosed),
            None => Err(NetError::ConnectionClosed),
        }
    }

    async fn recv_exact(&self, len: usize) -> Result<Bytes, NetError> {
        let mut half = self.rx.lock().await;
        while half.buf.len() < len {
            match half.chan.recv().await {
                Some(chunk) => half.buf.extend_from_slice(&chunk),
                None => return Err(NetError::ConnectionClosed),
            }
        }
        Ok(half.buf.split_to(len).freeze())
    }

    async fn close(&self) {
        self.tx.lock().take();
    }
}

/// Accept side of a registered in-memory peer.
pub struct MemListener {
    incoming: mpsc::UnboundedReceiver<MemSocket>,
}

impl MemListener {
    /// Accept the next stream opened to this peer, or `None` once the host
    /// has dropped the peer's registration.
    pub async fn accept(&mut self) -> Option<MemSocket> {
        self.incoming.recv().await
    }
}

/// A [`Host`] whose peers are in-process listeners.
#[derive(Default)]
pub struct MemHost {
    peers: DashMap<PeerId, mpsc::UnboundedSender<MemSocket>>,
}

impl MemHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer and return its accept side. Re-registering a peer
    /// replaces the previous listener.
    pub fn register(&self, peer: PeerId) -> MemListener {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(peer, tx);
        MemListener { incoming: rx }
    }

    /// Drop a peer's registration; subsequent opens fail.
    pub fn deregister(&self, peer: &PeerId) {
        self.peers.remove(peer);
    }
}

#[async_trait]
impl Host for MemHost {
    async fn open(&self, peer: &PeerId) -> Result<Box<dyn Socket>, NetError> {
        let entry = self
            .peers
            .get(peer)
            .ok_or_else(|| NetError::UnknownPeer(peer.clone()))?;

        let (local, remote) = socket_pair();
        entry
            .value()
            .send(remote)
            .map_err(|_| NetError::ConnectFailed(format!("{peer}: listener gone")))?;
        Ok(Box::new(local))
    }
}
