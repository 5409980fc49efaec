//! TCP transport for the monitor.
//!
//! [`TcpHost`] resolves peer identities through an address book and dials a
//! fresh connection per collection; [`TcpSocket`] wraps a split
//! `tokio::net::TcpStream` so sends and receives can proceed from different
//! tasks.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use peermon_net::{Host, NetError, Socket};
use peermon_types::PeerId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

/// A TCP stream split into independently lockable halves.
pub struct TcpSocket {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    peer_addr: SocketAddr,
}

impl TcpSocket {
    /// Wrap an already-connected stream.
    pub fn from_stream(stream: tokio::net::TcpStream) -> Result<Self, NetError> {
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: Mutex::new(read_half),
            writer: Mutex::new(write_half),
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

#[async_trait]
impl Socket for TcpSocket {
    async fn send(&self, data: Bytes) -> Result<(), NetError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv_exact(&self, len: usize) -> Result<Bytes, NetError> {
        let mut reader = self.reader.lock().await;
        let mut buf = BytesMut::zeroed(len);
        match reader.read_exact(&mut buf).await {
            Ok(_) => Ok(buf.freeze()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(NetError::ConnectionClosed)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// Connect to `addr` and return a [`TcpSocket`].
pub async fn connect(addr: SocketAddr) -> Result<TcpSocket, NetError> {
    tracing::debug!(%addr, "dialing");
    let stream = tokio::net::TcpStream::connect(addr)
        .await
        .map_err(|e| NetError::ConnectFailed(format!("{addr}: {e}")))?;
    TcpSocket::from_stream(stream)
}

/// Accept side used by peers (and by the tests of the crates above this one).
pub struct TcpListener {
    inner: tokio::net::TcpListener,
}

impl TcpListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, NetError> {
        let inner = tokio::net::TcpListener::bind(addr).await?;
        let local = inner.local_addr()?;
        tracing::info!(addr = %local, "listener bound");
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.inner.local_addr()?)
    }

    pub async fn accept(&self) -> Result<TcpSocket, NetError> {
        let (stream, peer) = self.inner.accept().await?;
        tracing::debug!(%peer, "accepted connection");
        TcpSocket::from_stream(stream)
    }
}

/// A [`Host`] that dials peers over TCP.
///
/// Peer identities are mapped to socket addresses through an address book
/// populated by the operator (or by whatever feeds discovery).
#[derive(Default)]
pub struct TcpHost {
    book: DashMap<PeerId, SocketAddr>,
}

impl TcpHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dialing address for a peer, replacing any previous one.
    pub fn add_address(&self, peer: PeerId, addr: SocketAddr) {
        self.book.insert(peer, addr);
    }

    pub fn remove_address(&self, peer: &PeerId) {
        self.book.remove(peer);
    }

    pub fn lookup(&self, peer: &PeerId) -> Option<SocketAddr> {
        self.book.get(peer).map(|e| *e.value())
    }
}

#[async_trait]
impl Host for TcpHost {
    async fn open(&self, peer: &PeerId) -> Result<Box<dyn Socket>, NetError> {
        let addr = self
            .lookup(peer)
            .ok_or_else(|| NetError::UnknownPeer(peer.clone()))?;
        let socket = connect(addr).await?;
        Ok(Box::new(socket))
    }
}
