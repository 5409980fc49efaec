//! One-shot client for a single remote peer.
//!
//! A [`TelemetryClient`] wraps one stream obtained from a
//! [`Host`](peermon_net::Host): it reads the session preamble the peer writes
//! at accept time, then issues snapshot, bandwidth, or system-info requests.
//! Clients are not reused across collections and never retry; every error
//! surfaces to the caller.

use chrono::Utc;
use peermon_net::{Host, NetError, Socket};
use peermon_types::{BandwidthSample, PeerId, SeqN, Session, Snapshot, SystemInfo};
use peermon_wire::{
    read_payload, read_response, read_session, write_payload, write_request, Request, Response,
    WireError,
};
use thiserror::Error;
use tokio::time::Instant;

pub use peermon_wire::DEFAULT_PAYLOAD_SIZE;

/// Errors from a single collection attempt against one peer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("net error: {0}")]
    Net(#[from] NetError),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The peer answered with a response type the request does not admit.
    #[error("unexpected response type: {0}")]
    UnexpectedResponse(u32),

    /// The peer closed the stream where a response was required.
    #[error("stream closed before response")]
    StreamClosed,
}

/// Session identity reported by a peer at stream establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub session: Session,
}

/// One batch of a streamed snapshot response.
///
/// `next_seqn` is the sequence number the next batch would start at, i.e. one
/// past the last record delivered so far.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBatch {
    pub next_seqn: SeqN,
    pub snapshots: Vec<Snapshot>,
}

/// A client bound to one stream to one peer.
pub struct TelemetryClient {
    socket: Box<dyn Socket>,
    session: Option<Session>,
}

impl std::fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl TelemetryClient {
    /// Open a stream to `peer` through the host.
    pub async fn open(host: &dyn Host, peer: &PeerId) -> Result<Self, ClientError> {
        let socket = host.open(peer).await?;
        Ok(Self {
            socket,
            session: None,
        })
    }

    /// The peer's current session id.
    ///
    /// Reads the stream preamble on first call and caches it for the life of
    /// the client.
    pub async fn session_info(&mut self) -> Result<SessionInfo, ClientError> {
        let session = self.ensure_session().await?;
        Ok(SessionInfo { session })
    }

    async fn ensure_session(&mut self) -> Result<Session, ClientError> {
        if let Some(session) = self.session {
            return Ok(session);
        }
        let session = read_session(self.socket.as_ref()).await?;
        self.session = Some(session);
        Ok(session)
    }

    /// Request all snapshot records with sequence number >= `since`.
    ///
    /// The peer streams response frames until it has sent everything it holds
    /// at call time, then half-closes the stream.
    pub async fn snapshots(&mut self, since: SeqN) -> Result<SnapshotStream<'_>, ClientError> {
        self.ensure_session().await?;
        write_request(self.socket.as_ref(), &Request::snapshot(since)).await?;
        Ok(SnapshotStream {
            socket: self.socket.as_ref(),
            next_seqn: since,
            done: false,
        })
    }

    /// Measure downstream and upstream throughput with a payload of
    /// `payload_size` bytes each way. Wall time is taken at this end.
    pub async fn bandwidth(&mut self, payload_size: usize) -> Result<BandwidthSample, ClientError> {
        self.ensure_session().await?;
        let socket = self.socket.as_ref();

        let started = Instant::now();
        write_request(socket, &Request::BandwidthDownload).await?;
        let payload = read_payload(socket).await?;
        let download = rate(payload.len(), started.elapsed());

        let data = vec![0u8; payload_size];
        let started = Instant::now();
        write_request(socket, &Request::BandwidthUpload).await?;
        write_payload(socket, &data).await?;
        let _ack = read_payload(socket).await?;
        let upload = rate(payload_size, started.elapsed());

        Ok(BandwidthSample {
            download,
            upload,
            timestamp: Utc::now(),
        })
    }

    /// Ask the peer for its static system information.
    pub async fn system_info(&mut self) -> Result<SystemInfo, ClientError> {
        self.ensure_session().await?;
        write_request(self.socket.as_ref(), &Request::SystemInfo).await?;
        match read_response(self.socket.as_ref()).await? {
            Some(Response::SystemInfo(info)) => Ok(info),
            Some(other) => Err(ClientError::UnexpectedResponse(other.type_value())),
            None => Err(ClientError::StreamClosed),
        }
    }

    /// Release the stream.
    pub async fn close(self) {
        self.socket.close().await;
    }
}

fn rate(bytes: usize, elapsed: std::time::Duration) -> f64 {
    bytes as f64 / elapsed.as_secs_f64().max(1e-9)
}

/// Iterator-style access to a streamed snapshot response.
pub struct SnapshotStream<'a> {
    socket: &'a dyn Socket,
    next_seqn: SeqN,
    done: bool,
}

impl SnapshotStream<'_> {
    /// The next batch, or `None` once the peer has sent everything.
    ///
    /// The wire response does not carry sequence numbers, so the batch's
    /// `next_seqn` is derived here: the requested starting point plus the
    /// records received so far.
    pub async fn next_batch(&mut self) -> Result<Option<SnapshotBatch>, ClientError> {
        if self.done {
            return Ok(None);
        }
        match read_response(self.socket).await? {
            Some(Response::Snapshot(batch)) => {
                self.next_seqn = SeqN(self.next_seqn.0 + batch.snapshots.len() as u64);
                Ok(Some(SnapshotBatch {
                    next_seqn: self.next_seqn,
                    snapshots: batch.snapshots,
                }))
            }
            Some(other) => Err(ClientError::UnexpectedResponse(other.type_value())),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }
}
