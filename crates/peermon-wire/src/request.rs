use peermon_net::Socket;
use peermon_types::SeqN;
use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::frame::{read_frame, write_frame};

pub const REQUEST_SNAPSHOT: u32 = 0;
pub const REQUEST_SYSTEM_INFO: u32 = 1;
pub const REQUEST_BANDWIDTH_DOWNLOAD: u32 = 2;
pub const REQUEST_BANDWIDTH_UPLOAD: u32 = 3;

/// A request frame from the monitor to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Ask for all snapshot records with sequence number >= `since`.
    ///
    /// The session field rides along for compatibility but carries no
    /// semantics; only `since` selects records.
    Snapshot { session: u64, since: SeqN },
    SystemInfo,
    BandwidthDownload,
    BandwidthUpload,
}

#[derive(Serialize, Deserialize)]
struct SnapshotBody {
    session: u64,
    since: u64,
}

impl Request {
    /// A snapshot request resuming from `since`.
    pub fn snapshot(since: SeqN) -> Self {
        Request::Snapshot { session: 0, since }
    }

    pub fn type_value(&self) -> u32 {
        match self {
            Request::Snapshot { .. } => REQUEST_SNAPSHOT,
            Request::SystemInfo => REQUEST_SYSTEM_INFO,
            Request::BandwidthDownload => REQUEST_BANDWIDTH_DOWNLOAD,
            Request::BandwidthUpload => REQUEST_BANDWIDTH_UPLOAD,
        }
    }
}

/// Encode and send one request. Body-less requests encode as zero bytes.
pub async fn write_request(socket: &dyn Socket, request: &Request) -> Result<(), WireError> {
    let body = match request {
        Request::Snapshot { session, since } => serde_json::to_vec(&SnapshotBody {
            session: *session,
            since: since.0,
        })?,
        Request::SystemInfo | Request::BandwidthDownload | Request::BandwidthUpload => Vec::new(),
    };
    write_frame(socket, request.type_value(), &body).await
}

/// Read one request, or `None` when the monitor closed the stream.
pub async fn read_request(socket: &dyn Socket) -> Result<Option<Request>, WireError> {
    let frame = match read_frame(socket).await? {
        Some(frame) => frame,
        None => return Ok(None),
    };

    let request = match frame.kind {
        REQUEST_SNAPSHOT => {
            let body: SnapshotBody = serde_json::from_slice(&frame.body)?;
            Request::Snapshot {
                session: body.session,
                since: SeqN(body.since),
            }
        }
        REQUEST_SYSTEM_INFO => Request::SystemInfo,
        REQUEST_BANDWIDTH_DOWNLOAD => Request::BandwidthDownload,
        REQUEST_BANDWIDTH_UPLOAD => Request::BandwidthUpload,
        other => return Err(WireError::InvalidRequestType(other)),
    };
    Ok(Some(request))
}
