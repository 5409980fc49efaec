use peermon_net::Socket;
use peermon_types::{Session, Snapshot, SystemInfo};
use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::frame::{read_frame, write_frame};

pub const RESPONSE_SNAPSHOT: u32 = 0;
pub const RESPONSE_SYSTEM_INFO: u32 = 1;

/// Type word of the session preamble the peer writes when it accepts a
/// stream, before any request is served. Deliberately outside the response
/// value space.
pub const SESSION_PREAMBLE: u32 = u32::MAX;

/// One batch of a streamed snapshot response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub session: Session,
    pub snapshots: Vec<Snapshot>,
}

/// A response frame from a peer to the monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Snapshot(SnapshotResponse),
    SystemInfo(SystemInfo),
}

impl Response {
    pub fn type_value(&self) -> u32 {
        match self {
            Response::Snapshot(_) => RESPONSE_SNAPSHOT,
            Response::SystemInfo(_) => RESPONSE_SYSTEM_INFO,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SessionBody {
    session: u64,
}

/// Encode and send one response.
pub async fn write_response(socket: &dyn Socket, response: &Response) -> Result<(), WireError> {
    let body = match response {
        Response::Snapshot(snapshot) => serde_json::to_vec(snapshot)?,
        Response::SystemInfo(info) => serde_json::to_vec(info)?,
    };
    write_frame(socket, response.type_value(), &body).await
}

/// Read one response, or `None` when the peer half-closed the stream (the end
/// of a snapshot stream).
pub async fn read_response(socket: &dyn Socket) -> Result<Option<Response>, WireError> {
    let frame = match read_frame(socket).await? {
        Some(frame) => frame,
        None => return Ok(None),
    };

    let response = match frame.kind {
        RESPONSE_SNAPSHOT => Response::Snapshot(serde_json::from_slice(&frame.body)?),
        RESPONSE_SYSTEM_INFO => Response::SystemInfo(serde_json::from_slice(&frame.body)?),
        other => return Err(WireError::InvalidResponseType(other)),
    };
    Ok(Some(response))
}

/// Write the session preamble. Peer side of stream establishment.
pub async fn write_session(socket: &dyn Socket, session: Session) -> Result<(), WireError> {
    let body = serde_json::to_vec(&SessionBody { session: session.0 })?;
    write_frame(socket, SESSION_PREAMBLE, &body).await
}

/// Read the session preamble. Monitor side of stream establishment.
///
/// The preamble is mandatory: a close before it arrives, a different frame
/// type, or the invalid-session sentinel are all errors.
pub async fn read_session(socket: &dyn Socket) -> Result<Session, WireError> {
    let frame = read_frame(socket)
        .await?
        .ok_or(WireError::TruncatedFrame)?;
    if frame.kind != SESSION_PREAMBLE {
        return Err(WireError::InvalidResponseType(frame.kind));
    }

    let body: SessionBody = serde_json::from_slice(&frame.body)?;
    let session = Session(body.session);
    if !session.is_valid() {
        return Err(WireError::InvalidSession);
    }
    Ok(session)
}
