//! Wire protocol spoken between the monitor and its peers.
//!
//! Every message is a length-prefixed frame carrying a `u32` type word and a
//! JSON body; bandwidth probes additionally exchange raw payload frames. See
//! [`frame`] for the layout and [`request`]/[`response`] for the message set.

pub mod error;
pub mod frame;
pub mod request;
pub mod response;

pub use error::WireError;
pub use frame::{
    read_frame, read_payload, write_frame, write_payload, Frame, DEFAULT_PAYLOAD_SIZE,
    MAX_FRAME_SIZE,
};
pub use request::{read_request, write_request, Request};
pub use response::{
    read_response, read_session, write_response, write_session, Response, SnapshotResponse,
};
