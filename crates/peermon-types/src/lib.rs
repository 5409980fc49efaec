pub mod id;
pub mod metrics;

pub use id::{PeerId, SeqN, Session};
pub use metrics::{BandwidthSample, Snapshot, SystemInfo};
