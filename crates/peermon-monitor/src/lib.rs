//! Monitor scheduling and collection engine.
//!
//! The [`Monitor`] owns the peer state table and drains a [`Waker`] of timed
//! actions; each due telemetry or bandwidth action spawns a collector task
//! that probes one peer, hands results to the [`Exporter`], and reschedules
//! itself on success. Failures accumulate per peer until the peer is removed.

pub mod collector;
pub mod config;
pub mod exporter;
pub mod monitor;
pub mod peer;
pub mod waker;

pub use config::MonitorConfig;
pub use exporter::{ExportError, Exporter, FileExporter, InMemoryExporter, LogExporter};
pub use monitor::{Action, ActionKind, Monitor};
pub use peer::PeerStatus;
pub use waker::Waker;
