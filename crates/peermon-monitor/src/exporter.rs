//! Downstream sinks for collected telemetry.
//!
//! The monitor is not the system of record: exporters own durability and
//! retries. Errors returned here are logged by the collectors and never
//! counted as peer failures.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use peermon_types::{BandwidthSample, PeerId, Session, Snapshot};
use serde::Serialize;
use thiserror::Error;

/// Errors from an exporter backend.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Downstream sink for snapshots and bandwidth samples.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Export one snapshot batch, in the order the peer emitted it.
    async fn export_snapshots(
        &self,
        peer: &PeerId,
        session: Session,
        snapshots: &[Snapshot],
    ) -> Result<(), ExportError>;

    /// Export one bandwidth measurement.
    async fn export_bandwidth(
        &self,
        peer: &PeerId,
        session: Session,
        sample: BandwidthSample,
    ) -> Result<(), ExportError>;
}

/// Exports by writing structured log events.
pub struct LogExporter;

#[async_trait]
impl Exporter for LogExporter {
    async fn export_snapshots(
        &self,
        peer: &PeerId,
        session: Session,
        snapshots: &[Snapshot],
    ) -> Result<(), ExportError> {
        tracing::info!(%peer, %session, count = snapshots.len(), "snapshots");
        Ok(())
    }

    async fn export_bandwidth(
        &self,
        peer: &PeerId,
        session: Session,
        sample: BandwidthSample,
    ) -> Result<(), ExportError> {
        tracing::info!(
            %peer,
            %session,
            download = sample.download,
            upload = sample.upload,
            "bandwidth"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotLine<'a> {
    peer: &'a PeerId,
    session: Session,
    snapshot: &'a Snapshot,
}

#[derive(Serialize)]
struct BandwidthLine<'a> {
    peer: &'a PeerId,
    session: Session,
    bandwidth: BandwidthSample,
}

/// Appends one JSON object per record to a file.
pub struct FileExporter {
    path: PathBuf,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, lines: &[String]) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Exporter for FileExporter {
    async fn export_snapshots(
        &self,
        peer: &PeerId,
        session: Session,
        snapshots: &[Snapshot],
    ) -> Result<(), ExportError> {
        let lines = snapshots
            .iter()
            .map(|snapshot| {
                serde_json::to_string(&SnapshotLine {
                    peer,
                    session,
                    snapshot,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.append(&lines)
    }

    async fn export_bandwidth(
        &self,
        peer: &PeerId,
        session: Session,
        sample: BandwidthSample,
    ) -> Result<(), ExportError> {
        let line = serde_json::to_string(&BandwidthLine {
            peer,
            session,
            bandwidth: sample,
        })?;
        self.append(&[line])
    }
}

/// Buffers everything in memory. For tests and inspection.
#[derive(Default)]
pub struct InMemoryExporter {
    snapshots: Mutex<Vec<(PeerId, Session, Vec<Snapshot>)>>,
    bandwidth: Mutex<Vec<(PeerId, Session, BandwidthSample)>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshot batches exported so far, in export order.
    pub fn snapshot_batches(&self) -> Vec<(PeerId, Session, Vec<Snapshot>)> {
        self.snapshots.lock().clone()
    }

    /// All bandwidth samples exported so far, in export order.
    pub fn bandwidth_samples(&self) -> Vec<(PeerId, Session, BandwidthSample)> {
        self.bandwidth.lock().clone()
    }

    pub fn snapshot_batch_count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn bandwidth_sample_count(&self) -> usize {
        self.bandwidth.lock().len()
    }
}

#[async_trait]
impl Exporter for InMemoryExporter {
    async fn export_snapshots(
        &self,
        peer: &PeerId,
        session: Session,
        snapshots: &[Snapshot],
    ) -> Result<(), ExportError> {
        self.snapshots
            .lock()
            .push((peer.clone(), session, snapshots.to_vec()));
        Ok(())
    }

    async fn export_bandwidth(
        &self,
        peer: &PeerId,
        session: Session,
        sample: BandwidthSample,
    ) -> Result<(), ExportError> {
        self.bandwidth.lock().push((peer.clone(), session, sample));
        Ok(())
    }
}
