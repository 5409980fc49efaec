//! One-shot collection tasks.
//!
//! Each collector runs on its own task, takes the peer lock for the whole
//! collection, performs a single probe through a fresh client, and either
//! reschedules its own action kind or folds the failure into the peer's
//! error count.

use std::sync::Arc;

use peermon_client::{ClientError, TelemetryClient, DEFAULT_PAYLOAD_SIZE};
use peermon_net::Host;
use peermon_types::{PeerId, SeqN};

use crate::config::MonitorConfig;
use crate::exporter::Exporter;
use crate::monitor::{Action, ActionKind};
use crate::peer::{PeerRecord, ProbeState};
use crate::waker::Waker;

/// State shared between the monitor loop and its collectors.
pub(crate) struct Shared {
    pub host: Arc<dyn Host>,
    pub exporter: Arc<dyn Exporter>,
    pub actions: Waker<Action>,
    pub config: MonitorConfig,
}

pub(crate) async fn collect_telemetry(shared: Arc<Shared>, record: Arc<PeerRecord>) {
    let mut state = record.state.lock().await;
    match try_collect_telemetry(&shared, &record.id, &mut state).await {
        Ok(()) => {
            shared.actions.push(
                Action::new(ActionKind::Telemetry, record.id.clone()),
                shared.config.collect_period,
            );
        }
        Err(err) => {
            record.clear_scheduled(ActionKind::Telemetry);
            peer_error(&shared, &record.id, &mut state, &err);
        }
    }
}

async fn try_collect_telemetry(
    shared: &Shared,
    peer: &PeerId,
    state: &mut ProbeState,
) -> Result<(), ClientError> {
    tracing::debug!(%peer, "opening client");
    let mut client = TelemetryClient::open(shared.host.as_ref(), peer).await?;

    let session = client.session_info().await?.session;

    // A new session starts a new snapshot log; the old position is void.
    // The session change commits here even if the stream below fails.
    let since = if session != state.last_session {
        state.last_session = session;
        state.last_seqn = SeqN::ZERO;
        SeqN::ZERO
    } else {
        state.last_seqn
    };

    tracing::debug!(%peer, %session, %since, "streaming snapshots");
    let mut stream = client.snapshots(since).await?;
    while let Some(batch) = stream.next_batch().await? {
        tracing::debug!(%peer, count = batch.snapshots.len(), "exporting snapshots");
        if let Err(err) = shared
            .exporter
            .export_snapshots(peer, session, &batch.snapshots)
            .await
        {
            // The sink is the system of record and owns its retries.
            tracing::warn!(%peer, error = %err, "snapshot export failed");
        }
        state.last_seqn = batch.next_seqn;
    }

    client.close().await;
    Ok(())
}

pub(crate) async fn collect_bandwidth(shared: Arc<Shared>, record: Arc<PeerRecord>) {
    let mut state = record.state.lock().await;
    match try_collect_bandwidth(&shared, &record.id).await {
        Ok(()) => {
            shared.actions.push(
                Action::new(ActionKind::Bandwidth, record.id.clone()),
                shared.config.bandwidth_period,
            );
        }
        Err(err) => {
            record.clear_scheduled(ActionKind::Bandwidth);
            peer_error(&shared, &record.id, &mut state, &err);
        }
    }
}

async fn try_collect_bandwidth(shared: &Shared, peer: &PeerId) -> Result<(), ClientError> {
    let mut client = TelemetryClient::open(shared.host.as_ref(), peer).await?;

    let session = client.session_info().await?.session;
    let sample = client.bandwidth(DEFAULT_PAYLOAD_SIZE).await?;

    if let Err(err) = shared.exporter.export_bandwidth(peer, session, sample).await {
        tracing::warn!(%peer, error = %err, "bandwidth export failed");
    }

    client.close().await;
    Ok(())
}

// Must be called with the peer lock held.
fn peer_error(shared: &Shared, peer: &PeerId, state: &mut ProbeState, err: &ClientError) {
    tracing::warn!(%peer, error = %err, "peer error");
    state.failed_attempts += 1;
    if state.failed_attempts > shared.config.max_failed_attempts {
        shared
            .actions
            .push_now(Action::new(ActionKind::RemovePeer, peer.clone()));
    }
}
