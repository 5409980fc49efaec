//! The monitor loop.
//!
//! Owns the peer state table, drains the action queue, and spawns collector
//! tasks. The loop is the only writer of the table; collectors reach their
//! peer through a shared record and communicate back by enqueueing actions.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use peermon_net::Host;
use peermon_net_tcp::TcpHost;
use peermon_types::PeerId;
use tokio::sync::watch;

use crate::collector::{collect_bandwidth, collect_telemetry, Shared};
use crate::config::MonitorConfig;
use crate::exporter::Exporter;
use crate::peer::{PeerRecord, PeerStatus};
use crate::waker::Waker;

/// What a scheduled action does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Discover,
    Telemetry,
    Bandwidth,
    RemovePeer,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Discover => "discover",
            ActionKind::Telemetry => "telemetry",
            ActionKind::Bandwidth => "bandwidth",
            ActionKind::RemovePeer => "remove-peer",
        };
        write!(f, "{name}")
    }
}

/// A unit of scheduled work targeting one peer.
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub peer: PeerId,
}

impl Action {
    pub fn new(kind: ActionKind, peer: PeerId) -> Self {
        Self { kind, peer }
    }
}

/// The collection engine. One per process; all state lives here.
pub struct Monitor {
    pub(crate) shared: Arc<Shared>,
    peers: DashMap<PeerId, Arc<PeerRecord>>,
}

impl Monitor {
    /// Build a monitor with a default TCP host.
    pub fn new(config: MonitorConfig, exporter: Arc<dyn Exporter>) -> Self {
        Self::with_host(config, Arc::new(TcpHost::new()), exporter)
    }

    /// Build a monitor around a pre-built host.
    pub fn with_host(
        config: MonitorConfig,
        host: Arc<dyn Host>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                host,
                exporter,
                actions: Waker::new(),
                config,
            }),
            peers: DashMap::new(),
        }
    }

    /// Entry point for the upstream discovery feed.
    pub fn peer_discovered(&self, peer: PeerId) {
        self.shared
            .actions
            .push_now(Action::new(ActionKind::Discover, peer));
    }

    /// Stop handing out work. Idempotent; `run` returns soon after.
    pub fn close(&self) {
        self.shared.actions.close();
    }

    pub fn contains_peer(&self, peer: &PeerId) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Snapshot of one peer's probe state, taken under its lock.
    pub async fn peer_status(&self, peer: &PeerId) -> Option<PeerStatus> {
        let record = self.peers.get(peer).map(|entry| entry.value().clone())?;
        let state = record.state.lock().await;
        Some(PeerStatus::from(&*state))
    }

    /// Drain the action queue until shutdown is signalled or the waker is
    /// closed. Outstanding collectors are not joined; their reschedules
    /// become no-ops once the waker closes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                action = self.shared.actions.receive() => match action {
                    Some(action) => self.dispatch(action),
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("monitor loop exited");
    }

    fn dispatch(&self, action: Action) {
        tracing::debug!(peer = %action.peer, kind = %action.kind, "action");
        match action.kind {
            ActionKind::Discover => self.on_discover(action.peer),
            ActionKind::Telemetry => {
                // A missing record means the peer was removed while the
                // action sat in the queue; drop it.
                if let Some(record) = self.lookup(&action.peer) {
                    tokio::spawn(collect_telemetry(Arc::clone(&self.shared), record));
                }
            }
            ActionKind::Bandwidth => {
                if let Some(record) = self.lookup(&action.peer) {
                    tokio::spawn(collect_bandwidth(Arc::clone(&self.shared), record));
                }
            }
            ActionKind::RemovePeer => {
                tracing::info!(peer = %action.peer, "removing peer");
                self.peers.remove(&action.peer);
            }
        }
    }

    fn lookup(&self, peer: &PeerId) -> Option<Arc<PeerRecord>> {
        self.peers.get(peer).map(|entry| entry.value().clone())
    }

    fn on_discover(&self, peer: PeerId) {
        match self.peers.entry(peer.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(PeerRecord::new(peer.clone()));
                self.shared
                    .actions
                    .push_now(Action::new(ActionKind::Telemetry, peer.clone()));
                self.shared
                    .actions
                    .push_now(Action::new(ActionKind::Bandwidth, peer));
            }
            Entry::Occupied(entry) => {
                // The record is left untouched. A kind with an action already
                // queued or a collector running is absorbed; an idle kind is
                // re-triggered, which is how a dormant failing peer gets its
                // next attempt.
                let record = entry.get().clone();
                drop(entry);
                if record.try_schedule(ActionKind::Telemetry) {
                    self.shared
                        .actions
                        .push_now(Action::new(ActionKind::Telemetry, peer.clone()));
                }
                if record.try_schedule(ActionKind::Bandwidth) {
                    self.shared
                        .actions
                        .push_now(Action::new(ActionKind::Bandwidth, peer));
                }
            }
        }
    }
}
