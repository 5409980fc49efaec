use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use peermon_types::{PeerId, SeqN, Session};
use tokio::sync::Mutex;

use crate::monitor::ActionKind;

/// Mutable collection state of one peer. Guarded by the record's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProbeState {
    pub failed_attempts: u32,
    pub last_session: Session,
    /// Next expected snapshot index; only meaningful with `last_session`.
    pub last_seqn: SeqN,
}

/// One peer under management.
///
/// The async mutex doubles as the per-peer collection lock: a collector holds
/// it for the whole collection, which serializes telemetry and bandwidth
/// probes against the same peer and bounds outbound streams per peer to one.
pub(crate) struct PeerRecord {
    pub id: PeerId,
    pub state: Mutex<ProbeState>,
    /// Whether a telemetry action is queued or a telemetry collector running.
    telemetry_scheduled: AtomicBool,
    /// Same, for bandwidth.
    bandwidth_scheduled: AtomicBool,
}

impl PeerRecord {
    /// A fresh record. Both kinds start scheduled: discovery enqueues one
    /// telemetry and one bandwidth action along with the insert.
    pub fn new(id: PeerId) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(ProbeState {
                failed_attempts: 0,
                last_session: Session::INVALID,
                last_seqn: SeqN::ZERO,
            }),
            telemetry_scheduled: AtomicBool::new(true),
            bandwidth_scheduled: AtomicBool::new(true),
        })
    }

    fn flag(&self, kind: ActionKind) -> &AtomicBool {
        match kind {
            ActionKind::Telemetry => &self.telemetry_scheduled,
            ActionKind::Bandwidth => &self.bandwidth_scheduled,
            _ => unreachable!("only collection kinds carry schedule flags"),
        }
    }

    /// Claim the schedule slot for `kind`. Returns false if an action of that
    /// kind is already queued or running, in which case the caller must not
    /// enqueue another.
    pub fn try_schedule(&self, kind: ActionKind) -> bool {
        !self.flag(kind).swap(true, Ordering::AcqRel)
    }

    /// Release the schedule slot for `kind`. Called by a failing collector,
    /// which does not reschedule itself.
    pub fn clear_scheduled(&self, kind: ActionKind) {
        self.flag(kind).store(false, Ordering::Release);
    }
}

/// Read-only snapshot of a peer's probe state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStatus {
    pub failed_attempts: u32,
    pub last_session: Session,
    pub last_seqn: SeqN,
}

impl From<&ProbeState> for PeerStatus {
    fn from(state: &ProbeState) -> Self {
        Self {
            failed_attempts: state.failed_attempts,
            last_session: state.last_session,
            last_seqn: state.last_seqn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_record_state() {
        let record = PeerRecord::new(PeerId::new("p1"));
        let state = record.state.try_lock().unwrap();
        assert_eq!(state.failed_attempts, 0);
        assert_eq!(state.last_session, Session::INVALID);
        assert_eq!(state.last_seqn, SeqN::ZERO);
    }

    #[test]
    fn test_schedule_flags_start_claimed() {
        let record = PeerRecord::new(PeerId::new("p1"));
        assert!(!record.try_schedule(ActionKind::Telemetry));
        assert!(!record.try_schedule(ActionKind::Bandwidth));
    }

    #[test]
    fn test_schedule_claim_release_cycle() {
        let record = PeerRecord::new(PeerId::new("p1"));
        record.clear_scheduled(ActionKind::Telemetry);

        assert!(record.try_schedule(ActionKind::Telemetry));
        assert!(!record.try_schedule(ActionKind::Telemetry));

        // Bandwidth slot is independent.
        record.clear_scheduled(ActionKind::Bandwidth);
        assert!(record.try_schedule(ActionKind::Bandwidth));
    }
}
