use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use thiserror::Error;

use crate::order::job::{JobId, JobRecord, PrepResult};
use crate::worker::JobHandle;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("order {0} is already registered")]
    DuplicateIdentity(JobId),
}

/// Result of looking an order up by identity.
#[derive(Debug, Clone)]
pub enum Lookup {
    NotFound,
    Pending(JobRecord),
    Ready(JobRecord),
}

struct PendingJob {
    record: JobRecord,
    handle: JobHandle,
}

#[derive(Default)]
struct RegistryState {
    last_sequence: u64,
    pending: BTreeMap<JobId, PendingJob>,
    ready: HashMap<JobId, JobRecord>,
}

impl RegistryState {
    /// Move a pending job to ready storage. Returns false when the job is not
    /// pending, so a late or repeated completion changes nothing.
    fn promote(&mut self, id: &JobId, result: PrepResult) -> bool {
        match self.pending.remove(id) {
            Some(PendingJob { mut record, .. }) => {
                record.complete(result);
                self.ready.insert(*id, record);
                true
            }
            None => false,
        }
    }
}

/// Owns every order record and the identity counter.
///
/// All reads and writes of the pending map, the ready map and the counter
/// happen inside a single acquisition of one lock per call.
#[derive(Default)]
pub struct JobRegistry {
    state: Mutex<RegistryState>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next identity. No two callers ever observe the same value.
    pub fn next_identity(&self) -> JobId {
        let mut state = self.state.lock();
        state.last_sequence += 1;
        JobId::from_sequence(state.last_sequence)
    }

    /// Assign the next identity, start the job and record it as pending, all
    /// under one lock. The counter only advances when `start` succeeds, so a
    /// failed start leaves no gap in the sequence.
    pub fn submit_with<E>(
        &self,
        start: impl FnOnce(JobId) -> Result<(JobRecord, JobHandle), E>,
    ) -> Result<JobId, E> {
        let mut state = self.state.lock();
        let id = JobId::from_sequence(state.last_sequence + 1);
        let (record, handle) = start(id)?;

        state.last_sequence = id.sequence();
        state.pending.insert(id, PendingJob { record, handle });
        tracing::debug!(job_id = %id, pending = state.pending.len(), "Order registered");
        Ok(id)
    }

    /// Record a job as in flight.
    pub fn register_pending(
        &self,
        record: JobRecord,
        handle: JobHandle,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let id = record.id;
        if state.pending.contains_key(&id) || state.ready.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentity(id));
        }
        state.pending.insert(id, PendingJob { record, handle });
        tracing::debug!(job_id = %id, pending = state.pending.len(), "Order registered");
        Ok(())
    }

    /// Move a job from pending to ready. Only the first completion applies;
    /// later ones are reported and ignored.
    pub fn mark_ready(&self, id: &JobId, result: PrepResult) -> bool {
        let mut state = self.state.lock();
        if state.promote(id, result) {
            tracing::debug!(job_id = %id, "Order marked ready");
            return true;
        }
        if state.ready.contains_key(id) {
            tracing::warn!(job_id = %id, "Duplicate completion ignored");
        } else {
            tracing::warn!(job_id = %id, "Completion for unknown order ignored");
        }
        false
    }

    /// Look an order up, promoting it first if its handle has completed.
    pub fn lookup(&self, id: &JobId) -> Lookup {
        let mut state = self.state.lock();

        if let Some(record) = state.ready.get(id) {
            return Lookup::Ready(record.clone());
        }

        let finished = match state.pending.get(id) {
            Some(job) => job.handle.result(),
            None => return Lookup::NotFound,
        };

        match finished {
            Some(result) => {
                state.promote(id, result);
                match state.ready.get(id) {
                    Some(record) => Lookup::Ready(record.clone()),
                    None => Lookup::NotFound,
                }
            }
            None => match state.pending.get(id) {
                Some(job) => Lookup::Pending(job.record.clone()),
                None => Lookup::NotFound,
            },
        }
    }

    /// Identities currently pending, in ascending order.
    pub fn list_pending(&self) -> Vec<JobId> {
        self.state.lock().pending.keys().copied().collect()
    }

    /// Wait for every job pending at call time and promote it to ready.
    ///
    /// The lock is only held while taking the snapshot and while promoting,
    /// never while waiting. Jobs submitted during the drain are not waited on.
    /// Returns the number of jobs drained.
    pub async fn drain_all(&self) -> usize {
        let snapshot: Vec<(JobId, JobHandle)> = {
            let state = self.state.lock();
            state
                .pending
                .iter()
                .map(|(id, job)| (*id, job.handle.clone()))
                .collect()
        };

        if snapshot.is_empty() {
            return 0;
        }
        tracing::info!(count = snapshot.len(), "Draining pending orders");

        let mut drained = 0;
        for (id, handle) in snapshot {
            match handle.await_result().await {
                Ok(result) => {
                    // A concurrent lookup may already have promoted it.
                    self.state.lock().promote(&id, result);
                    drained += 1;
                }
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "Order could not be drained");
                }
            }
        }

        tracing::info!(drained, "Drain complete");
        drained
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn ready_count(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Total number of orders ever registered.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.pending.len() + state.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
