//! Registry of recent jobs for status queries.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use cobot_models::{JobId, JobReport};
use tokio::sync::watch;

struct RegistryInner {
    jobs: HashMap<JobId, watch::Receiver<JobReport>>,
    /// Insertion order, oldest first
    order: VecDeque<JobId>,
    capacity: usize,
}

/// Latest report of each recent job.
///
/// Once `capacity` is exceeded the oldest finished jobs are forgotten;
/// unfinished jobs are never evicted.
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl JobRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                jobs: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // A panic while holding the lock cannot leave the map inconsistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Track a job's status channel.
    pub fn insert(&self, job_id: JobId, status: watch::Receiver<JobReport>) {
        let mut inner = self.lock();
        if inner.jobs.insert(job_id.clone(), status).is_none() {
            inner.order.push_back(job_id);
        }
        Self::evict(&mut inner);
    }

    fn evict(inner: &mut RegistryInner) {
        while inner.jobs.len() > inner.capacity {
            let position = inner.order.iter().position(|id| {
                inner
                    .jobs
                    .get(id)
                    .map(|rx| rx.borrow().is_terminal())
                    .unwrap_or(true)
            });
            match position {
                Some(index) => {
                    if let Some(id) = inner.order.remove(index) {
                        inner.jobs.remove(&id);
                    }
                }
                None => break,
            }
        }
    }

    /// Latest report of a job.
    pub fn get(&self, job_id: &JobId) -> Option<JobReport> {
        self.lock().jobs.get(job_id).map(|rx| rx.borrow().clone())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobot_models::PipelineState;

    fn job(state: PipelineState) -> (JobId, watch::Sender<JobReport>, watch::Receiver<JobReport>) {
        let id = JobId::new();
        let mut report = JobReport::new(id.clone(), "COBOT-x");
        report.set_state(state);
        let (tx, rx) = watch::channel(report);
        (id, tx, rx)
    }

    #[test]
    fn test_get_follows_updates() {
        let registry = JobRegistry::new(8);
        let (id, tx, rx) = job(PipelineState::Staged);
        registry.insert(id.clone(), rx);

        tx.send_modify(|r| r.set_state(PipelineState::Transcoded));

        assert_eq!(registry.get(&id).unwrap().state, PipelineState::Transcoded);
        assert!(registry.get(&JobId::new()).is_none());
    }

    #[test]
    fn test_evicts_oldest_finished_first() {
        let registry = JobRegistry::new(2);
        let (running, _tx1, rx1) = job(PipelineState::Inspected);
        let (done, _tx2, rx2) = job(PipelineState::CleanedUp);
        let (newest, _tx3, rx3) = job(PipelineState::Staged);

        registry.insert(running.clone(), rx1);
        registry.insert(done.clone(), rx2);
        registry.insert(newest.clone(), rx3);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&running).is_some());
        assert!(registry.get(&done).is_none());
        assert!(registry.get(&newest).is_some());
    }

    #[test]
    fn test_never_evicts_unfinished() {
        let registry = JobRegistry::new(1);
        let (a, _tx1, rx1) = job(PipelineState::Staged);
        let (b, _tx2, rx2) = job(PipelineState::Staged);
        registry.insert(a, rx1);
        registry.insert(b, rx2);
        assert_eq!(registry.len(), 2);
    }
}
