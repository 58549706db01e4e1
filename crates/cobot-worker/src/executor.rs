//! Job executor.
//!
//! Uploads are queued on a bounded channel and run by a dispatcher task,
//! at most `max_concurrent_jobs` at a time. A full queue refuses new work
//! instead of spawning unbounded tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use cobot_models::{JobId, JobReport, MediaSet, PipelineState};

use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::Pipeline;
use crate::registry::JobRegistry;

struct QueuedJob {
    set: MediaSet,
    status: watch::Sender<JobReport>,
}

/// Observable handle to a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job_id: JobId,
    status: watch::Receiver<JobReport>,
}

impl JobHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Current state of the job.
    pub fn state(&self) -> PipelineState {
        self.status.borrow().state
    }

    /// Snapshot of the latest report.
    pub fn report(&self) -> JobReport {
        self.status.borrow().clone()
    }

    /// Receiver that observes every published report.
    pub fn watch(&self) -> watch::Receiver<JobReport> {
        self.status.clone()
    }

    /// Wait for the job to reach a terminal state.
    ///
    /// If the executor shuts down before the job ran, the last published
    /// report (still `Staged`) is returned.
    pub async fn wait(mut self) -> JobReport {
        if let Ok(report) = self.status.wait_for(|r| r.is_terminal()).await {
            return report.clone();
        }
        self.status.borrow().clone()
    }
}

/// Bounded background executor for pipeline jobs.
pub struct PipelineExecutor {
    sender: mpsc::Sender<QueuedJob>,
    registry: JobRegistry,
    shutdown: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    capacity: usize,
}

impl PipelineExecutor {
    /// Start the dispatcher. Must be called within a Tokio runtime.
    pub fn start(pipeline: Pipeline, config: &PipelineConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let max_concurrent_jobs = config.max_concurrent_jobs.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);

        info!(
            "Starting pipeline executor with {} max concurrent jobs, queue capacity {}",
            max_concurrent_jobs, capacity
        );

        let dispatcher = tokio::spawn(dispatch(
            pipeline,
            receiver,
            Arc::new(Semaphore::new(max_concurrent_jobs)),
            shutdown_rx,
            config.shutdown_timeout,
        ));

        Self {
            sender,
            registry: JobRegistry::new(config.job_history),
            shutdown,
            dispatcher: Mutex::new(Some(dispatcher)),
            capacity,
        }
    }

    /// Queue a staged upload for processing.
    ///
    /// Never blocks: a full queue yields [`WorkerError::QueueFull`].
    pub fn submit(&self, set: MediaSet) -> WorkerResult<JobHandle> {
        if *self.shutdown.borrow() {
            crate::metrics::record_job_rejected("shutting_down");
            return Err(WorkerError::ShuttingDown);
        }

        let job_id = JobId::new();
        let stem = set.dest_name.clone();
        let (status, receiver) = watch::channel(JobReport::new(job_id.clone(), &stem));

        match self.sender.try_send(QueuedJob { set, status }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                crate::metrics::record_job_rejected("queue_full");
                warn!(stem = %stem, "Job queue full, refusing upload");
                return Err(WorkerError::QueueFull {
                    capacity: self.capacity,
                });
            }
            Err(TrySendError::Closed(_)) => {
                crate::metrics::record_job_rejected("shutting_down");
                return Err(WorkerError::ShuttingDown);
            }
        }

        self.registry.insert(job_id.clone(), receiver.clone());
        crate::metrics::record_job_submitted();
        info!(job_id = %job_id, stem = %stem, "Job queued");

        Ok(JobHandle {
            job_id,
            status: receiver,
        })
    }

    /// Latest report of a recent job.
    pub fn report(&self, job_id: &JobId) -> Option<JobReport> {
        self.registry.get(job_id)
    }

    /// Jobs waiting for a free slot.
    pub fn queued(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop accepting jobs and wait for in-flight jobs to finish.
    ///
    /// Jobs still queued are not started; their staged files stay in the
    /// upload directory.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let dispatcher = self.dispatcher.lock().await.take();
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.await {
                warn!("Pipeline dispatcher ended abnormally: {}", e);
            }
        }
    }
}

async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    // A dropped sender counts as shutdown
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

async fn dispatch(
    pipeline: Pipeline,
    mut receiver: mpsc::Receiver<QueuedJob>,
    semaphore: Arc<Semaphore>,
    mut shutdown_rx: watch::Receiver<bool>,
    shutdown_timeout: Duration,
) {
    let mut running = JoinSet::new();

    loop {
        while let Some(result) = running.try_join_next() {
            if let Err(e) = result {
                warn!("Pipeline job task ended abnormally: {}", e);
            }
        }

        let permit = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let job = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        debug!("Dispatching job {}", job.status.borrow().job_id);
        running.spawn(run_job(pipeline.clone(), job, permit));
    }

    info!("Shutdown signal received, stopping pipeline executor");
    receiver.close();
    while let Ok(job) = receiver.try_recv() {
        warn!(
            "Job {} not started; staged file {} retained",
            job.status.borrow().job_id,
            job.set.source_path().display()
        );
    }

    info!("Waiting for {} in-flight jobs to complete...", running.len());
    let drained = tokio::time::timeout(shutdown_timeout, async {
        while running.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(
            "Shutdown timeout elapsed with {} jobs still running; aborting them",
            running.len()
        );
        running.abort_all();
    }

    info!("Pipeline executor stopped");
}

async fn run_job(pipeline: Pipeline, job: QueuedJob, _permit: OwnedSemaphorePermit) {
    let QueuedJob { set, status } = job;
    crate::metrics::record_job_started();

    let initial = status.borrow().clone();
    let report = pipeline
        .run(&set, initial, |report| {
            status.send_replace(report.clone());
        })
        .await;

    crate::metrics::record_job_finished(&report);
    status.send_replace(report);
}
