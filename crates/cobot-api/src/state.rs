//! Application state.

use std::sync::Arc;

use cobot_media::ensure_dir;
use cobot_worker::{Pipeline, PipelineConfig, PipelineExecutor, ToolStages, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineConfig>,
    pub executor: Arc<PipelineExecutor>,
}

impl AppState {
    /// Create the staging and destination roots and start the pipeline executor.
    pub async fn new(config: ApiConfig, pipeline: PipelineConfig) -> WorkerResult<Self> {
        ensure_dir(&pipeline.upload_dir).await?;
        ensure_dir(&pipeline.record_dir).await?;

        let stages = ToolStages::from_config(&pipeline).await?;
        let executor = PipelineExecutor::start(Pipeline::new(Arc::new(stages)), &pipeline);

        Ok(Self::with_executor(config, pipeline, executor))
    }

    /// Build state around an already started executor.
    pub fn with_executor(
        config: ApiConfig,
        pipeline: PipelineConfig,
        executor: PipelineExecutor,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            executor: Arc::new(executor),
        }
    }
}
