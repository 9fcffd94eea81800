//! Start/stop adapter around [`Pipeline::run`], for hosts that manage the uploader
//! as a long-running service.

use crate::pipeline::{Pipeline, PipelineError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub struct UploaderService {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<Result<(), PipelineError>>,
}

impl UploaderService {
    /// Spawns the pipeline on the current tokio runtime.
    pub fn start(pipeline: Pipeline) -> Self {
        let (shutdown, rx) = watch::channel(false);
        info!("uploader service starting");
        let handle = tokio::spawn(pipeline.run(rx));
        Self { shutdown, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Resolves when the pipeline ends on its own, which only happens on a fatal error.
    pub async fn wait(&mut self) -> Result<(), PipelineError> {
        (&mut self.handle).await?
    }

    /// Signals the pipeline to stop and waits for it to wind down.
    pub async fn stop(self) -> Result<(), PipelineError> {
        info!("uploader service stopping");
        let _ = self.shutdown.send(true);
        let result = self.handle.await?;
        info!("uploader service stopped");
        result
    }
}
