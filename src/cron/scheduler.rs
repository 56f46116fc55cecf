//! Cron scheduler that releases epochs on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use super::jobs::epoch_release::EpochPipeline;
use crate::store::SnapshotStore;

pub struct EpochScheduler<S> {
    pipeline: Arc<EpochPipeline<S>>,
    interval_secs: u64,
}

impl<S: SnapshotStore + 'static> EpochScheduler<S> {
    pub fn new(pipeline: Arc<EpochPipeline<S>>, interval_secs: u64) -> Self {
        Self {
            pipeline,
            interval_secs,
        }
    }

    /// Starts the scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        self.register_epoch_release_job(&scheduler).await?;

        scheduler.start().await?;
        info!("Epoch scheduler started");

        cancellation_token.cancelled().await;
        info!("Epoch scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_epoch_release_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let pipeline = self.pipeline.clone();
        let interval = self.interval_secs.max(1);

        let job = Job::new_repeated_async(Duration::from_secs(interval), move |_uuid, _lock| {
            let pipeline = pipeline.clone();
            Box::pin(async move {
                if let Err(e) = pipeline.run().await {
                    error!("Failed to release epoch: {:#}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        info!("Registered epoch_release job (every {}s)", interval);
        Ok(())
    }
}
