use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use snapshotter::{
    EpochCursor, EpochPipeline, EpochScheduler, FsSnapshotStore, RpcChainData, Settings,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    let level = LevelFilter::from_str(&settings.logging.level).unwrap_or(LevelFilter::Info);
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logger")?;

    let chain = Arc::new(
        RpcChainData::new(&settings.rpc, &settings.sources)
            .context("Failed to initialize RPC chain data layer")?,
    );

    let store = Arc::new(
        FsSnapshotStore::new(&settings.storage.dir, settings.storage.read_cache_capacity)
            .await
            .context("Failed to open snapshot store")?,
    );

    let cursor_path = EpochCursor::path_in(&settings.storage.dir);
    let cursor = match EpochCursor::load(&cursor_path).await? {
        Some(cursor) => {
            info!(
                "Resuming after epoch {} (block {:?})",
                cursor.last_epoch_id, cursor.last_end_block
            );
            cursor
        },
        None => {
            warn!("No epoch cursor at {}, starting fresh", cursor_path.display());
            EpochCursor::default()
        },
    };

    let pipeline = Arc::new(
        EpochPipeline::new(settings.clone(), chain, store, cursor).with_cursor_path(cursor_path),
    );

    run_snapshotter(settings, pipeline).await
}

async fn run_snapshotter(
    settings: Arc<Settings>,
    pipeline: Arc<EpochPipeline<FsSnapshotStore>>,
) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    let scheduler = EpochScheduler::new(pipeline, settings.epochs.interval_secs);

    let scheduler_token = cancellation_token.child_token();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run(scheduler_token).await {
            error!("Epoch scheduler failed: {:#}", e);
        }
    });

    info!(
        "Snapshotter running on namespace {} ({} pairs, {} assets). Press Ctrl+C to stop.",
        settings.epochs.namespace,
        settings.sources.pairs.len(),
        settings.sources.assets.len()
    );

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    // An epoch cut short here is recomputed from the persisted cursor on restart
    cancellation_token.cancel();

    info!("Waiting for epoch scheduler to stop...");
    let _ = scheduler_handle.await;

    info!("Snapshotter stopped");
    Ok(())
}
