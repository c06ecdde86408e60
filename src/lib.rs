pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod domain;
pub mod icons;
pub mod library;
pub mod parser;
pub mod services;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use domain::{EventBus, event_channel};
use icons::{ArtworkEmbedder, FolderIconApplier, IconApplier};
use services::{PosterService, ProcessingCoordinator, ProcessingQueue};
use watch::{ChangeDebouncer, DirectoryWatcher};

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    init_logging(&config);

    match cli.command {
        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, leaving it alone.");
            }
            Ok(())
        }
        Some(Commands::Scan { force }) => {
            config.validate()?;
            let (coordinator, _bus) = build_coordinator(&config).await?;
            let summary = coordinator.scan_library(force).await;
            println!(
                "Scan complete: {} processed, {} skipped, {} failed",
                summary.processed, summary.skipped, summary.failed
            );
            Ok(())
        }
        Some(Commands::Process { path, force }) => {
            let (coordinator, _bus) = build_coordinator(&config).await?;
            let outcome = coordinator.process_folder(&path, force).await;
            println!("{}: {outcome:?}", path.display());
            Ok(())
        }
        Some(Commands::Watch) | None => run_daemon(config).await,
    }
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_coordinator(
    config: &Config,
) -> anyhow::Result<(Arc<ProcessingCoordinator>, EventBus)> {
    let poster = PosterService::from_config(config).await?;

    let folder_icon: Arc<dyn IconApplier> = Arc::new(FolderIconApplier::new());
    let embedder: Option<Arc<dyn IconApplier>> = config
        .poster
        .embed_artwork
        .then(|| Arc::new(ArtworkEmbedder::new()) as Arc<dyn IconApplier>);

    let event_bus = event_channel(config.general.event_bus_buffer_size);
    let coordinator = Arc::new(ProcessingCoordinator::new(
        config,
        poster,
        folder_icon,
        embedder,
        event_bus.clone(),
    ));
    Ok((coordinator, event_bus))
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Iconarr v{} starting in watch mode...",
        env!("CARGO_PKG_VERSION")
    );
    config.validate()?;

    let (coordinator, _event_bus) = build_coordinator(&config).await?;
    let queue = Arc::new(ProcessingQueue::new());

    let mut worker_handles = Vec::new();
    for worker in 0..config.watcher.max_workers {
        let queue = Arc::clone(&queue);
        let coordinator = Arc::clone(&coordinator);
        worker_handles.push(tokio::spawn(async move {
            while let Some(path) = queue.pop().await {
                info!(worker, path = %path.display(), "Worker picked up folder");
                coordinator.process_folder(&path, false).await;
            }
        }));
    }

    let (debouncer, mut debounced_rx) = ChangeDebouncer::new(
        Duration::from_secs(config.watcher.debounce_secs),
        config.watcher.max_events_per_second,
    );

    let root = config.library_root();
    let (_watcher, mut watch_rx) = DirectoryWatcher::start(&root)?;

    let event_handle = tokio::spawn(async move {
        while let Some(event) = watch_rx.recv().await {
            debouncer.handle_event(&event).await;
        }
    });

    let feed_handle = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            while let Some((path, priority)) = debounced_rx.recv().await {
                queue.push(path, priority).await;
            }
        })
    };

    let scan_handle = if config.library.scan_on_start {
        let coordinator = Arc::clone(&coordinator);
        Some(tokio::spawn(async move {
            coordinator.scan_library(false).await;
        }))
    } else {
        None
    };

    info!("Watching {}. Press Ctrl+C to stop.", root.display());

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }

    event_handle.abort();
    feed_handle.abort();
    if let Some(handle) = scan_handle {
        handle.abort();
    }

    queue.close().await;
    for handle in worker_handles {
        let _ = handle.await;
    }

    info!("Stopped");
    Ok(())
}
