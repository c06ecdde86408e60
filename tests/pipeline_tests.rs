use std::fs;
use std::path::Path;
use std::sync::Arc;

use iconarr::config::Config;
use iconarr::domain::{ProcessingEvent, event_channel};
use iconarr::icons::{FolderIconApplier, IconApplier};
use iconarr::library::MediaKind;
use iconarr::services::{
    FolderOutcome, PRIORITY_CREATED, PosterService, ProcessingCoordinator, ProcessingQueue,
};
use tempfile::TempDir;

fn library_config(tmp: &TempDir) -> Config {
    let root = tmp.path().join("media");
    fs::create_dir_all(&root).unwrap();

    let mut config = Config::default();
    config.library.root_path = root.to_string_lossy().into_owned();
    config.cache.dir = tmp.path().join("cache").to_string_lossy().into_owned();
    config.cache.mock_mode = true;
    config
}

async fn spawn_coordinator(config: &Config) -> Arc<ProcessingCoordinator> {
    spawn_coordinator_with_bus(config, event_channel(16)).await
}

async fn spawn_coordinator_with_bus(
    config: &Config,
    bus: iconarr::domain::EventBus,
) -> Arc<ProcessingCoordinator> {
    let poster = PosterService::from_config(config)
        .await
        .expect("Failed to build poster service");
    let folder_icon: Arc<dyn IconApplier> = Arc::new(FolderIconApplier::new());
    Arc::new(ProcessingCoordinator::new(config, poster, folder_icon, None, bus))
}

fn make_series(root: &Path, name: &str) -> std::path::PathBuf {
    let show = root.join(name);
    let season = show.join("Season 1");
    fs::create_dir_all(&season).unwrap();
    fs::write(season.join("s01e01.mkv"), b"episode one").unwrap();
    fs::write(season.join("s01e02.mkv"), b"episode two").unwrap();
    show
}

fn make_movie(root: &Path, name: &str, file: &str) -> std::path::PathBuf {
    let movie = root.join(name);
    fs::create_dir_all(&movie).unwrap();
    fs::write(movie.join(file), b"feature").unwrap();
    movie
}

#[tokio::test]
async fn test_series_folder_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let show = make_series(&config.library_root(), "BreakingBad");

    let coordinator = spawn_coordinator(&config).await;
    let outcome = coordinator.process_folder(&show, false).await;

    assert_eq!(outcome, FolderOutcome::Applied(MediaKind::Series));
    assert!(show.join("poster.jpg").exists());
    assert!(show.join("folder.ico").exists());
    assert!(show.join("desktop.ini").exists());
    // Season subfolders are not decorated, only the show folder.
    assert!(!show.join("Season 1").join("poster.jpg").exists());
}

#[tokio::test]
async fn test_movie_folder_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let movie = make_movie(
        &config.library_root(),
        "The.Matrix.1999.1080p.BluRay.x264",
        "The.Matrix.1999.mkv",
    );

    let coordinator = spawn_coordinator(&config).await;
    let outcome = coordinator.process_folder(&movie, false).await;

    assert_eq!(outcome, FolderOutcome::Applied(MediaKind::Movie));
    assert!(movie.join("poster.jpg").exists());
    // Movie folders never get the series folder-icon treatment.
    assert!(!movie.join("folder.ico").exists());
    assert!(!movie.join("desktop.ini").exists());
}

#[tokio::test]
async fn test_poster_is_valid_normalized_jpeg() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let movie = make_movie(&config.library_root(), "Interstellar", "Interstellar.mkv");

    let coordinator = spawn_coordinator(&config).await;
    coordinator.process_folder(&movie, false).await;

    let bytes = fs::read(movie.join("poster.jpg")).unwrap();
    let img = image::load_from_memory(&bytes).expect("poster must decode");
    assert!(img.width().max(img.height()) <= config.poster.max_dimension);
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[tokio::test]
async fn test_full_scan_handles_mixed_library() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let root = config.library_root();

    make_series(&root, "TheOffice");
    make_movie(&root, "Inception", "Inception.mkv");
    fs::create_dir_all(root.join("EmptyFolder")).unwrap();
    fs::write(root.join("stray_notes.txt"), b"not media").unwrap();

    let bus = event_channel(64);
    let mut events = bus.subscribe();
    let coordinator = spawn_coordinator_with_bus(&config, bus).await;
    let summary = coordinator.scan_library(false).await;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);

    let mut saw_scan_started = false;
    let mut folders_processed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            ProcessingEvent::ScanStarted { .. } => saw_scan_started = true,
            ProcessingEvent::FolderProcessed { success, .. } => {
                assert!(success);
                folders_processed += 1;
            }
            _ => {}
        }
    }
    assert!(saw_scan_started);
    assert_eq!(folders_processed, 2);
}

#[tokio::test]
async fn test_repeated_trigger_is_absorbed() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let movie = make_movie(&config.library_root(), "Dune", "Dune.mkv");

    let coordinator = spawn_coordinator(&config).await;
    assert_eq!(
        coordinator.process_folder(&movie, false).await,
        FolderOutcome::Applied(MediaKind::Movie)
    );
    assert_eq!(
        coordinator.process_folder(&movie, false).await,
        FolderOutcome::SkippedRecent
    );
}

#[tokio::test]
async fn test_queue_feeds_workers_in_priority_order() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let root = config.library_root();
    let first = make_movie(&root, "FirstMovie", "FirstMovie.mkv");
    let second = make_movie(&root, "SecondMovie", "SecondMovie.mkv");

    let queue = Arc::new(ProcessingQueue::new());
    queue.push(second.clone(), 3).await;
    queue.push(first.clone(), PRIORITY_CREATED).await;
    // Duplicate push must not create a second unit of work.
    queue.push(first.clone(), 3).await;
    queue.close().await;

    let coordinator = spawn_coordinator(&config).await;
    let mut order = Vec::new();
    while let Some(path) = queue.pop().await {
        coordinator.process_folder(&path, false).await;
        order.push(path);
    }

    assert_eq!(order, vec![first.clone(), second.clone()]);
    assert!(first.join("poster.jpg").exists());
    assert!(second.join("poster.jpg").exists());
}

#[tokio::test]
async fn test_mock_posters_never_persisted_to_cache() {
    let tmp = TempDir::new().unwrap();
    let config = library_config(&tmp);
    let movie = make_movie(&config.library_root(), "Arrival", "Arrival.mkv");

    let coordinator = spawn_coordinator(&config).await;
    coordinator.process_folder(&movie, false).await;
    assert!(movie.join("poster.jpg").exists());

    // Placeholder posters stay out of the persistent cache so a later real
    // session starts with a clean slate.
    let cache_dir = config.cache_dir();
    assert!(!cache_dir.join("api_cache.json").exists());
    assert!(!cache_dir.join("poster_arrival_movie.jpg").exists());

    // A fresh coordinator still re-applies on demand.
    fs::remove_file(movie.join("poster.jpg")).unwrap();
    let coordinator = spawn_coordinator(&config).await;
    let outcome = coordinator.process_folder(&movie, true).await;
    assert_eq!(outcome, FolderOutcome::Applied(MediaKind::Movie));
    assert!(movie.join("poster.jpg").exists());
}
