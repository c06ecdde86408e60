use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::constants::{LIBRARY_ROOT_SENTINELS, POSTER_CANDIDATES};
use crate::domain::{EventBus, ProcessingEvent};
use crate::icons::IconApplier;
use crate::icons::folder::DESKTOP_INI;
use crate::library::{MediaKind, classify, is_anime, media_files};
use crate::parser::infer_title;
use crate::parser::title::is_season_folder;
use crate::services::poster::PosterService;

/// Terminal state of one folder processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Applied(MediaKind),
    SkippedRoot,
    SkippedActive,
    SkippedRecent,
    SkippedFresh,
    SkippedNoMedia,
    SkippedNoTitle,
    NoPoster,
    Failed(String),
}

impl FolderOutcome {
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::SkippedRoot
                | Self::SkippedActive
                | Self::SkippedRecent
                | Self::SkippedFresh
                | Self::SkippedNoMedia
                | Self::SkippedNoTitle
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives one folder through the whole pipeline: resolve the media unit,
/// classify, infer the title, fetch a poster, apply it. Guards against the
/// watcher feeding the same unit twice, both concurrently and in quick
/// succession.
pub struct ProcessingCoordinator {
    library_root: PathBuf,
    reprocess_window: Duration,
    freshness_days: u64,
    force_update: bool,
    poster_filename: String,
    poster: PosterService,
    folder_icon: Arc<dyn IconApplier>,
    embedder: Option<Arc<dyn IconApplier>>,
    event_bus: EventBus,
    active: Mutex<HashSet<PathBuf>>,
    recently_processed: Mutex<HashMap<PathBuf, Instant>>,
}

impl ProcessingCoordinator {
    pub fn new(
        config: &Config,
        poster: PosterService,
        folder_icon: Arc<dyn IconApplier>,
        embedder: Option<Arc<dyn IconApplier>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            library_root: config.library_root(),
            reprocess_window: Duration::from_secs(config.library.reprocess_window_secs),
            freshness_days: config.library.freshness_days,
            force_update: config.library.force_update,
            poster_filename: config.poster.filename.clone(),
            poster,
            folder_icon,
            embedder,
            event_bus,
            active: Mutex::new(HashSet::new()),
            recently_processed: Mutex::new(HashMap::new()),
        }
    }

    /// Process a single folder. Never returns an error; every failure mode
    /// is folded into the outcome so one bad folder cannot stop a scan.
    pub async fn process_folder(&self, folder: &Path, force: bool) -> FolderOutcome {
        if !folder.is_dir() {
            debug!(path = %folder.display(), "Not a directory, skipping");
            return FolderOutcome::SkippedNoMedia;
        }

        if self.is_library_root(folder) {
            debug!(path = %folder.display(), "Library root itself, skipping");
            return FolderOutcome::SkippedRoot;
        }

        // A season folder is processed as its parent show folder.
        let Some(target) = self.resolve_target(folder) else {
            warn!(path = %folder.display(), "Season folder with no usable parent, skipping");
            return FolderOutcome::SkippedNoTitle;
        };

        {
            let mut active = self.active.lock().await;
            if !active.insert(target.clone()) {
                debug!(path = %target.display(), "Already being processed");
                return FolderOutcome::SkippedActive;
            }
        }

        let outcome = self
            .process_inner(&target, folder, force || self.force_update)
            .await;
        self.active.lock().await.remove(&target);

        self.emit_outcome(&target, &outcome);
        outcome
    }

    async fn process_inner(&self, target: &Path, origin: &Path, force: bool) -> FolderOutcome {
        if !force {
            let recent = self.recently_processed.lock().await;
            if let Some(at) = recent.get(target)
                && at.elapsed() < self.reprocess_window
            {
                debug!(path = %target.display(), "Processed moments ago, skipping");
                return FolderOutcome::SkippedRecent;
            }
        }

        let kind = classify(target);
        if kind == MediaKind::Unknown {
            debug!(path = %target.display(), "No recognizable media content");
            return FolderOutcome::SkippedNoMedia;
        }

        if !force && self.has_fresh_artwork(target, kind) {
            debug!(path = %target.display(), "Existing artwork is still fresh");
            return FolderOutcome::SkippedFresh;
        }

        let Some(title) = infer_title(target) else {
            warn!(path = %target.display(), "Could not infer a title");
            return FolderOutcome::SkippedNoTitle;
        };

        // The raw event path can carry release tags the resolved folder
        // name lost, so anime routing looks at the origin.
        let anime = is_anime(&title, origin);
        info!(path = %target.display(), title = %title, kind = %kind, anime, "Processing folder");

        let poster_bytes = match self.poster.fetch(&title, kind, anime).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.mark_processed(target).await;
                return FolderOutcome::NoPoster;
            }
            Err(e) => {
                error!(path = %target.display(), error = %e, "Poster fetch failed");
                return FolderOutcome::Failed(e.to_string());
            }
        };

        let local_poster = target.join(&self.poster_filename);
        if let Err(e) = tokio::fs::write(&local_poster, &poster_bytes).await {
            error!(path = %local_poster.display(), error = %e, "Failed to write poster");
            return FolderOutcome::Failed(e.to_string());
        }

        // Series get a folder icon; movies get the poster embedded into the
        // files themselves, never folder-icon artifacts.
        let result = match kind {
            MediaKind::Movie => match &self.embedder {
                Some(embedder) => embedder.apply(target, &local_poster).await,
                None => {
                    debug!(path = %target.display(), "Artwork embedding disabled, keeping poster file only");
                    Ok(())
                }
            },
            _ => self.folder_icon.apply(target, &local_poster).await,
        };

        self.mark_processed(target).await;

        match result {
            Ok(()) => FolderOutcome::Applied(kind),
            Err(e) => {
                warn!(path = %target.display(), error = %e, "Applier failed");
                FolderOutcome::Failed(e.to_string())
            }
        }
    }

    /// Walk the whole library tree and process every directory holding media
    /// files directly. Season folders resolve to their show and the recency
    /// guard absorbs the duplicates, so nested layouts like
    /// `root/Genre/Show/Season 1` are reached.
    pub async fn scan_library(&self, force: bool) -> ScanSummary {
        let root = self.library_root.clone();
        info!(root = %root.display(), "Library scan started");
        let _ = self.event_bus.send(ProcessingEvent::ScanStarted { root: root.clone() });

        let mut summary = ScanSummary::default();
        let folders: Vec<PathBuf> = WalkDir::new(&root)
            .min_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .filter(|dir| !media_files(dir).is_empty())
            .collect();

        for folder in folders {
            match self.process_folder(&folder, force).await {
                FolderOutcome::Applied(_) => summary.processed += 1,
                FolderOutcome::Failed(_) => summary.failed += 1,
                _ => summary.skipped += 1,
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Library scan finished"
        );
        let _ = self.event_bus.send(ProcessingEvent::ScanFinished {
            processed: summary.processed,
            skipped: summary.skipped,
            failed: summary.failed,
        });
        summary
    }

    fn resolve_target(&self, folder: &Path) -> Option<PathBuf> {
        let name = folder.file_name().and_then(|n| n.to_str())?;
        if !is_season_folder(name) {
            return Some(folder.to_path_buf());
        }

        let parent = folder.parent()?;
        if self.is_library_root(parent) {
            return None;
        }
        Some(parent.to_path_buf())
    }

    /// Processed-marker check: a recognized poster file younger than the
    /// freshness window, whoever wrote it. Series additionally need their
    /// icon descriptor in place; movies never carry one.
    fn has_fresh_artwork(&self, folder: &Path, kind: MediaKind) -> bool {
        if kind == MediaKind::Series && !folder.join(DESKTOP_INI).exists() {
            return false;
        }

        let max_age = Duration::from_secs(self.freshness_days.saturating_mul(86_400));
        POSTER_CANDIDATES.iter().any(|name| {
            folder
                .join(name)
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age < max_age)
        })
    }

    fn is_library_root(&self, folder: &Path) -> bool {
        if folder == self.library_root {
            return true;
        }
        folder
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| {
                LIBRARY_ROOT_SENTINELS
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(name))
            })
    }

    async fn mark_processed(&self, folder: &Path) {
        let mut recent = self.recently_processed.lock().await;
        recent.insert(folder.to_path_buf(), Instant::now());
        // The map only needs entries young enough to matter.
        let window = self.reprocess_window;
        recent.retain(|_, at| at.elapsed() < window);
    }

    fn emit_outcome(&self, folder: &Path, outcome: &FolderOutcome) {
        let event = match outcome {
            FolderOutcome::Applied(kind) => ProcessingEvent::FolderProcessed {
                path: folder.to_path_buf(),
                kind: kind.as_str().to_string(),
                success: true,
            },
            FolderOutcome::Failed(message) => ProcessingEvent::Error {
                message: format!("{}: {}", folder.display(), message),
            },
            FolderOutcome::NoPoster => ProcessingEvent::FolderSkipped {
                path: folder.to_path_buf(),
                reason: "no poster found".to_string(),
            },
            outcome if outcome.is_skip() => ProcessingEvent::FolderSkipped {
                path: folder.to_path_buf(),
                reason: format!("{outcome:?}"),
            },
            _ => return,
        };
        let _ = self.event_bus.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event_channel;
    use crate::icons::FolderIconApplier;
    use std::fs;

    fn test_config(root: &Path, cache: &Path) -> Config {
        let mut config = Config::default();
        config.library.root_path = root.to_string_lossy().into_owned();
        config.cache.dir = cache.to_string_lossy().into_owned();
        config.cache.mock_mode = true;
        config
    }

    async fn coordinator(config: &Config) -> ProcessingCoordinator {
        let poster = PosterService::from_config(config).await.unwrap();
        ProcessingCoordinator::new(
            config,
            poster,
            Arc::new(FolderIconApplier::new()),
            None,
            event_channel(16),
        )
    }

    #[tokio::test]
    async fn test_series_folder_gets_poster_and_icon() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let show = root.join("BreakingBad");
        fs::create_dir_all(show.join("Season 1")).unwrap();
        fs::write(show.join("Season 1").join("e01.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        let outcome = coord.process_folder(&show, false).await;
        assert_eq!(outcome, FolderOutcome::Applied(MediaKind::Series));
        assert!(show.join("poster.jpg").exists());
        assert!(show.join("folder.ico").exists());
        assert!(show.join("desktop.ini").exists());
    }

    #[tokio::test]
    async fn test_season_folder_resolves_to_show() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let show = root.join("BreakingBad");
        let season = show.join("Season 1");
        fs::create_dir_all(&season).unwrap();
        fs::write(season.join("e01.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        let outcome = coord.process_folder(&season, false).await;
        assert_eq!(outcome, FolderOutcome::Applied(MediaKind::Series));
        // Artifacts land in the show folder, not the season folder.
        assert!(show.join("poster.jpg").exists());
        assert!(!season.join("poster.jpg").exists());

        // The redirected run marks the show as processed, absorbing a
        // near-simultaneous fire for the show itself.
        assert_eq!(
            coord.process_folder(&show, false).await,
            FolderOutcome::SkippedRecent
        );
    }

    #[tokio::test]
    async fn test_season_folder_under_root_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let season = root.join("Season 3");
        fs::create_dir_all(&season).unwrap();
        fs::write(season.join("e01.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        assert_eq!(
            coord.process_folder(&season, false).await,
            FolderOutcome::SkippedNoTitle
        );
    }

    #[tokio::test]
    async fn test_movie_keeps_folder_clean_of_icon_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let movie = root.join("Interstellar");
        fs::create_dir_all(&movie).unwrap();
        fs::write(movie.join("Interstellar.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        let outcome = coord.process_folder(&movie, false).await;
        assert_eq!(outcome, FolderOutcome::Applied(MediaKind::Movie));
        assert!(movie.join("poster.jpg").exists());
        // Movies take the file-artwork path, never the folder-icon one.
        assert!(!movie.join("folder.ico").exists());
        assert!(!movie.join("desktop.ini").exists());
    }

    #[tokio::test]
    async fn test_reprocess_window_skips_second_attempt() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let movie = root.join("Interstellar");
        fs::create_dir_all(&movie).unwrap();
        fs::write(movie.join("Interstellar.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        assert_eq!(
            coord.process_folder(&movie, false).await,
            FolderOutcome::Applied(MediaKind::Movie)
        );
        assert_eq!(
            coord.process_folder(&movie, false).await,
            FolderOutcome::SkippedRecent
        );
        // Explicit force bypasses the window.
        assert_eq!(
            coord.process_folder(&movie, true).await,
            FolderOutcome::Applied(MediaKind::Movie)
        );
    }

    #[tokio::test]
    async fn test_fresh_artwork_skips_new_coordinator() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let movie = root.join("Heat");
        fs::create_dir_all(&movie).unwrap();
        fs::write(movie.join("Heat.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;
        assert_eq!(
            coord.process_folder(&movie, false).await,
            FolderOutcome::Applied(MediaKind::Movie)
        );

        // A restarted process has no recency map but still honors the
        // artwork on disk.
        let coord = coordinator(&config).await;
        assert_eq!(
            coord.process_folder(&movie, false).await,
            FolderOutcome::SkippedFresh
        );
    }

    #[tokio::test]
    async fn test_library_root_is_never_processed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        fs::create_dir_all(&root).unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        assert_eq!(coord.process_folder(&root, false).await, FolderOutcome::SkippedRoot);

        let sentinel = tmp.path().join("test_media");
        fs::create_dir_all(&sentinel).unwrap();
        assert_eq!(
            coord.process_folder(&sentinel, false).await,
            FolderOutcome::SkippedRoot
        );
    }

    #[tokio::test]
    async fn test_empty_folder_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let empty = root.join("NotMediaYet");
        fs::create_dir_all(&empty).unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        assert_eq!(
            coord.process_folder(&empty, false).await,
            FolderOutcome::SkippedNoMedia
        );
        assert!(!empty.join("poster.jpg").exists());
    }

    #[tokio::test]
    async fn test_scan_library_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let show = root.join("TheOffice");
        fs::create_dir_all(&show).unwrap();
        fs::write(show.join("s01e01.mkv"), b"x").unwrap();
        fs::write(show.join("s01e02.mkv"), b"x").unwrap();
        let movie = root.join("Films").join("Heat");
        fs::create_dir_all(&movie).unwrap();
        fs::write(movie.join("Heat.mkv"), b"x").unwrap();
        fs::create_dir_all(root.join("Empty")).unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        let summary = coord.scan_library(false).await;
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);
        assert!(movie.join("poster.jpg").exists());
        // The genre folder itself holds no media and stays untouched.
        assert!(!root.join("Films").join("poster.jpg").exists());
    }

    #[tokio::test]
    async fn test_scan_reaches_nested_show() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("media");
        let show = root.join("Documentaries").join("PlanetEarth");
        let season = show.join("Season 1");
        fs::create_dir_all(&season).unwrap();
        fs::write(season.join("e01.mkv"), b"x").unwrap();

        let config = test_config(&root, &tmp.path().join("cache"));
        let coord = coordinator(&config).await;

        let summary = coord.scan_library(false).await;
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 0);
        assert!(show.join("poster.jpg").exists());
        assert!(!season.join("poster.jpg").exists());
        assert!(!root.join("Documentaries").join("poster.jpg").exists());
    }
}
