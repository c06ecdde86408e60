use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use super::{ChangeKind, WatchEvent};
use crate::constants::{is_ignored_name, is_media_extension, limits};
use crate::library::classify::has_media_subdirs;
use crate::parser::title::is_season_folder;
use crate::services::queue::{PRIORITY_CREATED, PRIORITY_MODIFIED};

const RATE_WINDOW: Duration = Duration::from_secs(1);

struct Pending {
    priority: i32,
    generation: u64,
}

struct Inner {
    delay: Duration,
    max_events_per_second: usize,
    tx: mpsc::UnboundedSender<(PathBuf, i32)>,
    pending: Mutex<HashMap<PathBuf, Pending>>,
    recent: Mutex<VecDeque<Instant>>,
}

/// Trailing-edge debouncer between the raw watcher stream and the processing
/// queue. A burst of events for one folder collapses into a single emission
/// `delay` after the burst goes quiet, carrying the most urgent priority seen.
#[derive(Clone)]
pub struct ChangeDebouncer {
    inner: Arc<Inner>,
}

impl ChangeDebouncer {
    #[must_use]
    pub fn new(
        delay: Duration,
        max_events_per_second: usize,
    ) -> (Self, mpsc::UnboundedReceiver<(PathBuf, i32)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            inner: Arc::new(Inner {
                delay,
                max_events_per_second,
                tx,
                pending: Mutex::new(HashMap::new()),
                recent: Mutex::new(VecDeque::new()),
            }),
        };
        (debouncer, rx)
    }

    pub async fn handle_event(&self, event: &WatchEvent) {
        if self.rate_limited().await {
            warn!(path = %event.path.display(), "Event rate limit hit, dropping");
            return;
        }

        let Some(folder) = target_folder(&event.path) else {
            debug!(path = %event.path.display(), "Irrelevant change, ignoring");
            return;
        };

        let priority = match event.kind {
            ChangeKind::Created | ChangeKind::Moved => PRIORITY_CREATED,
            ChangeKind::Modified => PRIORITY_MODIFIED,
        };

        self.schedule(folder, priority).await;
    }

    async fn schedule(&self, folder: PathBuf, priority: i32) {
        let generation = {
            let mut pending = self.inner.pending.lock().await;
            let entry = pending.entry(folder.clone()).or_insert(Pending {
                priority,
                generation: 0,
            });
            entry.priority = entry.priority.min(priority);
            entry.generation += 1;
            entry.generation
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;

            let mut pending = inner.pending.lock().await;
            // A newer event for the same folder restarted the clock.
            let Some(entry) = pending.get(&folder) else {
                return;
            };
            if entry.generation != generation {
                return;
            }

            let priority = entry.priority;
            pending.remove(&folder);
            drop(pending);

            debug!(path = %folder.display(), priority, "Debounce window closed");
            let _ = inner.tx.send((folder, priority));
        });
    }

    /// Rolling one-second window over accepted events.
    async fn rate_limited(&self) -> bool {
        let mut recent = self.inner.recent.lock().await;
        let now = Instant::now();
        while let Some(front) = recent.front() {
            if now.duration_since(*front) > RATE_WINDOW {
                recent.pop_front();
            } else {
                break;
            }
        }
        if recent.len() >= self.inner.max_events_per_second {
            return true;
        }
        recent.push_back(now);
        false
    }
}

/// Map a changed path to the media folder it concerns, or `None` when the
/// change cannot matter: non-media files, scratch files, folders with nothing
/// media-shaped in them.
fn target_folder(path: &Path) -> Option<PathBuf> {
    // The path may have vanished between the OS event and now.
    if !path.exists() {
        return None;
    }

    let name = path.file_name()?.to_str()?;
    if is_ignored_name(name) {
        return None;
    }

    if path.is_dir() {
        return folder_looks_relevant(path).then(|| path.to_path_buf());
    }

    let extension = path.extension()?.to_str()?;
    if !is_media_extension(extension) {
        return None;
    }

    let parent = path.parent()?;
    parent.is_dir().then(|| parent.to_path_buf())
}

/// Cheap relevance probe, capped so a folder with thousands of entries never
/// stalls event handling.
fn folder_looks_relevant(dir: &Path) -> bool {
    if has_media_subdirs(dir) {
        return true;
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.flatten().take(limits::DIR_PROBE_MAX_ENTRIES) {
        let path = entry.path();
        if path.is_file()
            && let Some(ext) = path.extension().and_then(|e| e.to_str())
            && is_media_extension(ext)
        {
            return true;
        }
        if path.is_dir()
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
            && is_season_folder(name)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn event(path: &Path, kind: ChangeKind) -> WatchEvent {
        WatchEvent {
            path: path.to_path_buf(),
            kind,
        }
    }

    fn show_dir(tmp: &Path) -> PathBuf {
        let dir = tmp.join("Show");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("e01.mkv"), b"x").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_burst_collapses_to_one_emission() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = show_dir(tmp.path());
        let file = dir.join("e01.mkv");

        let (debouncer, mut rx) = ChangeDebouncer::new(Duration::from_millis(50), 100);
        for _ in 0..5 {
            debouncer.handle_event(&event(&file, ChangeKind::Modified)).await;
        }

        let (path, _) = rx.recv().await.unwrap();
        assert_eq!(path, dir);
        assert!(
            timeout(Duration::from_millis(150), rx.recv()).await.is_err(),
            "burst must produce exactly one emission"
        );
    }

    #[tokio::test]
    async fn test_priority_merges_to_most_urgent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = show_dir(tmp.path());
        let file = dir.join("e01.mkv");

        let (debouncer, mut rx) = ChangeDebouncer::new(Duration::from_millis(50), 100);
        debouncer.handle_event(&event(&file, ChangeKind::Modified)).await;
        debouncer.handle_event(&event(&file, ChangeKind::Created)).await;

        let (_, priority) = rx.recv().await.unwrap();
        assert_eq!(priority, PRIORITY_CREATED);
    }

    #[tokio::test]
    async fn test_file_event_maps_to_parent_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = show_dir(tmp.path());

        assert_eq!(target_folder(&dir.join("e01.mkv")), Some(dir.clone()));
        assert_eq!(target_folder(&dir), Some(dir));
    }

    #[tokio::test]
    async fn test_irrelevant_paths_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = show_dir(tmp.path());
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.join("e02.mkv.part"), b"x").unwrap();
        let empty = tmp.path().join("Empty");
        std::fs::create_dir(&empty).unwrap();

        assert_eq!(target_folder(&dir.join("notes.txt")), None);
        assert_eq!(target_folder(&dir.join("e02.mkv.part")), None);
        assert_eq!(target_folder(&empty), None);
    }

    #[tokio::test]
    async fn test_vanished_path_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = show_dir(tmp.path());

        // A media file deleted before the event is handled must not trigger
        // processing of its parent.
        assert_eq!(target_folder(&dir.join("gone.mkv")), None);
        assert_eq!(target_folder(&tmp.path().join("GoneShow")), None);
    }

    #[tokio::test]
    async fn test_season_subdir_makes_folder_relevant() {
        let tmp = tempfile::tempdir().unwrap();
        let show = tmp.path().join("NewShow");
        std::fs::create_dir_all(show.join("Season 1")).unwrap();

        assert_eq!(target_folder(&show), Some(show));
    }

    #[tokio::test]
    async fn test_rate_limit_drops_floods() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = show_dir(tmp.path());
        let file = dir.join("e01.mkv");

        let (debouncer, mut rx) = ChangeDebouncer::new(Duration::from_millis(20), 3);
        for _ in 0..50 {
            debouncer.handle_event(&event(&file, ChangeKind::Modified)).await;
        }

        // The survivors still collapse into one emission for the folder.
        assert!(rx.recv().await.is_some());
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }
}
