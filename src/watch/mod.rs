pub mod debounce;

pub use debounce::ChangeDebouncer;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Moved,
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Recursive filesystem watcher over the library root. Raw notify events are
/// mapped to [`WatchEvent`]s and pushed into an unbounded channel; the
/// debouncer downstream decides what is worth acting on.
pub struct DirectoryWatcher {
    // Dropping the watcher stops the event stream.
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    pub fn start(root: &Path) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let kind = match event.kind {
                        EventKind::Create(_) => ChangeKind::Created,
                        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Moved,
                        EventKind::Modify(_) => ChangeKind::Modified,
                        _ => return,
                    };

                    if kind == ChangeKind::Moved {
                        // Renames carry source and destination; only the
                        // destination still exists.
                        if let Some(path) = event.paths.last() {
                            let _ = tx.send(WatchEvent {
                                path: path.clone(),
                                kind,
                            });
                        }
                    } else {
                        for path in event.paths {
                            let _ = tx.send(WatchEvent { path, kind });
                        }
                    }
                }
                Err(e) => error!(error = %e, "Filesystem watcher error"),
            }
        })
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        info!(root = %root.display(), "Watching library for changes");
        Ok((Self { _watcher: watcher }, rx))
    }
}
