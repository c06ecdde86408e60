use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::path::PathBuf;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// Lower numbers are processed first.
pub const PRIORITY_CREATED: i32 = 2;
pub const PRIORITY_MODIFIED: i32 = 3;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    priority: i32,
    seq: u64,
    path: PathBuf,
}

#[derive(Default)]
struct QueueInner {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    // Current priority per queued path. A heap entry whose priority no
    // longer matches the map is stale and gets skipped on pop.
    index: HashMap<PathBuf, i32>,
    seq: u64,
    closed: bool,
}

/// Priority work queue with constant-time dedupe. Re-queueing a path that is
/// already pending merges to the more urgent priority instead of adding a
/// second entry.
#[derive(Default)]
pub struct ProcessingQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl ProcessingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, path: PathBuf, priority: i32) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }

        match inner.index.get(&path) {
            Some(&existing) if existing <= priority => {
                debug!(path = %path.display(), "Path already queued at equal or higher priority");
                return;
            }
            _ => {}
        }

        inner.index.insert(path.clone(), priority);
        inner.seq += 1;
        let seq = inner.seq;
        inner.heap.push(Reverse(QueueEntry {
            priority,
            seq,
            path,
        }));
        drop(inner);
        self.notify.notify_one();
    }

    /// Waits for the next path in priority order. Returns `None` once the
    /// queue is closed and drained.
    pub async fn pop(&self) -> Option<PathBuf> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                while let Some(Reverse(entry)) = inner.heap.pop() {
                    if inner.index.get(&entry.path) == Some(&entry.priority) {
                        inner.index.remove(&entry.path);
                        return Some(entry.path);
                    }
                    // Stale entry superseded by a higher-priority push.
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
