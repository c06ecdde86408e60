pub mod cache;
pub mod coordinator;
pub mod image;
pub mod poster;
pub mod queue;

pub use cache::{KindTag, PosterCache, cache_key};
pub use coordinator::{FolderOutcome, ProcessingCoordinator, ScanSummary};
pub use poster::PosterService;
pub use queue::{PRIORITY_CREATED, PRIORITY_MODIFIED, ProcessingQueue};
