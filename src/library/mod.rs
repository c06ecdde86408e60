pub mod anime;
pub mod classify;

pub use anime::is_anime;
pub use classify::{MediaKind, classify, media_files};
