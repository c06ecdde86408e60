pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "m2v", "3gp", "3g2",
    "f4v", "asf", "rm", "rmvb", "ts", "mts", "m2ts", "vob", "ogv", "divx", "xvid",
];

/// Sidecar files written by this tool or by desktop shells. Events for these
/// must never trigger reprocessing or the pipeline would feed itself.
pub const IGNORED_NAMES: &[&str] = &[
    "desktop.ini",
    "thumbs.db",
    ".ds_store",
    "folder.ico",
    "poster.jpg",
    "poster.png",
    "cover.jpg",
    "cover.png",
    "fanart.jpg",
    "banner.jpg",
];

/// Suffix globs for in-progress downloads and editor droppings.
pub const IGNORED_SUFFIXES: &[&str] = &[".tmp", ".part", ".crdownload", ".download", ".!ut"];

/// Existing artwork recognized when deciding whether a folder already has a poster.
pub const POSTER_CANDIDATES: &[&str] = &[
    "poster.jpg",
    "poster.png",
    "poster.jpeg",
    "cover.jpg",
    "cover.png",
    "cover.jpeg",
    "folder.jpg",
    "folder.png",
    "folder.jpeg",
    "fanart.jpg",
    "fanart.png",
    "fanart.jpeg",
];

/// Top-level folder names that are library roots, never media units.
pub const LIBRARY_ROOT_SENTINELS: &[&str] = &["media", "test_media"];

pub mod limits {
    /// Entries examined during the debouncer's shallow "could this directory
    /// hold media" probe.
    pub const DIR_PROBE_MAX_ENTRIES: usize = 20;

    /// Upward steps the title inferer will take through season folders.
    pub const TITLE_WALK_MAX_DEPTH: usize = 3;
}

pub mod timeouts {
    use std::time::Duration;

    pub const PROVIDER_REQUEST: Duration = Duration::from_secs(10);

    /// Re-containerizing a large video can legitimately take minutes.
    pub const ARTWORK_EMBED: Duration = Duration::from_secs(300);
}

#[must_use]
pub fn is_media_extension(ext: &str) -> bool {
    let lower = ext.to_lowercase();
    MEDIA_EXTENSIONS.contains(&lower.as_str())
}

#[must_use]
pub fn is_ignored_name(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IGNORED_NAMES.contains(&lower.as_str()) || IGNORED_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_extension_case_insensitive() {
        assert!(is_media_extension("MKV"));
        assert!(is_media_extension("mp4"));
        assert!(!is_media_extension("txt"));
    }

    #[test]
    fn test_ignored_names_and_suffixes() {
        assert!(is_ignored_name("Desktop.ini"));
        assert!(is_ignored_name("poster.jpg"));
        assert!(is_ignored_name("episode.mkv.PART"));
        assert!(!is_ignored_name("show.s01e01.mkv"));
    }
}
