use crate::constants::{is_ignored_name, is_media_extension};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Series,
    Movie,
    Unknown,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Movie => "movie",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immediate media files in a directory, sidecars excluded. Non-recursive.
#[must_use]
pub fn media_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(is_media_extension)
        })
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !is_ignored_name(n))
        })
        .collect();

    files.sort();
    files
}

pub fn has_media_subdirs(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    for entry in entries.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_ignored_name)
        {
            continue;
        }
        if !media_files(&path).is_empty() {
            return true;
        }
    }

    false
}

fn episode_term_regex() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(?i)\b(episode\s*\d*|ep\d+|e\d{1,3}|s\d{1,2}e\d{1,3}|season\s*\d*)\b")
            .expect("Invalid regex pattern defined in code")
    })
}

fn part_term_regex() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(?i)\b(part|disc|cd|dvd|bd)\s*\d*\b")
            .expect("Invalid regex pattern defined in code")
    })
}

fn stems_match_any(stems: &[String], re: &regex::Regex) -> bool {
    stems.iter().any(|stem| re.is_match(stem))
}

/// Decide whether a directory holds a series or a single movie.
///
/// Subdirectories containing media are the strongest signal and always win; a
/// lone file in the root is a movie; multiple root files are disambiguated by
/// episode-vs-part filename keywords, defaulting to series when both or
/// neither appear.
#[must_use]
pub fn classify(dir: &Path) -> MediaKind {
    if !dir.exists() {
        return MediaKind::Unknown;
    }

    let root_files = media_files(dir);

    if has_media_subdirs(dir) {
        debug!(path = %dir.display(), "Classified as series (media in subdirectories)");
        return MediaKind::Series;
    }

    match root_files.len() {
        0 => {
            warn!(path = %dir.display(), "No media files found");
            MediaKind::Unknown
        }
        1 => {
            debug!(path = %dir.display(), "Classified as movie (single media file)");
            MediaKind::Movie
        }
        _ => {
            let stems: Vec<String> = root_files
                .iter()
                .filter_map(|p| p.file_stem().and_then(|s| s.to_str()))
                .map(str::to_lowercase)
                .collect();

            let has_episode = stems_match_any(&stems, episode_term_regex());
            let has_part = stems_match_any(&stems, part_term_regex());

            match (has_episode, has_part) {
                (true, false) => {
                    debug!(path = %dir.display(), "Classified as series (episode filenames)");
                    MediaKind::Series
                }
                (false, true) => {
                    debug!(path = %dir.display(), "Classified as movie (part filenames)");
                    MediaKind::Movie
                }
                _ => {
                    debug!(path = %dir.display(), "Ambiguous filenames, defaulting to series");
                    MediaKind::Series
                }
            }
        }
    }
}
