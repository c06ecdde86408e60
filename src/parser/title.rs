use crate::constants::{LIBRARY_ROOT_SENTINELS, limits::TITLE_WALK_MAX_DEPTH};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn season_folder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?i)^Season\s*\d+$")
}

#[must_use]
pub fn is_season_folder(name: &str) -> bool {
    season_folder_regex().is_match(name)
}

/// Derive a searchable title from a media folder path.
///
/// Season folders resolve to their parent's name; the walk is bounded so a
/// pathological tree of nested season-like names cannot loop forever. A season
/// folder sitting directly under a library root has no usable title and yields
/// `None`.
///
/// Returns `None` whenever nothing searchable survives cleanup; callers must
/// treat that as "skip, cannot process".
#[must_use]
pub fn infer_title(path: &Path) -> Option<String> {
    let mut current = path;

    for _ in 0..TITLE_WALK_MAX_DEPTH {
        let name = current.file_name()?.to_str()?;

        if !is_season_folder(name) {
            return clean_folder_name(name);
        }

        let parent = current.parent()?;
        let parent_name = parent.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if LIBRARY_ROOT_SENTINELS.contains(&parent_name.to_lowercase().as_str()) {
            debug!(path = %path.display(), "Season folder directly under library root, no title");
            return None;
        }

        current = parent;
    }

    debug!(path = %path.display(), "Season-folder walk exceeded max depth");
    None
}

fn clean_folder_name(name: &str) -> Option<String> {
    if let Some(split) = split_camel_case(name) {
        return Some(split);
    }

    static STRIP_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = STRIP_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\bS\d{1,2}E\d{1,2}\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b\d{1,2}x\d{1,2}\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b(720p|1080p|2160p|4K|UHD)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b(HDTV|BluRay|WEB-DL|WEBRip)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b(x264|x265|HEVC|AVC)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bSeason\s*\d+\b").expect("Invalid Regex"),
            Regex::new(r"\[[^\]]*\]").expect("Invalid Regex"),
            Regex::new(r"\([^)]*\)").expect("Invalid Regex"),
            Regex::new(r"\.\w+$").expect("Invalid Regex"),
        ]
    });

    let mut cleaned = name.to_string();
    for pattern in patterns {
        cleaned = pattern.replace_all(&cleaned, "").to_string();
    }

    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let cleaned = get_regex(&SEPARATORS, r"[._]+").replace_all(&cleaned, " ");
    let cleaned = get_regex(&WHITESPACE, r"\s+").replace_all(&cleaned, " ");

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Split separator-free CamelCase names ("StrangerThings") into words.
///
/// A space goes before every lowercase-to-uppercase transition, and before the
/// last capital of a consecutive-capital run followed by lowercase so that
/// acronym prefixes stay intact ("HBOMax" -> "HBO Max"). Names that are not
/// CamelCase (separators, single word, all caps) pass through untouched as
/// `None` so the normal cleanup runs instead.
fn split_camel_case(name: &str) -> Option<String> {
    let is_candidate = !name.is_empty()
        && name.chars().all(char::is_alphanumeric)
        && name.chars().next().is_some_and(char::is_uppercase)
        && name.chars().filter(|c| c.is_uppercase()).count() >= 2
        && name.chars().any(char::is_lowercase);

    if !is_candidate {
        return None;
    }

    static LOWER_UPPER: OnceLock<Regex> = OnceLock::new();
    static ACRONYM: OnceLock<Regex> = OnceLock::new();
    let split = get_regex(&LOWER_UPPER, r"([a-z0-9])([A-Z])").replace_all(name, "$1 $2");
    let split = get_regex(&ACRONYM, r"([A-Z]+)([A-Z][a-z])").replace_all(&split, "$1 $2");

    Some(split.to_string())
}
