use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Well-known anime series and films. Substring match against the inferred
/// title or path, lowercased.
const ANIME_TITLES: &[&str] = &[
    "naruto",
    "one piece",
    "attack on titan",
    "shingeki no kyojin",
    "death note",
    "demon slayer",
    "kimetsu no yaiba",
    "jujutsu kaisen",
    "my hero academia",
    "boku no hero",
    "dragon ball",
    "fullmetal alchemist",
    "hunter x hunter",
    "one punch man",
    "mob psycho",
    "cowboy bebop",
    "evangelion",
    "code geass",
    "steins;gate",
    "sword art online",
    "tokyo ghoul",
    "bleach",
    "fairy tail",
    "spirited away",
    "your name",
    "kimi no na wa",
    "princess mononoke",
    "akira",
    "chainsaw man",
    "spy x family",
    "vinland saga",
    "made in abyss",
    "re:zero",
    "konosuba",
    "frieren",
    "oshi no ko",
];

/// Animation studios and distributors whose names show up in release folders.
const ANIME_STUDIOS: &[&str] = &[
    "studio ghibli",
    "ghibli",
    "toei animation",
    "madhouse",
    "kyoto animation",
    "kyoani",
    "bones",
    "ufotable",
    "mappa",
    "wit studio",
    "a-1 pictures",
    "production i.g",
    "trigger",
    "pierrot",
    "sunrise",
    "shaft",
    "gainax",
    "cloverworks",
    "crunchyroll",
    "funimation",
    "aniplex",
];

fn generic_term_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(anime|ova|ona|sub(bed)?|dub(bed)?|senpai|shounen|shoujo|seinen|isekai)\b")
            .expect("Invalid regex pattern defined in code")
    })
}

fn honorific_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[-\s](chan|kun|san)\b").expect("Invalid regex pattern defined in code")
    })
}

fn release_tag_regexes() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\[(BD|Sub|Dub|Batch|Complete)\]").expect("Invalid Regex"),
            // Episode ranges like "12-24" typical of batch fansub releases.
            Regex::new(r"\b\d{1,3}-\d{1,3}\b").expect("Invalid Regex"),
        ]
    })
}

/// Best-effort routing hint for provider selection, not authoritative
/// metadata. Any single signal in the title or path is enough.
#[must_use]
pub fn is_anime(title: &str, path: &Path) -> bool {
    let haystack = format!("{} {}", title, path.display()).to_lowercase();

    if ANIME_TITLES.iter().any(|t| haystack.contains(t)) {
        debug!(title = %title, "Anime hint: known title");
        return true;
    }

    if ANIME_STUDIOS.iter().any(|s| haystack.contains(s)) {
        debug!(title = %title, "Anime hint: studio name");
        return true;
    }

    if generic_term_regex().is_match(&haystack) || honorific_regex().is_match(&haystack) {
        debug!(title = %title, "Anime hint: generic term");
        return true;
    }

    if release_tag_regexes().iter().any(|re| re.is_match(&haystack)) {
        debug!(title = %title, "Anime hint: release tag");
        return true;
    }

    false
}
