//! Mention Parser
//!
//! Decomposes a fragment that passed the Noise Filter into
//! (title, artist, extras). Bracketed extras are pulled out first, then an
//! ordered chain of split rules is tried, first match wins. A fragment with
//! no recognized separator yields `None`: a bare phrase is never promoted
//! to a track mention.

use once_cell::sync::Lazy;
use regex::Regex;
use setlist_common::text::{is_placeholder_name, normalize_text};

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[]([^\(\)\[\]]+)[\)\]]").expect("valid regex"));

static ARTIST_QUOTED_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?P<artist>[^"“”]+?)\s*[:\-–—]?\s*["“](?P<title>[^"“”]+)["”]\s*$"#).expect("valid regex")
});

static BY_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+by\s+").expect("valid regex"));

static QUOTED_TITLE_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^["“](?P<title>[^"“”]+)["”]\s*(?:[-–—:]|by\b)?\s*(?P<artist>[^"“”]+)$"#).expect("valid regex")
});

/// Bracket markers removed outright (not extras, not part of the title)
const DENIED_MARKERS: &[&str] = &[
    "unreleased",
    "not released",
    "forthcoming",
    "dubplate",
    "vip",
    "free download",
    "free dl",
    "out now",
    "preview",
    "clip",
];

/// Denied markers that also hint the track is unreleased
const UNRELEASED_MARKERS: &[&str] = &["unreleased", "not released", "forthcoming", "dubplate"];

/// Words that mark a remix/version name
const REMIX_KEYWORDS: &[&str] = &[
    "remix", "remixed", "edit", "rework", "bootleg", "flip", "mix", "dub", "version", "refix",
];

/// Dash separators, in no particular priority (earliest occurrence wins)
const DASHES: &[&str] = &[" - ", " – ", " — "];

/// Successful decomposition of a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMention {
    pub title: String,
    pub artist: String,
    pub extras: Vec<String>,
    pub is_unreleased_hint: bool,
}

type SplitRule = fn(&str) -> Option<(String, String)>;

/// Ordered split rules returning (title, artist), first match wins
const SPLIT_RULES: &[(&str, SplitRule)] = &[
    ("dash", split_dash),
    ("by", split_by),
    ("artist_quoted_title", split_artist_quoted_title),
    ("quoted_title_first", split_quoted_title_first),
];

/// Parse a fragment into a track mention
pub fn parse_mention(fragment: &str) -> Option<ParsedMention> {
    let (text, extras, is_unreleased_hint) = extract_extras(fragment.trim());

    for (name, rule) in SPLIT_RULES {
        let Some((title, artist)) = rule(&text) else {
            continue;
        };
        let title = clean_field(&title);
        let artist = clean_field(&artist);
        if title.is_empty() || artist.is_empty() {
            continue;
        }
        if is_placeholder_name(&title) && is_placeholder_name(&artist) {
            tracing::trace!(rule = name, fragment, "Both fields are placeholders");
            return None;
        }
        tracing::trace!(rule = name, title = %title, artist = %artist, "Mention parsed");
        return Some(ParsedMention {
            title,
            artist,
            extras,
            is_unreleased_hint,
        });
    }

    None
}

/// Pull bracketed segments out of a fragment
///
/// Returns (text to split, extras, unreleased hint). Denied markers vanish
/// entirely; remix/version brackets stay in the text (they belong to the
/// title) and are also reported as extras; any other bracket only becomes
/// an extra.
fn extract_extras(fragment: &str) -> (String, Vec<String>, bool) {
    let mut extras = Vec::new();
    let mut unreleased = false;
    let mut text = String::with_capacity(fragment.len());
    let mut last = 0;

    for caps in BRACKETED.captures_iter(fragment) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        text.push_str(&fragment[last..whole.start()]);
        last = whole.end();

        let inner = inner.as_str().trim();

        if let Some(marker) = denied_marker(inner) {
            if UNRELEASED_MARKERS.contains(&marker) {
                unreleased = true;
            }
            continue;
        }

        extras.push(inner.to_string());
        if has_remix_keyword(inner) {
            text.push_str(whole.as_str());
        }
    }
    text.push_str(&fragment[last..]);

    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (text, extras, unreleased)
}

/// Denied marker present in a bracket as whole words
fn denied_marker(inner: &str) -> Option<&'static str> {
    let padded = format!(" {} ", normalize_text(inner));
    DENIED_MARKERS
        .iter()
        .copied()
        .find(|marker| padded.contains(&format!(" {} ", marker)))
}

fn has_remix_keyword(text: &str) -> bool {
    normalize_text(text)
        .split(' ')
        .any(|word| REMIX_KEYWORDS.contains(&word))
}

/// `X - Y`: title - artist by convention, unless only the right side
/// carries a remix keyword
fn split_dash(text: &str) -> Option<(String, String)> {
    let (pos, sep) = DASHES
        .iter()
        .filter_map(|sep| text.find(sep).map(|pos| (pos, *sep)))
        .min_by_key(|(pos, _)| *pos)?;
    let left = &text[..pos];
    let right = &text[pos + sep.len()..];

    if has_remix_keyword(right) && !has_remix_keyword(left) {
        Some((right.to_string(), left.to_string()))
    } else {
        Some((left.to_string(), right.to_string()))
    }
}

/// `X by Y`: title by artist
fn split_by(text: &str) -> Option<(String, String)> {
    let sep = BY_SEPARATOR.find(text)?;
    Some((text[..sep.start()].to_string(), text[sep.end()..].to_string()))
}

/// `X "Y"`: artist, quoted title
fn split_artist_quoted_title(text: &str) -> Option<(String, String)> {
    let caps = ARTIST_QUOTED_TITLE.captures(text)?;
    Some((caps["title"].to_string(), caps["artist"].to_string()))
}

/// `"Y" - X`: quoted title first
fn split_quoted_title_first(text: &str) -> Option<(String, String)> {
    let caps = QUOTED_TITLE_FIRST.captures(text)?;
    Some((caps["title"].to_string(), caps["artist"].to_string()))
}

/// Trim whitespace, quotes and dangling punctuation from a field
fn clean_field(value: &str) -> String {
    let trimmed = value.trim().trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '“' | '”' | '\'' | '-' | '–' | '—' | ':' | ',' | ';' | '|' | '?' | '!')
    });
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
