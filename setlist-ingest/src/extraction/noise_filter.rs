//! Noise Filter
//!
//! Classifies a trimmed fragment as a plausible track mention or as
//! conversational noise. Rules are an ordered list of pure predicates;
//! the first rule that fires rejects the fragment. Precision over recall:
//! a false positive pollutes the catalog, a false negative only costs a
//! missed line.

use setlist_common::text::normalize_text;

/// Why a fragment was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseReason {
    Reaction,
    EmojiDominated,
    BarePlaceholder,
    UnansweredQuestion,
    Length,
}

/// Whole-fragment reactions (compared after normalization)
const REACTION_PHRASES: &[&str] = &[
    "fire",
    "banger",
    "absolute banger",
    "tune",
    "what a tune",
    "insane",
    "wow",
    "omg",
    "love this",
    "love it",
    "so good",
    "this is fire",
    "need this",
    "goosebumps",
    "legend",
];

/// Question openers that never introduce a track mention
const REACTION_PREFIXES: &[&str] = &[
    "anyone know",
    "does anyone know",
    "anybody know",
    "who knows",
    "what is this",
    "whats this",
    "whats the name",
    "what is the name",
    "what song",
    "what track",
    "track id please",
    "id please",
    "need the id",
    "need id",
];

/// Fragments that only say "not identified"
const BARE_PLACEHOLDERS: &[&str] = &["id", "unknown", "tba", "tbc", "id id", "unknown track"];

/// Separators the Mention Parser understands
const SEPARATORS: &[&str] = &[" - ", " – ", " — ", " by ", "\"", "“", "”"];

const MIN_CHARS: usize = 3;
const MAX_CHARS: usize = 200;

type NoiseRule = (NoiseReason, fn(&str) -> bool);

/// Ordered rule chain, first match wins
const RULES: &[NoiseRule] = &[
    (NoiseReason::Reaction, is_reaction),
    (NoiseReason::EmojiDominated, is_emoji_dominated),
    (NoiseReason::BarePlaceholder, is_bare_placeholder),
    (NoiseReason::UnansweredQuestion, is_unanswered_question),
    (NoiseReason::Length, has_bad_length),
];

/// Classify a fragment
///
/// `Ok(())` means "plausible track mention"; `Err(reason)` names the first
/// rule that rejected it.
pub fn check_fragment(fragment: &str) -> Result<(), NoiseReason> {
    let fragment = fragment.trim();
    match RULES.iter().find(|(_, rule)| rule(fragment)) {
        Some((reason, _)) => Err(*reason),
        None => Ok(()),
    }
}

/// Convenience wrapper over [`check_fragment`]
pub fn is_plausible_mention(fragment: &str) -> bool {
    check_fragment(fragment).is_ok()
}

fn is_reaction(fragment: &str) -> bool {
    let normalized = normalize_text(fragment);
    if REACTION_PHRASES.contains(&normalized.as_str()) {
        return true;
    }
    REACTION_PREFIXES.iter().any(|prefix| {
        normalized == *prefix || normalized.starts_with(&format!("{} ", prefix))
    })
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF   // pictographs, emoticons, transport, supplemental symbols
        | 0x2600..=0x27BF   // misc symbols, dingbats
        | 0x2B00..=0x2BFF   // arrows, stars
        | 0xFE0F            // variation selector
        | 0x200D            // zero-width joiner
    )
}

fn is_emoji_dominated(fragment: &str) -> bool {
    let emoji = fragment.chars().filter(|c| is_emoji(*c)).count();
    if emoji == 0 {
        return false;
    }
    let alnum = fragment.chars().filter(|c| c.is_alphanumeric()).count();
    alnum == 0 || emoji >= alnum
}

fn is_bare_placeholder(fragment: &str) -> bool {
    BARE_PLACEHOLDERS.contains(&normalize_text(fragment).as_str())
}

fn has_separator(fragment: &str) -> bool {
    let lowered = fragment.to_lowercase();
    SEPARATORS.iter().any(|sep| lowered.contains(sep))
}

fn is_unanswered_question(fragment: &str) -> bool {
    fragment.ends_with('?') && !has_separator(fragment)
}

fn has_bad_length(fragment: &str) -> bool {
    let chars = fragment.chars().count();
    !(MIN_CHARS..=MAX_CHARS).contains(&chars)
}
