//! Text normalization helpers shared by matching, catalog and cleanup code

/// Normalize text for matching
///
/// Lower-cases, drops every character that is not alphanumeric, `_` or
/// whitespace, and collapses whitespace runs to a single space.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generate a URL-friendly slug from a name
pub fn generate_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else if c.is_alphanumeric() {
            slug.push(c);
        }
    }
    slug.trim_matches('-').to_string()
}

/// Short all-caps words that stay upper-case when tidying names
const KEEP_UPPER: &[&str] = &["DJ", "MC", "MK", "GW", "ZHU", "CID"];

/// Tidy a catalog artist name
///
/// - Collapses whitespace
/// - Converts ALL-CAPS names (longer than 3 chars) to title case, keeping
///   short words and well-known acronyms upper-case
/// - Strips leading/trailing `,.-:;` (but keeps `&` as in "Above & Beyond")
pub fn tidy_artist_name(name: &str) -> String {
    let mut cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() > 3 && cleaned == cleaned.to_uppercase() {
        cleaned = cleaned
            .split(' ')
            .map(|word| {
                if word.chars().count() <= 3 || KEEP_UPPER.contains(&word) {
                    word.to_string()
                } else {
                    title_case_word(word)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
    }

    let edge = |c: char| matches!(c, ',' | '.' | '-' | ':' | ';');
    cleaned
        .trim_start_matches(edge)
        .trim()
        .trim_end_matches(edge)
        .trim()
        .to_string()
}

fn title_case_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut at_start = true;
    for c in word.chars() {
        if c.is_alphabetic() {
            if at_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_start = false;
        } else {
            out.push(c);
            at_start = true;
        }
    }
    out
}

/// Names that stand for "track not identified"
const PLACEHOLDER_NAMES: &[&str] = &["id", "unknown", "tba", "tbc", "unknown artist", "unknown track"];

/// Whether a name is an "ID"-style placeholder rather than a real identity
pub fn is_placeholder_name(name: &str) -> bool {
    let normalized = normalize_text(name);
    normalized.is_empty() || PLACEHOLDER_NAMES.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_strips_punctuation_and_case() {
        assert_eq!(normalize_text("  Daft   Punk! "), "daft punk");
        assert_eq!(normalize_text("Be Good (2 Me)"), "be good 2 me");
        assert_eq!(normalize_text("Rüfüs Du Sol"), "rüfüs du sol");
        assert_eq!(normalize_text("!!!"), "");
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Above & Beyond"), "above-beyond");
        assert_eq!(generate_slug("  Chris  Stussy "), "chris-stussy");
        assert_eq!(generate_slug("dj_koze"), "dj-koze");
        assert_eq!(generate_slug("--x--"), "x");
    }

    #[test]
    fn test_tidy_artist_name_title_cases_all_caps() {
        assert_eq!(tidy_artist_name("CHRIS STUSSY"), "Chris Stussy");
        assert_eq!(tidy_artist_name("DJ KOZE"), "DJ Koze");
        assert_eq!(tidy_artist_name("MK"), "MK");
    }

    #[test]
    fn test_tidy_artist_name_trims_edges() {
        assert_eq!(tidy_artist_name("  Luke   Dean, "), "Luke Dean");
        assert_eq!(tidy_artist_name("- Above & Beyond"), "Above & Beyond");
        assert_eq!(tidy_artist_name("Mixed Case"), "Mixed Case");
    }

    #[test]
    fn test_placeholder_names() {
        assert!(is_placeholder_name("ID"));
        assert!(is_placeholder_name(" id "));
        assert!(is_placeholder_name("Unknown"));
        assert!(is_placeholder_name(""));
        assert!(!is_placeholder_name("Idris Elba"));
    }
}
