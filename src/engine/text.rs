//! Team-name normalization shared by every lookup that crosses data sources.

use unicode_normalization::UnicodeNormalization;

/// Canonical lookup key for a team name: lowercase, accents stripped,
/// only `[a-z0-9]` words separated by single spaces.
///
/// Empty input yields an empty string.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .trim()
        .to_lowercase()
        .nfkd()
        .filter(char::is_ascii)
        .collect();

    folded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(normalize_name("São Paulo"), "sao paulo");
        assert_eq!(normalize_name("  GRÊMIO  "), "gremio");
        assert_eq!(normalize_name("Atlético-MG"), "atleticomg");
    }

    #[test]
    fn collapses_whitespace_and_punctuation() {
        assert_eq!(normalize_name("Red  Bull\tBragantino."), "red bull bragantino");
        assert_eq!(normalize_name("E.C. Bahia"), "ec bahia");
    }

    #[test]
    fn empty_and_missing_input() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn stable_under_repeat() {
        let once = normalize_name("Palmeiras Sub-20");
        assert_eq!(normalize_name(&once), once);
    }
}
