//! Controlled vocabularies for genres and mood tags
//!
//! The same constants are embedded in the prompt and used to validate the
//! model's answer, so the set we ask for is the set we accept.

/// Genres the model may recommend.
pub const GENRES: [&str; 7] = ["blues", "country", "hip hop", "jazz", "pop", "reggae", "rock"];

/// Mood/theme tags the model may attach.
pub const TAGS: [&str; 12] = [
    "dating",
    "violence",
    "world/life",
    "night/time",
    "shake the audience",
    "family/gospel",
    "romantic",
    "communication",
    "obscene",
    "family/spiritual",
    "sadness",
    "feelings",
];

/// Minimum number of genres the prompt asks for.
pub const MIN_GENRES: usize = 2;

/// Minimum number of tags a valid caption must carry.
pub const MIN_TAGS: usize = 3;

pub fn is_genre(value: &str) -> bool {
    GENRES.iter().any(|g| *g == value)
}

pub fn is_tag(value: &str) -> bool {
    TAGS.iter().any(|t| *t == value)
}

/// Render a vocabulary as a quoted, comma separated list for prompt text.
pub fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_is_exact() {
        assert!(is_genre("hip hop"));
        assert!(!is_genre("Hip Hop"));
        assert!(!is_genre("metal"));
        assert!(is_tag("night/time"));
        assert!(!is_tag("night"));
    }

    #[test]
    fn test_quoted_list() {
        assert_eq!(quoted_list(&["a", "b c"]), "\"a\", \"b c\"");
    }

    #[test]
    fn test_vocabularies_have_no_duplicates() {
        let mut genres = GENRES.to_vec();
        genres.sort_unstable();
        genres.dedup();
        assert_eq!(genres.len(), GENRES.len());

        let mut tags = TAGS.to_vec();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), TAGS.len());
    }
}
