//! Parsing and validation of the model's caption text
//!
//! Model output is untrusted. It is located, parsed with `serde_json`, checked
//! against the caption schema and then against the controlled vocabularies.
//! Anything that fails comes back as a [`CaptionFailure`] holding the raw text.

use crate::models::{CaptionFailure, CaptionOutcome, CaptionResult, FailureCause, VocabularyPolicy};
use crate::vocab;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawCaption {
    description: String,
    top_music_genres: Vec<String>,
    top_tags: Vec<String>,
    title_playlist: String,
}

/// Turn raw model text into a validated caption.
pub fn parse_caption(raw: &str, policy: VocabularyPolicy) -> CaptionOutcome {
    let fail = |cause, message: String| CaptionFailure::new(cause, message, Some(raw.to_string()));

    let payload = extract_json_payload(raw);
    let value: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
        fail(
            FailureCause::MalformedOutput,
            format!("Model output is not valid JSON: {}", e),
        )
    })?;

    if !value.is_object() {
        return Err(fail(
            FailureCause::MalformedOutput,
            "Model output is JSON but not an object".to_string(),
        ));
    }

    let caption: RawCaption = serde_json::from_value(value).map_err(|e| {
        fail(
            FailureCause::SchemaViolation,
            format!("Caption does not match schema: {}", e),
        )
    })?;

    if caption.top_music_genres.is_empty() {
        return Err(fail(
            FailureCause::SchemaViolation,
            "top_music_genres must not be empty".to_string(),
        ));
    }
    if caption.top_tags.len() < vocab::MIN_TAGS {
        return Err(fail(
            FailureCause::SchemaViolation,
            format!(
                "top_tags needs at least {} entries, got {}",
                vocab::MIN_TAGS,
                caption.top_tags.len()
            ),
        ));
    }

    let (genres, tags) = match policy {
        VocabularyPolicy::Strict => {
            let unknown = unknown_entries(&caption.top_music_genres, &caption.top_tags);
            if !unknown.is_empty() {
                return Err(fail(FailureCause::VocabularyViolation, unknown));
            }
            (caption.top_music_genres, caption.top_tags)
        }
        VocabularyPolicy::Lenient => {
            let unknown = unknown_entries(&caption.top_music_genres, &caption.top_tags);
            if !unknown.is_empty() {
                tracing::warn!("Dropping out-of-vocabulary entries: {}", unknown);
            }

            let genres: Vec<String> = caption
                .top_music_genres
                .into_iter()
                .filter(|g| vocab::is_genre(g))
                .collect();
            let tags: Vec<String> = caption
                .top_tags
                .into_iter()
                .filter(|t| vocab::is_tag(t))
                .collect();

            if genres.is_empty() || tags.len() < vocab::MIN_TAGS {
                return Err(fail(
                    FailureCause::VocabularyViolation,
                    format!(
                        "{}; {} genres and {} tags remain after filtering",
                        unknown,
                        genres.len(),
                        tags.len()
                    ),
                ));
            }
            (genres, tags)
        }
    };

    Ok(CaptionResult {
        description: caption.description,
        top_music_genres: genres,
        top_tags: tags,
        title_playlist: caption.title_playlist,
    })
}

/// Describe out-of-vocabulary entries, or return an empty string if there are none.
fn unknown_entries(genres: &[String], tags: &[String]) -> String {
    let bad_genres: Vec<&str> = genres
        .iter()
        .map(String::as_str)
        .filter(|g| !vocab::is_genre(g))
        .collect();
    let bad_tags: Vec<&str> = tags
        .iter()
        .map(String::as_str)
        .filter(|t| !vocab::is_tag(t))
        .collect();

    let mut parts = Vec::new();
    if !bad_genres.is_empty() {
        parts.push(format!("unknown genres {:?}", bad_genres));
    }
    if !bad_tags.is_empty() {
        parts.push(format!("unknown tags {:?}", bad_tags));
    }
    parts.join("; ")
}

/// Locate the JSON payload inside model text that may carry markdown fences or
/// chatter around it. Text that already parses as JSON is returned whole.
/// Otherwise the first complete JSON value starting at a `{` is returned, and
/// failing that the trimmed input unchanged.
pub fn extract_json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return trimmed;
    }

    let mut search_from = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        let mut values =
            serde_json::Deserializer::from_str(&trimmed[start..]).into_iter::<serde_json::Value>();
        if let Some(Ok(_)) = values.next() {
            return &trimmed[start..start + values.byte_offset()];
        }
        search_from = start + 1;
    }

    trimmed
}
