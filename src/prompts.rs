use crate::vocab;

pub const CAPTION: &str = include_str!("../data/prompts/caption.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Build the captioning instruction for one image.
///
/// `context` is free text about the situation, e.g. `"the weather is sunny"`.
pub fn build_caption_prompt(context: &str) -> String {
    let min_genres = vocab::MIN_GENRES.to_string();
    let min_tags = vocab::MIN_TAGS.to_string();
    let genres = vocab::quoted_list(&vocab::GENRES);
    let tags = vocab::quoted_list(&vocab::TAGS);

    render(
        CAPTION,
        &[
            ("context", context.trim()),
            ("min_genres", &min_genres),
            ("min_tags", &min_tags),
            ("genres", &genres),
            ("tags", &tags),
        ],
    )
}
