use std::sync::LazyLock;

use regex::Regex;

/// Strip model artifacts from raw output: the `<unusedN>thought` prefix some
/// models emit, stray `<unusedN>` tokens and surrounding whitespace.
pub fn clean_model_output(raw: &str) -> String {
    static UNUSED_TOKEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<unused\d+>").expect("valid regex"));

    let mut text = raw;
    if let Some(idx) = text.find("<unused") {
        if let Some(offset) = text[idx..].find("thought\n") {
            text = &text[idx + offset + "thought\n".len()..];
        }
    }
    UNUSED_TOKEN_RE.replace_all(text, "").trim().to_string()
}

/// Locate the JSON object in a model response: a ```json fenced block if
/// present, otherwise the span from the first `{` to the last `}`.
pub fn extract_json_object(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let body = &response[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}
