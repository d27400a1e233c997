// src/utils/html.rs

/// Sanitizes free-form quiz descriptions before they are stored.
///
/// Whitelist based: safe formatting tags (<b>, <p>, ...) survive, scripts,
/// iframes and event-handler attributes are dropped along with their content.
/// Question texts and choice/pair items are never passed through here since
/// matching answers are compared verbatim.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes an optional description, treating a blank result as absent.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(clean_html)
        .filter(|cleaned| !cleaned.trim().is_empty())
}
