/// Parse and validate a provider id.
///
/// Provider ids are slugs such as `gutenberg`, `bricks` or `acf-blocks`:
/// lowercase ASCII letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns an error message if the id is empty or contains other characters.
pub fn parse_provider_id(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("Provider id cannot be empty".to_string());
    }

    if let Some(bad) = s
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
    {
        return Err(format!(
            "Provider id can only contain lowercase letters, digits, '-' or '_' (found '{bad}' in '{s}')"
        ));
    }

    Ok(s.to_string())
}
