//! Tokenizer for keyword search.

/// Tokenize text into searchable terms.
///
/// ```
/// use kg_search::tokenizer::tokenize;
///
/// let tokens = tokenize("Hello, World!");
/// assert_eq!(tokens, vec!["hello", "world"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, preserving first-seen order — used to build
/// the OR-expanded query term list.
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
