//! Identifier normalization
//!
//! Turns any user-supplied name into a lookup key: ASCII letters are
//! lower-cased, digits and `_` kept, everything else deleted.

/// Canonical lookup key for `text`
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Lookup key of a `message.signal` pair
pub fn qualified_key(message: &str, signal: &str) -> String {
    normalize(&format!("{}.{}", message, signal))
}
