// Player name canonicalisation used by every name-based match pass.

use unicode_normalization::UnicodeNormalization;

/// Canonical form of a display name: lowercase, diacritics stripped via
/// compatibility decomposition, then only `[a-z0-9 ]` kept and the ends
/// trimmed. Interior whitespace is left as-is.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept: String = lowered
        .nfkd()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | ' '))
        .collect();
    kept.trim().to_string()
}

/// Missing names normalise to the empty string.
pub fn normalize_name(name: Option<&str>) -> String {
    name.map(normalize).unwrap_or_default()
}
