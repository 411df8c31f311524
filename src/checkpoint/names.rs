//! Name keys used as a fallback identity.

use std::sync::LazyLock;

use regex::Regex;

/// `<name>_<YYYYMMDD>_<HHMMSS>` with an optional de-collision suffix.
#[allow(clippy::expect_used)]
static ARTIFACT_STEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)_\d{8}_\d{6}(?:_\d+)?$").expect("artifact stem regex is valid")
});

/// Normalizes a display name for comparison.
///
/// Case-insensitive; any run of whitespace or punctuation becomes one space.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Recovers the display-name part of a finalized artifact file stem.
///
/// `"Jean Dupont_20251126_154317"` yields `"Jean Dupont"`. Stems that do not
/// follow the artifact naming scheme are returned whole.
#[must_use]
pub fn name_from_artifact_stem(stem: &str) -> &str {
    ARTIFACT_STEM_PATTERN
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .map_or(stem, |m| m.as_str())
}
