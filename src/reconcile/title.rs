//! Collection title cleaning, folder naming and comparison keys.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::Collection;

/// Longest cleaned title kept in a folder name, in characters.
pub const MAX_FOLDER_TITLE_CHARS: usize = 80;

/// Date format used inside folder names.
pub const FOLDER_DATE_FORMAT: &str = "%d-%m-%Y";

#[allow(clippy::expect_used)]
static GENDER_MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\(?\s*\b[HF]\s*/\s*[HF]\b\s*\)?\s*")
        .expect("gender marker regex is valid")
});

#[allow(clippy::expect_used)]
static DATED_FOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+) \((\d{2}-\d{2}-\d{4})\)$").expect("dated folder regex is valid")
});

/// Cleans a collection title for use as a folder name.
///
/// Removes dual-gender markers such as `(H/F)` or `F/H`, turns `/` into `-`,
/// drops characters that are invalid in folder names and collapses whitespace.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let without_markers = GENDER_MARKER_PATTERN.replace_all(title, " ");
    let replaced: String = without_markers
        .chars()
        .filter_map(|c| match c {
            '/' | '\\' => Some('-'),
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for a title: cleaned, diacritics stripped, lower-cased,
/// punctuation removed, whitespace collapsed.
///
/// `"Ingénieur Logiciel (H/F)"` and `"ingenieur logiciel"` share a key.
#[must_use]
pub fn normalize_key(title: &str) -> String {
    let folded: String = clean_title(title)
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace())
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folder name for a collection: `"<clean title> (DD-MM-YYYY)"`, or the clean
/// title alone when no creation date is known.
///
/// Falls back to the collection identity when the title cleans to nothing.
#[must_use]
pub fn folder_name_for(collection: &Collection) -> String {
    let mut title: String = clean_title(&collection.title)
        .chars()
        .take(MAX_FOLDER_TITLE_CHARS)
        .collect();
    title = title.trim().to_string();
    if title.is_empty() || title.chars().all(|c| c == '.') {
        title = clean_title(&collection.identity);
    }
    if title.is_empty() {
        title = "collection".to_string();
    }

    match collection.created_date {
        Some(date) => format!("{title} ({})", date.format(FOLDER_DATE_FORMAT)),
        None => title,
    }
}

/// Splits a folder name into its title and optional date suffix.
#[must_use]
pub fn parse_folder_name(name: &str) -> (&str, Option<NaiveDate>) {
    let Some(captures) = DATED_FOLDER_PATTERN.captures(name) else {
        return (name, None);
    };
    let (Some(title), Some(date)) = (captures.get(1), captures.get(2)) else {
        return (name, None);
    };
    match NaiveDate::parse_from_str(date.as_str(), FOLDER_DATE_FORMAT) {
        Ok(date) => (title.as_str(), Some(date)),
        Err(_) => (name, None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::CollectionStatus;

    fn collection(title: &str, date: Option<NaiveDate>) -> Collection {
        Collection {
            identity: "job-1".to_string(),
            title: title.to_string(),
            status: CollectionStatus::Active,
            created_date: date,
            announced_item_count: 0,
        }
    }

    #[test]
    fn test_clean_title_removes_gender_markers() {
        assert_eq!(clean_title("Développeur Rust (H/F)"), "Développeur Rust");
        assert_eq!(clean_title("Chef de projet F/H confirmé"), "Chef de projet confirmé");
        assert_eq!(clean_title("Comptable ( f / h )"), "Comptable");
    }

    #[test]
    fn test_clean_title_keeps_words_around_slashes() {
        assert_eq!(clean_title("Chef/Fullstack"), "Chef-Fullstack");
        assert_eq!(clean_title("Dev: Back <API>"), "Dev Back API");
    }

    #[test]
    fn test_normalize_key_matches_accented_and_plain_titles() {
        assert_eq!(
            normalize_key("Ingénieur Logiciel (H/F)"),
            normalize_key("ingenieur logiciel")
        );
        assert_eq!(normalize_key("Ingénieur Logiciel (H/F)"), "ingenieur logiciel");
    }

    #[test]
    fn test_normalize_key_drops_punctuation() {
        assert_eq!(normalize_key("Full-Stack  Dev!"), "fullstack dev");
    }

    #[test]
    fn test_folder_name_for_with_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            folder_name_for(&collection("Data Analyst (H/F)", Some(date))),
            "Data Analyst (07-03-2024)"
        );
    }

    #[test]
    fn test_folder_name_for_truncates_long_titles() {
        let title = "x".repeat(200);
        let name = folder_name_for(&collection(&title, None));
        assert_eq!(name.chars().count(), MAX_FOLDER_TITLE_CHARS);
    }

    #[test]
    fn test_folder_name_for_empty_title_uses_identity() {
        assert_eq!(folder_name_for(&collection(" (H/F) ", None)), "job-1");
    }

    #[test]
    fn test_parse_folder_name_round_trips_dated_names() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(
            parse_folder_name("Data Analyst (31-12-2023)"),
            ("Data Analyst", Some(date))
        );
        assert_eq!(parse_folder_name("Data Analyst"), ("Data Analyst", None));
        assert_eq!(
            parse_folder_name("Bad Date (99-99-2023)"),
            ("Bad Date (99-99-2023)", None)
        );
    }
}
