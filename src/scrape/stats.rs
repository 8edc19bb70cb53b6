use once_cell::sync::Lazy;
use regex::Regex;

static ADDITIONS_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+)\s+additions?").expect("valid additions pattern"));
static DELETIONS_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\d,]+)\s+deletions?").expect("valid deletions pattern"));
static ADDITIONS_COMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+\s*([\d,]+)").expect("valid compact additions pattern"));
static DELETIONS_COMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*([\d,]+)").expect("valid compact deletions pattern"));

/// Addition/deletion line counts read off a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub additions: u64,
    pub deletions: u64,
}

impl DiffStats {
    fn from_sides(additions: Option<u64>, deletions: Option<u64>) -> Option<DiffStats> {
        if additions.is_none() && deletions.is_none() {
            return None;
        }
        Some(DiffStats {
            additions: additions.unwrap_or(0),
            deletions: deletions.unwrap_or(0),
        })
    }
}

/// Read counts from a label such as "12 additions and 3 deletions" or "+12 −3".
///
/// The worded form wins over the compact form for each side. The Unicode
/// minus sign is accepted as a hyphen. Returns None when neither side matches.
pub fn parse_stats_text(text: &str) -> Option<DiffStats> {
    if text.trim().is_empty() {
        return None;
    }
    let normalized = text.replace('\u{2212}', "-");

    let additions = capture_count(&ADDITIONS_WORDS, &normalized)
        .or_else(|| capture_count(&ADDITIONS_COMPACT, &normalized));
    let deletions = capture_count(&DELETIONS_WORDS, &normalized)
        .or_else(|| capture_count(&DELETIONS_COMPACT, &normalized));

    DiffStats::from_sides(additions, deletions)
}

/// Combine the texts of separately colored addition/deletion elements.
/// Each side keeps only its digits, so signs and separators are ignored.
pub fn parse_marker_texts(additions: Option<&str>, deletions: Option<&str>) -> Option<DiffStats> {
    DiffStats::from_sides(
        additions.and_then(parse_loose_count),
        deletions.and_then(parse_loose_count),
    )
}

fn capture_count(pattern: &Regex, text: &str) -> Option<u64> {
    let digits = pattern.captures(text)?.get(1)?.as_str().replace(',', "");
    digits.parse().ok()
}

fn parse_loose_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(additions: u64, deletions: u64) -> Option<DiffStats> {
        Some(DiffStats { additions, deletions })
    }

    #[test]
    fn test_worded_label() {
        assert_eq!(parse_stats_text("12 additions and 3 deletions"), stats(12, 3));
        assert_eq!(parse_stats_text("1 addition & 1 deletion"), stats(1, 1));
        assert_eq!(parse_stats_text("1,204 Additions, 7 Deletions"), stats(1204, 7));
    }

    #[test]
    fn test_compact_label() {
        assert_eq!(parse_stats_text("+12 -3"), stats(12, 3));
        assert_eq!(parse_stats_text("+1,500 \u{2212}20"), stats(1500, 20));
        assert_eq!(parse_stats_text("+ 8"), stats(8, 0));
    }

    #[test]
    fn test_single_side_defaults_other_to_zero() {
        assert_eq!(parse_stats_text("5 deletions"), stats(0, 5));
    }

    #[test]
    fn test_no_numbers() {
        assert_eq!(parse_stats_text(""), None);
        assert_eq!(parse_stats_text("   "), None);
        assert_eq!(parse_stats_text("Files changed"), None);
    }

    #[test]
    fn test_marker_texts() {
        assert_eq!(parse_marker_texts(Some("+1,024"), Some("−16")), stats(1024, 16));
        assert_eq!(parse_marker_texts(Some("+4"), None), stats(4, 0));
        assert_eq!(parse_marker_texts(Some("none"), Some("")), None);
        assert_eq!(parse_marker_texts(None, None), None);
    }
}
