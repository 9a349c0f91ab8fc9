//! Title block recognition for TLF pages
//!
//! Clinical report pages open with a "Table 14.1.1", "Figure 2.3" or
//! "Listing 16.2" heading. Two layouts occur in practice: the whole
//! identifier and name on one line, or a fixed 3-line block (identifier,
//! name, population descriptor).

use once_cell::sync::Lazy;
use regex::Regex;

/// Line starts a title: section keyword, space, dotted numeric identifier.
pub static TITLE_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Table|Figure|Listing)\s[\d\.]+\s?.*").unwrap());

/// Stricter variant requiring a colon after the identifier, for documents
/// where body text mentions table numbers in prose.
pub static TITLE_COLON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Table|Figure|Listing)\s[\d\.]+\s?:.*").unwrap());

/// Embedded pagination artifact ("Page 3 of 12"), stripped from all fields.
static PAGE_ARTIFACT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Page\s*\d+\s*of\s*\d+").unwrap());

/// A recognized page title.
#[derive(Debug, Clone, PartialEq)]
pub enum Title {
    /// Identifier and name on a single line, returned verbatim (trimmed).
    Single(String),
    /// Fixed 3-line block: identifier, name, population descriptor.
    Block {
        id: String,
        name: String,
        population: String,
    },
}

impl Title {
    pub fn id(&self) -> &str {
        match self {
            Title::Single(line) => line,
            Title::Block { id, .. } => id,
        }
    }
}

/// Which title layout a document family uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleShape {
    SingleLine,
    ThreeLineBlock,
}

/// Remove embedded pagination artifacts and trim.
pub fn strip_page_artifacts(line: &str) -> String {
    PAGE_ARTIFACT_RE.replace_all(line, "").trim().to_string()
}

/// Scan a page's lines top-to-bottom for the first title match.
///
/// One title per page is the working assumption; further candidate lines are
/// logged so multi-title pages are observable.
pub fn find_title(lines: &[String], shape: TitleShape, require_colon: bool) -> Option<Title> {
    let pattern: &Regex = if require_colon {
        &TITLE_COLON_RE
    } else {
        &TITLE_START_RE
    };

    let first = lines.iter().position(|l| pattern.is_match(l.trim()))?;

    let extras = lines[first + 1..]
        .iter()
        .filter(|l| pattern.is_match(l.trim()))
        .count();
    if extras > 0 {
        log::debug!(
            "{} additional title-pattern line(s) after the first; keeping the top-most",
            extras
        );
    }

    match shape {
        TitleShape::SingleLine => Some(Title::Single(strip_page_artifacts(&lines[first]))),
        TitleShape::ThreeLineBlock => {
            // The block needs a name line and a population line after the id;
            // a truncated block yields no title rather than a partial record.
            if first + 2 >= lines.len() {
                return None;
            }
            Some(Title::Block {
                id: strip_page_artifacts(&lines[first]),
                name: strip_page_artifacts(&lines[first + 1]),
                population: strip_page_artifacts(&lines[first + 2]),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_line_title_recognized_verbatim() {
        let page = lines(&[
            "Protocol XYZ-123",
            "Table 14.1.1: Summary of Demographics",
            "Age (years)  n  Mean",
        ]);
        let title = find_title(&page, TitleShape::SingleLine, false).unwrap();
        assert_eq!(
            title,
            Title::Single("Table 14.1.1: Summary of Demographics".to_string())
        );
    }

    #[test]
    fn test_missing_space_rejected() {
        let page = lines(&["table14.1.1", "body"]);
        assert!(find_title(&page, TitleShape::SingleLine, false).is_none());
        let page2 = lines(&["Table14.1.1: Summary", "body"]);
        assert!(find_title(&page2, TitleShape::SingleLine, false).is_none());
    }

    #[test]
    fn test_colon_strict_variant() {
        let page = lines(&["Table 2.1 continued from before", "Listing 16.2: Deaths"]);
        let title = find_title(&page, TitleShape::SingleLine, true).unwrap();
        assert_eq!(title, Title::Single("Listing 16.2: Deaths".to_string()));
    }

    #[test]
    fn test_three_line_block() {
        let page = lines(&["Table 1.1", "Demographics", "All Subjects", "body text..."]);
        let title = find_title(&page, TitleShape::ThreeLineBlock, false).unwrap();
        assert_eq!(
            title,
            Title::Block {
                id: "Table 1.1".to_string(),
                name: "Demographics".to_string(),
                population: "All Subjects".to_string(),
            }
        );
    }

    #[test]
    fn test_truncated_block_yields_nothing() {
        let page = lines(&["Table 1.1", "Demographics"]);
        assert!(find_title(&page, TitleShape::ThreeLineBlock, false).is_none());
    }

    #[test]
    fn test_page_artifacts_stripped() {
        let page = lines(&["Table 3.2: Adverse Events Page 4 of 17", "x"]);
        let title = find_title(&page, TitleShape::SingleLine, false).unwrap();
        assert_eq!(title, Title::Single("Table 3.2: Adverse Events".to_string()));
    }

    #[test]
    fn test_no_title_no_match() {
        let page = lines(&["Interim Analysis", "Sponsor Confidential"]);
        assert!(find_title(&page, TitleShape::SingleLine, false).is_none());
    }

    #[test]
    fn test_figure_keyword_recognized() {
        let page = lines(&["Figure 9.4 Kaplan-Meier Plot"]);
        let title = find_title(&page, TitleShape::SingleLine, false).unwrap();
        assert_eq!(title.id(), "Figure 9.4 Kaplan-Meier Plot");
    }
}
