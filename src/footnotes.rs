//! Footnote extraction policies
//!
//! Three document families, three ways of locating the footnote region:
//! scan every separator-bounded block, crop below the N-th separator rule,
//! or crop a fixed fraction of the page footer. One policy is selected per
//! document by configuration; the line-level cleanup is shared.

use crate::page::{filter_separator_rules, PageContent};
use crate::segment::{build_anchors, segment_blocks};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// "Page 3" / "Page 3 of 10" noise line.
static PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^Page\s*\d+").unwrap());

/// Rendered separator artifact: a line of rule glyphs and underscores.
static RULE_ARTIFACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s_\-—–─]+$").unwrap());

/// In-house annotation never meant for the output.
static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^programming note").unwrap());

/// Confidentiality banner, present on every footer of some sponsors.
static CONFIDENTIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)confidential").unwrap());

/// Explicit footnote reference id: "(3) text...".
static EXPLICIT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((\d+)\)(.*)").unwrap());

/// Keyword opening a footer note in threshold-cropped documents.
const NOTE_PREFIX: &str = "Note:";

/// How block-scan assigns reference ids to surviving lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdAssignment {
    /// Every surviving line gets the next sequential id.
    Sequential,
    /// A leading "(N)" marker assigns the id; unmarked lines continue the
    /// most recent one.
    Explicit,
}

/// Named, swappable strategy for locating the footnote region on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FootnotePolicy {
    /// Walk every separator-bounded block in page order.
    BlockScan { ids: IdAssignment },
    /// Everything below the N-th separator rule (1-indexed, top to bottom).
    FixedCount { separator_index: usize },
    /// Keyword/abbreviation scan over the bottom fraction of the page.
    FooterThreshold { fraction: f32 },
}

impl Default for FootnotePolicy {
    fn default() -> Self {
        FootnotePolicy::BlockScan {
            ids: IdAssignment::Sequential,
        }
    }
}

/// Shared cleanup: trim, drop empties and noise lines.
fn clean_lines<'a, I: IntoIterator<Item = &'a String>>(lines: I) -> Vec<String> {
    lines
        .into_iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter(|l| !PAGE_NUMBER_RE.is_match(l))
        .filter(|l| !RULE_ARTIFACT_RE.is_match(l))
        .filter(|l| !BOILERPLATE_RE.is_match(l))
        .map(|l| l.to_string())
        .collect()
}

/// Extract footnote entries from one page under the given policy.
///
/// `title_pattern` is the pattern used to locate title anchors; it must be
/// the same one the title matcher ran with, so blocks end where titles begin.
pub fn extract_footnotes(
    page: &PageContent,
    policy: &FootnotePolicy,
    title_pattern: &Regex,
) -> Vec<String> {
    match policy {
        FootnotePolicy::BlockScan { ids } => block_scan(page, *ids, title_pattern),
        FootnotePolicy::FixedCount { separator_index } => {
            fixed_count(page, *separator_index, title_pattern)
        }
        FootnotePolicy::FooterThreshold { fraction } => footer_threshold(page, *fraction),
    }
}

/// Render extracted entries to the output cell.
pub fn render_footnotes(entries: &[String]) -> String {
    if entries.is_empty() {
        "N/A".to_string()
    } else {
        entries.join(" | ")
    }
}

fn separator_ys(page: &PageContent) -> Vec<f32> {
    let mut ys: Vec<f32> = filter_separator_rules(&page.rules, page.width)
        .iter()
        .map(|r| r.y)
        .collect();
    ys.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    ys
}

fn block_scan(page: &PageContent, ids: IdAssignment, title_pattern: &Regex) -> Vec<String> {
    let separators = separator_ys(page);
    let titles = page.find_all_line_tops(title_pattern);
    let anchors = build_anchors(&separators, &titles, page.height);
    let blocks = segment_blocks(&anchors);

    let mut lines = Vec::new();
    for block in blocks {
        let extracted = page.text_in_region(0.0, block.top, page.width, block.bottom);
        lines.extend(clean_lines(&extracted));
    }

    match ids {
        IdAssignment::Sequential => assign_sequential_ids(&lines),
        IdAssignment::Explicit => fold_explicit_ids(&lines),
    }
}

fn fixed_count(page: &PageContent, separator_index: usize, title_pattern: &Regex) -> Vec<String> {
    let separators = separator_ys(page);
    if separator_index == 0 || separators.len() < separator_index {
        debug!(
            "page {}: {} separator rule(s), policy needs {}; empty footnotes",
            page.index,
            separators.len(),
            separator_index
        );
        return Vec::new();
    }
    let top = separators[separator_index - 1];

    // Cap the region at the next title below the separator, if any.
    let bottom = page
        .find_all_line_tops(title_pattern)
        .into_iter()
        .filter(|&y| y > top)
        .fold(f32::INFINITY, f32::min)
        .min(page.height);

    let extracted = page.text_in_region(0.0, top, page.width, bottom);
    clean_lines(&extracted)
}

fn footer_threshold(page: &PageContent, fraction: f32) -> Vec<String> {
    let fraction = fraction.clamp(0.0, 1.0);
    let top = page.height * (1.0 - fraction);
    let extracted = page.text_in_region(0.0, top, page.width, page.height);

    extracted
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter(|l| !PAGE_NUMBER_RE.is_match(l))
        .filter(|l| !CONFIDENTIAL_RE.is_match(l))
        .filter(|l| l.starts_with(NOTE_PREFIX) || l.contains('='))
        .map(|l| l.to_string())
        .collect()
}

/// Each surviving line gets a fresh sequential id.
fn assign_sequential_ids(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| format!("({}) {}", i + 1, l))
        .collect()
}

/// Fold over the ordered lines carrying (id → text, last-seen id).
///
/// Lines with a "(N)" prefix open entry N; unmarked lines continue the most
/// recent entry; a repeated explicit id concatenates onto the existing text
/// (multi-line continuation), never overwrites. Lines before the first
/// marker have no entry to attach to and are dropped.
fn fold_explicit_ids(lines: &[String]) -> Vec<String> {
    let (entries, _) = lines.iter().fold(
        (BTreeMap::<u32, String>::new(), None::<u32>),
        |(mut entries, last_id), line| {
            if let Some(caps) = EXPLICIT_ID_RE.captures(line) {
                let id: u32 = caps[1].parse().unwrap_or(0);
                let text = caps[2].trim().to_string();
                entries
                    .entry(id)
                    .and_modify(|existing| {
                        existing.push(' ');
                        existing.push_str(&text);
                    })
                    .or_insert(text);
                (entries, Some(id))
            } else if let Some(id) = last_id {
                if let Some(existing) = entries.get_mut(&id) {
                    existing.push(' ');
                    existing.push_str(line);
                }
                (entries, Some(id))
            } else {
                (entries, None)
            }
        },
    );

    entries
        .into_iter()
        .map(|(id, text)| format!("({}) {}", id, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TextItem;

    fn make_item(text: &str, x: f32, top: f32) -> TextItem {
        TextItem {
            text: text.to_string(),
            x,
            top,
            height: 10.0,
            font_size: 10.0,
        }
    }

    fn make_page(items: Vec<TextItem>, rule_ys: &[f32]) -> PageContent {
        use crate::page::RuleLine;
        PageContent {
            index: 1,
            width: 612.0,
            height: 792.0,
            items,
            rules: rule_ys
                .iter()
                .map(|&y| RuleLine { y, x0: 30.0, x1: 580.0 })
                .collect(),
        }
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    static TITLE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(Table|Figure|Listing)\s[\d\.]+\s?.*").unwrap());

    #[test]
    fn test_explicit_id_continuation() {
        let lines = strings(&["(1) First part", "continued text", "(2) Second"]);
        let entries = fold_explicit_ids(&lines);
        assert_eq!(
            entries,
            vec![
                "(1) First part continued text".to_string(),
                "(2) Second".to_string(),
            ]
        );
    }

    #[test]
    fn test_explicit_id_repeat_concatenates() {
        let lines = strings(&["(1) alpha", "(2) beta", "(1) gamma"]);
        let entries = fold_explicit_ids(&lines);
        assert_eq!(entries[0], "(1) alpha gamma");
        assert_eq!(entries[1], "(2) beta");
    }

    #[test]
    fn test_unmarked_leading_lines_dropped() {
        let lines = strings(&["orphan line", "(1) real"]);
        let entries = fold_explicit_ids(&lines);
        assert_eq!(entries, vec!["(1) real".to_string()]);
    }

    #[test]
    fn test_sequential_ids() {
        let lines = strings(&["alpha", "beta"]);
        assert_eq!(
            assign_sequential_ids(&lines),
            vec!["(1) alpha".to_string(), "(2) beta".to_string()]
        );
    }

    #[test]
    fn test_clean_lines_filters_noise() {
        let lines = strings(&[
            "  (1) AE counts are per subject  ",
            "",
            "Page 4 of 12",
            "______________________",
            "Programming note: rerun with final cut",
            "real footnote",
        ]);
        assert_eq!(
            clean_lines(&lines),
            vec![
                "(1) AE counts are per subject".to_string(),
                "real footnote".to_string(),
            ]
        );
    }

    #[test]
    fn test_block_scan_collects_below_separator() {
        let page = make_page(
            vec![
                make_item("Table 1.1: Summary", 40.0, 60.0),
                make_item("body cell", 40.0, 300.0),
                make_item("(1) denominator is N", 40.0, 660.0),
                make_item("Page 2 of 9", 40.0, 760.0),
            ],
            &[640.0],
        );
        let entries = block_scan(&page, IdAssignment::Explicit, &TITLE_RE);
        assert_eq!(entries, vec!["(1) denominator is N".to_string()]);
    }

    #[test]
    fn test_block_scan_no_separators_no_entries() {
        let page = make_page(vec![make_item("(1) text", 40.0, 660.0)], &[]);
        assert!(block_scan(&page, IdAssignment::Explicit, &TITLE_RE).is_empty());
    }

    #[test]
    fn test_fixed_count_underflow_is_empty() {
        let page = make_page(vec![make_item("footnote", 40.0, 700.0)], &[200.0, 400.0]);
        let entries = fixed_count(&page, 3, &TITLE_RE);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_fixed_count_third_separator_to_bottom() {
        let page = make_page(
            vec![
                make_item("cell", 40.0, 300.0),
                make_item("source: listing 16.2", 40.0, 700.0),
            ],
            &[100.0, 400.0, 650.0],
        );
        let entries = fixed_count(&page, 3, &TITLE_RE);
        assert_eq!(entries, vec!["source: listing 16.2".to_string()]);
    }

    #[test]
    fn test_footer_threshold_keeps_notes_and_definitions() {
        let page = make_page(
            vec![
                make_item("Confidential", 40.0, 500.0),
                make_item("Note: see appendix", 40.0, 560.0),
                make_item("AE = adverse event", 40.0, 620.0),
                make_item("Page 3 of 10", 40.0, 700.0),
            ],
            &[],
        );
        // Bottom 40% starts at 475.2
        let entries = footer_threshold(&page, 0.4);
        assert_eq!(
            entries,
            vec![
                "Note: see appendix".to_string(),
                "AE = adverse event".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_footnotes() {
        assert_eq!(render_footnotes(&[]), "N/A");
        assert_eq!(
            render_footnotes(&strings(&["(1) a", "(2) b"])),
            "(1) a | (2) b"
        );
    }
}
