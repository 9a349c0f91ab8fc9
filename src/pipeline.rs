//! Document-level orchestration
//!
//! Opens the PDF, walks its pages, and assembles one record per page that
//! carries a recognized title. Pages are independent: no state crosses page
//! boundaries, so they are processed in parallel and the records re-sorted
//! by page index afterwards.

use crate::footnotes::{extract_footnotes, render_footnotes, FootnotePolicy};
use crate::page::PageContent;
use crate::title::{find_title, Title, TitleShape, TITLE_COLON_RE, TITLE_START_RE};
use crate::ExtractError;
use log::{debug, info};
use lopdf::Document;
use rayon::prelude::*;
use regex::Regex;
use std::path::Path;

/// Per-document extraction configuration.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Title layout of this document family
    pub title_shape: TitleShape,
    /// Require a colon after the identifier (disambiguates prose mentions)
    pub require_colon: bool,
    /// How to locate the footnote region
    pub policy: FootnotePolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title_shape: TitleShape::SingleLine,
            require_colon: false,
            policy: FootnotePolicy::default(),
        }
    }
}

impl ExtractConfig {
    fn title_pattern(&self) -> &'static Regex {
        if self.require_colon {
            &TITLE_COLON_RE
        } else {
            &TITLE_START_RE
        }
    }
}

/// One output row: a page with a recognized title.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Page number (1-indexed)
    pub page: u32,
    pub title: Title,
    /// Rendered footnote cell (" | "-joined, "N/A" when empty)
    pub footnotes: String,
}

/// Extract records from every page of a PDF document.
///
/// Pages without a title are skipped silently; a page whose content cannot
/// be read is logged and skipped. Only a missing or unreadable file is
/// terminal. The result may be empty.
pub fn extract_document<P: AsRef<Path>>(
    path: P,
    config: &ExtractConfig,
) -> Result<Vec<PageRecord>, ExtractError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExtractError::SourceNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let pages: Vec<(u32, lopdf::ObjectId)> = doc.get_pages().into_iter().collect();
    info!("processing {} pages from {}", pages.len(), path.display());

    let mut records: Vec<PageRecord> = pages
        .par_iter()
        .filter_map(|&(page_num, page_id)| {
            let page = PageContent::build(&doc, page_id, page_num);
            process_page(&page, config)
        })
        .collect();

    // Parallel collection order is arbitrary; output is sorted by page index.
    records.sort_by_key(|r| r.page);
    Ok(records)
}

/// Title-gate one page and assemble its record.
pub fn process_page(page: &PageContent, config: &ExtractConfig) -> Option<PageRecord> {
    let lines = page.text_lines();
    let Some(title) = find_title(&lines, config.title_shape, config.require_colon) else {
        debug!("page {}: no title, skipped", page.index);
        return None;
    };

    let entries = extract_footnotes(page, &config.policy, config.title_pattern());
    debug!(
        "page {}: title {:?}, {} footnote entr{}",
        page.index,
        title.id(),
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" }
    );

    Some(PageRecord {
        page: page.index,
        title,
        footnotes: render_footnotes(&entries),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footnotes::IdAssignment;
    use crate::page::{RuleLine, TextItem};

    fn make_item(text: &str, x: f32, top: f32) -> TextItem {
        TextItem {
            text: text.to_string(),
            x,
            top,
            height: 10.0,
            font_size: 10.0,
        }
    }

    fn make_page(index: u32, items: Vec<TextItem>, rule_ys: &[f32]) -> PageContent {
        PageContent {
            index,
            width: 612.0,
            height: 792.0,
            items,
            rules: rule_ys
                .iter()
                .map(|&y| RuleLine { y, x0: 30.0, x1: 580.0 })
                .collect(),
        }
    }

    #[test]
    fn test_page_without_title_yields_no_record() {
        let page = make_page(1, vec![make_item("Appendix body text", 40.0, 100.0)], &[640.0]);
        assert!(process_page(&page, &ExtractConfig::default()).is_none());
    }

    #[test]
    fn test_titled_page_yields_record_with_footnotes() {
        let page = make_page(
            3,
            vec![
                make_item("Table 14.3.1: Adverse Events", 40.0, 60.0),
                make_item("body", 40.0, 300.0),
                make_item("(1) treatment emergent", 40.0, 660.0),
            ],
            &[640.0],
        );
        let config = ExtractConfig {
            policy: FootnotePolicy::BlockScan {
                ids: IdAssignment::Explicit,
            },
            ..ExtractConfig::default()
        };
        let record = process_page(&page, &config).unwrap();
        assert_eq!(record.page, 3);
        assert_eq!(
            record.title,
            Title::Single("Table 14.3.1: Adverse Events".to_string())
        );
        assert_eq!(record.footnotes, "(1) treatment emergent");
    }

    #[test]
    fn test_fixed_count_underflow_still_produces_record() {
        // One separator, policy wants three: record exists, footnotes empty
        let page = make_page(
            5,
            vec![
                make_item("Listing 16.1: Deaths", 40.0, 60.0),
                make_item("footer text", 40.0, 700.0),
            ],
            &[640.0],
        );
        let config = ExtractConfig {
            policy: FootnotePolicy::FixedCount { separator_index: 3 },
            ..ExtractConfig::default()
        };
        let record = process_page(&page, &config).unwrap();
        assert_eq!(record.footnotes, "N/A");
    }

    #[test]
    fn test_missing_source_is_terminal() {
        let err = extract_document("/no/such/file.pdf", &ExtractConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::SourceNotFound(_)));
    }
}
