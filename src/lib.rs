//! Heuristic title and footnote extraction from clinical TLF report PDFs
//!
//! This crate provides:
//! - Page-level layout segmentation anchored on horizontal separator rules
//!   and title-pattern text
//! - Title block recognition (single-line and fixed 3-line layouts)
//! - Three footnote extraction policies selected per document family
//! - CSV serialization of the per-page records

pub mod footnotes;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod segment;
pub mod title;

pub use footnotes::{FootnotePolicy, IdAssignment};
pub use page::{PageContent, RuleLine, TextItem};
pub use pipeline::{extract_document, ExtractConfig, PageRecord};
pub use segment::{Anchor, AnchorKind, Block};
pub use title::{Title, TitleShape};

use std::path::Path;

/// Run the full pipeline: extract records from `input` and write them to
/// `output` as CSV.
///
/// Returns the number of rows written. A missing input file and a document
/// where no page matched any title are the only terminal failures; per-page
/// anomalies degrade and are logged.
pub fn extract_to_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &ExtractConfig,
) -> Result<usize, ExtractError> {
    let records = extract_document(input, config)?;
    output::write_csv(output, &records, config.title_shape)?;
    Ok(records.len())
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("source file not found: {}", .0.display())]
    SourceNotFound(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no data extracted: no page matched a title pattern")]
    NoData,
}

impl From<lopdf::Error> for ExtractError {
    fn from(e: lopdf::Error) -> Self {
        ExtractError::Parse(e.to_string())
    }
}
