//! CSV serialization of extracted records

use crate::pipeline::PageRecord;
use crate::title::{Title, TitleShape};
use crate::ExtractError;
use log::info;
use std::path::Path;

/// Write records to a CSV file, overwriting any existing file.
///
/// Column order is fixed: `Page,Title,Footnotes` for single-line titles,
/// `Page,Id,Title,Population,Footnotes` for 3-line blocks. Refuses to write
/// an empty spreadsheet: zero records is the caller's `NoData` case.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    records: &[PageRecord],
    shape: TitleShape,
) -> Result<(), ExtractError> {
    if records.is_empty() {
        return Err(ExtractError::NoData);
    }

    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    match shape {
        TitleShape::SingleLine => {
            writer.write_record(["Page", "Title", "Footnotes"])?;
        }
        TitleShape::ThreeLineBlock => {
            writer.write_record(["Page", "Id", "Title", "Population", "Footnotes"])?;
        }
    }

    for record in records {
        let page = record.page.to_string();
        match &record.title {
            Title::Single(title) => {
                writer.write_record([page.as_str(), title.as_str(), record.footnotes.as_str()])?;
            }
            Title::Block {
                id,
                name,
                population,
            } => {
                writer.write_record([
                    page.as_str(),
                    id.as_str(),
                    name.as_str(),
                    population.as_str(),
                    record.footnotes.as_str(),
                ])?;
            }
        }
    }

    writer.flush()?;
    info!("wrote {} row(s) to {}", records.len(), path.display());
    Ok(())
}
