//! CSV import for batch catalyst loads.
//!
//! Expected header: `ticker,catalyst_type,event_date,impact,description,source`.
//! `description` and `source` may be empty. Enum columns use the same
//! SCREAMING_SNAKE_CASE names as the JSON store.

use std::io::Read;
use std::path::Path;

use crate::domain::Catalyst;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: ticker is empty")]
    EmptyTicker { row: usize },
}

/// Parse catalysts from any CSV reader.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Catalyst>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (i, record) in rdr.deserialize::<Catalyst>().enumerate() {
        let mut catalyst = record?;
        if catalyst.ticker.is_empty() {
            return Err(ImportError::EmptyTicker { row: i + 1 });
        }
        catalyst.ticker = catalyst.ticker.to_ascii_uppercase();
        out.push(catalyst);
    }
    Ok(out)
}

/// Parse catalysts from a CSV file on disk.
pub fn read_csv_file(path: &Path) -> Result<Vec<Catalyst>, ImportError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    read_csv(file)
}
