use crate::error::{WindcastError, WindcastResult};
use crate::payload::RawValue;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Raw-table reader collaborator: resolves a file and an owning-entity name
/// into the timestamp -> values mapping consumed by series construction.
pub trait SeriesReader {
    fn read_series(
        &self,
        path: &Path,
        owner: &str,
    ) -> WindcastResult<BTreeMap<DateTime<Utc>, Vec<RawValue>>>;
}

/// Delimited-text reader. The first row is a header whose first column is the
/// timestamp; the owning-entity name selects the value column. Timestamps are
/// RFC 3339.
pub struct DelimitedReader {
    delimiter: char,
}

impl DelimitedReader {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn comma() -> Self {
        Self::new(',')
    }
}

impl SeriesReader for DelimitedReader {
    fn read_series(
        &self,
        path: &Path,
        owner: &str,
    ) -> WindcastResult<BTreeMap<DateTime<Utc>, Vec<RawValue>>> {
        let contents = std::fs::read_to_string(path)?;
        let mut lines = contents.lines();
        let header = lines
            .next()
            .ok_or_else(|| WindcastError::data_format(format!("{} is empty", path.display())))?;
        let columns: Vec<&str> = header.split(self.delimiter).map(str::trim).collect();
        let column = columns
            .iter()
            .skip(1)
            .position(|name| *name == owner)
            .map(|i| i + 1)
            .ok_or_else(|| {
                WindcastError::invalid_argument(format!(
                    "no column named '{owner}' in {}",
                    path.display()
                ))
            })?;

        let mut mapping = BTreeMap::new();
        for (offset, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = offset + 2; // 1-based, after the header
            let fields: Vec<&str> = line.split(self.delimiter).map(str::trim).collect();
            if fields.len() != columns.len() {
                return Err(WindcastError::data_format(format!(
                    "row {row} has {} fields, header has {}",
                    fields.len(),
                    columns.len()
                )));
            }
            let timestamp = DateTime::parse_from_rfc3339(fields[0])
                .map_err(|e| {
                    WindcastError::data_format(format!("row {row} has a bad timestamp: {e}"))
                })?
                .with_timezone(&Utc);
            let value: f64 = fields[column].parse().map_err(|e| {
                WindcastError::data_format(format!("row {row} has a bad value: {e}"))
            })?;
            if mapping.insert(timestamp, vec![RawValue::Scalar(value)]).is_some() {
                return Err(WindcastError::data_format(format!(
                    "duplicate timestamp {timestamp} at row {row}"
                )));
            }
        }
        if mapping.is_empty() {
            return Err(WindcastError::data_format(format!(
                "no data rows in {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), owner, rows = mapping.len(), "read series file");
        Ok(mapping)
    }
}
