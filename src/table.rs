use crate::error::{WindcastError, WindcastResult};
use chrono::{DateTime, Utc};

/// Time-indexed tabular input with named value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTable {
    index: Vec<DateTime<Utc>>,
    columns: Vec<(String, Vec<f64>)>,
}

impl TimeTable {
    pub fn new(
        index: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> WindcastResult<Self> {
        if index.is_empty() {
            return Err(WindcastError::data_format("a time table must have a non-empty index"));
        }
        if !index.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(WindcastError::data_format(
                "time table index must be strictly ascending",
            ));
        }
        if columns.is_empty() {
            return Err(WindcastError::data_format("a time table must have at least one column"));
        }
        for (name, values) in &columns {
            if values.len() != index.len() {
                return Err(WindcastError::data_format(format!(
                    "column '{name}' has {} rows, index has {}",
                    values.len(),
                    index.len()
                )));
            }
        }
        Ok(Self { index, columns })
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// The table's sole value column. Series construction from tabular input
    /// supports only single-column tables; anything wider is rejected.
    pub fn single_column(&self) -> WindcastResult<(&str, &[f64])> {
        match self.columns.as_slice() {
            [(name, values)] => Ok((name.as_str(), values.as_slice())),
            columns => Err(WindcastError::invalid_argument(format!(
                "series construction supports only single-column tables, got {} columns",
                columns.len()
            ))),
        }
    }
}
