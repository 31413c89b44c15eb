//! Read/write the multi-table result document.
//!
//! The document is the portable output of a fit run: the (possibly
//! EBL-corrected) SED table, the parameter summary, the full flattened
//! posterior, and the corrected VHE table when one took part. Table names
//! and ordering are an external contract; downstream tooling looks tables up
//! by name.
//!
//! Undefined values (upper-limit rows, undetected bins) are stored as JSON
//! `null` and come back as NaN.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnData {
    Text(Vec<String>),
    Numeric(Vec<Option<f64>>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    /// Numeric column; NaN values persist as `null`.
    pub fn numeric(name: impl Into<String>, values: &[f64]) -> Column {
        Column {
            name: name.into(),
            data: ColumnData::Numeric(
                values
                    .iter()
                    .map(|&v| if v.is_finite() { Some(v) } else { None })
                    .collect(),
            ),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Column {
        Column {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Text(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values with `null` restored to NaN; `None` for text columns.
    pub fn as_numeric(&self) -> Option<Vec<f64>> {
        match &self.data {
            ColumnData::Numeric(v) => {
                Some(v.iter().map(|o| o.unwrap_or(f64::NAN)).collect())
            }
            ColumnData::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Table {
        Table {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDoc {
    pub tool: String,
    pub created_utc: DateTime<Utc>,
    pub source_name: String,
    /// Display name of the fitted model ("PowerLaw", "LogPar", ...).
    pub model: String,
    pub redshift: f64,
    /// User-facing EBL model label; absent when no correction was applied.
    pub ebl_model: Option<String>,
    pub warnings: Vec<String>,
    pub tables: Vec<Table>,
}

impl ResultDoc {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

pub fn write_result_doc(path: &Path, doc: &ResultDoc) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::io(path, e))?;
    serde_json::to_writer_pretty(file, doc)
        .map_err(|e| AppError::new(2, format!("Failed to write result document: {e}")))?;
    Ok(())
}

pub fn read_result_doc(path: &Path) -> Result<ResultDoc, AppError> {
    let file = File::open(path).map_err(|e| AppError::io(path, e))?;
    let doc: ResultDoc = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid result document: {e}")))?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ResultDoc {
        ResultDoc {
            tool: "gsed".to_string(),
            created_utc: Utc::now(),
            source_name: "4FGL J0000.0+0000".to_string(),
            model: "PowerLaw".to_string(),
            redshift: 0.31,
            ebl_model: Some("Dominguez et al. (2011)".to_string()),
            warnings: vec![],
            tables: vec![
                Table::new(
                    "SED",
                    vec![
                        Column::numeric("e_ctr", &[200.0, 800.0]),
                        Column::numeric("e2dnde", &[1.2e-5, f64::NAN]),
                    ],
                ),
                Table::new(
                    "MCMC Parameters",
                    vec![
                        Column::text(
                            "Parameter",
                            vec!["N0 (log scale)".to_string(), "Alpha".to_string()],
                        ),
                        Column::numeric("Value", &[-11.2, 2.1]),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn tables_are_looked_up_by_name_in_order() {
        let doc = doc();
        assert_eq!(doc.tables[0].name, "SED");
        assert_eq!(doc.tables[1].name, "MCMC Parameters");
        assert!(doc.table("SED").is_some());
        assert!(doc.table("MCMC Posterior dist.").is_none());
    }

    #[test]
    fn nan_round_trips_as_null() {
        let doc = doc();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("null"));
        let back: ResultDoc = serde_json::from_str(&json).unwrap();
        let col = back.table("SED").unwrap().column("e2dnde").unwrap();
        let values = col.as_numeric().unwrap();
        assert!((values[0] - 1.2e-5).abs() < 1e-18);
        assert!(values[1].is_nan());
    }

    #[test]
    fn text_columns_survive_the_untagged_encoding() {
        let doc = doc();
        let json = serde_json::to_string(&doc).unwrap();
        let back: ResultDoc = serde_json::from_str(&json).unwrap();
        let col = back
            .table("MCMC Parameters")
            .unwrap()
            .column("Parameter")
            .unwrap();
        assert!(col.as_numeric().is_none());
        match &col.data {
            ColumnData::Text(v) => assert_eq!(v[1], "Alpha"),
            ColumnData::Numeric(_) => panic!("expected text column"),
        }
    }
}
