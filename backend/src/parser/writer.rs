//! Output side of the sheet codec: projected grids to CSV or JSON bytes.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::str::FromStr;

use crate::error::{ExportError, ExportResult};
use crate::transform::projector::{Cell, Projection};

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    /// Render a projection in this format.
    pub fn write(&self, projection: &Projection) -> ExportResult<Vec<u8>> {
        match self {
            OutputFormat::Csv => write_csv(projection),
            OutputFormat::Json => write_json(projection),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected csv or json)", other)),
        }
    }
}

/// CSV bytes. Integer ISBN cells are written unquoted.
pub fn write_csv(projection: &Projection) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(false)
        .from_writer(Vec::new());

    if let Some(header) = &projection.header {
        writer.write_record(header)?;
    }
    for row in &projection.rows {
        writer.write_record(row.iter().map(Cell::to_string))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Finish(e.to_string()))
}

/// Pretty JSON array, one object per row keyed by field label in schema
/// order. Integer ISBN cells become JSON numbers.
///
/// The header toggle does not apply: keys always carry the labels.
pub fn write_json(projection: &Projection) -> ExportResult<Vec<u8>> {
    let labels = projection.labels();
    let rows = projection
        .rows
        .iter()
        .map(|cells| JsonRow {
            labels: &labels,
            cells,
        })
        .collect::<Vec<_>>();

    Ok(serde_json::to_vec_pretty(&rows)?)
}

struct JsonRow<'a> {
    labels: &'a [&'static str],
    cells: &'a [Cell],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (label, cell) in self.labels.iter().zip(self.cells) {
            map.serialize_entry(label, cell)?;
        }
        map.end()
    }
}
