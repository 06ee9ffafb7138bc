//! Projection of source rows onto the canonical ten-column POD grid.
//!
//! Export never fails on data quality: whatever the store resolves is written,
//! and only a summary counts the gaps.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;

use crate::mapping::{resolve, MappingStore};
use crate::parser::Dataset;
use crate::schema::{self, FieldKey};
use crate::validation::strip_isbn;

/// Sheet name for exported data.
pub const EXPORT_SHEET_NAME: &str = "POD_Template_Data";

/// Sheet name for the blank template.
pub const TEMPLATE_SHEET_NAME: &str = "POD_Template";

/// Number format attached to integer ISBN cells.
pub const ISBN_NUMBER_FORMAT: &str = "0";

const TEMPLATE_SAMPLE_ROW: [&str; 8] = [
    "9781234567890",
    "Sample Book Title - Max 58 Characters",
    "198",
    "129",
    "Amber Preprint 80 gsm",
    "Limp",
    "320",
    "Gloss",
];

// =============================================================================
// Types
// =============================================================================

/// One output cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    /// A whole number with a display format, used for ISBNs.
    Integer { value: u64, format: &'static str },
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Text(s) if s.is_empty())
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Integer { value, .. } => write!(f, "{}", value),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Integer { value, .. } => serializer.serialize_u64(*value),
        }
    }
}

/// Export toggles. All default to on, also when missing from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default = "default_true")]
    pub include_headers: bool,
    #[serde(default = "default_true")]
    pub validate_data: bool,
    #[serde(default = "default_true")]
    pub apply_value_mappings: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            include_headers: true,
            validate_data: true,
            apply_value_mappings: true,
        }
    }
}

/// Counters reported after a projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub exported_rows: usize,
    pub value_mappings_applied: usize,
    /// Counted per (row, required field) with an empty value, and only when
    /// `validate_data` is on.
    pub rows_missing_required: usize,
}

impl ExportSummary {
    /// One-line human summary.
    pub fn message(&self) -> String {
        let mut message = format!("Successfully exported {} rows", self.exported_rows);
        if self.value_mappings_applied > 0 {
            message.push_str(&format!(
                " ({} value mappings applied)",
                self.value_mappings_applied
            ));
        }
        if self.rows_missing_required > 0 {
            message.push_str(&format!(
                " ({} rows may have missing required data)",
                self.rows_missing_required
            ));
        }
        message
    }
}

/// The output grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub sheet_name: &'static str,
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<Cell>>,
    pub summary: ExportSummary,
}

impl Projection {
    /// Column labels, whether or not the header row is emitted.
    pub fn labels(&self) -> Vec<&'static str> {
        schema::fields().take(self.width()).map(|f| f.label).collect()
    }

    /// Number of cells per row.
    pub fn width(&self) -> usize {
        self.header
            .as_ref()
            .map(Vec::len)
            .or_else(|| self.rows.first().map(Vec::len))
            .unwrap_or(FieldKey::ALL.len())
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Project every row onto all ten fields in schema order.
pub fn project(dataset: &Dataset, store: &MappingStore, settings: &ExportSettings) -> Projection {
    let mut summary = ExportSummary::default();

    let header = settings
        .include_headers
        .then(|| schema::fields().map(|f| f.label.to_string()).collect());

    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            schema::fields()
                .map(|field| {
                    let resolved = resolve(store, row, field.key, settings.apply_value_mappings);
                    let value = match resolved {
                        Some(r) => {
                            if r.substituted {
                                summary.value_mappings_applied += 1;
                            }
                            r.value
                        }
                        None => String::new(),
                    };

                    if settings.validate_data && field.required && value.is_empty() {
                        summary.rows_missing_required += 1;
                    }

                    if field.key == FieldKey::Isbn {
                        isbn_cell(value)
                    } else {
                        Cell::Text(value)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    summary.exported_rows = rows.len();

    Projection {
        sheet_name: EXPORT_SHEET_NAME,
        header,
        rows,
        summary,
    }
}

/// Integer cell when the separator-free ISBN is all digits and fits `u64`.
pub fn isbn_cell(value: String) -> Cell {
    let digits = strip_isbn(&value);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(number) = digits.parse::<u64>() {
            return Cell::Integer {
                value: number,
                format: ISBN_NUMBER_FORMAT,
            };
        }
    }
    Cell::Text(value)
}

/// Blank template: the eight required labels plus one sample row.
pub fn template_grid() -> Projection {
    let header = schema::required_fields()
        .map(|f| f.label.to_string())
        .collect::<Vec<_>>();
    let row = TEMPLATE_SAMPLE_ROW
        .iter()
        .map(|v| Cell::text(*v))
        .collect::<Vec<_>>();

    Projection {
        sheet_name: TEMPLATE_SHEET_NAME,
        header: Some(header),
        rows: vec![row],
        summary: ExportSummary {
            exported_rows: 1,
            ..Default::default()
        },
    }
}

/// Default export file name, e.g. `POD_Remapped_2024-03-01_14_05_09_123.csv`.
pub fn export_file_name(extension: &str, at: DateTime<Utc>) -> String {
    format!(
        "POD_Remapped_{}.{}",
        at.format("%Y-%m-%d_%H_%M_%S_%3f"),
        extension
    )
}

/// Default template file name.
pub fn template_file_name(extension: &str) -> String {
    format!("POD_Template_Format.{}", extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Row;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn dataset(rows: Vec<Value>) -> Dataset {
        let columns = rows
            .first()
            .and_then(Value::as_object)
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        let rows = rows
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect::<Vec<Row>>();
        Dataset::new(columns, rows)
    }

    fn store() -> MappingStore {
        let mut store = MappingStore::new();
        store.set_column(FieldKey::Isbn, "EAN");
        store.set_column(FieldKey::Title, "Name");
        store.set_column(FieldKey::BindingStyle, "Binding");
        store.set_fixed_value(FieldKey::Lamination, "Matt");
        store.set_value_mapping(FieldKey::BindingStyle, "Limp Bound", "Limp");
        store
    }

    #[test]
    fn test_rows_follow_schema_order() {
        let data = dataset(vec![json!({
            "Name": "A Book",
            "EAN": "978-1-234-56789-0",
            "Binding": "Limp Bound"
        })]);
        let projection = project(&data, &store(), &ExportSettings::default());

        let header = projection.header.as_ref().unwrap();
        assert_eq!(header.len(), 10);
        assert_eq!(header[0], "ISBN");
        assert_eq!(header[9], "Plate Section 2");

        let row = &projection.rows[0];
        assert_eq!(row.len(), 10);
        assert_eq!(
            row[0],
            Cell::Integer {
                value: 9781234567890,
                format: "0"
            }
        );
        assert_eq!(row[1], Cell::text("A Book"));
        assert_eq!(row[5], Cell::text("Limp"));
        assert_eq!(row[7], Cell::text("Matt"));
        assert!(row[9].is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let data = dataset(vec![
            json!({ "Name": "A", "EAN": "9781234567890", "Binding": "Limp Bound" }),
            json!({ "Name": "", "EAN": "9781234567890", "Binding": "Cased" }),
        ]);
        let projection = project(&data, &store(), &ExportSettings::default());

        assert_eq!(projection.summary.exported_rows, 2);
        assert_eq!(projection.summary.value_mappings_applied, 1);
        // Row 1 misses 4 unmapped required fields, row 2 the same plus Title
        assert_eq!(projection.summary.rows_missing_required, 9);
    }

    #[test]
    fn test_settings_toggle_behaviour() {
        let data = dataset(vec![json!({ "Name": "A", "EAN": "x", "Binding": "Limp Bound" })]);
        let settings = ExportSettings {
            include_headers: false,
            validate_data: false,
            apply_value_mappings: false,
        };
        let projection = project(&data, &store(), &settings);

        assert!(projection.header.is_none());
        assert_eq!(projection.rows[0][5], Cell::text("Limp Bound"));
        assert_eq!(projection.summary.value_mappings_applied, 0);
        assert_eq!(projection.summary.rows_missing_required, 0);
    }

    #[test]
    fn test_isbn_cell_keeps_text_when_not_numeric() {
        assert_eq!(isbn_cell("ISBN-pending".into()), Cell::text("ISBN-pending"));
        assert_eq!(isbn_cell(String::new()), Cell::text(""));
        assert_eq!(
            isbn_cell("99999999999999999999999".into()),
            Cell::text("99999999999999999999999")
        );
        assert_eq!(
            isbn_cell("978 1 234".into()),
            Cell::Integer {
                value: 9781234,
                format: "0"
            }
        );
    }

    #[test]
    fn test_cell_serializes_as_scalar() {
        let cells = vec![
            Cell::text("Gloss"),
            Cell::Integer {
                value: 9781234567890,
                format: "0",
            },
        ];
        assert_eq!(
            serde_json::to_string(&cells).unwrap(),
            r#"["Gloss",9781234567890]"#
        );
    }

    #[test]
    fn test_export_settings_default_when_missing() {
        let settings: ExportSettings =
            serde_json::from_str(r#"{ "includeHeaders": false }"#).unwrap();
        assert!(!settings.include_headers);
        assert!(settings.validate_data);
        assert!(settings.apply_value_mappings);
    }

    #[test]
    fn test_summary_message() {
        let summary = ExportSummary {
            exported_rows: 3,
            value_mappings_applied: 2,
            rows_missing_required: 1,
        };
        assert_eq!(
            summary.message(),
            "Successfully exported 3 rows (2 value mappings applied) (1 rows may have missing required data)"
        );
    }

    #[test]
    fn test_template_grid() {
        let grid = template_grid();
        assert_eq!(grid.sheet_name, "POD_Template");
        let header = grid.header.as_ref().unwrap();
        assert_eq!(header.len(), 8);
        assert_eq!(header[7], "Lamination");
        assert_eq!(grid.rows[0][4], Cell::text("Amber Preprint 80 gsm"));
        assert_eq!(grid.labels().len(), 8);
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(
            export_file_name("csv", at),
            "POD_Remapped_2024-03-01_14_05_09_123.csv"
        );
    }
}
