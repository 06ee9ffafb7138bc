//! The mapping session: one dataset, one mapping store, one cached
//! validation result.
//!
//! All engine state lives here and every operation is a synchronous pass over
//! the in-memory rows. Any mutation of the mapping invalidates the cached
//! [`ValidationResult`].
//!
//! # Lifecycle
//!
//! ```text
//! load_dataset ──▶ auto-match every field ────────▶ edit mappings ──▶ validate ──▶ export
//!        ▲                                             ▲
//!        └── unmatched fields keep their bindings      └── load_config replaces all three tables
//! ```

use serde::Serialize;
use std::collections::HashSet;

use crate::config::{self, LoadedConfig, MappingConfig};
use crate::error::{ConfigResult, InputError, InputResult, PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::mapping::{find_best_value_match, match_field, resolve, MappingStore};
use crate::parser::{cell_text, Dataset};
use crate::schema::{self, FieldKey};
use crate::transform::projector::{self, ExportSettings, Projection};
use crate::validation::{self, ValidationResult};

/// Rows shown by the preview projections.
pub const PREVIEW_ROWS: usize = 5;

/// A column mapping that points at a column the current dataset lacks.
///
/// Not an error: the field resolves to empty values until remapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReference {
    pub field: FieldKey,
    pub column: String,
}

impl std::fmt::Display for StaleReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is mapped to column \"{}\", which is not in the current sheet",
            self.field, self.column
        )
    }
}

/// Mapping progress at a glance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSummary {
    pub total_rows: usize,
    /// Column mappings plus fixed values.
    pub mapped_count: usize,
    pub column_count: usize,
    pub fixed_count: usize,
    pub value_mapping_count: usize,
    pub required_mapped: usize,
    pub required_total: usize,
    pub complete: bool,
    pub config_name: Option<String>,
}

/// First rows of every mapped or fixed field, without value substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    dataset: Option<Dataset>,
    store: MappingStore,
    validation: Option<ValidationResult>,
    export_settings: ExportSettings,
    config_name: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Last validation result, if still current.
    pub fn validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn export_settings(&self) -> &ExportSettings {
        &self.export_settings
    }

    pub fn set_export_settings(&mut self, settings: ExportSettings) {
        self.export_settings = settings;
    }

    /// Name of the configuration last loaded or saved.
    pub fn config_name(&self) -> Option<&str> {
        self.config_name.as_deref()
    }

    // -------------------------------------------------------------------------
    // Dataset
    // -------------------------------------------------------------------------

    /// Replace the dataset.
    ///
    /// Every field is auto-matched against the new headers. A match replaces
    /// the field's column or fixed value; fields without a match keep their
    /// bindings, even stale ones. Returns the fields that were auto-matched.
    /// An empty dataset is refused and changes nothing.
    pub fn load_dataset(&mut self, dataset: Dataset) -> InputResult<Vec<FieldKey>> {
        if dataset.columns.is_empty() {
            return Err(InputError::NoHeaders);
        }
        if dataset.is_empty() {
            return Err(InputError::NoDataRows);
        }

        log_success(format!(
            "Loaded {} rows with {} columns",
            dataset.len(),
            dataset.columns.len()
        ));

        self.dataset = Some(dataset);
        self.validation = None;

        let matched = self.auto_match_columns();
        for stale in self.stale_columns() {
            log_warning(stale.to_string());
        }
        Ok(matched)
    }

    /// Bind every field with a matching header to that column.
    pub fn auto_match_columns(&mut self) -> Vec<FieldKey> {
        let Some(dataset) = &self.dataset else {
            return Vec::new();
        };

        let mut matched = Vec::new();
        for field in schema::fields() {
            if let Some(column) = match_field(field, &dataset.columns) {
                log_info_indent(format!("{} -> {}", field.label, column), 1);
                self.store.set_column(field.key, column);
                matched.push(field.key);
            }
        }

        if !matched.is_empty() {
            self.validation = None;
            log_info(format!("Auto-mapped {} fields", matched.len()));
        }
        matched
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Apply a loaded configuration, replacing all three tables at once.
    ///
    /// Returns column mappings that do not resolve against the current
    /// dataset; those are logged but kept.
    pub fn apply_config(&mut self, loaded: LoadedConfig) -> Vec<StaleReference> {
        for key in &loaded.dropped_keys {
            log_warning(format!("Ignoring unknown field \"{}\" in configuration", key));
        }

        self.store = loaded.store;
        self.export_settings = loaded.export_settings;
        self.config_name = Some(loaded.name);
        self.validation = None;

        log_success(format!(
            "Configuration \"{}\" loaded successfully",
            self.config_name.as_deref().unwrap_or_default()
        ));

        let stale = self.stale_columns();
        for reference in &stale {
            log_warning(reference.to_string());
        }
        stale
    }

    /// Parse and apply a configuration document. On error nothing changes.
    pub fn load_config(&mut self, text: &str) -> ConfigResult<Vec<StaleReference>> {
        let loaded = config::deserialize(text)?;
        Ok(self.apply_config(loaded))
    }

    /// Snapshot the current mapping as a named configuration.
    pub fn save_config(&mut self, name: &str, description: &str) -> ConfigResult<MappingConfig> {
        let config = config::serialize(&self.store, &self.export_settings, name, description)?;
        self.config_name = Some(config.name.clone());
        log_success(format!("Configuration \"{}\" saved successfully", config.name));
        Ok(config)
    }

    // -------------------------------------------------------------------------
    // Mapping edits
    // -------------------------------------------------------------------------

    pub fn set_column(&mut self, field: FieldKey, column: &str) {
        self.store.set_column(field, column);
        self.validation = None;
    }

    pub fn set_fixed_value(&mut self, field: FieldKey, value: &str) {
        self.store.set_fixed_value(field, value);
        self.validation = None;
    }

    pub fn clear_column(&mut self, field: FieldKey) {
        self.store.clear_column(field);
        self.validation = None;
    }

    pub fn clear_fixed_value(&mut self, field: FieldKey) {
        self.store.clear_fixed_value(field);
        self.validation = None;
    }

    pub fn clear_field(&mut self, field: FieldKey) {
        self.store.clear_field(field);
        self.validation = None;
    }

    pub fn set_value_mapping(&mut self, field: FieldKey, raw: &str, canonical: &str) {
        self.store.set_value_mapping(field, raw, canonical);
        self.validation = None;
    }

    pub fn clear_value_mapping(&mut self, field: FieldKey, raw: &str) {
        self.store.clear_value_mapping(field, raw);
        self.validation = None;
    }

    pub fn clear_value_mappings(&mut self, field: FieldKey) {
        self.store.clear_value_mappings(field);
        self.validation = None;
    }

    /// Map every distinct raw value of a domain field to its best canonical
    /// value. Returns how many mappings were written.
    pub fn auto_map_values(&mut self, field: FieldKey) -> usize {
        let Some(domain) = field.value_domain() else {
            return 0;
        };

        let mut written = 0;
        for raw in self.unique_values(field) {
            if let Some(canonical) = find_best_value_match(&raw, domain) {
                self.store.set_value_mapping(field, &raw, canonical);
                written += 1;
            }
        }

        if written > 0 {
            self.validation = None;
            log_info(format!("Auto-mapped {} values for {}", written, field));
        }
        written
    }

    /// Forget the dataset, all mappings and settings.
    pub fn reset(&mut self) {
        *self = Self::default();
        log_info("Session reset");
    }

    // -------------------------------------------------------------------------
    // Validate / export
    // -------------------------------------------------------------------------

    /// True when every required field has a column mapping or fixed value.
    pub fn export_allowed(&self) -> bool {
        schema::required_fields().all(|f| self.store.is_mapped(f.key))
    }

    /// Labels of required fields with neither a column nor a fixed value.
    pub fn unmapped_required(&self) -> Vec<String> {
        schema::required_fields()
            .filter(|f| !self.store.is_mapped(f.key))
            .map(|f| f.label.to_string())
            .collect()
    }

    fn ready(&self) -> PipelineResult<&Dataset> {
        let dataset = self.dataset.as_ref().ok_or(PipelineError::NoData)?;
        if !self.export_allowed() {
            return Err(PipelineError::RequiredFieldsUnmapped(self.unmapped_required()));
        }
        Ok(dataset)
    }

    /// Validate all rows and cache the result.
    pub fn validate(&mut self) -> PipelineResult<&ValidationResult> {
        let result = validation::validate_rows(self.ready()?, &self.store);

        if result.is_valid() {
            log_success(format!("{} ({} rows)", result.status_text(), result.total_rows));
        } else {
            log_warning(format!(
                "{}: {} of {} rows valid",
                result.status_text(),
                result.valid_rows,
                result.total_rows
            ));
        }

        Ok(&*self.validation.insert(result))
    }

    /// Project the dataset with the current export settings.
    pub fn export(&self) -> PipelineResult<Projection> {
        let projection = projector::project(self.ready()?, &self.store, &self.export_settings);
        log_success(projection.summary.message());
        Ok(projection)
    }

    // -------------------------------------------------------------------------
    // Read-only projections
    // -------------------------------------------------------------------------

    /// First effective values of a field.
    pub fn column_preview(&self, field: FieldKey) -> Vec<String> {
        let Some(dataset) = &self.dataset else {
            return Vec::new();
        };
        dataset
            .rows
            .iter()
            .take(PREVIEW_ROWS)
            .filter_map(|row| resolve(&self.store, row, field, true).map(|r| r.value))
            .collect()
    }

    /// First rows of every mapped field, in schema order.
    pub fn preview_table(&self) -> PreviewTable {
        let fields: Vec<_> = schema::fields().filter(|f| self.store.is_mapped(f.key)).collect();
        let rows = self
            .dataset
            .iter()
            .flat_map(|d| d.rows.iter().take(PREVIEW_ROWS))
            .map(|row| {
                fields
                    .iter()
                    .map(|f| {
                        resolve(&self.store, row, f.key, false)
                            .map(|r| r.value)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        PreviewTable {
            headers: fields.iter().map(|f| f.label).collect(),
            rows,
        }
    }

    /// Distinct non-empty raw values of the column mapped to a field, in
    /// first-seen order.
    pub fn unique_values(&self, field: FieldKey) -> Vec<String> {
        let (Some(dataset), Some(column)) = (&self.dataset, self.store.column(field)) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        dataset
            .rows
            .iter()
            .filter_map(|row| row.get(column).map(cell_text))
            .filter(|v| !v.is_empty() && seen.insert(v.clone()))
            .collect()
    }

    pub fn mapping_summary(&self) -> MappingSummary {
        let required_total = schema::required_count();
        let required_mapped = schema::required_fields()
            .filter(|f| self.store.is_mapped(f.key))
            .count();
        let column_count = self.store.column_mappings().len();
        let fixed_count = self.store.fixed_values().len();

        MappingSummary {
            total_rows: self.dataset.as_ref().map_or(0, Dataset::len),
            mapped_count: column_count + fixed_count,
            column_count,
            fixed_count,
            value_mapping_count: self.store.value_mapping_count(),
            required_mapped,
            required_total,
            complete: required_mapped == required_total,
            config_name: self.config_name.clone(),
        }
    }

    /// Column mappings whose column is missing from the current dataset.
    /// Empty when no dataset is loaded.
    pub fn stale_columns(&self) -> Vec<StaleReference> {
        let Some(dataset) = &self.dataset else {
            return Vec::new();
        };
        self.store
            .column_mappings()
            .iter()
            .filter(|(field, column)| {
                self.store.fixed_value(**field).is_none() && !dataset.has_column(column)
            })
            .map(|(field, column)| StaleReference {
                field: *field,
                column: column.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use crate::transform::projector::Cell;

    const SHEET: &str = "\
EAN,Book Title,Height,Width,Paper,Binding,Pages,Finish,Author
9781234567890,First Book,198,129,Woodfree 80 gsm,Limp Bound,320,Gloss,Ann
,Second Book,198,129,Woodfree 80 gsm,Cased,200,Matt,Bob
978-1-234-56789-0,Third Book,234,156,Navigator 80 gsm,limp,96,glossy,Cy
";

    fn sheet() -> Dataset {
        parse_str(SHEET, ',').unwrap()
    }

    fn mapped_session() -> Session {
        let mut session = Session::new();
        session.load_dataset(sheet()).unwrap();
        session.set_column(FieldKey::Isbn, "EAN");
        session.set_column(FieldKey::TrimHeight, "Height");
        session.set_column(FieldKey::TrimWidth, "Width");
        session.set_column(FieldKey::PaperType, "Paper");
        session.set_column(FieldKey::BindingStyle, "Binding");
        session.set_column(FieldKey::PageExtent, "Pages");
        session.set_column(FieldKey::Lamination, "Finish");
        session
    }

    #[test]
    fn test_load_auto_matches_columns() {
        let mut session = Session::new();
        let matched = session.load_dataset(sheet()).unwrap();

        assert!(matched.contains(&FieldKey::Title));
        assert_eq!(session.store().column(FieldKey::Title), Some("Book Title"));
        assert!(!session.store().is_mapped(FieldKey::Lamination));
    }

    #[test]
    fn test_empty_dataset_leaves_session_untouched() {
        let mut session = mapped_session();
        let before = session.dataset().cloned();

        let empty = Dataset::new(vec!["A".into()], Vec::new());
        assert!(matches!(session.load_dataset(empty), Err(InputError::NoDataRows)));
        assert_eq!(session.dataset().cloned(), before);
    }

    #[test]
    fn test_export_gated_on_required_fields() {
        let mut session = Session::new();
        session.load_dataset(sheet()).unwrap();
        assert!(!session.export_allowed());

        match session.export() {
            Err(PipelineError::RequiredFieldsUnmapped(labels)) => {
                assert!(labels.contains(&"ISBN".to_string()));
            }
            other => panic!("expected gating error, got {:?}", other.map(|p| p.rows.len())),
        }

        let session = mapped_session();
        assert!(session.export_allowed());
        assert!(session.export().is_ok());
    }

    #[test]
    fn test_fixed_value_satisfies_gating() {
        let mut session = mapped_session();
        session.clear_field(FieldKey::Lamination);
        assert!(!session.export_allowed());
        session.set_fixed_value(FieldKey::Lamination, "Gloss");
        assert!(session.export_allowed());
    }

    #[test]
    fn test_single_entry_clears_invalidate() {
        let mut session = mapped_session();
        session.set_fixed_value(FieldKey::Lamination, "Gloss");
        session.set_value_mapping(FieldKey::BindingStyle, "Limp Bound", "Limp");

        session.validate().unwrap();
        session.clear_value_mapping(FieldKey::BindingStyle, "Limp Bound");
        assert!(session.validation().is_none());
        assert_eq!(session.store().value_mapping_count(), 0);

        session.validate().unwrap();
        session.clear_fixed_value(FieldKey::Lamination);
        assert!(session.validation().is_none());
        assert!(!session.store().is_mapped(FieldKey::Lamination));

        session.clear_column(FieldKey::Isbn);
        assert!(session.store().column(FieldKey::Isbn).is_none());
        assert!(!session.export_allowed());
    }

    #[test]
    fn test_validate_without_data() {
        let mut session = Session::new();
        assert!(matches!(session.validate(), Err(PipelineError::NoData)));
    }

    #[test]
    fn test_validate_caches_and_mutation_invalidates() {
        let mut session = mapped_session();
        let result = session.validate().unwrap().clone();

        assert_eq!(result.total_rows, 3);
        assert!(result.errors.contains(&"Row 2: ISBN is required but empty".to_string()));
        assert!(session.validation().is_some());

        session.set_value_mapping(FieldKey::BindingStyle, "Limp Bound", "Limp");
        assert!(session.validation().is_none());
    }

    #[test]
    fn test_auto_map_values_fixes_domain_errors() {
        let mut session = mapped_session();
        session.set_fixed_value(FieldKey::Isbn, "9781234567890");

        let before = session.validate().unwrap().clone();
        assert!(before
            .errors
            .iter()
            .any(|e| e.contains("Invalid binding style \"Limp Bound\"")));

        assert_eq!(session.auto_map_values(FieldKey::BindingStyle), 3);
        assert_eq!(session.auto_map_values(FieldKey::Lamination), 3);
        assert_eq!(session.auto_map_values(FieldKey::Title), 0);

        let after = session.validate().unwrap();
        assert!(after.is_valid(), "{:?}", after.errors);
        assert_eq!(after.valid_rows, 3);
        // identity mappings ("Cased" -> "Cased") are not counted
        assert_eq!(after.value_mappings_applied, 3);
    }

    #[test]
    fn test_config_round_trip_through_session() {
        let mut session = mapped_session();
        session.set_value_mapping(FieldKey::Lamination, "glossy", "Gloss");
        let config = session.save_config("Feed A", "").unwrap();
        assert_eq!(session.config_name(), Some("Feed A"));

        let mut other = Session::new();
        other.load_dataset(sheet()).unwrap();
        let stale = other.load_config(&config.to_json().unwrap()).unwrap();

        assert!(stale.is_empty());
        assert_eq!(other.store(), session.store());
        assert_eq!(other.mapping_summary().config_name.as_deref(), Some("Feed A"));
    }

    #[test]
    fn test_bad_config_changes_nothing() {
        let mut session = mapped_session();
        let before = session.store().clone();
        assert!(session.load_config(r#"{ "name": "x" }"#).is_err());
        assert_eq!(session.store(), &before);
    }

    #[test]
    fn test_stale_columns_degrade_to_empty() {
        let mut session = Session::new();
        session.load_dataset(sheet()).unwrap();
        let stale = session
            .load_config(r#"{ "columnMappings": { "ISBN": "ISBN13", "Title": "Book Title" } }"#)
            .unwrap();

        assert_eq!(
            stale,
            vec![StaleReference {
                field: FieldKey::Isbn,
                column: "ISBN13".into()
            }]
        );
        assert_eq!(session.column_preview(FieldKey::Isbn), vec!["", "", ""]);
    }

    #[test]
    fn test_new_upload_keeps_unmatched_bindings() {
        let mut session = mapped_session();
        session.set_fixed_value(FieldKey::Lamination, "Matt");

        let other = parse_str("Code,Name\nX1,Other Book\n", ',').unwrap();
        session.load_dataset(other).unwrap();

        assert_eq!(session.store().fixed_value(FieldKey::Lamination), Some("Matt"));
        assert_eq!(session.store().column(FieldKey::PaperType), Some("Paper"));
        assert!(session
            .stale_columns()
            .iter()
            .any(|s| s.field == FieldKey::PaperType));
        assert!(session.validation().is_none());
    }

    #[test]
    fn test_new_upload_rebinds_matched_fields() {
        let mut session = Session::new();
        session.set_column(FieldKey::Isbn, "EAN");
        session.set_fixed_value(FieldKey::Lamination, "Gloss");

        let sheet = parse_str("ISBN,Title,Lamination\n9780000000002,B,Matt\n", ',').unwrap();
        let matched = session.load_dataset(sheet).unwrap();

        assert!(matched.contains(&FieldKey::Isbn));
        assert_eq!(session.store().column(FieldKey::Isbn), Some("ISBN"));
        assert_eq!(session.column_preview(FieldKey::Isbn), vec!["9780000000002"]);
        assert_eq!(session.store().column(FieldKey::Lamination), Some("Lamination"));
        assert!(session.store().fixed_value(FieldKey::Lamination).is_none());
        assert!(session.stale_columns().is_empty());
    }

    #[test]
    fn test_previews() {
        let mut session = mapped_session();
        session.set_fixed_value(FieldKey::Lamination, "Matt");

        assert_eq!(
            session.column_preview(FieldKey::Title),
            vec!["First Book", "Second Book", "Third Book"]
        );

        let table = session.preview_table();
        assert_eq!(table.headers.len(), 8);
        assert_eq!(table.headers[7], "Lamination");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][5], "Limp Bound");
        assert_eq!(table.rows[2][7], "Matt");

        assert_eq!(
            session.unique_values(FieldKey::BindingStyle),
            vec!["Limp Bound", "Cased", "limp"]
        );
    }

    #[test]
    fn test_mapping_summary() {
        let mut session = mapped_session();
        session.clear_field(FieldKey::PageExtent);
        session.set_fixed_value(FieldKey::Lamination, "Matt");

        let summary = session.mapping_summary();
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.column_count, 6);
        assert_eq!(summary.fixed_count, 1);
        assert_eq!(summary.required_mapped, 7);
        assert_eq!(summary.required_total, 8);
        assert!(!summary.complete);
    }

    #[test]
    fn test_export_end_to_end() {
        let mut session = mapped_session();
        session.auto_map_values(FieldKey::BindingStyle);
        let projection = session.export().unwrap();

        assert_eq!(projection.rows.len(), 3);
        assert_eq!(projection.summary.exported_rows, 3);
        assert_eq!(projection.summary.rows_missing_required, 1);
        assert_eq!(
            projection.rows[2][0],
            Cell::Integer {
                value: 9781234567890,
                format: "0"
            }
        );
        assert_eq!(projection.rows[0][5], Cell::text("Limp"));
    }

    #[test]
    fn test_reset() {
        let mut session = mapped_session();
        session.reset();
        assert!(session.dataset().is_none());
        assert!(session.store().is_empty());
        assert!(session.config_name().is_none());
    }
}
