//! Row validation against the POD template rules.
//!
//! Every row is checked on every *required* field. Optional fields (the two
//! plate sections) are not checked at all, not even for format.
//!
//! # Rules
//!
//! Run in this order for each (row, field); a failure never stops the later
//! checks, and every failure marks the row invalid:
//!
//! | Rule      | Applies to                             | Message |
//! |-----------|----------------------------------------|---------|
//! | presence  | all required fields                    | `{Label} is required but empty` |
//! | ISBN      | ISBN                                   | `Invalid ISBN format (must be 13 digits)` |
//! | length    | Title                                  | `Title exceeds 58 characters ({n} chars): "{v}"` |
//! | domain    | Paper Type, Binding Style, Lamination  | `Invalid binding style "{v}" (must be Limp or Cased)` ... |
//! | positive  | Trim Height, Trim Width, Page Extent   | `{Label} must be a positive number` |
//!
//! Each message is prefixed with `Row {n}: ` where `n` is the 1-based row index.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookload::validation::validate_rows;
//!
//! let result = validate_rows(&dataset, &store);
//! println!("{} / {} rows valid", result.valid_rows, result.total_rows);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::mapping::{resolve, MappingStore};
use crate::parser::Dataset;
use crate::schema::{self, FieldKey, ISBN_LENGTH, MAX_TITLE_LENGTH};

/// Errors shown by the presentation layer before truncating.
pub const DISPLAYED_ERRORS: usize = 20;

/// Warnings shown by the presentation layer before truncating.
pub const DISPLAYED_WARNINGS: usize = 10;

static ISBN_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]").expect("valid regex"));

static ISBN_13: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{13}$").expect("valid regex"));

static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(Infinity|(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?)").expect("valid regex")
});

// =============================================================================
// Result
// =============================================================================

/// Outcome of one validation pass over the whole dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<String>,
    /// No rule emits warnings yet; reserved for soft checks.
    pub warnings: Vec<String>,
    /// Number of (row, field) resolutions where a value mapping changed the value.
    #[serde(rename = "valueMappingsApplied")]
    pub value_mappings_applied: usize,
}

/// Overall status of a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "count", rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Warnings(usize),
    Errors(usize),
}

impl ValidationResult {
    pub fn invalid_rows(&self) -> usize {
        self.total_rows - self.valid_rows
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn status(&self) -> ValidationStatus {
        if !self.errors.is_empty() {
            ValidationStatus::Errors(self.errors.len())
        } else if !self.warnings.is_empty() {
            ValidationStatus::Warnings(self.warnings.len())
        } else {
            ValidationStatus::Valid
        }
    }

    pub fn status_text(&self) -> String {
        match self.status() {
            ValidationStatus::Valid => "All data valid".to_string(),
            ValidationStatus::Warnings(n) => format!("{} warnings found", n),
            ValidationStatus::Errors(n) => format!("{} errors found", n),
        }
    }

    /// First `limit` errors plus how many were left out.
    pub fn displayed_errors(&self, limit: usize) -> (&[String], usize) {
        truncate(&self.errors, limit)
    }

    /// First `limit` warnings plus how many were left out.
    pub fn displayed_warnings(&self, limit: usize) -> (&[String], usize) {
        truncate(&self.warnings, limit)
    }
}

fn truncate(items: &[String], limit: usize) -> (&[String], usize) {
    let shown = items.len().min(limit);
    (&items[..shown], items.len() - shown)
}

// =============================================================================
// Validation
// =============================================================================

/// Validate every row of a dataset through the mapping store.
///
/// Never aborts early; all rows and all required fields are checked.
pub fn validate_rows(dataset: &Dataset, store: &MappingStore) -> ValidationResult {
    let mut result = ValidationResult {
        total_rows: dataset.len(),
        ..Default::default()
    };

    for (index, row) in dataset.rows.iter().enumerate() {
        let row_number = index + 1;
        let mut has_errors = false;

        for field in schema::required_fields() {
            let resolved = resolve(store, row, field.key, true);
            if resolved.as_ref().is_some_and(|r| r.substituted) {
                result.value_mappings_applied += 1;
            }

            let value = resolved.as_ref().map(|r| r.value.as_str());
            for message in field_errors(field.key, value) {
                result.errors.push(format!("Row {}: {}", row_number, message));
                has_errors = true;
            }
        }

        if !has_errors {
            result.valid_rows += 1;
        }
    }

    result
}

/// All rule failures for one field value, in rule order.
///
/// Format rules only run on non-empty values. A whitespace-only value fails
/// presence and may also fail the format rules.
pub fn field_errors(field: FieldKey, value: Option<&str>) -> Vec<String> {
    let mut errors = Vec::new();
    let label = field.label();

    let value = value.unwrap_or("");
    if value.trim().is_empty() {
        errors.push(format!("{} is required but empty", label));
    }
    if value.is_empty() {
        return errors;
    }

    if field == FieldKey::Isbn && !is_valid_isbn(value) {
        errors.push("Invalid ISBN format (must be 13 digits)".to_string());
    }

    if field == FieldKey::Title {
        // Measured in UTF-16 code units, as spreadsheet tools count them
        let length = value.encode_utf16().count();
        if length > MAX_TITLE_LENGTH {
            errors.push(format!(
                "Title exceeds {} characters ({} chars): \"{}\"",
                MAX_TITLE_LENGTH, length, value
            ));
        }
    }

    if let Some(domain) = field.value_domain() {
        if !domain.contains(&value) {
            errors.push(domain_error(field, value));
        }
    }

    if field.is_positive_numeric() && !parse_float_prefix(value).is_some_and(|n| n > 0.0) {
        errors.push(format!("{} must be a positive number", label));
    }

    errors
}

fn domain_error(field: FieldKey, value: &str) -> String {
    match field {
        FieldKey::PaperType => format!("Invalid paper type \"{}\"", value),
        FieldKey::BindingStyle => {
            format!("Invalid binding style \"{}\" (must be Limp or Cased)", value)
        }
        FieldKey::Lamination => {
            format!("Invalid lamination \"{}\" (must be Gloss, Matt, or None)", value)
        }
        other => format!("Invalid {} \"{}\"", other.label().to_lowercase(), value),
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// Remove hyphens and whitespace from an ISBN.
pub fn strip_isbn(value: &str) -> String {
    ISBN_SEPARATORS.replace_all(value, "").into_owned()
}

/// True when the value is 13 decimal digits once separators are removed.
pub fn is_valid_isbn(value: &str) -> bool {
    let isbn = strip_isbn(value);
    isbn.len() == ISBN_LENGTH && ISBN_13.is_match(&isbn)
}

/// Parse the longest leading decimal number, ignoring trailing text
/// (`"198mm"` reads as 198). Leading whitespace is skipped.
pub fn parse_float_prefix(value: &str) -> Option<f64> {
    let trimmed = value.trim_start();
    let matched = FLOAT_PREFIX.find(trimmed)?.as_str();
    match matched.trim_start_matches(['+', '-']) {
        "Infinity" if matched.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ => matched.parse().ok(),
    }
}

// =============================================================================
// Tests
// =============================================================================
