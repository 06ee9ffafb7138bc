//! Portable mapping configuration documents.
//!
//! A configuration is a named JSON snapshot of the three mapping tables plus
//! the export settings, so the same mapping can be reused across uploads
//! that share a source layout.
//!
//! # Document shape (version `1.1`)
//!
//! ```json
//! {
//!   "name": "Distributor feed",
//!   "description": "",
//!   "version": "1.1",
//!   "createdAt": "2024-03-01T14:05:09.123Z",
//!   "columnMappings": { "ISBN": "EAN13", "Title": "Book Title" },
//!   "fixedValues": { "Lamination": "Matt" },
//!   "valueMappings": { "Binding Style": { "Limp Bound": "Limp" } },
//!   "exportSettings": { "includeHeaders": true, "validateData": true, "applyValueMappings": true },
//!   "requiredColumns": [{ "key": "ISBN", "label": "ISBN", "required": true }]
//! }
//! ```
//!
//! Reading is lenient: unknown field keys are dropped, missing tables default
//! to empty and missing export toggles default to on. The only hard
//! requirement is a `columnMappings` or `fixedValues` object.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{ConfigError, ConfigResult};
use crate::mapping::{ColumnMappings, FixedValues, MappingStore, ValueMappings};
use crate::parser::cell_text;
use crate::schema::{self, FieldKey};
use crate::transform::projector::ExportSettings;

/// Version written into new documents.
pub const CONFIG_VERSION: &str = "1.1";

/// Name used when a loaded document has none.
pub const DEFAULT_LOADED_NAME: &str = "Loaded Configuration";

/// Enforces only the presence of a `columnMappings` or `fixedValues` object.
static CONFIG_VALIDATOR: Lazy<jsonschema::Validator> = Lazy::new(|| {
    let schema: Value = serde_json::from_str(include_str!("../../schemas/mapping-config.json"))
        .expect("Invalid embedded schema");
    jsonschema::draft7::new(&schema).expect("Invalid embedded schema")
});

// =============================================================================
// Document
// =============================================================================

/// Snapshot of one schema field, stored for human readers of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredColumn {
    pub key: FieldKey,
    pub label: String,
    pub required: bool,
}

/// The configuration document as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    pub created_at: String,
    pub column_mappings: ColumnMappings,
    pub fixed_values: FixedValues,
    pub value_mappings: ValueMappings,
    pub export_settings: ExportSettings,
    pub required_columns: Vec<RequiredColumn>,
}

impl MappingConfig {
    /// Pretty-printed JSON text.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested file name for this document.
    pub fn file_name(&self) -> String {
        config_file_name(&self.name)
    }
}

/// A document read back, ready to be applied in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub name: String,
    pub description: String,
    pub version: Option<String>,
    pub created_at: Option<String>,
    pub store: MappingStore,
    pub export_settings: ExportSettings,
    /// Keys that did not name a schema field and were ignored.
    pub dropped_keys: Vec<String>,
}

// =============================================================================
// Serialize
// =============================================================================

/// Snapshot the current mapping state.
///
/// Refuses to save an empty mapping or a blank name.
pub fn serialize(
    store: &MappingStore,
    settings: &ExportSettings,
    name: &str,
    description: &str,
) -> ConfigResult<MappingConfig> {
    serialize_at(store, settings, name, description, Utc::now())
}

/// [`serialize`] with an explicit creation time.
pub fn serialize_at(
    store: &MappingStore,
    settings: &ExportSettings,
    name: &str,
    description: &str,
    created_at: DateTime<Utc>,
) -> ConfigResult<MappingConfig> {
    if store.is_empty() {
        return Err(ConfigError::NothingToSave);
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::MissingName);
    }

    Ok(MappingConfig {
        name: name.to_string(),
        description: description.trim().to_string(),
        version: CONFIG_VERSION.to_string(),
        created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        column_mappings: store.column_mappings().clone(),
        fixed_values: store.fixed_values().clone(),
        value_mappings: store.value_mappings().clone(),
        export_settings: *settings,
        required_columns: schema::fields()
            .map(|f| RequiredColumn {
                key: f.key,
                label: f.label.to_string(),
                required: f.required,
            })
            .collect(),
    })
}

// =============================================================================
// Deserialize
// =============================================================================

/// Parse and check a configuration document.
///
/// Nothing is returned unless the whole document passes, so callers can
/// apply the result atomically.
pub fn deserialize(text: &str) -> ConfigResult<LoadedConfig> {
    let doc: Value = serde_json::from_str(text)?;
    check_shape(&doc)?;

    let empty = Map::new();
    let obj = doc.as_object().unwrap_or(&empty);
    let mut dropped_keys = Vec::new();

    let column_mappings = read_field_map(obj.get("columnMappings"), &mut dropped_keys, |v| {
        v.as_str().map(str::to_string)
    });
    let fixed_values = read_field_map(obj.get("fixedValues"), &mut dropped_keys, |v| {
        (!v.is_null()).then(|| cell_text(v))
    });
    let value_mappings = read_field_map(obj.get("valueMappings"), &mut dropped_keys, |v| {
        let table: BTreeMap<String, String> = v
            .as_object()?
            .iter()
            .filter_map(|(raw, canonical)| {
                canonical
                    .as_str()
                    .filter(|c| !c.is_empty())
                    .map(|c| (raw.clone(), c.to_string()))
            })
            .collect();
        Some(table)
    });

    Ok(LoadedConfig {
        name: string_field(obj, "name").unwrap_or_else(|| DEFAULT_LOADED_NAME.to_string()),
        description: string_field(obj, "description").unwrap_or_default(),
        version: string_field(obj, "version"),
        created_at: string_field(obj, "createdAt"),
        store: MappingStore::from_parts(column_mappings, fixed_values, value_mappings),
        export_settings: read_export_settings(obj.get("exportSettings")),
        dropped_keys,
    })
}

fn check_shape(doc: &Value) -> ConfigResult<()> {
    let errors: Vec<String> = CONFIG_VALIDATOR
        .iter_errors(doc).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingMappings(errors))
    }
}

/// Read a `{ fieldKey: value }` object, dropping unknown keys and entries
/// that convert to nothing or to an empty string.
fn read_field_map<T, F>(value: Option<&Value>, dropped: &mut Vec<String>, convert: F) -> BTreeMap<FieldKey, T>
where
    T: IsBlank,
    F: Fn(&Value) -> Option<T>,
{
    let mut map = BTreeMap::new();
    let Some(obj) = value.and_then(Value::as_object) else {
        return map;
    };

    for (key, raw) in obj {
        let Some(field) = FieldKey::from_key(key) else {
            if !dropped.contains(key) {
                dropped.push(key.clone());
            }
            continue;
        };
        if let Some(converted) = convert(raw).filter(|v| !v.is_blank()) {
            map.insert(field, converted);
        }
    }
    map
}

trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl IsBlank for BTreeMap<String, String> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Each toggle is off only when explicitly `false`.
fn read_export_settings(value: Option<&Value>) -> ExportSettings {
    let flag = |key: &str| {
        value
            .and_then(|v| v.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    };
    ExportSettings {
        include_headers: flag("includeHeaders"),
        validate_data: flag("validateData"),
        apply_value_mappings: flag("applyValueMappings"),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Naming
// =============================================================================

/// Suggested name for a new configuration, e.g. `POD Mapping Config - 2024-03-01`.
pub fn default_config_name() -> String {
    format!("POD Mapping Config - {}", Local::now().format("%Y-%m-%d"))
}

/// File name for a configuration: `pod_mapping_config_{slug}.json`.
pub fn config_file_name(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("pod_mapping_config_{}.json", slug)
}
