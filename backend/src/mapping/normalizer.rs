//! Effective value resolution for a (row, field) pair.
//!
//! Shared by validation and export so both read a field the same way:
//!
//! 1. fixed value, verbatim, row ignored
//! 2. mapped column, missing cell read as `""`, then value-mapping
//!    substitution for domain fields
//! 3. otherwise no value

use crate::parser::{cell_text, Row};
use crate::schema::FieldKey;

use super::store::{MappingStore, ValueSource};

/// A resolved field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    /// True when value-mapping substitution changed the raw value.
    pub substituted: bool,
}

/// Resolve a field for a row.
///
/// `apply_value_mappings` gates substitution; validation always passes
/// `true`, export passes its setting through.
pub fn resolve(
    store: &MappingStore,
    row: &Row,
    field: FieldKey,
    apply_value_mappings: bool,
) -> Option<Resolved> {
    match store.source(field) {
        ValueSource::Fixed(value) => Some(Resolved {
            value: value.to_string(),
            substituted: false,
        }),
        ValueSource::Column(column) => {
            let raw = row.get(column).map(cell_text).unwrap_or_default();
            if apply_value_mappings && field.has_value_domain() {
                if let Some(mapped) = store.mapped_value(field, &raw) {
                    let substituted = mapped != raw;
                    return Some(Resolved {
                        value: mapped.to_string(),
                        substituted,
                    });
                }
            }
            Some(Resolved {
                value: raw,
                substituted: false,
            })
        }
        ValueSource::Unmapped => None,
    }
}

/// Effective value of a field for a row, with value mappings applied.
pub fn effective_value(store: &MappingStore, row: &Row, field: FieldKey) -> Option<String> {
    resolve(store, row, field, true).map(|r| r.value)
}
