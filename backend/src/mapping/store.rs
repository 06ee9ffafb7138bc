//! Live mapping state: which source column or fixed value feeds each field,
//! and how raw values translate into canonical domain values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::FieldKey;

/// Field -> source column name.
pub type ColumnMappings = BTreeMap<FieldKey, String>;

/// Field -> literal value used for every row.
pub type FixedValues = BTreeMap<FieldKey, String>;

/// Field -> (raw source value -> canonical domain value).
pub type ValueMappings = BTreeMap<FieldKey, BTreeMap<String, String>>;

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource<'a> {
    Fixed(&'a str),
    Column(&'a str),
    Unmapped,
}

/// The three mapping tables.
///
/// Column mapping and fixed value are mutually exclusive per field: setting
/// one clears the other. If both are present anyway (e.g. a hand-edited
/// configuration), the fixed value wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingStore {
    column_mappings: ColumnMappings,
    fixed_values: FixedValues,
    value_mappings: ValueMappings,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store directly from the three tables.
    ///
    /// No exclusivity is enforced here; [`MappingStore::source`] resolves
    /// conflicts. Value mappings for fields without a domain are dropped.
    pub fn from_parts(
        column_mappings: ColumnMappings,
        fixed_values: FixedValues,
        value_mappings: ValueMappings,
    ) -> Self {
        let mut store = Self::default();
        store.replace_all(column_mappings, fixed_values, value_mappings);
        store
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn column_mappings(&self) -> &ColumnMappings {
        &self.column_mappings
    }

    pub fn fixed_values(&self) -> &FixedValues {
        &self.fixed_values
    }

    pub fn value_mappings(&self) -> &ValueMappings {
        &self.value_mappings
    }

    pub fn column(&self, field: FieldKey) -> Option<&str> {
        self.column_mappings
            .get(&field)
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }

    pub fn fixed_value(&self, field: FieldKey) -> Option<&str> {
        self.fixed_values
            .get(&field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Value source with fixed-value precedence. Empty entries count as absent.
    pub fn source(&self, field: FieldKey) -> ValueSource<'_> {
        if let Some(value) = self.fixed_value(field) {
            ValueSource::Fixed(value)
        } else if let Some(column) = self.column(field) {
            ValueSource::Column(column)
        } else {
            ValueSource::Unmapped
        }
    }

    pub fn is_mapped(&self, field: FieldKey) -> bool {
        !matches!(self.source(field), ValueSource::Unmapped)
    }

    /// Canonical value for a raw source value, if a mapping exists.
    pub fn mapped_value(&self, field: FieldKey, raw: &str) -> Option<&str> {
        self.value_mappings
            .get(&field)
            .and_then(|table| table.get(raw))
            .map(String::as_str)
    }

    pub fn value_mapping_count(&self) -> usize {
        self.value_mappings.values().map(BTreeMap::len).sum()
    }

    /// True when neither columns nor fixed values are set.
    pub fn is_empty(&self) -> bool {
        self.column_mappings.is_empty() && self.fixed_values.is_empty()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Bind a field to a source column, clearing its fixed value.
    /// An empty column name clears both.
    pub fn set_column(&mut self, field: FieldKey, column: impl Into<String>) {
        let column = column.into();
        self.fixed_values.remove(&field);
        if column.is_empty() {
            self.column_mappings.remove(&field);
        } else {
            self.column_mappings.insert(field, column);
        }
    }

    pub fn clear_column(&mut self, field: FieldKey) {
        self.column_mappings.remove(&field);
    }

    /// Use a literal for a field, clearing its column mapping.
    /// The value is trimmed; a blank value removes the fixed value.
    pub fn set_fixed_value(&mut self, field: FieldKey, value: &str) {
        self.column_mappings.remove(&field);
        let value = value.trim();
        if value.is_empty() {
            self.fixed_values.remove(&field);
        } else {
            self.fixed_values.insert(field, value.to_string());
        }
    }

    pub fn clear_fixed_value(&mut self, field: FieldKey) {
        self.fixed_values.remove(&field);
    }

    /// Remove both the column mapping and the fixed value.
    pub fn clear_field(&mut self, field: FieldKey) {
        self.column_mappings.remove(&field);
        self.fixed_values.remove(&field);
    }

    /// Map a raw value to a canonical value. An empty target removes the entry.
    /// Ignored for fields without a value domain and for targets outside it.
    pub fn set_value_mapping(&mut self, field: FieldKey, raw: &str, canonical: &str) {
        if !field.has_value_domain() {
            return;
        }
        if canonical.is_empty() {
            self.clear_value_mapping(field, raw);
            return;
        }
        if !in_domain(field, canonical) {
            return;
        }
        self.value_mappings
            .entry(field)
            .or_default()
            .insert(raw.to_string(), canonical.to_string());
    }

    pub fn clear_value_mapping(&mut self, field: FieldKey, raw: &str) {
        if let Some(table) = self.value_mappings.get_mut(&field) {
            table.remove(raw);
        }
    }

    /// Drop every value mapping of one field.
    pub fn clear_value_mappings(&mut self, field: FieldKey) {
        self.value_mappings.remove(&field);
    }

    /// Replace all three tables at once.
    pub fn replace_all(
        &mut self,
        column_mappings: ColumnMappings,
        fixed_values: FixedValues,
        mut value_mappings: ValueMappings,
    ) {
        value_mappings.retain(|field, table| {
            table.retain(|_, canonical| in_domain(*field, canonical.as_str()));
            !table.is_empty()
        });
        self.column_mappings = column_mappings;
        self.fixed_values = fixed_values;
        self.value_mappings = value_mappings;
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn in_domain(field: FieldKey, canonical: &str) -> bool {
    field
        .value_domain()
        .is_some_and(|domain| domain.iter().any(|v| *v == canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_and_fixed_are_exclusive() {
        let mut store = MappingStore::new();
        store.set_column(FieldKey::Title, "Book Title");
        assert_eq!(store.source(FieldKey::Title), ValueSource::Column("Book Title"));

        store.set_fixed_value(FieldKey::Title, "  Untitled ");
        assert_eq!(store.source(FieldKey::Title), ValueSource::Fixed("Untitled"));
        assert!(store.column(FieldKey::Title).is_none());

        store.set_column(FieldKey::Title, "Book Title");
        assert!(store.fixed_value(FieldKey::Title).is_none());
    }

    #[test]
    fn test_fixed_wins_when_both_forced() {
        let mut columns = ColumnMappings::new();
        columns.insert(FieldKey::BindingStyle, "Binding".into());
        let mut fixed = FixedValues::new();
        fixed.insert(FieldKey::BindingStyle, "Cased".into());

        let store = MappingStore::from_parts(columns, fixed, ValueMappings::new());
        assert_eq!(store.source(FieldKey::BindingStyle), ValueSource::Fixed("Cased"));
    }

    #[test]
    fn test_blank_fixed_value_clears() {
        let mut store = MappingStore::new();
        store.set_fixed_value(FieldKey::Lamination, "Gloss");
        store.set_fixed_value(FieldKey::Lamination, "   ");
        assert!(!store.is_mapped(FieldKey::Lamination));
    }

    #[test]
    fn test_empty_entries_count_as_absent() {
        let mut fixed = FixedValues::new();
        fixed.insert(FieldKey::Isbn, String::new());
        let mut columns = ColumnMappings::new();
        columns.insert(FieldKey::Isbn, "EAN".into());

        let store = MappingStore::from_parts(columns, fixed, ValueMappings::new());
        assert_eq!(store.source(FieldKey::Isbn), ValueSource::Column("EAN"));
    }

    #[test]
    fn test_value_mappings() {
        let mut store = MappingStore::new();
        store.set_value_mapping(FieldKey::BindingStyle, "Limp Bound", "Limp");
        store.set_value_mapping(FieldKey::BindingStyle, "Hardback", "Cased");
        assert_eq!(store.mapped_value(FieldKey::BindingStyle, "Limp Bound"), Some("Limp"));
        assert_eq!(store.value_mapping_count(), 2);

        store.set_value_mapping(FieldKey::BindingStyle, "Hardback", "");
        assert_eq!(store.value_mapping_count(), 1);

        store.clear_value_mappings(FieldKey::BindingStyle);
        assert_eq!(store.value_mapping_count(), 0);
    }

    #[test]
    fn test_value_mapping_ignored_without_domain() {
        let mut store = MappingStore::new();
        store.set_value_mapping(FieldKey::Title, "a", "b");
        assert_eq!(store.value_mapping_count(), 0);
    }

    #[test]
    fn test_value_mapping_target_must_be_in_domain() {
        let mut store = MappingStore::new();
        store.set_value_mapping(FieldKey::BindingStyle, "Hardback", "Hardcover");
        assert_eq!(store.value_mapping_count(), 0);

        let mut table = BTreeMap::new();
        table.insert("Limp Bound".to_string(), "Limp".to_string());
        table.insert("Spiral".to_string(), "Wire-O".to_string());
        let mut value_mappings = ValueMappings::new();
        value_mappings.insert(FieldKey::BindingStyle, table);
        store.replace_all(ColumnMappings::new(), FixedValues::new(), value_mappings);

        assert_eq!(store.mapped_value(FieldKey::BindingStyle, "Limp Bound"), Some("Limp"));
        assert!(store.mapped_value(FieldKey::BindingStyle, "Spiral").is_none());
    }

    #[test]
    fn test_replace_all_swaps_everything() {
        let mut store = MappingStore::new();
        store.set_column(FieldKey::Isbn, "EAN");
        store.set_value_mapping(FieldKey::Lamination, "glossy", "Gloss");

        let mut fixed = FixedValues::new();
        fixed.insert(FieldKey::BindingStyle, "Limp".into());
        store.replace_all(ColumnMappings::new(), fixed, ValueMappings::new());

        assert!(store.column(FieldKey::Isbn).is_none());
        assert_eq!(store.value_mapping_count(), 0);
        assert_eq!(store.fixed_value(FieldKey::BindingStyle), Some("Limp"));
    }
}
