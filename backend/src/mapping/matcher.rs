//! Heuristic matching of source columns to schema fields, and of raw cell
//! values to canonical domain values.
//!
//! Both matchers use the same two rules, case-insensitively:
//!
//! 1. exact equality
//! 2. substring containment in either direction
//!
//! There is no scoring. The first candidate in enumeration order wins, which
//! keeps the result deterministic for a given header order.

use crate::schema::SchemaField;

/// Best source column for a field, searching by key then by label.
///
/// For each search term, an exact match anywhere in `columns` beats a partial
/// one; the key term is fully tried before the label term.
pub fn find_best_column_match<'a>(key: &str, label: &str, columns: &'a [String]) -> Option<&'a str> {
    let lowered: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();

    for term in [key.to_lowercase(), label.to_lowercase()] {
        if let Some(i) = lowered.iter().position(|col| *col == term) {
            return Some(columns[i].as_str());
        }

        if let Some(i) = lowered
            .iter()
            .position(|col| col.contains(term.as_str()) || term.contains(col.as_str()))
        {
            return Some(columns[i].as_str());
        }
    }

    None
}

/// Convenience wrapper over [`find_best_column_match`] for a schema field.
pub fn match_field<'a>(field: &SchemaField, columns: &'a [String]) -> Option<&'a str> {
    find_best_column_match(field.key.as_str(), field.label, columns)
}

/// Best canonical value for a raw cell value.
///
/// The raw value is trimmed before comparison. Blank values never match.
pub fn find_best_value_match<'a>(raw: &str, domain: &[&'a str]) -> Option<&'a str> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some(exact) = domain.iter().find(|v| v.to_lowercase() == normalized) {
        return Some(*exact);
    }

    domain
        .iter()
        .find(|v| {
            let valid = v.to_lowercase();
            valid.contains(normalized.as_str()) || normalized.contains(valid.as_str())
        })
        .copied()
}
