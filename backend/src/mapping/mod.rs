//! Mapping module.
//!
//! This module turns arbitrary source rows into schema fields:
//! - Store: column bindings, fixed values, value translation tables
//! - Matcher: auto-mapping heuristics for columns and values
//! - Normalizer: effective value of a field for a row

pub mod matcher;
pub mod normalizer;
pub mod store;

pub use matcher::{find_best_column_match, find_best_value_match, match_field};
pub use normalizer::{effective_value, resolve, Resolved};
pub use store::{ColumnMappings, FixedValues, MappingStore, ValueMappings, ValueSource};
