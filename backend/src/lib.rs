//! # Bookload - POD template mapping, validation and export
//!
//! Bookload takes book-production sheets in arbitrary layouts and maps them
//! onto the fixed ten-column print-on-demand template: ISBN, title, trim size,
//! paper, binding, extent, lamination and two optional plate sections.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Sheet file │────▶│   Parser    │────▶│   Session   │────▶│  POD sheet  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (map+check) │     │ (CSV/JSON)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                ▲
//!                                   mapping configuration (JSON)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookload::{open_session, LoadOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (mut session, _) = open_session(Path::new("books.csv"), &LoadOptions::default())
//!         .await
//!         .unwrap();
//!     let result = session.validate().unwrap();
//!     println!("{} of {} rows valid", result.valid_rows, result.total_rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`schema`] - The ten template fields and their value domains
//! - [`parser`] - Sheet reading with auto-detection, CSV/JSON writing
//! - [`mapping`] - Column bindings, fixed values, value mappings, matching
//! - [`validation`] - Per-row template rules
//! - [`transform`] - Projection to the output grid and the file pipeline
//! - [`config`] - Portable mapping configuration documents
//! - [`session`] - Engine state for one sheet
//! - [`logs`] - Pipeline log broadcasting
//! - [`settings`] - Environment settings

// Core modules
pub mod error;
pub mod schema;

// Parsing
pub mod parser;

// Mapping
pub mod mapping;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Configuration documents
pub mod config;

// Engine state
pub mod session;

// Ambient
pub mod logs;
pub mod settings;

pub use transform::pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, ExportError, ExportResult, InputError, InputResult, PipelineError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{FieldKey, SchemaField, SCHEMA};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_str, write_csv,
    write_json, Dataset, OutputFormat, ParseResult, Row,
};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{effective_value, find_best_column_match, find_best_value_match, MappingStore};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{validate_rows, ValidationResult, ValidationStatus};

// =============================================================================
// Re-exports - Projection
// =============================================================================

pub use transform::{project, template_grid, Cell, ExportSettings, ExportSummary, Projection};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{default_config_name, LoadedConfig, MappingConfig};

// =============================================================================
// Re-exports - Session & pipeline
// =============================================================================

pub use session::{MappingSummary, PreviewTable, Session, StaleReference};
pub use transform::{export_to_file, open_session, LoadOptions, SheetInfo};
