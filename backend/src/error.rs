//! Error types for the Bookload mapping engine.
//!
//! - [`InputError`] - uploaded sheet could not be turned into rows
//! - [`ConfigError`] - mapping configuration could not be read or saved
//! - [`ExportError`] - projected rows could not be written out
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Validation findings are not errors: they are returned as data in
//! [`crate::validation::ValidationResult`]. Stale column references are
//! reported as [`crate::session::StaleReference`] notices.

use thiserror::Error;

// =============================================================================
// Input (tabular codec) Errors
// =============================================================================

/// Errors while reading an uploaded sheet.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes could not be decoded as text.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid delimited-text content.
    #[error("Invalid sheet format at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// No header row.
    #[error("No headers found in sheet")]
    NoHeaders,

    /// Header row present but no data rows.
    #[error("The sheet appears to be empty or has no data rows")]
    NoDataRows,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading or writing a mapping configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Not valid JSON.
    #[error("Invalid configuration format: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Neither `columnMappings` nor `fixedValues` present.
    #[error("Invalid configuration format: {}", .0.join("; "))]
    MissingMappings(Vec<String>),

    /// Attempted to save a configuration with no column mappings or fixed values.
    #[error("No column mappings or fixed values to save")]
    NothingToSave,

    /// Configuration name is blank.
    #[error("Please enter a configuration name")]
    MissingName,

    /// IO error.
    #[error("Configuration IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing projected rows.
///
/// Data-quality problems never end up here: export is best-effort.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure.
    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writer buffer could not be recovered.
    #[error("Failed to finish output: {0}")]
    Finish(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors returned by the async loaders in [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Sheet input error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Export or validation requested before every required field is mapped.
    #[error("Required fields not mapped: {}", .0.join(", "))]
    RequiredFieldsUnmapped(Vec<String>),

    /// No dataset loaded in the session.
    #[error("No data loaded")]
    NoData,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for sheet input.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
