//! File-level pipeline: read sheet and configuration bytes, build a
//! [`Session`], write projected output.
//!
//! The only async work is the one-shot file I/O. Each read completes before
//! any parsing starts, and all engine passes run synchronously afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookload::transform::pipeline::{open_session, export_to_file, LoadOptions};
//! use bookload::parser::OutputFormat;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = LoadOptions {
//!         config_path: Some("feed.json".into()),
//!         ..Default::default()
//!     };
//!     let (session, _info) = open_session(Path::new("catalog.csv"), &options).await?;
//!     let (path, summary) = export_to_file(&session, OutputFormat::Csv, None).await?;
//!     println!("{} -> {}", summary.message(), path.display());
//!     Ok(())
//! }
//! ```

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{self, LoadedConfig, MappingConfig};
use crate::error::{ConfigError, ExportError, InputError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success};
use crate::parser::{parse_bytes, OutputFormat, ParseResult};
use crate::session::Session;

use super::projector::{export_file_name, template_file_name, template_grid, ExportSummary};

/// Options for loading a sheet into a session
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Mapping configuration applied after the sheet is loaded
    pub config_path: Option<PathBuf>,
    /// Force a delimiter instead of detecting one
    pub delimiter: Option<char>,
}

/// Sheet file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for SheetInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.dataset.columns.clone(),
            row_count: parsed.dataset.len(),
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Read and parse a sheet file.
pub async fn read_sheet(path: &Path, delimiter: Option<char>) -> PipelineResult<ParseResult> {
    log_info(format!("Reading {}...", path.display()));
    let bytes = tokio::fs::read(path).await.map_err(InputError::from)?;
    read_sheet_bytes(&bytes, delimiter)
}

/// Parse sheet bytes already in memory.
pub fn read_sheet_bytes(bytes: &[u8], delimiter: Option<char>) -> PipelineResult<ParseResult> {
    let parsed = parse_bytes(bytes, delimiter)?;

    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!(
        "Detected separator: '{}'",
        format_delimiter(parsed.delimiter)
    ));
    log_info(format!("Sheet has {} columns:", parsed.dataset.columns.len()));
    for (i, col) in parsed.dataset.columns.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    Ok(parsed)
}

/// Read and check a mapping configuration file.
pub async fn read_config(path: &Path) -> PipelineResult<LoadedConfig> {
    log_info(format!("Reading configuration {}...", path.display()));
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(ConfigError::from)?;
    Ok(config::deserialize(&text)?)
}

/// Load a sheet into a fresh session, then apply a configuration if given.
///
/// Both files are fully read and checked before the session is touched.
pub async fn open_session(path: &Path, options: &LoadOptions) -> PipelineResult<(Session, SheetInfo)> {
    let parsed = read_sheet(path, options.delimiter).await?;
    let loaded = match &options.config_path {
        Some(config_path) => Some(read_config(config_path).await?),
        None => None,
    };

    let info = SheetInfo::from(&parsed);
    let mut session = Session::new();
    session.load_dataset(parsed.dataset)?;
    if let Some(loaded) = loaded {
        session.apply_config(loaded);
    }

    Ok((session, info))
}

// =============================================================================
// Writing
// =============================================================================

/// Write bytes to a file, replacing it.
pub async fn write_output(path: &Path, bytes: &[u8]) -> PipelineResult<()> {
    tokio::fs::write(path, bytes).await.map_err(ExportError::from)?;
    log_success(format!("Wrote {}", path.display()));
    Ok(())
}

/// Export the session's projection. Without a path, a timestamped
/// `POD_Remapped_*` file is created in the working directory.
pub async fn export_to_file(
    session: &Session,
    format: OutputFormat,
    path: Option<&Path>,
) -> PipelineResult<(PathBuf, ExportSummary)> {
    let projection = session.export()?;
    let bytes = format.write(&projection)?;

    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(export_file_name(format.extension(), Utc::now())));
    write_output(&path, &bytes).await?;

    Ok((path, projection.summary))
}

/// Write the blank template. Defaults to `POD_Template_Format.{ext}`.
pub async fn write_template(format: OutputFormat, path: Option<&Path>) -> PipelineResult<PathBuf> {
    let bytes = format.write(&template_grid())?;
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(template_file_name(format.extension())));
    write_output(&path, &bytes).await?;
    Ok(path)
}

/// Write a configuration document. Defaults to `pod_mapping_config_{slug}.json`.
pub async fn save_config_file(config: &MappingConfig, path: Option<&Path>) -> PipelineResult<PathBuf> {
    let text = config.to_json()?;
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(config.file_name()));
    tokio::fs::write(&path, text).await.map_err(ConfigError::from)?;
    log_success(format!("Saved configuration to {}", path.display()));
    Ok(path)
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::schema::FieldKey;
    use tempfile::tempdir;

    const SHEET: &str = "\
ISBN;Title;Trim Height;Trim Width;Paper Type;Binding Style;Page Extent;Lamination
9781234567890;First;198;129;Woodfree 80 gsm;Limp;320;Gloss
;Second;198;129;Woodfree 80 gsm;Cased;200;Matt
978-1-234-56789-0;Third;234;156;Navigator 80 gsm;Limp;96;None
";

    #[tokio::test]
    async fn test_open_session_end_to_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.csv");
        std::fs::write(&path, SHEET).unwrap();

        let (mut session, info) = open_session(&path, &LoadOptions::default()).await.unwrap();
        assert_eq!(info.delimiter, ';');
        assert_eq!(info.row_count, 3);
        assert!(session.export_allowed());

        let result = session.validate().unwrap();
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.valid_rows, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Row 2: ISBN is required but empty"));
    }

    #[tokio::test]
    async fn test_export_and_config_files() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("books.csv");
        std::fs::write(&sheet, SHEET).unwrap();

        let (mut session, _) = open_session(&sheet, &LoadOptions::default()).await.unwrap();
        session.set_fixed_value(FieldKey::Lamination, "Matt");

        let out = dir.path().join("out.csv");
        let (written, summary) = export_to_file(&session, OutputFormat::Csv, Some(out.as_path()))
            .await
            .unwrap();
        assert_eq!(written, out);
        assert_eq!(summary.exported_rows, 3);
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("9781234567890,First,"));

        let config = session.save_config("Semicolon feed", "").unwrap();
        let config_path = dir.path().join("cfg.json");
        let config_path = save_config_file(&config, Some(config_path.as_path()))
            .await
            .unwrap();

        let options = LoadOptions {
            config_path: Some(config_path),
            delimiter: Some(';'),
        };
        let (reloaded, _) = open_session(&sheet, &options).await.unwrap();
        assert_eq!(reloaded.store().fixed_value(FieldKey::Lamination), Some("Matt"));
        assert_eq!(reloaded.config_name(), Some("Semicolon feed"));
    }

    #[tokio::test]
    async fn test_missing_sheet_is_input_error() {
        let dir = tempdir().unwrap();
        let err = open_session(&dir.path().join("nope.csv"), &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::Io(_))));
    }

    #[tokio::test]
    async fn test_bad_config_fails_before_session() {
        let dir = tempdir().unwrap();
        let sheet = dir.path().join("books.csv");
        std::fs::write(&sheet, SHEET).unwrap();
        let cfg = dir.path().join("bad.json");
        std::fs::write(&cfg, r#"{ "name": "no tables" }"#).unwrap();

        let options = LoadOptions {
            config_path: Some(cfg),
            delimiter: None,
        };
        let err = open_session(&sheet, &options).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::MissingMappings(_))));
    }

    #[tokio::test]
    async fn test_write_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("template.json");
        write_template(OutputFormat::Json, Some(path.as_path())).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["ISBN"], "9781234567890");
        assert_eq!(value[0]["Lamination"], "Gloss");
    }
}
