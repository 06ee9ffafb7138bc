//! Bookload CLI - map, validate and export POD book-production sheets
//!
//! # Commands
//!
//! ```bash
//! bookload schema                              # Show the target template fields
//! bookload inspect books.csv                   # Headers, auto-mapping, distinct values
//! bookload validate books.csv -c feed.json     # Check every row
//! bookload export books.csv -c feed.json       # Write POD_Remapped_<timestamp>.csv
//! bookload init-config books.csv -o feed.json  # Save the auto-mapping as a configuration
//! bookload template                            # Write the blank POD template
//! ```
//!
//! `BOOKLOAD_CONFIG` and `BOOKLOAD_DELIMITER` (also read from `.env`) supply
//! defaults for `--config` and `--delimiter`.

use bookload::parser::OutputFormat;
use bookload::pipeline::{
    export_to_file, open_session, save_config_file, write_template, LoadOptions,
};
use bookload::schema;
use bookload::settings::Settings;
use bookload::transform::ExportSettings;
use bookload::validation::{DISPLAYED_ERRORS, DISPLAYED_WARNINGS};
use bookload::{default_config_name, Session};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bookload")]
#[command(about = "Map, validate and export POD book-production sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the target template fields
    Schema {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show sheet headers, the automatic column mapping and distinct values
    Inspect {
        /// Input sheet (CSV, TSV, semicolon or pipe separated)
        input: PathBuf,

        /// Sheet delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Mapping configuration to apply
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate every row against the template rules
    Validate {
        /// Input sheet
        input: PathBuf,

        /// Sheet delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Mapping configuration to apply
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Auto-map values of Paper Type, Binding Style and Lamination first
        #[arg(long)]
        auto_values: bool,

        /// Print every error instead of the first 20
        #[arg(long)]
        all: bool,
    },

    /// Export the remapped sheet in template column order
    Export {
        /// Input sheet
        input: PathBuf,

        /// Sheet delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Mapping configuration to apply
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (default: POD_Remapped_<timestamp>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: csv or json
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,

        /// Omit the header row
        #[arg(long)]
        no_headers: bool,

        /// Write raw values without value mappings
        #[arg(long)]
        no_value_mappings: bool,

        /// Skip counting missing required values
        #[arg(long)]
        no_validate: bool,

        /// Auto-map values of Paper Type, Binding Style and Lamination first
        #[arg(long)]
        auto_values: bool,
    },

    /// Save the automatic mapping of a sheet as a configuration
    InitConfig {
        /// Input sheet
        input: PathBuf,

        /// Sheet delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Configuration file (default: pod_mapping_config_<name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration name (default: "POD Mapping Config - <date>")
        #[arg(short, long)]
        name: Option<String>,

        /// Free-text description
        #[arg(long, default_value = "")]
        description: String,

        /// Also auto-map values of the domain fields
        #[arg(long)]
        auto_values: bool,
    },

    /// Write the blank POD template with a sample row
    Template {
        /// Output file (default: POD_Template_Format.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: csv or json
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema { json } => cmd_schema(json),

        Commands::Inspect {
            input,
            delimiter,
            config,
        } => cmd_inspect(&input, load_options(&settings, delimiter, config)).await,

        Commands::Validate {
            input,
            delimiter,
            config,
            auto_values,
            all,
        } => {
            cmd_validate(
                &input,
                load_options(&settings, delimiter, config),
                auto_values,
                all,
            )
            .await
        }

        Commands::Export {
            input,
            delimiter,
            config,
            output,
            format,
            no_headers,
            no_value_mappings,
            no_validate,
            auto_values,
        } => {
            let overrides = ExportOverrides {
                no_headers,
                no_value_mappings,
                no_validate,
            };
            cmd_export(
                &input,
                load_options(&settings, delimiter, config),
                output.as_deref(),
                format,
                overrides,
                auto_values,
            )
            .await
        }

        Commands::InitConfig {
            input,
            delimiter,
            output,
            name,
            description,
            auto_values,
        } => {
            // A configuration is built from the sheet alone
            let options = LoadOptions {
                config_path: None,
                delimiter: delimiter.or(settings.delimiter),
            };
            cmd_init_config(
                &input,
                options,
                output.as_deref(),
                name,
                &description,
                auto_values,
            )
            .await
        }

        Commands::Template { output, format } => cmd_template(output.as_deref(), format).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_options(settings: &Settings, delimiter: Option<char>, config: Option<PathBuf>) -> LoadOptions {
    LoadOptions {
        config_path: config.or_else(|| settings.default_config.clone()),
        delimiter: delimiter.or(settings.delimiter),
    }
}

fn cmd_schema(json: bool) -> CliResult {
    if json {
        let fields: Vec<_> = schema::fields().collect();
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    for field in schema::fields() {
        println!(
            "{:2}. {:<16} {:<9} {}",
            field.order,
            field.label,
            if field.required { "required" } else { "optional" },
            field.description
        );
        if let Some(domain) = field.value_domain {
            println!("    values: {}", domain.join(", "));
        }
    }
    Ok(())
}

async fn cmd_inspect(input: &Path, options: LoadOptions) -> CliResult {
    let (session, info) = open_session(input, &options).await?;

    println!("Encoding:  {}", info.encoding);
    println!("Delimiter: {}", format_delimiter(info.delimiter));
    println!("Rows:      {}", info.row_count);
    println!();

    println!("Mapping:");
    for field in schema::fields() {
        let source = match (session.store().fixed_value(field.key), session.store().column(field.key)) {
            (Some(value), _) => format!("fixed \"{}\"", value),
            (None, Some(column)) => format!("column \"{}\"", column),
            (None, None) => "-".to_string(),
        };
        let marker = if field.required { "*" } else { " " };
        println!("  {}{:<16} {}", marker, field.label, source);

        let preview = session.column_preview(field.key);
        if !preview.is_empty() {
            println!("    Sample: {}", preview.join(", "));
        }
    }

    for field in schema::domain_fields() {
        let values = session.unique_values(field.key);
        if values.is_empty() {
            continue;
        }
        println!();
        println!("{} values ({}):", field.label, values.len());
        for value in values {
            println!("  {}", value);
        }
    }

    println!();
    print_summary(&session);
    Ok(())
}

async fn cmd_validate(input: &Path, options: LoadOptions, auto_values: bool, all: bool) -> CliResult {
    let (mut session, _) = open_session(input, &options).await?;
    if auto_values {
        auto_map_domain_values(&mut session);
    }

    let result = session.validate()?;

    println!(
        "{}: {} of {} rows valid",
        result.status_text(),
        result.valid_rows,
        result.total_rows
    );
    if result.value_mappings_applied > 0 {
        println!("{} value mappings applied", result.value_mappings_applied);
    }

    let limit = if all { usize::MAX } else { DISPLAYED_ERRORS };
    let (errors, hidden) = result.displayed_errors(limit);
    for error in errors {
        println!("  - {}", error);
    }
    if hidden > 0 {
        println!("  ... and {} more errors", hidden);
    }

    let limit = if all { usize::MAX } else { DISPLAYED_WARNINGS };
    let (warnings, hidden) = result.displayed_warnings(limit);
    for warning in warnings {
        println!("  ! {}", warning);
    }
    if hidden > 0 {
        println!("  ... and {} more warnings", hidden);
    }

    if !result.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

struct ExportOverrides {
    no_headers: bool,
    no_value_mappings: bool,
    no_validate: bool,
}

impl ExportOverrides {
    /// Flags only switch toggles off; configuration values stay otherwise.
    fn apply(&self, settings: ExportSettings) -> ExportSettings {
        ExportSettings {
            include_headers: settings.include_headers && !self.no_headers,
            validate_data: settings.validate_data && !self.no_validate,
            apply_value_mappings: settings.apply_value_mappings && !self.no_value_mappings,
        }
    }
}

async fn cmd_export(
    input: &Path,
    options: LoadOptions,
    output: Option<&Path>,
    format: OutputFormat,
    overrides: ExportOverrides,
    auto_values: bool,
) -> CliResult {
    let (mut session, _) = open_session(input, &options).await?;
    if auto_values {
        auto_map_domain_values(&mut session);
    }
    session.set_export_settings(overrides.apply(*session.export_settings()));

    let (path, summary) = export_to_file(&session, format, output).await?;
    println!("{}", summary.message());
    println!("Output: {}", path.display());
    Ok(())
}

async fn cmd_init_config(
    input: &Path,
    options: LoadOptions,
    output: Option<&Path>,
    name: Option<String>,
    description: &str,
    auto_values: bool,
) -> CliResult {
    let (mut session, _) = open_session(input, &options).await?;
    if auto_values {
        auto_map_domain_values(&mut session);
    }

    let name = name.unwrap_or_else(default_config_name);
    let config = session.save_config(&name, description)?;
    let path = save_config_file(&config, output).await?;

    print_summary(&session);
    println!("Configuration: {}", path.display());
    Ok(())
}

async fn cmd_template(output: Option<&Path>, format: OutputFormat) -> CliResult {
    let path = write_template(format, output).await?;
    println!("Template: {}", path.display());
    Ok(())
}

fn auto_map_domain_values(session: &mut Session) {
    for field in schema::domain_fields() {
        session.auto_map_values(field.key);
    }
}

fn print_summary(session: &Session) {
    let summary = session.mapping_summary();
    println!(
        "Status: {} ({}/{} required mapped)",
        if summary.complete { "Complete" } else { "Incomplete" },
        summary.required_mapped,
        summary.required_total
    );
    println!(
        "Column mappings: {}, fixed values: {}, value mappings: {}",
        summary.column_count, summary.fixed_count, summary.value_mapping_count
    );
    if let Some(name) = &summary.config_name {
        println!("Based on: {}", name);
    }
    let missing = session.unmapped_required();
    if !missing.is_empty() {
        println!("Unmapped required fields: {}", missing.join(", "));
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
