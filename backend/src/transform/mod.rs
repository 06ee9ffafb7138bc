//! Transformation module.
//!
//! This module turns mapped rows into the exported POD grid:
//! - Projector: canonical ten-column rows, ISBN cells, export summary
//! - Pipeline: async file loading and writing around a session

pub mod pipeline;
pub mod projector;

pub use pipeline::{
    export_to_file, open_session, read_config, read_sheet, read_sheet_bytes, save_config_file,
    write_output, write_template, LoadOptions, SheetInfo,
};
pub use projector::{
    export_file_name, isbn_cell, project, template_file_name, template_grid, Cell, ExportSettings,
    ExportSummary, Projection, EXPORT_SHEET_NAME, TEMPLATE_SHEET_NAME,
};
