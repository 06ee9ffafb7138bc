//! Delimited-text sheet reader with encoding and delimiter auto-detection.
//!
//! Turns uploaded bytes into a [`Dataset`]: the header row (in file order)
//! plus one [`Row`] per data line. No schema-specific logic here.

pub mod writer;

use serde_json::{Map, Value};

use crate::error::{InputError, InputResult};

pub use writer::{write_csv, write_json, OutputFormat};

/// One source row: source column name -> cell value (string or primitive).
pub type Row = Map<String, Value>;

/// Parsed upload: the source column list and its rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Column headers in file order. Used for matcher tie-breaking.
    pub columns: Vec<String>,
    /// Data rows.
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub dataset: Dataset,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Render a cell as text. Null and nested values read as empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> InputResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => {
            let codec = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                InputError::Encoding(format!("unsupported encoding '{}'", other))
            })?;
            codec.decode(bytes).0.into_owned()
        }
    };
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse sheet bytes, optionally forcing the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> InputResult<ParseResult> {
    if bytes.is_empty() {
        return Err(InputError::NoHeaders);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let dataset = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        dataset,
        encoding,
        delimiter,
    })
}

/// Parse decoded text with an explicit delimiter.
///
/// Blank headers are named `__EMPTY`, `__EMPTY_1`, ... and duplicate headers
/// get a `_1`, `_2` suffix, so every column name is unique. Rows where every
/// cell is blank are skipped. Short rows are padded with empty cells.
pub fn parse_str(content: &str, delimiter: char) -> InputResult<Dataset> {
    let delimiter = u8::try_from(delimiter).map_err(|_| InputError::Parse {
        line: 1,
        message: format!("delimiter '{}' is not a single-byte character", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let raw_headers = reader.headers().map_err(|e| parse_error(1, &e))?.clone();
    if raw_headers.is_empty() || raw_headers.iter().all(str::is_empty) {
        return Err(InputError::NoHeaders);
    }
    let columns = unique_headers(raw_headers.iter());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // +1 for 0-index, +1 for header
        let record = record.map_err(|e| parse_error(idx + 2, &e))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let mut row = Map::new();
        for (i, column) in columns.iter().enumerate() {
            let value = record.get(i).unwrap_or("");
            row.insert(column.clone(), Value::String(value.to_string()));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(InputError::NoDataRows);
    }

    Ok(Dataset::new(columns, rows))
}

fn parse_error(line: usize, err: &csv::Error) -> InputError {
    let line = err
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(line);
    InputError::Parse {
        line,
        message: err.to_string(),
    }
}

fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for header in raw {
        let base = if header.is_empty() { "__EMPTY" } else { header };
        let mut name = base.to_string();
        let mut n = 1;
        while columns.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        columns.push(name);
    }
    columns
}
