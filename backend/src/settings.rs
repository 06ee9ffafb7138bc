//! Environment settings.
//!
//! Read after `.env` has been loaded by the binary. All values are optional.
//!
//! | Variable             | Effect                                            |
//! |----------------------|---------------------------------------------------|
//! | `BOOKLOAD_DELIMITER` | Force the input delimiter: one character, or `tab` |
//! | `BOOKLOAD_CONFIG`    | Mapping configuration used when `--config` is absent |

use std::env;
use std::path::PathBuf;

pub const DELIMITER_VAR: &str = "BOOKLOAD_DELIMITER";
pub const CONFIG_VAR: &str = "BOOKLOAD_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub delimiter: Option<char>,
    pub default_config: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unusable values are ignored.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let delimiter = lookup(DELIMITER_VAR).and_then(|v| parse_delimiter(&v));
        let default_config = lookup(CONFIG_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            delimiter,
            default_config,
        }
    }
}

/// Accepts a single character, or `tab` / `\t` for a tab.
pub fn parse_delimiter(value: &str) -> Option<char> {
    match value {
        "tab" | "\\t" | "\t" => Some('\t'),
        other => {
            let mut chars = other.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
    }
}
