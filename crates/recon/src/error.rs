use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate slab, bad rule digit, empty override, etc.).
    ConfigValidation(String),
    /// A mapped column is missing from a roster's header row.
    MissingColumn { source: String, column: String },
    /// Malformed CSV content in a roster.
    Csv { source: String, message: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { source, column } => {
                write!(f, "roster '{source}': missing column '{column}'")
            }
            Self::Csv { source, message } => {
                write!(f, "roster '{source}': malformed CSV: {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
