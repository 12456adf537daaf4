//! Error types for the data-loader crate.
//!
//! Every loader in this crate reports failures through `DataLoadError`.
//! Callers that treat a snapshot as optional (the CF model, the embedding
//! index) match on the error and degrade instead of propagating it.

use thiserror::Error;

/// Errors that can occur while loading the catalog or a precomputed snapshot
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// JSON document (snapshot or catalog record) was malformed
    #[error("JSON error in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// Binary snapshot header or payload was not what we expected
    #[error("Malformed snapshot {file}: {reason}")]
    MalformedSnapshot { file: String, reason: String },

    /// Referenced entity doesn't exist (e.g., rating for non-existent movie)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u32 },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Instead of writing `Result<T, DataLoadError>` everywhere,
/// we can write `Result<T>`
pub type Result<T> = std::result::Result<T, DataLoadError>;
