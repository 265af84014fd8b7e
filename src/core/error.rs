//! Error types for cartograph

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using cartograph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// cartograph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Repository not found: {path}")]
    RepoNotFound { path: PathBuf },

    #[error("Failed to parse {path}: {message}")]
    FileParse { path: PathBuf, message: String },

    #[error(
        "Symbol table invariant violated: {qualified_name} already registered as {existing}, got {incoming}"
    )]
    SymbolTableInvariant {
        qualified_name: String,
        existing: String,
        incoming: String,
    },

    #[error("Invalid {language} query bundle: {message}")]
    Query { language: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
