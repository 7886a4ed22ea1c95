//! CLI error types.

use wd_cache::CacheError;
use wd_config::ConfigError;
use wd_template::{PreprocessError, TemplateError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Template(#[from] TemplateError),

    #[error("{0}")]
    Preprocess(#[from] PreprocessError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("Invalid context file {path}: {source}")]
    Context {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Validation(String),
}
