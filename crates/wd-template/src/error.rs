//! Error types for template resolution and rendering.

use std::path::PathBuf;

use crate::preprocess::PreprocessError;

/// Error returned while resolving or rendering a template.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// Template name resolves to neither a file nor a directory.
    #[error("Template {name} not found in directory {}", .root.display())]
    NotFound {
        /// Template name as requested.
        name: String,
        /// Configured template root.
        root: PathBuf,
    },

    /// Package manifest is missing or cannot be parsed.
    #[error("Malformed package: {0}")]
    MalformedPackage(String),

    /// A referenced package member does not exist.
    #[error("Missing package member: {0}")]
    MissingMember(String),

    /// A preprocessing stage rejected its input.
    #[error("{0}")]
    Preprocess(#[from] PreprocessError),

    /// Data substitution failed.
    #[error("Template substitution failed: {0}")]
    Substitution(#[from] minijinja::Error),

    /// Reading or writing the ZIP archive failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
