//! `wd cache` subcommand group.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use wd_cache::{CacheConfig, CacheManager};
use wd_config::{CliSettings, Config};
use wd_document::{Document, Format};

use crate::error::CliError;
use crate::output::Output;

/// Options shared by every cache command.
#[derive(Args)]
pub(crate) struct CacheOptions {
    /// Path to configuration file (default: auto-discover wd.toml).
    #[arg(short, long, env = "WD_CONFIG")]
    config: Option<PathBuf>,

    /// Cache directory (overrides config).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Secret mixed into cache keys (overrides config and `WD_SECRET`).
    #[arg(long)]
    secret: Option<String>,
}

impl CacheOptions {
    fn manager(self) -> Result<CacheManager, CliError> {
        let cli_settings = CliSettings {
            cache_dir: self.cache_dir,
            secret: self.secret,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let secret = config.require_secret()?;
        Ok(CacheManager::new(CacheConfig::new(
            &config.cache_resolved.dir,
            secret,
        ))?)
    }
}

/// Conversion cache commands.
#[derive(Subcommand)]
pub(crate) enum CacheCommand {
    /// Print the path of the cached conversion of a document.
    Lookup {
        /// Source document.
        document: PathBuf,
        /// Target format.
        #[arg(short, long)]
        format: Format,
        #[command(flatten)]
        options: CacheOptions,
    },
    /// Store a converted artifact for a document.
    Store {
        /// Source document.
        document: PathBuf,
        /// Target format of the artifact.
        #[arg(short, long)]
        format: Format,
        /// Converted artifact to store.
        rendered: PathBuf,
        #[command(flatten)]
        options: CacheOptions,
    },
    /// Remove the cached conversion of a document.
    Delete {
        /// Source document.
        document: PathBuf,
        /// Target format.
        #[arg(short, long)]
        format: Format,
        #[command(flatten)]
        options: CacheOptions,
    },
    /// Remove every cached entry.
    Clear {
        #[command(flatten)]
        options: CacheOptions,
    },
}

impl CacheCommand {
    /// Execute the cache subcommand.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        match self {
            Self::Lookup {
                document,
                format,
                options,
            } => {
                let cache = options.manager()?;
                let mut source = open_source(&document)?;
                match cache.get(&mut source, format)? {
                    Some(entry) => {
                        output.result(&entry.path().display().to_string());
                        entry.close()?;
                    }
                    None => output.warning(&format!(
                        "No cached {format} conversion of {}",
                        document.display()
                    )),
                }
                source.close()?;
            }
            Self::Store {
                document,
                format,
                rendered,
                options,
            } => {
                let cache = options.manager()?;
                let mut source = open_source(&document)?;
                let mut converted = Document::open(&rendered, format)?;
                let path = cache.set(&mut source, format, &mut converted)?;
                converted.close()?;
                source.close()?;
                output.result(&path.display().to_string());
            }
            Self::Delete {
                document,
                format,
                options,
            } => {
                let cache = options.manager()?;
                let mut source = open_source(&document)?;
                if cache.delete(&mut source, format)? {
                    output.success(&format!(
                        "Deleted cached {format} conversion of {}",
                        document.display()
                    ));
                } else {
                    output.info(&format!(
                        "No cached {format} conversion of {}",
                        document.display()
                    ));
                }
                source.close()?;
            }
            Self::Clear { options } => {
                let cache = options.manager()?;
                let removed = cache.clear()?;
                output.success(&format!("Removed {removed} cached entries"));
            }
        }
        Ok(())
    }
}

/// Open a source document, taking its format from the file extension.
///
/// Only the bytes feed the cache key, so an unrecognised extension falls
/// back to ODT.
fn open_source(path: &Path) -> Result<Document, CliError> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
        .unwrap_or(Format::Odt);
    Ok(Document::open(path, format)?)
}
