//! `wd render` command implementation.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde_json::Value;
use wd_config::{CliSettings, Config};
use wd_document::Document;
use wd_template::{Pipeline, Renderer, TemplateLoader};

use crate::error::CliError;
use crate::output::Output;

/// Kind of template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum TemplateKind {
    /// Single-file HTML template.
    Html,
    /// OpenDocument text template (archive or directory).
    Odt,
}

impl TemplateKind {
    /// Infer the kind from the template name: `.html`/`.htm` is HTML,
    /// anything else is ODF.
    fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("html" | "htm") => Self::Html,
            _ => Self::Odt,
        }
    }
}

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Template name, relative to the template directory.
    template: String,

    /// JSON file with the substitution context (default: empty object).
    #[arg(long)]
    context: Option<PathBuf>,

    /// Where to write the rendered document.
    #[arg(short, long)]
    output: PathBuf,

    /// Template kind (default: inferred from the template name).
    #[arg(long, value_enum)]
    kind: Option<TemplateKind>,

    /// Path to configuration file (default: auto-discover wd.toml).
    #[arg(short, long, env = "WD_CONFIG")]
    config: Option<PathBuf>,

    /// Template directory (overrides config).
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// Temp directory for rendering (overrides config).
    #[arg(long)]
    tmp_dir: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, the context file, or rendering fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            templates_dir: self.templates_dir,
            tmp_dir: self.tmp_dir,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let context = load_context(self.context.as_deref())?;
        let pipeline = match &config.templates_resolved.preprocessors {
            Some(names) => Pipeline::from_names(names.as_slice())?,
            None => Pipeline::standard(),
        };
        let renderer = Renderer::new(&config.render_resolved.tmp_dir, pipeline);
        let loader = TemplateLoader::new(&config.templates_resolved.dir);

        let kind = self
            .kind
            .unwrap_or_else(|| TemplateKind::from_name(&self.template));
        tracing::info!(template = %self.template, ?kind, "rendering");

        let document = match kind {
            TemplateKind::Html => {
                renderer.render_html_default(&loader.html(&self.template)?, &context)?
            }
            TemplateKind::Odt => renderer.render_odf(&loader.odf(&self.template)?, &context)?,
        };
        write_output(document, &self.output)?;

        output.success(&format!(
            "Rendered {} to {}",
            self.template,
            self.output.display()
        ));
        Ok(())
    }
}

/// Read the JSON context, or an empty object when no file was given.
fn load_context(path: Option<&Path>) -> Result<Value, CliError> {
    let Some(path) = path else {
        return Ok(Value::Object(serde_json::Map::new()));
    };
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|source| CliError::Context {
        path: path.display().to_string(),
        source,
    })?;
    if !value.is_object() {
        return Err(CliError::Validation(format!(
            "Context file {} must contain a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

/// Copy the rendered document to `dest` and close it, removing the temp file.
fn write_output(mut document: Document, dest: &Path) -> Result<(), CliError> {
    let data = document.read_all()?;
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, data)?;
    document.close()?;
    Ok(())
}
