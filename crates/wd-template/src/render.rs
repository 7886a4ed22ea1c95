//! Template rendering into documents.

use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment};
use serde_json::Value;
use tempfile::{Builder, NamedTempFile};
use wd_document::{Document, Format};

use crate::archive::write_package;
use crate::loader::{HtmlTemplate, OdfTemplate};
use crate::package::Package;
use crate::preprocess::Pipeline;
use crate::TemplateError;

/// Directory under the render working directory that holds the package tree.
const PACKAGE_DIR: &str = "package";

/// Text substitution engine shared by HTML and XML members.
///
/// Values are escaped for markup, so context data cannot break the
/// surrounding HTML or XML.
pub struct Substitution {
    env: Environment<'static>,
}

impl Substitution {
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Substitute `context` into `source`.
    pub fn render(&self, source: &str, context: &Value) -> Result<String, TemplateError> {
        Ok(self.env.render_str(source, context)?)
    }
}

impl Default for Substitution {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders templates into documents under a temporary directory.
pub struct Renderer {
    tmp_dir: PathBuf,
    pipeline: Pipeline,
    substitution: Substitution,
}

impl Renderer {
    /// Create a renderer writing its output under `tmp_dir`.
    ///
    /// `pipeline` is applied to every XML member of ODF templates.
    #[must_use]
    pub fn new(tmp_dir: impl Into<PathBuf>, pipeline: Pipeline) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
            pipeline,
            substitution: Substitution::new(),
        }
    }

    /// Directory rendered documents are created in.
    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Render an HTML template; the result is deleted when closed.
    pub fn render_html_default(
        &self,
        template: &HtmlTemplate,
        context: &Value,
    ) -> Result<Document, TemplateError> {
        self.render_html(template, context, true)
    }

    /// Render an HTML template into a fresh `.html` file.
    pub fn render_html(
        &self,
        template: &HtmlTemplate,
        context: &Value,
        delete_on_close: bool,
    ) -> Result<Document, TemplateError> {
        let content = self.substitution.render(&template.content()?, context)?;

        let mut output = self.output_file(Format::Html)?;
        output.write_all(content.as_bytes())?;

        tracing::debug!(template = template.name(), "rendered HTML template");
        Ok(into_document(output, Format::Html)?.with_delete_on_close(delete_on_close))
    }

    /// Render an ODF template into a fresh `.odt` archive.
    ///
    /// The returned document is deleted when closed. The working directory
    /// used while rendering is removed before this returns, on success or
    /// failure.
    pub fn render_odf(
        &self,
        template: &OdfTemplate,
        context: &Value,
    ) -> Result<Document, TemplateError> {
        fs::create_dir_all(&self.tmp_dir)?;
        let workdir = Builder::new()
            .prefix("wd-render-")
            .tempdir_in(&self.tmp_dir)?;
        let root = workdir.path().join(PACKAGE_DIR);
        template.unpack(&root)?;

        for member in template.xml_members()? {
            let source = String::from_utf8(template.get_file(&member)?).map_err(|e| {
                TemplateError::MalformedPackage(format!("{member} is not valid UTF-8: {e}"))
            })?;
            let text = self.pipeline.run(source)?;
            let rendered = self.substitution.render(&text, context)?;
            replace_file(&root.join(&member), rendered.as_bytes())?;
            tracing::trace!(template = template.name(), member, "rendered member");
        }

        let output = self.output_file(Format::Odt)?;
        write_package(&root, output.as_file())?;
        workdir.close()?;

        tracing::debug!(template = template.name(), "rendered ODF template");
        Ok(into_document(output, Format::Odt)?.with_delete_on_close(true))
    }

    fn output_file(&self, format: Format) -> Result<NamedTempFile, TemplateError> {
        fs::create_dir_all(&self.tmp_dir)?;
        Ok(Builder::new()
            .prefix("wd-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile_in(&self.tmp_dir)?)
    }
}

/// Write `data` to `path` as a new file.
///
/// Unpacked copies keep the template's permission bits, so the old file is
/// unlinked rather than opened for writing.
fn replace_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::write(path, data)
}

/// Keep the temporary file and hand it over to a [`Document`].
fn into_document(mut output: NamedTempFile, format: Format) -> Result<Document, TemplateError> {
    output.as_file_mut().rewind()?;
    let (file, path) = output.keep().map_err(std::io::Error::from)?;
    Ok(Document::from_file(file, path, format))
}
