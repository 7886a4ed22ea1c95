//! Template resolution and rendering for webdoc.
//!
//! Templates live under a configured root directory:
//!
//! - HTML templates are single text files.
//! - ODF templates are either a packed `.odt` archive or an unpacked directory
//!   tree with the same layout.
//!
//! [`TemplateLoader`] resolves a template name into an [`HtmlTemplate`] or an
//! [`OdfTemplate`], and [`Renderer`] substitutes a JSON context into it,
//! producing a [`wd_document::Document`] over a fresh temporary file.
//!
//! ODF rendering processes every member the package manifest declares as
//! `text/xml`, running it through a [`Pipeline`] of text preprocessors before
//! substitution. Rendered archives are byte-for-byte reproducible: every member
//! carries the same fixed timestamp and members are written in a stable order.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use wd_template::{Pipeline, Renderer, TemplateLoader};
//!
//! let loader = TemplateLoader::new("templates");
//! let renderer = Renderer::new("/tmp/webdoc", Pipeline::standard());
//!
//! let template = loader.odf("letter.odt")?;
//! let document = renderer.render_odf(&template, &json!({"name": "Ada"}))?;
//! println!("{}", document.path().display());
//! # Ok::<(), wd_template::TemplateError>(())
//! ```

mod archive;
mod error;
mod loader;
mod manifest;
mod package;
mod preprocess;
mod render;

pub use archive::{FIXED_TIMESTAMP_SECS, fixed_timestamp};
pub use error::TemplateError;
pub use loader::{HtmlTemplate, OdfTemplate, TemplateLoader};
pub use manifest::{MANIFEST_NAMESPACE, MANIFEST_PATH, parse_manifest};
pub use package::{Package, PackedPackage, UnpackedPackage};
pub use preprocess::{
    DEFAULT_PREPROCESSORS, FnPreprocessor, Pipeline, PreprocessError, Preprocessor,
    StripMarkupInTags, UnescapeTemplateTags,
};
pub use render::{Renderer, Substitution};
