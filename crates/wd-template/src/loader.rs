//! Resolution of template names against the template root.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::{MANIFEST_PATH, parse_manifest};
use crate::package::{Package, PackedPackage, UnpackedPackage};
use crate::TemplateError;

/// Resolves template names relative to a root directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    root: PathBuf,
}

impl TemplateLoader {
    /// Create a loader for templates under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Template root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an HTML template. The name must point to a regular file.
    pub fn html(&self, name: &str) -> Result<HtmlTemplate, TemplateError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(self.not_found(name));
        }
        Ok(HtmlTemplate {
            name: name.to_owned(),
            path,
        })
    }

    /// Resolve an ODF template.
    ///
    /// A file is treated as a packed archive, a directory as an unpacked tree.
    pub fn odf(&self, name: &str) -> Result<OdfTemplate, TemplateError> {
        let path = self.root.join(name);
        let (packed, package): (bool, Box<dyn Package>) = if path.is_file() {
            (true, Box::new(PackedPackage::new(&path)))
        } else if path.is_dir() {
            (false, Box::new(UnpackedPackage::new(&path)))
        } else {
            return Err(self.not_found(name));
        };
        tracing::debug!(template = name, packed, "resolved ODF template");
        Ok(OdfTemplate {
            name: name.to_owned(),
            path,
            packed,
            package,
        })
    }

    fn not_found(&self, name: &str) -> TemplateError {
        TemplateError::NotFound {
            name: name.to_owned(),
            root: self.root.clone(),
        }
    }
}

/// A single-file HTML template.
#[derive(Debug, Clone)]
pub struct HtmlTemplate {
    name: String,
    path: PathBuf,
}

impl HtmlTemplate {
    /// Template name as requested.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Template source text.
    pub fn content(&self) -> Result<String, TemplateError> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

/// An ODF template, packed or unpacked.
pub struct OdfTemplate {
    name: String,
    path: PathBuf,
    packed: bool,
    package: Box<dyn Package>,
}

impl OdfTemplate {
    /// Template name as requested.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` for a single archive file, `false` for a directory tree.
    #[must_use]
    pub fn packed(&self) -> bool {
        self.packed
    }

    /// Members declared as `text/xml` in the package manifest.
    pub fn xml_members(&self) -> Result<Vec<String>, TemplateError> {
        let manifest = match self.package.get_file(MANIFEST_PATH) {
            Ok(manifest) => manifest,
            Err(TemplateError::MissingMember(_)) => {
                return Err(TemplateError::MalformedPackage(format!(
                    "{MANIFEST_PATH} not found in {}",
                    self.name
                )));
            }
            Err(e) => return Err(e),
        };
        parse_manifest(&manifest)
    }
}

impl Package for OdfTemplate {
    fn get_file(&self, path: &str) -> Result<Vec<u8>, TemplateError> {
        self.package.get_file(path)
    }

    fn unpack(&self, dest: &Path) -> Result<(), TemplateError> {
        self.package.unpack(dest)
    }
}

impl fmt::Debug for OdfTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdfTemplate")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("packed", &self.packed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_html_resolves_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("page.html"), "<p>{{ name }}</p>").unwrap();

        let template = TemplateLoader::new(tmp.path()).html("page.html").unwrap();
        assert_eq!(template.name(), "page.html");
        assert_eq!(template.content().unwrap(), "<p>{{ name }}</p>");
    }

    #[test]
    fn test_html_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = TemplateLoader::new(tmp.path()).html("nope.html").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { ref name, .. } if name == "nope.html"));
    }

    #[test]
    fn test_html_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("dir.html")).unwrap();
        let err = TemplateLoader::new(tmp.path()).html("dir.html").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }

    #[test]
    fn test_odf_file_is_packed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("letter.odt"), b"PK").unwrap();

        let template = TemplateLoader::new(tmp.path()).odf("letter.odt").unwrap();
        assert!(template.packed());
    }

    #[test]
    fn test_odf_directory_is_unpacked() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("letter")).unwrap();

        let template = TemplateLoader::new(tmp.path()).odf("letter").unwrap();
        assert!(!template.packed());
    }

    #[test]
    fn test_odf_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = TemplateLoader::new(tmp.path()).odf("letter").unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Template letter not found in directory {}", tmp.path().display())
        );
    }

    #[test]
    fn test_missing_manifest_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("letter");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("content.xml"), "<content/>").unwrap();

        let template = TemplateLoader::new(tmp.path()).odf("letter").unwrap();
        assert!(matches!(
            template.xml_members(),
            Err(TemplateError::MalformedPackage(_))
        ));
        assert_eq!(template.get_content_xml().unwrap(), b"<content/>");
    }
}
