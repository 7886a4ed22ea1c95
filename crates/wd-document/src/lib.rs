//! Rendered document lifecycle for webdoc.
//!
//! A [`Document`] owns exactly one open file handle representing a rendered
//! artifact (an HTML file, an ODF package, or a converted output) together
//! with the path it was opened from. Leaving scope closes the handle once and,
//! when the document was created with `delete_on_close`, unlinks the file
//! afterwards.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use wd_document::{Document, Format};
//!
//! let mut doc = Document::open("report.odt", Format::Odt)?;
//! let mut head = [0u8; 4];
//! doc.read_exact(&mut head)?;
//! doc.close()?;
//! # Ok::<(), std::io::Error>(())
//! ```

mod document;
mod format;

pub use document::Document;
pub use format::{Format, UnknownFormat};
