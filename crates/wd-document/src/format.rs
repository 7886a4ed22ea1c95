//! Document output formats.

use std::fmt;
use std::str::FromStr;

/// Output format of a [`Document`](crate::Document).
///
/// `Html` and `Odt` are produced by template rendering; the remaining
/// variants are conversion targets stored in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Html,
    Odt,
    Pdf,
    Doc,
    Rtf,
    Txt,
}

/// Every known format, in declaration order.
const ALL: [Format; 6] = [
    Format::Html,
    Format::Odt,
    Format::Pdf,
    Format::Doc,
    Format::Rtf,
    Format::Txt,
];

impl Format {
    /// File extension and format token (e.g. `"odt"`).
    ///
    /// The token takes part in cache key derivation, so it must stay stable.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Odt => "odt",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Rtf => "rtf",
            Self::Txt => "txt",
        }
    }

    /// MIME type served for this format.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Rtf => "application/rtf",
            Self::Txt => "text/plain",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when parsing an unrecognized format token.
#[derive(Debug, thiserror::Error)]
#[error("unknown document format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().trim_start_matches('.');
        ALL.into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(token))
            .ok_or_else(|| UnknownFormat(s.to_owned()))
    }
}
