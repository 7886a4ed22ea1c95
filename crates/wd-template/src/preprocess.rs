//! Text preprocessing applied to template members before substitution.
//!
//! Office suites store template tags typed into a document as ordinary XML
//! text: quotes get escaped, and a single `{{ name }}` is often split over
//! several formatting runs. Preprocessors repair that before the text reaches
//! the substitution engine.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Preprocessors applied when none are configured.
pub const DEFAULT_PREPROCESSORS: &[&str] = &[StripMarkupInTags::NAME, UnescapeTemplateTags::NAME];

/// Matches a complete `{{ ... }}` or `{% ... %}` tag, possibly spanning lines.
///
/// A tag never extends over another `{{` or `{%`, so a tag whose closing
/// delimiter is missing stays unmatched instead of swallowing later text.
static TEMPLATE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?:[^{}]|\{[^{%]|\}[^{}])*?\}\}|\{%(?:[^{%]|\{[^{%]|%[^{}])*?%\}").unwrap()
});

/// Opening delimiter split by markup: `{</text:span><text:span>{`.
static SPLIT_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:<[^>]*>)+([{%])").unwrap());

/// Closing delimiter split by markup: `}</text:span><text:span>}`.
static SPLIT_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([}%])(?:<[^>]*>)+\}").unwrap());

static XML_MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Error returned by a preprocessing stage.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PreprocessError {
    /// No preprocessor is registered under this identifier.
    #[error("Unknown preprocessor: {0}")]
    Unknown(String),

    /// A stage refused its input.
    #[error("Preprocessor {stage} rejected input: {reason}")]
    Rejected {
        /// Name of the rejecting stage.
        stage: String,
        /// Why the input was rejected.
        reason: String,
    },
}

/// A single text transformation stage.
pub trait Preprocessor: Send + Sync {
    /// Identifier used in configuration.
    fn name(&self) -> &str;

    /// Transform `text`, or reject it.
    fn process(&self, text: String) -> Result<String, PreprocessError>;
}

/// Ordered chain of preprocessors.
///
/// Each stage receives the previous stage's output. The first rejection
/// aborts the chain.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Preprocessor>>,
}

impl Pipeline {
    /// Create an empty pipeline (text passes through unchanged).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline of the [`DEFAULT_PREPROCESSORS`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_stage(StripMarkupInTags)
            .with_stage(UnescapeTemplateTags)
    }

    /// Build a pipeline from configured identifiers, in order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PreprocessError> {
        names
            .iter()
            .try_fold(Self::new(), |pipeline, name| match name.as_ref() {
                StripMarkupInTags::NAME => Ok(pipeline.with_stage(StripMarkupInTags)),
                UnescapeTemplateTags::NAME => Ok(pipeline.with_stage(UnescapeTemplateTags)),
                other => Err(PreprocessError::Unknown(other.to_owned())),
            })
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Preprocessor + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Identifiers of the stages, in order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run `text` through every stage.
    pub fn run(&self, text: String) -> Result<String, PreprocessError> {
        self.stages
            .iter()
            .try_fold(text, |text, stage| stage.process(text))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .finish()
    }
}

/// Preprocessor backed by a closure.
pub struct FnPreprocessor<F> {
    name: String,
    f: F,
}

impl<F> FnPreprocessor<F>
where
    F: Fn(String) -> Result<String, PreprocessError> + Send + Sync,
{
    /// Wrap `f` under the identifier `name`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Preprocessor for FnPreprocessor<F>
where
    F: Fn(String) -> Result<String, PreprocessError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, text: String) -> Result<String, PreprocessError> {
        (self.f)(text)
    }
}

/// Removes XML markup inside template tags.
///
/// `{{ <text:span>name</text:span> }}` becomes `{{ name }}`. Delimiters split
/// across runs are joined first, so `{{ name }</text:span><text:span>}`
/// becomes `{{ name }}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripMarkupInTags;

impl StripMarkupInTags {
    pub const NAME: &'static str = "strip_markup_in_tags";
}

impl Preprocessor for StripMarkupInTags {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, text: String) -> Result<String, PreprocessError> {
        let text = SPLIT_OPEN_RE.replace_all(&text, "{$1");
        let text = SPLIT_CLOSE_RE.replace_all(&text, "${1}}");
        Ok(replace_in_tags(&text, |tag| XML_MARKUP_RE.replace_all(tag, "").into_owned()))
    }
}

/// Decodes XML entities inside template tags.
///
/// `{% if x == &quot;a&quot; %}` becomes `{% if x == "a" %}`. Rejects text
/// with an unterminated `{{` or `{%`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnescapeTemplateTags;

impl UnescapeTemplateTags {
    pub const NAME: &'static str = "unescape_template_tags";
}

impl Preprocessor for UnescapeTemplateTags {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn process(&self, text: String) -> Result<String, PreprocessError> {
        let remainder = TEMPLATE_TAG_RE.replace_all(&text, "");
        for opener in ["{{", "{%"] {
            if remainder.contains(opener) {
                return Err(PreprocessError::Rejected {
                    stage: Self::NAME.to_owned(),
                    reason: format!("unterminated template tag starting with {opener}"),
                });
            }
        }
        Ok(replace_in_tags(&text, unescape_entities))
    }
}

/// Apply `f` to every template tag in `text`.
fn replace_in_tags(text: &str, f: impl Fn(&str) -> String) -> String {
    TEMPLATE_TAG_RE
        .replace_all(text, |caps: &Captures<'_>| f(&caps[0]))
        .into_owned()
}

fn unescape_entities(tag: &str) -> String {
    // `&amp;` last so `&amp;quot;` decodes to `&quot;`, not `"`.
    tag.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
