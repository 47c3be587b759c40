use std::{
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
    ops::{Deref, Range},
    path::Path,
    sync::Arc,
};

pub use miette::{
    Diagnostic, IntoDiagnostic, LabeledSpan, Report, Severity, SourceCode, SourceSpan, WrapErr,
};

use miette::{MietteError, MietteSpanContents, SpanContents};

use crate::{text::LineIndex, StaticCow};

pub mod reporting {
    pub use miette::set_hook;

    #[cfg(feature = "fancy-diagnostics")]
    pub type ReportHandlerOpts = miette::MietteHandlerOpts;
}

#[cfg(feature = "fancy-diagnostics")]
pub use miette::set_panic_hook;

pub type DiagResult<T> = miette::Result<T>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileName {
    Stdin,
    Path(Arc<Path>),
    Virtual(StaticCow<str>),
}
impl From<&Path> for FileName {
    fn from(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            Self::Stdin
        } else {
            Self::Path(Arc::from(path))
        }
    }
}
impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        if name == "-" {
            Self::Stdin
        } else {
            Self::Virtual(Cow::Owned(name.to_string()))
        }
    }
}
impl From<String> for FileName {
    fn from(name: String) -> Self {
        if name == "-" {
            Self::Stdin
        } else {
            Self::Virtual(Cow::Owned(name))
        }
    }
}
impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Virtual(name) => f.write_str(name),
        }
    }
}

/// A named, fully-loaded source buffer.
///
/// Both check files and candidate streams are represented this way. The
/// buffer is immutable once loaded, so a [SourceFile] is typically shared
/// via `Arc` between the parser, the matcher, and any diagnostics produced.
#[derive(Debug)]
pub struct SourceFile {
    name: FileName,
    content: String,
    lines: LineIndex,
}
impl SourceFile {
    pub fn new(name: impl Into<FileName>, content: impl Into<String>) -> Self {
        let content = content.into();
        let lines = LineIndex::new(&content);
        Self {
            name: name.into(),
            content,
            lines,
        }
    }

    pub fn name(&self) -> &FileName {
        &self.name
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        self.content.as_str()
    }

    /// Get the file/line/column location of `offset`
    pub fn location(&self, offset: usize) -> FileLineCol {
        let (line, column) = self.lines.line_col(offset);
        FileLineCol {
            name: self.name.clone(),
            line,
            column,
        }
    }
}
impl SourceCode for SourceFile {
    fn read_span<'a>(
        &'a self,
        span: &SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
        let contents =
            self.content
                .as_str()
                .read_span(span, context_lines_before, context_lines_after)?;
        Ok(Box::new(MietteSpanContents::new_named(
            self.name.to_string(),
            contents.data(),
            *contents.span(),
            contents.line(),
            contents.column(),
            contents.line_count(),
        )))
    }
}

/// A human-readable source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLineCol {
    pub name: FileName,
    pub line: usize,
    pub column: usize,
}
impl fmt::Display for FileLineCol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", &self.name, self.line, self.column)
    }
}

pub trait Spanned {
    fn span(&self) -> SourceSpan;

    fn start(&self) -> usize {
        self.span().offset()
    }

    fn end(&self) -> usize {
        let span = self.span();
        span.offset() + span.len()
    }

    fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}
impl Spanned for SourceSpan {
    #[inline(always)]
    fn span(&self) -> SourceSpan {
        *self
    }
}
impl<T: ?Sized + Spanned> Spanned for &T {
    fn span(&self) -> SourceSpan {
        (**self).span()
    }
}
impl<T: ?Sized + Spanned> Spanned for Box<T> {
    fn span(&self) -> SourceSpan {
        (**self).span()
    }
}

/// Associates a byte range in some source file with an item of type `T`
pub struct Span<T> {
    span: Range<usize>,
    spanned: T,
}
impl<T: Clone> Clone for Span<T> {
    fn clone(&self) -> Self {
        Self {
            span: self.span.clone(),
            spanned: self.spanned.clone(),
        }
    }
}
impl<T> Span<T> {
    #[inline]
    pub fn new(range: Range<usize>, spanned: T) -> Self {
        Self {
            span: range,
            spanned,
        }
    }

    #[inline]
    pub fn inner(&self) -> &T {
        &self.spanned
    }
}
impl<T> Deref for Span<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.spanned
    }
}
impl<T: fmt::Debug> fmt::Debug for Span<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}@{:?}", &self.spanned, &self.span)
    }
}
impl<T: fmt::Display> fmt::Display for Span<T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.spanned, f)
    }
}
impl<T: Eq> Eq for Span<T> {}
impl<T: PartialEq> PartialEq for Span<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.spanned.eq(&other.spanned)
    }
}
impl<T: Hash> Hash for Span<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.spanned.hash(state);
    }
}
impl<T> Spanned for Span<T> {
    #[inline(always)]
    fn start(&self) -> usize {
        self.span.start
    }

    #[inline(always)]
    fn end(&self) -> usize {
        self.span.end
    }

    #[inline(always)]
    fn range(&self) -> Range<usize> {
        self.span.clone()
    }

    #[inline]
    fn span(&self) -> SourceSpan {
        SourceSpan::from(self.span.clone())
    }
}

/// A span with an optional message, used to build related diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    span: SourceSpan,
    label: Option<StaticCow<str>>,
}
impl Label {
    pub fn new<L>(span: impl Into<SourceSpan>, label: L) -> Self
    where
        StaticCow<str>: From<L>,
    {
        Self {
            span: span.into(),
            label: Some(Cow::from(label)),
        }
    }
}
impl Spanned for Label {
    fn span(&self) -> SourceSpan {
        self.span
    }
}
impl From<Label> for LabeledSpan {
    #[inline]
    fn from(label: Label) -> LabeledSpan {
        LabeledSpan::new_with_span(label.label.map(|l| l.into_owned()), label.span)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn source_file_locations() {
        let file = SourceFile::new("out.ll", "foo 42\nbar 43\n");
        let loc = file.location(8);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 2);
        assert_eq!(loc.to_string(), "out.ll:2:2");
    }

    #[test]
    fn span_accessors() {
        let span = Span::new(3..7, "text");
        assert_eq!(span.start(), 3);
        assert_eq!(span.end(), 7);
        assert_eq!(span.span().len(), 4);
        assert_eq!(*span, "text");
    }
}
