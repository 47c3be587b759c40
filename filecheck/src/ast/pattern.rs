use crate::common::*;

/// A single piece of a directive's pattern, as written in the check file.
///
/// All text is borrowed from the check file; spans are byte ranges into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckPatternPart<'a> {
    /// Text which must appear verbatim in the input
    Literal(Span<&'a str>),
    /// A `{{regex}}` block
    Regex(Span<&'a str>),
    /// A `[[NAME:regex]]` block, which always defines `NAME`
    Capture {
        span: Range<usize>,
        name: Span<&'a str>,
        pattern: Span<&'a str>,
    },
    /// A `[[NAME]]` block.
    ///
    /// Whether this is a reference or an implicit definition is decided when
    /// the pattern is compiled, since that depends on the preceding directives.
    Variable(Span<&'a str>),
}
impl<'a> CheckPatternPart<'a> {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Returns true if this part binds or uses a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Capture { .. } | Self::Variable(_))
    }
}
impl<'a> Spanned for CheckPatternPart<'a> {
    fn span(&self) -> SourceSpan {
        SourceSpan::from(self.range())
    }

    fn range(&self) -> Range<usize> {
        match self {
            Self::Literal(s) | Self::Regex(s) => s.range(),
            Self::Capture { span, .. } => span.clone(),
            Self::Variable(name) => name.range(),
        }
    }
}

/// The pattern of a single directive, split into literal text and placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPattern<'a> {
    /// The raw pattern text, trimmed of surrounding whitespace
    raw: Span<&'a str>,
    parts: SmallVec<[CheckPatternPart<'a>; 1]>,
}
impl<'a> CheckPattern<'a> {
    pub fn new(raw: Span<&'a str>, parts: SmallVec<[CheckPatternPart<'a>; 1]>) -> Self {
        Self { raw, parts }
    }

    /// A pattern consisting only of `raw`, matched verbatim
    pub fn literal(raw: Span<&'a str>) -> Self {
        Self {
            parts: smallvec![CheckPatternPart::Literal(raw.clone())],
            raw,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'a str {
        self.raw.inner()
    }

    pub fn parts(&self) -> &[CheckPatternPart<'a>] {
        self.parts.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the first part of this pattern which binds or uses a variable
    pub fn first_variable(&self) -> Option<&CheckPatternPart<'a>> {
        self.parts.iter().find(|part| part.is_variable())
    }
}
impl<'a> Spanned for CheckPattern<'a> {
    fn span(&self) -> SourceSpan {
        self.raw.span()
    }

    fn range(&self) -> Range<usize> {
        self.raw.range()
    }
}
impl<'a> fmt::Display for CheckPattern<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
