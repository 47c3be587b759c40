mod compiler;
mod matcher;

pub use self::compiler::PatternCompiler;
pub use self::matcher::{RegexMatcher, RegexSearcher, SubstringMatcher};

use crate::common::*;

#[derive(Diagnostic, Debug, thiserror::Error)]
pub enum PatternError {
    #[error("reference to undefined variable '{name}'")]
    #[diagnostic(help(
        "variables must be defined by an earlier directive, earlier in the same pattern, or with -D"
    ))]
    UndefinedVariable {
        #[label("'{name}' is not defined at this point")]
        span: SourceSpan,
        name: Box<str>,
    },
    #[error("invalid regular expression")]
    #[diagnostic()]
    InvalidRegex {
        #[label("{error}")]
        span: SourceSpan,
        error: String,
    },
    #[error("invalid variable definition")]
    #[diagnostic(help("a CHECK-NOT pattern never matches, so it cannot bind a variable"))]
    DefinitionInNegativeCheck {
        #[label("variables cannot be defined here")]
        span: SourceSpan,
    },
}

/// An error which occurs while searching for a pattern
#[derive(Debug, thiserror::Error)]
pub enum FindError {
    #[error("reference to undefined variable '{0}'")]
    Undefined(Box<str>),
    #[error("invalid regular expression after substitution: {0}")]
    Regex(#[from] regex::Error),
}

/// A successful match of a [Pattern] in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// The byte range of the match in the input
    pub range: Range<usize>,
    /// The variables defined by the pattern, and the text they captured
    pub captures: SmallVec<[CaptureMatch; 1]>,
}
impl PatternMatch {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            range,
            captures: smallvec![],
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.range.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.range.end
    }

    /// Returns true if this match shares at least one byte with `range`.
    ///
    /// Two empty matches at the same offset are also considered to overlap.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        (self.range.start < range.end && range.start < self.range.end) || self.range == *range
    }
}

/// The text captured for a variable definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMatch {
    pub name: Box<str>,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(SubstringMatcher),
    Regex(RegexMatcher),
}

/// The compiled, matchable form of a directive's pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The span of the pattern in the check file
    span: Range<usize>,
    /// The pattern as written
    source: Box<str>,
    matcher: Matcher,
    /// The variables referenced by this pattern, in order of first use
    references: SmallVec<[Box<str>; 1]>,
    /// The words of the literal parts of this pattern, used to look for near misses
    words: SmallVec<[Box<str>; 4]>,
}
impl Pattern {
    /// The pattern text as it was written in the check file
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if this pattern is matched as a plain substring
    pub fn is_substring(&self) -> bool {
        matches!(self.matcher, Matcher::Substring(_))
    }

    /// The variables this pattern defines
    pub fn definitions(&self) -> impl Iterator<Item = &str> + '_ {
        let defs = match &self.matcher {
            Matcher::Substring(_) => None,
            Matcher::Regex(matcher) => Some(matcher.definitions()),
        };
        defs.into_iter().flatten()
    }

    /// The variables this pattern references, and which must be bound when it is matched
    pub fn references(&self) -> impl Iterator<Item = &str> + '_ {
        self.references.iter().map(|name| &**name)
    }

    /// Search for the first match of this pattern in `range` of `buffer`.
    ///
    /// References are resolved against `env`. Unless the pattern explicitly
    /// matches newlines, matches never span more than one line.
    pub fn find(
        &self,
        buffer: &str,
        range: Range<usize>,
        env: &Env,
    ) -> Result<Option<PatternMatch>, FindError> {
        self.searcher(env)?.find(buffer, range)
    }

    /// Resolve the references of this pattern against `env`, for repeated searches
    pub fn searcher<'a>(&'a self, env: &'a Env) -> Result<Searcher<'a>, FindError> {
        match &self.matcher {
            Matcher::Substring(matcher) => Ok(Searcher::Substring(matcher)),
            Matcher::Regex(matcher) => matcher.searcher(env).map(Searcher::Regex),
        }
    }

    /// Describe what this pattern expects, with the current value of each referenced variable
    pub fn describe(&self, env: &Env) -> String {
        use std::fmt::Write;

        let mut description = format!("expected `{}`", &self.source);
        for (i, name) in self.references.iter().enumerate() {
            description.push_str(if i == 0 { ", where " } else { ", " });
            match env.resolve(name) {
                Some(value) => {
                    let _ = write!(&mut description, "'{name}' is {value:?}");
                }
                None => {
                    let _ = write!(&mut description, "'{name}' is undefined");
                }
            }
        }
        description
    }

    /// Score how similar `line` is to this pattern, by the number of literal words it contains
    pub fn similarity(&self, line: &str) -> usize {
        self.words
            .iter()
            .filter(|word| line.contains(&***word))
            .count()
    }
}
impl Spanned for Pattern {
    fn span(&self) -> SourceSpan {
        SourceSpan::from(self.span.clone())
    }

    fn range(&self) -> Range<usize> {
        self.span.clone()
    }
}
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A [Pattern] whose references have been resolved against a fixed set of bindings
#[derive(Debug)]
pub enum Searcher<'a> {
    Substring(&'a SubstringMatcher),
    Regex(RegexSearcher<'a>),
}
impl Searcher<'_> {
    /// Search for the first match in `range` of `buffer`
    pub fn find(
        &self,
        buffer: &str,
        range: Range<usize>,
    ) -> Result<Option<PatternMatch>, FindError> {
        if range.start > range.end || range.end > buffer.len() {
            return Ok(None);
        }
        match self {
            Self::Substring(matcher) => Ok(matcher.find(buffer, range)),
            Self::Regex(searcher) => searcher.find(buffer, range),
        }
    }
}
