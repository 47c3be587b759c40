use std::time::Duration;

use goldcheck::diagnostics::{FileName, Severity, SourceCode};

use crate::{common::*, parse::ParserError};

/// The phase of verification at which a run stopped
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Extracting directives from the check file
    Parse,
    /// Compiling directive patterns
    Compile,
    /// Matching directives against the input
    Match,
    /// The run was cancelled or ran out of time
    Aborted,
}
impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Parse => f.write_str("parse"),
            Self::Compile => f.write_str("compile"),
            Self::Match => f.write_str("match"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Why a run was aborted before it completed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The abort flag was raised by the caller
    Cancelled,
    /// The deadline given by `--timeout-ms` passed
    TimedOut(Duration),
}
impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::TimedOut(timeout) => write!(f, "timed out after {}ms", timeout.as_millis()),
        }
    }
}

/// The error returned by [crate::Test::verify]
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The check file could not be parsed
    #[error("{error}")]
    Parse {
        error: ParserError,
        match_file: Arc<SourceFile>,
    },
    /// A directive's pattern could not be compiled
    #[error("{error}")]
    Pattern {
        error: PatternError,
        match_file: Arc<SourceFile>,
    },
    /// The input did not satisfy the check file
    #[error(transparent)]
    Failed(#[from] TestFailed),
}
impl VerifyError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Parse { .. } => Stage::Parse,
            Self::Pattern { .. } => Stage::Compile,
            Self::Failed(failed) => match failed.error() {
                Some(CheckFailedError::Aborted { .. }) => Stage::Aborted,
                _ => Stage::Match,
            },
        }
    }

    /// Get the match failure, if this error occurred while matching
    pub fn failure(&self) -> Option<&CheckFailedError> {
        match self {
            Self::Failed(failed) => failed.error(),
            _ => None,
        }
    }

    fn as_diagnostic(&self) -> &dyn Diagnostic {
        match self {
            Self::Parse { error, .. } => error,
            Self::Pattern { error, .. } => error,
            Self::Failed(failed) => failed,
        }
    }
}
impl Diagnostic for VerifyError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.as_diagnostic().code()
    }
    fn severity(&self) -> Option<Severity> {
        self.as_diagnostic().severity()
    }
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.as_diagnostic().help()
    }
    fn url<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.as_diagnostic().url()
    }
    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            Self::Parse { match_file, .. } | Self::Pattern { match_file, .. } => Some(match_file),
            Self::Failed(failed) => failed.source_code(),
        }
    }
    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.as_diagnostic().labels()
    }
    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.as_diagnostic().related()
    }
    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.as_diagnostic().diagnostic_source()
    }
}

#[derive(Diagnostic, Debug, thiserror::Error)]
#[error("verification of '{test_from}' failed")]
#[diagnostic(help("see below for details"))]
pub struct TestFailed {
    pub test_from: FileName,
    #[related]
    pub errors: Vec<CheckFailedError>,
}
impl TestFailed {
    pub fn new(error: CheckFailedError, match_file: &SourceFile) -> Self {
        Self {
            test_from: match_file.name().clone(),
            errors: vec![error],
        }
    }

    /// The failure which stopped the run
    pub fn error(&self) -> Option<&CheckFailedError> {
        self.errors.first()
    }

    pub fn errors(&self) -> &[CheckFailedError] {
        self.errors.as_slice()
    }
}

#[derive(Diagnostic, Debug, thiserror::Error)]
pub enum CheckFailedError {
    /// No match was found for an expected pattern in its search window
    #[error("no match found for {directive} pattern")]
    #[diagnostic()]
    MatchNoneButExpected {
        #[label(primary, "pattern at this location was not matched")]
        span: SourceSpan,
        #[source_code]
        match_file: Arc<SourceFile>,
        /// The index of the directive in the check file
        index: usize,
        directive: Box<str>,
        #[help]
        note: Option<String>,
        /// The input line which most resembles the pattern, if any
        #[related]
        hint: Option<RelatedLabel>,
    },
    /// A match for an expected pattern was found, but not on the required line
    #[error("match found for {directive} pattern, but on the wrong line")]
    #[diagnostic()]
    MatchFoundButWrongLine {
        #[label(primary, "match found here")]
        span: SourceSpan,
        #[source_code]
        input_file: Arc<SourceFile>,
        index: usize,
        directive: Box<str>,
        #[related]
        pattern: Option<RelatedCheckError>,
        #[help]
        note: Option<String>,
    },
    /// A match for a `CHECK-NOT` pattern was found in its exclusion window
    #[error("match found for {directive} pattern, but it was excluded")]
    #[diagnostic()]
    MatchFoundButExcluded {
        #[label(primary, "match found here")]
        span: SourceSpan,
        #[source_code]
        input_file: Arc<SourceFile>,
        index: usize,
        directive: Box<str>,
        #[related]
        pattern: Option<RelatedCheckError>,
        #[help]
        note: Option<String>,
    },
    /// A member of a `CHECK-DAG` group did not match anywhere in the group's window
    #[error("no match found for {directive} pattern in its group")]
    #[diagnostic(help("CHECK-DAG patterns may match in any order, but cannot overlap each other"))]
    DagMemberUnmatched {
        #[label(primary, "pattern at this location was not matched")]
        span: SourceSpan,
        #[source_code]
        match_file: Arc<SourceFile>,
        index: usize,
        directive: Box<str>,
        #[label("in the group starting here")]
        group: Option<SourceSpan>,
        #[related]
        hint: Option<RelatedLabel>,
    },
    /// A referenced variable had no binding when the pattern was matched.
    ///
    /// This only occurs when the defining directive was optional and skipped.
    #[error("reference to undefined variable '{name}'")]
    #[diagnostic(help("the directive defining this variable was optional, and did not match"))]
    UndefinedVariable {
        #[label("referenced by this pattern")]
        span: SourceSpan,
        #[source_code]
        match_file: Arc<SourceFile>,
        index: usize,
        name: Box<str>,
    },
    /// A pattern became invalid once its references were substituted
    #[error("unable to match invalid pattern")]
    #[diagnostic()]
    InvalidPattern {
        #[label(primary, "{error}")]
        span: SourceSpan,
        #[source_code]
        match_file: Arc<SourceFile>,
        index: usize,
        error: String,
    },
    /// The run was cancelled, or ran out of time
    #[error("verification aborted: {reason}")]
    #[diagnostic()]
    Aborted { reason: AbortReason },
}
impl CheckFailedError {
    /// The index of the directive which failed, if the failure is attributable to one
    pub fn directive_index(&self) -> Option<usize> {
        match self {
            Self::MatchNoneButExpected { index, .. }
            | Self::MatchFoundButWrongLine { index, .. }
            | Self::MatchFoundButExcluded { index, .. }
            | Self::DagMemberUnmatched { index, .. }
            | Self::UndefinedVariable { index, .. }
            | Self::InvalidPattern { index, .. } => Some(*index),
            Self::Aborted { .. } => None,
        }
    }
}

/// This is used to associate source spans from the match file
/// with those from the input file.
#[derive(Diagnostic, Debug, thiserror::Error)]
#[error("check failed")]
#[diagnostic()]
pub struct RelatedCheckError {
    #[label("due to pattern at this location")]
    pub span: SourceSpan,
    #[source_code]
    pub match_file: Arc<SourceFile>,
}

/// A set of labels in some other file than the one a diagnostic is reported against
#[derive(Debug, thiserror::Error)]
#[error("see also")]
pub struct RelatedLabel {
    pub severity: Severity,
    pub labels: SmallVec<[Label; 1]>,
    pub file: Arc<SourceFile>,
}
impl RelatedLabel {
    pub fn note(label: Label, file: Arc<SourceFile>) -> Self {
        Self {
            severity: Severity::Advice,
            labels: smallvec![label],
            file,
        }
    }
}
impl Diagnostic for RelatedLabel {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        None
    }
    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        None
    }
    fn url<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        None
    }
    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.file)
    }
    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Box::new(self.labels.iter().cloned().map(|l| l.into())))
        }
    }
    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        None
    }
    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        None
    }
}
