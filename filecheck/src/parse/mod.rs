mod parser;

use crate::common::*;

pub use self::parser::CheckFileParser;

#[derive(Diagnostic, Debug, thiserror::Error)]
pub enum ParserError {
    #[error("check file did not contain any directives")]
    #[diagnostic(help(
        "check that the file uses the expected check prefixes, or pass --check-prefix"
    ))]
    Empty,
    #[error("the following check prefixes were never used: {}", text::DisplayCommaSeparated(.0.as_slice()))]
    #[diagnostic(help("pass --allow-unused-prefixes to ignore prefixes which do not occur"))]
    UnusedCheckPrefixes(Vec<Arc<str>>),
    #[error("prefix '{prefix}' is specified more than once")]
    #[diagnostic(help("check and comment prefixes must all be distinct"))]
    DuplicatePrefix { prefix: Arc<str> },
    #[error("{kind} directives are not permitted to be the first positive directive in a file")]
    #[diagnostic(help("{kind} matches relative to the previous match, so one must precede it"))]
    InvalidFirstCheck {
        #[label]
        span: SourceSpan,
        kind: Check,
    },
    #[error("invalid CHECK-LABEL pattern")]
    #[diagnostic()]
    InvalidLabel {
        #[label("in this pattern")]
        span: SourceSpan,
        #[label("variables are not allowed in CHECK-LABEL patterns")]
        var: SourceSpan,
    },
    #[error("invalid check type")]
    #[diagnostic(help("supported suffixes are: -NEXT, -SAME, -NOT, -DAG, -LABEL"))]
    UnsupportedCheckType {
        #[label("this check type is not supported")]
        span: SourceSpan,
    },
    #[error("invalid pattern")]
    #[diagnostic()]
    EmptyPattern {
        #[label("expected a non-empty pattern")]
        span: SourceSpan,
    },
    #[error("invalid check modifier")]
    #[diagnostic()]
    InvalidCheckModifier {
        #[label("this modifier is not recognized, valid modifiers are: LITERAL, OPTIONAL")]
        span: SourceSpan,
    },
    #[error("optional directives are not enabled")]
    #[diagnostic(help("pass --allow-optional to permit the OPTIONAL modifier"))]
    OptionalNotAllowed {
        #[label("this modifier requires --allow-optional")]
        span: SourceSpan,
    },
    #[error("invalid check modifier")]
    #[diagnostic()]
    OptionalNegativeCheck {
        #[label("CHECK-NOT directives cannot be optional")]
        span: SourceSpan,
    },
    #[error("unclosed substitution block")]
    #[diagnostic()]
    UnclosedSubstitution {
        #[label("no closing '{close}' found for this block")]
        span: SourceSpan,
        close: Box<str>,
    },
    #[error("unclosed regex block")]
    #[diagnostic()]
    UnclosedRegex {
        #[label("no closing '}}}}' found for this block")]
        span: SourceSpan,
    },
    #[error("invalid regex block")]
    #[diagnostic()]
    EmptyRegex {
        #[label("expected a non-empty regular expression")]
        span: SourceSpan,
    },
    #[error("invalid variable name")]
    #[diagnostic(help(
        "variable names must start with a letter, '_' or '$', followed by letters, digits or '_'"
    ))]
    InvalidVariableName {
        #[label("this is not a valid variable name")]
        span: SourceSpan,
    },
    #[error("unsupported substitution")]
    #[diagnostic(help("numeric and pseudo variables are not supported"))]
    UnsupportedExpression {
        #[label("this substitution is not supported")]
        span: SourceSpan,
    },
}

pub type ParseResult<T> = Result<T, ParserError>;

/// Returns true if `name` may be used as a pattern variable name
pub fn is_valid_variable_name(name: &str) -> bool {
    let name = name.strip_prefix('$').unwrap_or(name);
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
