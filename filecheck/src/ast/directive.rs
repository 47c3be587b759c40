use std::str::FromStr;

use crate::common::*;

use super::CheckModifier;

#[derive(Debug, PartialEq, Eq)]
pub enum InvalidCheckTypeError {
    /// The suffix is not a directive kind at all
    Unrecognized,
    /// The suffix names a directive kind which this implementation does not support
    Unsupported,
}

/// This enum represents the kind of directive that was parsed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Check {
    /// The base CHECK directive, i.e. match the pattern somewhere after the previous match
    Plain,
    /// The CHECK-NEXT directive, i.e. the pattern must match on the line following
    /// the one on which the previous match ended.
    Next,
    /// The CHECK-SAME directive, i.e. the pattern must match on the same line
    /// as the previous match ended on.
    Same,
    /// The CHECK-NOT directive, i.e. the pattern must _not_ match between the
    /// previous positive match and the next one.
    Not,
    /// The CHECK-DAG directive, i.e. like CHECK, but may match in any order relative
    /// to the other CHECK-DAG directives in the same consecutive group.
    Dag,
    /// The CHECK-LABEL directive, i.e. a regular CHECK which may not reference or bind
    /// variables, and which divides the input into blocks. Directives between two
    /// labels may only match within the block between the two label matches.
    Label,
}
impl Check {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Next => "-NEXT",
            Self::Same => "-SAME",
            Self::Not => "-NOT",
            Self::Dag => "-DAG",
            Self::Label => "-LABEL",
        }
    }

    /// Returns true if this directive asserts the presence of its pattern
    #[inline]
    pub fn is_positive(&self) -> bool {
        !matches!(self, Self::Not)
    }

    /// Returns true if this directive is anchored to the previous match
    #[inline]
    pub fn is_continuation(&self) -> bool {
        matches!(self, Self::Same | Self::Next)
    }
}
impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CHECK{}", self.suffix())
    }
}
impl FromStr for Check {
    type Err = InvalidCheckTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Plain),
            "NEXT" | "next" => Ok(Self::Next),
            "SAME" | "same" => Ok(Self::Same),
            "NOT" | "not" => Ok(Self::Not),
            "DAG" | "dag" => Ok(Self::Dag),
            "LABEL" | "label" => Ok(Self::Label),
            "EMPTY" | "empty" => Err(InvalidCheckTypeError::Unsupported),
            _ if s.starts_with("COUNT-") || s.starts_with("count-") => {
                Err(InvalidCheckTypeError::Unsupported)
            }
            _ => Err(InvalidCheckTypeError::Unrecognized),
        }
    }
}

/// The complete type of a directive: the prefix it was written with, its kind,
/// and any modifiers applied to it.
#[derive(Debug, Clone)]
pub struct CheckType {
    /// The span of `PREFIX-KIND{MODIFIERS}` in the check file
    pub span: SourceSpan,
    /// The check prefix used, e.g. `CHECK` or `CHECK-apple`
    pub prefix: Arc<str>,
    pub kind: Check,
    pub modifiers: CheckModifier,
}
impl CheckType {
    pub fn new(span: SourceSpan, prefix: Arc<str>, kind: Check) -> Self {
        Self {
            span,
            prefix,
            kind,
            modifiers: CheckModifier::empty(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: CheckModifier) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        self.modifiers.is_literal()
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.modifiers.is_optional()
    }
}
impl Spanned for CheckType {
    fn span(&self) -> SourceSpan {
        self.span
    }
}
impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", &self.prefix, self.kind.suffix())
    }
}
impl Eq for CheckType {}
impl PartialEq for CheckType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.modifiers == other.modifiers
            && self.prefix == other.prefix
    }
}
