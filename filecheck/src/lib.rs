pub mod ast;
pub mod check;
mod cursor;
mod env;
pub mod errors;
pub mod parse;
pub mod pattern;
mod test;

pub use self::cursor::Cursor;
pub use self::env::{Binding, Env};
pub use self::errors::{
    AbortReason, CheckFailedError, RelatedCheckError, RelatedLabel, Stage, TestFailed,
    VerifyError,
};
#[cfg(test)]
pub use self::test::TestContext;
pub use self::test::{LabelPosition, MatchInfo, Test, TestResult};

use std::str::FromStr;

use clap::{builder::ValueParser, ArgAction, Args, ColorChoice, ValueEnum};

pub(crate) mod common {
    pub use std::{
        borrow::Cow,
        fmt,
        ops::Range,
        sync::Arc,
    };

    pub use goldcheck::{
        diagnostics::{
            Diagnostic, Label, LabeledSpan, Report, SourceFile, SourceSpan, Span, Spanned,
        },
        text,
    };
    pub use regex::Regex;
    pub use rustc_hash::{FxHashMap, FxHashSet};
    pub use smallvec::{smallvec, SmallVec};

    pub use crate::ast::{Check, CheckModifier};
    pub use crate::cursor::Cursor;
    pub use crate::env::{Binding, Env};
    pub use crate::errors::{
        CheckFailedError, RelatedCheckError, RelatedLabel, TestFailed, VerifyError,
    };
    pub use crate::pattern::{Pattern, PatternError, PatternMatch};
    #[cfg(test)]
    pub(crate) use crate::test::TestContext;
    pub use crate::test::{MatchInfo, TestResult};
    pub use crate::Config;
}

pub const DEFAULT_CHECK_PREFIXES: &[&str] = &["CHECK"];
pub const DEFAULT_COMMENT_PREFIXES: &[&str] = &["COM", "RUN"];
pub const DEFAULT_VAR_OPEN: &str = "[[";
pub const DEFAULT_VAR_CLOSE: &str = "]]";

/// Verify a candidate output stream against the directives embedded in a check file.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Which prefixes to treat as directives.
    ///
    /// For example, in the directive `CHECK-SAME`, `CHECK` is the prefix.
    /// May be given multiple times, e.g. `--check-prefix=CHECK --check-prefix=CHECK-apple`.
    #[arg(
        long = "check-prefix",
        value_name = "PREFIX",
        default_values = ["CHECK"],
        value_parser(re_value_parser("^[A-Za-z][A-Za-z0-9_-]*$")),
        help_heading = "Syntax"
    )]
    pub check_prefixes: Vec<Box<str>>,
    /// Which prefixes to treat as comments.
    ///
    /// All content on a line following a comment directive is ignored,
    /// up to the next newline.
    #[arg(
        long = "comment-prefix",
        value_name = "PREFIX",
        default_values = ["COM", "RUN"],
        value_parser(re_value_parser("^[A-Za-z][A-Za-z0-9_-]*$")),
        help_heading = "Syntax"
    )]
    pub comment_prefixes: Vec<Box<str>>,
    /// If specifying multiple check prefixes, this controls whether or not
    /// to raise an error if one of the prefixes is missing in the check file.
    #[arg(long, default_value_t = false, help_heading = "Syntax")]
    pub allow_unused_prefixes: bool,
    /// Permit the `{OPTIONAL}` directive modifier.
    ///
    /// A positive directive marked optional that fails to match is skipped,
    /// rather than failing the run.
    #[arg(long, default_value_t = false, help_heading = "Syntax")]
    pub allow_optional: bool,
    /// The delimiter which opens a variable placeholder
    #[arg(
        long,
        value_name = "DELIM",
        default_value = DEFAULT_VAR_OPEN,
        help_heading = "Syntax"
    )]
    pub var_open: Box<str>,
    /// The delimiter which closes a variable placeholder
    #[arg(
        long,
        value_name = "DELIM",
        default_value = DEFAULT_VAR_CLOSE,
        help_heading = "Syntax"
    )]
    pub var_close: Box<str>,
    /// Disable default canonicalization of whitespace.
    ///
    /// By default, horizontal whitespace (spaces and tabs) in a pattern matches
    /// any run of horizontal whitespace in the input. This flag makes whitespace
    /// in patterns match exactly.
    #[arg(long, default_value_t = false, help_heading = "Matching")]
    pub strict_whitespace: bool,
    /// Disable case-sensitive matching
    #[arg(long, default_value_t = false, help_heading = "Matching")]
    pub ignore_case: bool,
    /// Controls the extent of the input searched by `CHECK-NOT` directives
    #[arg(
        long,
        value_enum,
        value_name = "SCOPE",
        default_value_t = NotScope::Window,
        help_heading = "Matching"
    )]
    pub not_scope: NotScope,
    /// Treat `[[NAME]]` as a definition when `NAME` has not been defined yet.
    ///
    /// The implicit definition captures the regex `\S+`. Without this flag,
    /// referencing an undefined variable is an error.
    #[arg(long, default_value_t = false, help_heading = "Variables")]
    pub implicit_definitions: bool,
    /// Set a pattern variable NAME with value VALUE that can be used in `CHECK:` lines
    ///
    /// You must specify each one in `NAME=VALUE` format
    #[arg(
        long = "define",
        short = 'D',
        value_name = "NAME=VALUE",
        help_heading = "Variables"
    )]
    pub variables: Vec<CliVariable>,
    /// Abort verification if it has not completed after this many milliseconds
    #[arg(long, value_name = "MS", help_heading = "Matching")]
    pub timeout_ms: Option<u64>,
    /// Set the verbosity level.
    ///
    /// If specified a single time, successful matches are printed.
    ///
    /// If specified multiple times, internal diagnostics are emitted to aid in troubleshooting.
    #[arg(long, short = 'v', action = ArgAction::Count, help_heading = "Output")]
    pub verbose: u8,
    /// Whether, and how, to color terminal output
    #[arg(
        global(true),
        value_enum,
        long,
        default_value_t = ColorChoice::Auto,
        default_missing_value = "auto",
        help_heading = "Output"
    )]
    pub color: ColorChoice,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            check_prefixes: DEFAULT_CHECK_PREFIXES.iter().map(|p| Box::from(*p)).collect(),
            comment_prefixes: DEFAULT_COMMENT_PREFIXES.iter().map(|p| Box::from(*p)).collect(),
            allow_unused_prefixes: false,
            allow_optional: false,
            var_open: Box::from(DEFAULT_VAR_OPEN),
            var_close: Box::from(DEFAULT_VAR_CLOSE),
            strict_whitespace: false,
            ignore_case: false,
            not_scope: NotScope::default(),
            implicit_definitions: false,
            variables: vec![],
            timeout_ms: None,
            verbose: 0,
            color: Default::default(),
        }
    }
}
impl Config {
    /// Set the check prefixes to recognize
    pub fn with_check_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_prefixes = prefixes.into_iter().map(|p| Box::from(p.as_ref())).collect();
        self
    }

    /// Add a command-line style variable definition
    pub fn define(mut self, name: impl Into<Box<str>>, value: impl Into<String>) -> Self {
        self.variables.push(CliVariable {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Determines the window in which a `CHECK-NOT` pattern must be absent
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub enum NotScope {
    /// Between the surrounding positive matches
    #[default]
    Window,
    /// Anywhere in the input
    Stream,
}

/// A variable defined on the command line via `-D NAME=VALUE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliVariable {
    pub name: Box<str>,
    pub value: String,
}
impl FromStr for CliVariable {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (name, value) = input
            .split_once('=')
            .ok_or_else(|| format!("invalid variable definition '{input}': expected NAME=VALUE"))?;
        if !parse::is_valid_variable_name(name) {
            return Err(format!(
                "invalid variable name '{name}': must start with a letter, '_' or '$', followed by letters, digits or '_'"
            ));
        }
        Ok(Self {
            name: Box::from(name),
            value: value.to_string(),
        })
    }
}

fn re_value_parser(r: &'static str) -> ValueParser {
    use clap::{error::ErrorKind, Error};

    ValueParser::from(move |s: &str| -> Result<Box<str>, clap::Error> {
        let re = regex::Regex::new(r)
            .map_err(|err| Error::raw(ErrorKind::ValueValidation, err.to_string()))?;
        if re.is_match(s) {
            Ok(s.to_owned().into_boxed_str())
        } else {
            Err(Error::raw(
                ErrorKind::ValueValidation,
                format!("'{s}' does not match expected pattern `{r}`"),
            ))
        }
    })
}
