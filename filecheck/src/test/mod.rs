
pub use self::result::{LabelPosition, MatchInfo, TestResult};
#[cfg(test)]
pub use self::testing::TestContext;

use std::{
    sync::atomic::AtomicBool,
    time::Duration,
};

use crate::{check::Checker, common::*, errors::VerifyError, parse::CheckFileParser};

/// Construct an `Arc<SourceFile>` from a string, named after the call site unless a name is given
#[macro_export]
macro_rules! source_file {
    ($content:expr) => {
        std::sync::Arc::new(goldcheck::diagnostics::SourceFile::new(
            goldcheck::diagnostics::FileName::from(format!("{}:{}", file!(), line!())),
            $content,
        ))
    };

    ($name:expr, $content:expr) => {
        std::sync::Arc::new(goldcheck::diagnostics::SourceFile::new(
            goldcheck::diagnostics::FileName::from($name),
            $content,
        ))
    };
}

/// This struct represents a single check file, which can be verified
/// against one or more candidate inputs.
///
/// This is the primary entrypoint for running verifications.
pub struct Test<'a> {
    config: &'a Config,
    match_file: Arc<SourceFile>,
    abort: Option<Arc<AtomicBool>>,
}
impl<'a> Test<'a> {
    /// Create a new test from the given match file (containing CHECKs) and configuration
    ///
    /// The match file is not parsed until verification is requested.
    pub fn new(match_file: Arc<SourceFile>, config: &'a Config) -> Self {
        Self {
            config,
            match_file,
            abort: None,
        }
    }

    /// Stop any verification in progress once `abort` is set
    pub fn with_abort_flag(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn match_file(&self) -> &Arc<SourceFile> {
        &self.match_file
    }

    /// Verify that `input_file` satisfies the directives of this test.
    ///
    /// The match file is parsed and its patterns compiled first; either step
    /// failing stops verification before the input is looked at. Then the
    /// directives are matched against the input, stopping at the first failure.
    pub fn verify(&self, input_file: Arc<SourceFile>) -> Result<TestResult, VerifyError> {
        let parse_error = |error| VerifyError::Parse {
            error,
            match_file: self.match_file.clone(),
        };
        let mut parser = CheckFileParser::new(self.config).map_err(parse_error)?;
        let file = parser
            .parse(self.match_file.as_str())
            .map_err(parse_error)?;

        let program = file
            .compile(self.config)
            .map_err(|error| VerifyError::Pattern {
                error,
                match_file: self.match_file.clone(),
            })?;

        let timeout = self.config.timeout_ms.map(Duration::from_millis);
        Checker::new(self.config, &program, self.match_file.clone(), &input_file)
            .with_abort_flag(self.abort.as_deref())
            .with_timeout(timeout)
            .check()
            .map_err(|error| VerifyError::Failed(TestFailed::new(error, &self.match_file)))
    }
}
