use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use filecheck::{Config, Stage, Test, TestResult};
use goldcheck::{
    diagnostics::{DiagResult, IntoDiagnostic, Report, SourceFile, WrapErr},
    Input,
};
use rayon::prelude::*;

use super::Command;

/// Verify one candidate stream against the directives in one or more check files
#[derive(Debug, Parser)]
#[command(name = "check", aliases = ["filecheck", "FileCheck"])]
pub struct Check {
    /// The files containing the directives, e.g. `CHECK`, to match against
    /// the `input_file`.
    ///
    /// A directory is searched recursively for files with one of the
    /// extensions given by `--file-type`. Each check file is verified
    /// against the same input, independently of the others.
    #[arg(value_name = "CHECK_FILE", required = true)]
    pub match_files: Vec<Input>,
    /// The path to the file to verify.
    ///
    /// By default this reads from standard input
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub input_file: Input,
    /// The file extensions to consider check files when searching a directory
    #[arg(
        long = "file-type",
        value_name = "EXT",
        default_values = ["txt", "ll", "sil", "swift", "mlir"]
    )]
    pub file_types: Vec<String>,
    /// Do not normalize CRLF line endings to LF in the inputs
    #[arg(long, default_value_t = false)]
    pub strict_newlines: bool,
    #[command(flatten)]
    pub config: Config,
}
impl Command for Check {
    fn is_help_requested(&self) -> bool {
        self.match_files
            .first()
            .is_some_and(|input| input.path().as_os_str() == "help")
    }

    fn run(self) -> DiagResult<ExitCode> {
        Ok(ExitCode::from(self.execute()))
    }
}
impl Check {
    /// Verify the input against every check file, returning the exit status
    ///
    /// The status is 0 if every check file passed, 1 if any match failed, and
    /// 2 if any input could not be read, parsed or compiled.
    fn execute(self) -> u8 {
        let mut config = self.config;
        config.check_prefixes.sort();
        config.check_prefixes.dedup();
        config.comment_prefixes.sort();
        config.comment_prefixes.dedup();

        let mut match_files = vec![];
        for input in self.match_files.iter() {
            let found = input
                .get_file_types(&self.file_types)
                .into_diagnostic()
                .wrap_err_with(|| format!("unable to search '{}'", input.path().display()));
            match found {
                Ok(found) => match_files.extend(found),
                Err(report) => return invalid_usage(report),
            }
        }
        if match_files.is_empty() {
            return invalid_usage(Report::msg(
                "no check files were found in the given paths",
            ));
        }

        let input_file = match self
            .input_file
            .into_source(self.strict_newlines)
            .into_diagnostic()
            .wrap_err("unable to read the input file")
        {
            Ok(input_file) => input_file,
            Err(report) => return invalid_usage(report),
        };
        log::debug!(
            target: "goldcheck",
            "verifying {} bytes of input against {} check files",
            input_file.as_str().len(),
            match_files.len()
        );

        let outcomes = match_files
            .par_iter()
            .map(|match_file| verify(match_file, &input_file, &config, self.strict_newlines))
            .collect::<Vec<_>>();

        let mut status = 0u8;
        for outcome in outcomes {
            match outcome {
                Outcome::Passed { match_file, result } => {
                    if config.verbose > 0 {
                        println!("PASS: {}: {result}", match_file.name());
                    }
                    if config.verbose > 1 {
                        print_matches(&input_file, &result);
                    }
                }
                Outcome::Failed(report) => {
                    eprintln!("{report:?}");
                    status = status.max(1);
                }
                Outcome::Invalid(report) => {
                    eprintln!("{report:?}");
                    status = status.max(2);
                }
            }
        }

        status
    }
}

/// Report an error in the inputs to the command, which is distinguished from a failed match by its status
fn invalid_usage(report: Report) -> u8 {
    eprintln!("{report:?}");
    2
}

/// The outcome of verifying a single check file
enum Outcome {
    Passed {
        match_file: Arc<SourceFile>,
        result: TestResult,
    },
    /// The input did not satisfy the check file
    Failed(Report),
    /// The check file could not be read, parsed or compiled
    Invalid(Report),
}

fn verify(
    match_file: &Input,
    input_file: &Arc<SourceFile>,
    config: &Config,
    strict_newlines: bool,
) -> Outcome {
    let match_file = match match_file
        .into_source(strict_newlines)
        .into_diagnostic()
        .wrap_err_with(|| format!("unable to read '{}'", match_file.path().display()))
    {
        Ok(match_file) => match_file,
        Err(report) => return Outcome::Invalid(report),
    };

    let test = Test::new(match_file.clone(), config);
    match test.verify(input_file.clone()) {
        Ok(result) => Outcome::Passed { match_file, result },
        Err(err) => {
            log::debug!(
                target: "goldcheck",
                "'{}' stopped at the {} stage",
                match_file.name(),
                err.stage()
            );
            match err.stage() {
                Stage::Parse | Stage::Compile => Outcome::Invalid(Report::new(err)),
                Stage::Match | Stage::Aborted => Outcome::Failed(Report::new(err)),
            }
        }
    }
}

fn print_matches(input_file: &SourceFile, result: &TestResult) {
    for info in result.matches_in_file_order() {
        let text = &input_file.as_str()[info.span.clone()];
        println!(
            "  #{} {} matched at {}: {}",
            info.index,
            info.kind,
            input_file.location(info.span.start),
            text.trim_end()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SANITY_CHECKS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/sanity/check.txt");
    const SANITY_INPUT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/sanity/input.txt");
    const PTRAUTH_INPUT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/ptrauth/input.ll");

    fn check(args: &[&str]) -> Check {
        Check::try_parse_from(std::iter::once("check").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn check_status_passed() {
        let status = check(&[SANITY_CHECKS, "--input-file", SANITY_INPUT]).execute();
        assert_eq!(status, 0);
    }

    #[test]
    fn check_status_match_failed() {
        let status = check(&[SANITY_CHECKS, "--input-file", PTRAUTH_INPUT]).execute();
        assert_eq!(status, 1);
    }

    #[test]
    fn check_status_unreadable_input() {
        let missing = concat!(env!("CARGO_MANIFEST_DIR"), "/../tests/sanity/missing.txt");
        let status = check(&[SANITY_CHECKS, "--input-file", missing]).execute();
        assert_eq!(status, 2);

        let status = check(&[missing, "--input-file", SANITY_INPUT]).execute();
        assert_eq!(status, 2);
    }

    #[test]
    fn check_status_no_check_files() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/src");
        let status = check(&[dir, "--file-type", "none", "--input-file", SANITY_INPUT]).execute();
        assert_eq!(status, 2);
    }
}
