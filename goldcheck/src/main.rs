mod commands;
use self::commands::*;

use std::{ffi::OsString, process::ExitCode};

use clap::ColorChoice;
use goldcheck::diagnostics::{self, DiagResult};

pub fn main() -> DiagResult<ExitCode> {
    init_logger();

    let mut cmd = build_cli();
    let matches = cmd
        .try_get_matches_from_mut(command_line())
        .unwrap_or_else(|e| e.exit());
    let mut subcommand = matches.subcommand();
    if let Some(("goldcheck", cmd)) = subcommand {
        subcommand = cmd.subcommand();
    }

    let Some((name, matches)) = subcommand else {
        cmd.print_long_help().ok();
        return Ok(ExitCode::from(2));
    };

    let color = matches
        .get_one::<ColorChoice>("color")
        .copied()
        .unwrap_or_default();
    diagnostics::reporting::set_hook(Box::new(move |_| {
        let opts = diagnostics::reporting::ReportHandlerOpts::new();
        let opts = match color {
            ColorChoice::Always => opts.color(true),
            ColorChoice::Never => opts.color(false),
            ColorChoice::Auto => opts,
        };
        Box::new(opts.build())
    }))?;
    diagnostics::set_panic_hook();

    match name {
        "check" | "filecheck" | "FileCheck" => run::<Check>(&mut cmd, name, matches),
        name => cmd
            .error(
                clap::error::ErrorKind::InvalidSubcommand,
                format!("unexpected subcommand '{name}'"),
            )
            .exit(),
    }
}

fn run<C: Command>(
    cmd: &mut clap::Command,
    name: &str,
    matches: &clap::ArgMatches,
) -> DiagResult<ExitCode> {
    match C::from_arg_matches(matches) {
        Ok(command) if command.is_help_requested() => {
            if let Some(subcommand) = cmd.find_subcommand_mut(name) {
                subcommand.print_long_help().ok();
            }
            Ok(ExitCode::from(2))
        }
        Ok(command) => command.run(),
        Err(err) => err.exit(),
    }
}

/// The process arguments, followed by any shell-quoted options found in `GOLDCHECK_OPTS`
fn command_line() -> Vec<OsString> {
    let mut args = std::env::args_os().collect::<Vec<_>>();
    if let Ok(opts) = std::env::var("GOLDCHECK_OPTS") {
        match shlex::split(&opts) {
            Some(extra) => {
                log::debug!(target: "goldcheck", "appending GOLDCHECK_OPTS: {extra:?}");
                args.extend(extra.into_iter().map(OsString::from));
            }
            None => {
                eprintln!("invalid GOLDCHECK_OPTS, unable to split '{opts}' into arguments");
                std::process::exit(2);
            }
        }
    }
    args
}

fn init_logger() {
    let mut builder = env_logger::Builder::from_env("GOLDCHECK_TRACE");
    builder.format_indent(Some(2));
    if let Ok(precision) = std::env::var("GOLDCHECK_TRACE_TIMING") {
        match precision.as_str() {
            "s" => builder.format_timestamp_secs(),
            "ms" => builder.format_timestamp_millis(),
            "us" => builder.format_timestamp_micros(),
            "ns" => builder.format_timestamp_nanos(),
            other => {
                eprintln!(
                    "invalid GOLDCHECK_TRACE_TIMING precision, expected one of [s, ms, us, ns], got '{}'",
                    other
                );
                std::process::exit(2);
            }
        };
    } else {
        builder.format_timestamp(None);
    }
    builder.init();
}

/// This builds a [clap::Command] representing the `goldcheck` multicall binary,
/// i.e. an executable that can be called the following ways:
///
/// * Explicit: `goldcheck check ARGS..`
/// * Implicit: `filecheck ARGS..`
///
/// The implicit form uses the name of the executable it was invoked with to
/// determine which command to run, so a symlink named `filecheck` or `FileCheck`
/// pointing at `goldcheck` behaves like the usual tool.
fn build_cli() -> clap::Command {
    clap::Command::new("goldcheck")
        .author(clap::crate_authors!(", "))
        .version(clap::crate_version!())
        .about("Verify compiler output against golden CHECK directives")
        .multicall(true)
        .subcommand(
            clap::Command::new("goldcheck")
                .arg_required_else_help(true)
                .subcommand_value_name("COMMAND")
                .subcommands(commands::all()),
        )
        .subcommands(commands::all())
}
