//! Command-line arguments and their mapping onto dump options.

use anyhow::{Context, Result};
use clap::Parser;
use depdump_core::{
    CommandSpec, DumpOptions, DumpReport, Dumper, ReferenceMode, SourceFormat, DEFAULT_ATTRIBUTE,
    DEFAULT_INDENT,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "depdump", version)]
#[command(about = "Dump the deps mapping of a manifest module to a JSON file", long_about = None)]
pub struct Cli {
    /// Module defining the manifest: a file path or a dotted module name
    ///
    /// Examples:
    ///   depdump chromium_deps.py out.json       # load this file
    ///   depdump chromium_deps out.json          # find chromium_deps.* on the search path
    ///   depdump src/DEPS out.json               # extension-less DEPS file
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// JSON file to write (replaced on success)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// How MODULE is interpreted
    #[arg(long, value_enum, default_value = "auto")]
    pub mode: Mode,

    /// Parse the module as FORMAT instead of guessing from its extension
    #[arg(long, value_enum, conflicts_with = "exec")]
    pub format: Option<Format>,

    /// Directory searched for by-name modules (repeatable, default: current directory)
    #[arg(short = 'I', long = "search-path", value_name = "DIR", conflicts_with = "exec")]
    pub search_paths: Vec<PathBuf>,

    /// Module attribute holding the manifest
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ATTRIBUTE)]
    pub attribute: String,

    /// Spaces per indentation level in the written JSON
    #[arg(long, value_name = "N", default_value_t = DEFAULT_INDENT)]
    pub indent: usize,

    /// Load the module by running PROGRAM, which must print the module's
    /// attributes as a JSON object on stdout
    ///
    /// PROGRAM is run as `PROGRAM [--exec-arg ARG]... MODULE`, without a shell.
    #[arg(long, value_name = "PROGRAM")]
    pub exec: Option<String>,

    /// Argument passed to the --exec program before MODULE (repeatable)
    #[arg(long = "exec-arg", value_name = "ARG", requires = "exec", allow_hyphen_values = true)]
    pub exec_args: Vec<String>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Existing files by path, anything else by name
    Auto,
    /// Always a file path
    Path,
    /// Always a module name
    Name,
}

impl From<Mode> for ReferenceMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => ReferenceMode::Auto,
            Mode::Path => ReferenceMode::Path,
            Mode::Name => ReferenceMode::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Deps,
    Json,
    Toml,
    Yaml,
}

impl From<Format> for SourceFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Deps => SourceFormat::Deps,
            Format::Json => SourceFormat::Json,
            Format::Toml => SourceFormat::Toml,
            Format::Yaml => SourceFormat::Yaml,
        }
    }
}

impl Cli {
    /// Builds dump options, defaulting the search path to the working directory.
    pub fn options(&self) -> Result<DumpOptions> {
        let search_paths = if self.search_paths.is_empty() {
            vec![std::env::current_dir().context("Failed to get current working directory")?]
        } else {
            self.search_paths.clone()
        };

        Ok(DumpOptions {
            attribute: self.attribute.clone(),
            mode: self.mode.into(),
            format: self.format.map(Into::into),
            search_paths,
            command: self.exec.as_ref().map(|program| CommandSpec {
                program: program.clone(),
                args: self.exec_args.clone(),
            }),
            indent: self.indent,
        })
    }
}

/// Runs a dump with the parsed arguments.
pub fn run(cli: &Cli) -> Result<DumpReport> {
    let dumper = Dumper::new(cli.options()?);
    tracing::debug!(options = ?dumper.options(), "Dump options");
    let report = dumper.dump(&cli.module, &cli.output)?;
    Ok(report)
}

/// Exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<depdump_core::Error>()
        .map_or(1, depdump_core::Error::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("depdump").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["chromium_deps", "out.json"]);
        let options = cli.options().unwrap();

        assert_eq!(options.attribute, "deps");
        assert_eq!(options.mode, ReferenceMode::Auto);
        assert_eq!(options.indent, 2);
        assert_eq!(options.format, None);
        assert_eq!(options.command, None);
        assert_eq!(options.search_paths, vec![std::env::current_dir().unwrap()]);
    }

    #[test]
    fn test_options_mapping() {
        let cli = parse(&[
            "--mode", "name", "--format", "toml", "-I", "a", "-I", "b", "--attribute", "vars",
            "--indent", "4", "m", "out.json",
        ]);
        let options = cli.options().unwrap();

        assert_eq!(options.mode, ReferenceMode::Name);
        assert_eq!(options.format, Some(SourceFormat::Toml));
        assert_eq!(options.search_paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(options.attribute, "vars");
        assert_eq!(options.indent, 4);
    }

    #[test]
    fn test_exec_arguments_keep_order() {
        let cli = parse(&[
            "--exec", "python3", "--exec-arg", "-c", "--exec-arg", "print(1)", "m", "out.json",
        ]);
        let options = cli.options().unwrap();

        assert_eq!(
            options.command,
            Some(CommandSpec {
                program: "python3".to_string(),
                args: vec!["-c".to_string(), "print(1)".to_string()],
            })
        );
    }

    #[test]
    fn test_rejected_combinations() {
        let args = |extra: &[&'static str]| {
            std::iter::once("depdump")
                .chain(extra.iter().copied())
                .chain(["m", "out.json"])
                .collect::<Vec<_>>()
        };

        assert!(Cli::try_parse_from(args(&["--exec-arg", "x"])).is_err());
        assert!(Cli::try_parse_from(args(&["--exec", "p", "--format", "json"])).is_err());
        assert!(Cli::try_parse_from(args(&["-q", "-v"])).is_err());
        assert!(Cli::try_parse_from(["depdump", "only-one"]).is_err());
    }

    #[test]
    fn test_exit_code_for_non_dump_errors() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&err), 1);

        let err = anyhow::Error::new(depdump_core::Error::MissingAttribute {
            module: "m".to_string(),
            attribute: "deps".to_string(),
        });
        assert_eq!(exit_code(&err), 4);
    }
}
