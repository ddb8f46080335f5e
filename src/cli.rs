//! `fhicl-dump`: read configuration documents and print them back.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use colored::Colorize;
use tracing::{debug, info};

use crate::error::{Error, ParseError, ValidationError};
use crate::parse::parse_document;
use crate::pset::{ParameterSet, PrintMode};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// parse configuration documents and print the resulting parameter sets
#[derive(Parser, Debug)]
#[command(name = "fhicl-dump", version, about)]
pub struct CommandLineInterface {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(required = true, num_args = 1..)]
    config: Vec<String>,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// include source location annotations
    #[arg(short, long, conflicts_with = "prefix_annotate")]
    annotate: bool,

    /// include source location annotations on the line preceding each assignment
    #[arg(long)]
    prefix_annotate: bool,

    /// parse only, print nothing
    #[arg(short, long, conflicts_with_all = ["annotate", "prefix_annotate"])]
    quiet: bool,

    /// read inputs as JSON objects instead of configuration text
    #[arg(long)]
    json: bool,

    /// omit the provenance header
    #[arg(long)]
    no_header: bool,

    /// more logging on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> ExitCode {
        match self.execute() {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{} {error:#}", "error:".red().bold());
                ExitCode::from(exit_status(&error))
            }
        }
    }

    fn mode(&self) -> PrintMode {
        if self.annotate {
            PrintMode::Annotated
        } else if self.prefix_annotate {
            PrintMode::PrefixAnnotated
        } else {
            PrintMode::Raw
        }
    }

    fn execute(&self) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.config)?;
        debug!(inputs = source_paths.len(), mode = ?self.mode(), "resolved inputs");
        let mut rendered = String::new();
        for source_path in &source_paths {
            let pset = self.load_parameter_set(source_path)?;
            info!(path = %source_path.display(), parameters = pset.len(), "loaded");
            if self.quiet {
                continue;
            }
            if !self.no_header {
                rendered.push_str(&header(source_path));
            }
            rendered.push_str(&pset.to_indented_string(0, self.mode()));
        }
        if self.quiet {
            return Ok(());
        }
        match self.output.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                std::fs::write(out, &rendered).with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => print!("{rendered}"),
        }
        Ok(())
    }

    fn load_parameter_set(&self, source_path: &Path) -> anyhow::Result<ParameterSet> {
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read source file {}", source_path.display()))?;
        let source_name = source_path.to_string_lossy();
        let pset = if self.json {
            ParameterSet::from_json_str(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_name})"))?
        } else {
            parse_document(&source, &source_name)?
        };
        Ok(pset)
    }
}

/// Process exit status for an error chain: 4 parse, 5 I/O, 6 validation,
/// 1 for anything else. Usage errors exit with 2 through clap.
pub fn exit_status(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(error) = cause.downcast_ref::<Error>() {
            match error {
                Error::Parse(_) | Error::Json(_) => return 4,
                Error::Validation(_) => return 6,
                _ => {}
            }
        }
        if cause.is::<ParseError>() || cause.is::<serde_json::Error>() {
            return 4;
        }
        if cause.is::<ValidationError>() {
            return 6;
        }
        if cause.is::<std::io::Error>() || cause.is::<glob::GlobError>() {
            return 5;
        }
        if cause.is::<glob::PatternError>() {
            return 2;
        }
    }
    1
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn header(source_path: &Path) -> String {
    let now = chrono::Local::now();
    format!(
        "# Produced from 'fhicl-dump' using:\n#   Input  : {}\n#   Date   : {}\n\n",
        source_path.display(),
        now.format("%Y-%m-%d %H:%M:%S %z"),
    )
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fhicl-dump-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn print_flags_conflict() {
        let err = CommandLineInterface::try_parse_from(["fhicl-dump", "-a", "--prefix-annotate", "x.fcl"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        assert_eq!(err.exit_code(), 2);
        assert!(CommandLineInterface::try_parse_from(["fhicl-dump", "-q", "-a", "x.fcl"]).is_err());
        assert!(CommandLineInterface::try_parse_from(["fhicl-dump"]).is_err());

        let cli = CommandLineInterface::try_parse_from(["fhicl-dump", "--prefix-annotate", "-vv", "x.fcl"]).unwrap();
        assert_eq!(cli.mode(), PrintMode::PrefixAnnotated);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn dumps_matching_inputs_to_a_file() {
        let dir = scratch_dir("dump");
        std::fs::write(dir.join("a.fcl"), "x: 1\ny: [a, b]\n").unwrap();
        std::fs::write(dir.join("b.fcl"), "z: { w: \"v\" }\n").unwrap();
        let out = dir.join("out").join("dump.fcl");
        let pattern = format!("{}/*.fcl", dir.display());
        let cli = CommandLineInterface::try_parse_from([
            "fhicl-dump",
            "--no-header",
            "-o",
            out.to_str().unwrap(),
            pattern.as_str(),
        ])
        .unwrap();
        cli.execute().unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, "x: 1\ny: [a, b]\nz: {\n   w: \"v\"\n}\n");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn failures_map_to_distinct_statuses() {
        let dir = scratch_dir("status");
        let broken = dir.join("broken.fcl");
        std::fs::write(&broken, "x 1\n").unwrap();
        let cli = |path: &Path, json: bool| {
            let mut args = vec!["fhicl-dump".to_string(), "-q".to_string(), path.display().to_string()];
            if json {
                args.push("--json".to_string());
            }
            CommandLineInterface::try_parse_from(args).unwrap()
        };

        let err = cli(&broken, false).execute().unwrap_err();
        assert_eq!(exit_status(&err), 4);
        let err = cli(&broken, true).execute().unwrap_err();
        assert_eq!(exit_status(&err), 4);
        let err = cli(&dir.join("missing.fcl"), false).execute().unwrap_err();
        assert_eq!(exit_status(&err), 5);
        let err = cli(&dir.join("*.nothing"), false).execute().unwrap_err();
        assert_eq!(exit_status(&err), 1);

        let validation = ValidationError { table: "t".into(), faults: vec![] };
        assert_eq!(exit_status(&anyhow::Error::new(Error::from(validation))), 6);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn header_names_the_input() {
        let text = header(Path::new("job.fcl"));
        assert!(text.starts_with("# Produced from 'fhicl-dump' using:\n#   Input  : job.fcl\n"));
        assert!(text.ends_with("\n\n"));
    }
}
