//! `wp` command-line driver
//!
//! Reads programs, datasets and test requests as JSON files and writes JSON
//! results to the given output. Logs go to stderr through `tracing`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wp_analytics::{attach_process_tests, invoke_json, Catalogue, Dataset, EngineConfig, Process, TestEngine};
use wp_graph::Program;

/// Build the command tree
#[must_use]
pub fn command() -> Command {
    Command::new("wp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Working paper program integrity and population analytics")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine configuration file (.toml, .yaml)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("sanitize")
                .about("Decode generator output and remove dangling references")
                .arg(program_arg())
                .arg(
                    Arg::new("renumber")
                        .long("renumber")
                        .action(ArgAction::SetTrue)
                        .help("Also renumber ids to dense sequences"),
                ),
        )
        .subcommand(
            Command::new("orphans")
                .about("Report risks and controls without counterparts")
                .arg(program_arg()),
        )
        .subcommand(
            Command::new("map-tests")
                .about("Attach catalogue tests of a process to the program's risks")
                .arg(program_arg())
                .arg(
                    Arg::new("process")
                        .long("process")
                        .required(true)
                        .help("procure-to-pay, payroll, order-to-cash or it-access"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Suggest a column mapping for a test")
                .arg(Arg::new("test").long("test").required(true).help("Catalogue test id"))
                .arg(
                    Arg::new("dataset")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Dataset JSON ({headers, rows})"),
                ),
        )
        .subcommand(
            Command::new("run").about("Execute a test invocation request").arg(
                Arg::new("request")
                    .required(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("Request JSON ({testId, columnMapping, rows, headers})"),
            ),
        )
        .subcommand(
            Command::new("catalogue").about("List catalogued tests").arg(
                Arg::new("process")
                    .long("process")
                    .help("Only tests of this process"),
            ),
        )
}

fn program_arg() -> Arg {
    Arg::new("program")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Program JSON")
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = result {
        eprintln!("logging already initialised: {err}");
    }
}

/// Run the selected subcommand
///
/// Returns `Ok(false)` when the command ran but reported a failure (a test
/// request that did not succeed).
///
/// # Errors
/// Unreadable or malformed input files, bad arguments, unknown test ids.
pub fn execute(matches: &ArgMatches, out: &mut dyn Write) -> Result<bool> {
    let (name, args) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no subcommand given"))?;
    let config = match global_path(matches, args, "config") {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match (name, args) {
        ("sanitize", args) => {
            let mut program = load_program(args)?;
            if args.get_flag("renumber") {
                program = program.renumber();
            }
            emit(out, &program)?;
        }
        ("orphans", args) => {
            let program = load_program(args)?;
            let report = program.orphan_check();
            emit(out, &json!({ "summary": program.summary(), "orphans": report }))?;
        }
        ("map-tests", args) => {
            let program = load_program(args)?;
            let process = parse_process(required(args, "process")?)?;
            let mapped = attach_process_tests(&program, &Catalogue::builtin(), process);
            emit(out, &mapped)?;
        }
        ("resolve", args) => {
            let engine = TestEngine::from_config(config);
            let test_id = required(args, "test")?;
            let dataset: Dataset = serde_json::from_str(&read(path_arg(args, "dataset")?)?)
                .context("dataset must be {\"headers\": [...], \"rows\": [...]}")?;
            let mapping = engine.suggest_mapping(test_id, &dataset.headers)?;
            let required_fields = engine.required_fields(test_id)?;
            emit(
                out,
                &json!({
                    "testId": test_id,
                    "columnMapping": mapping,
                    "unresolved": mapping.unresolved(&required_fields),
                }),
            )?;
        }
        ("run", args) => {
            let engine = TestEngine::from_config(config);
            let response = invoke_json(&engine, &read(path_arg(args, "request")?)?);
            emit(out, &response)?;
            return Ok(response.success);
        }
        ("catalogue", args) => {
            let catalogue = Catalogue::builtin();
            let tests: Vec<_> = match args.get_one::<String>("process") {
                Some(raw) => {
                    let process = parse_process(raw)?;
                    catalogue.for_process(process).collect()
                }
                None => catalogue.iter().collect(),
            };
            emit(out, &tests)?;
        }
        (other, _) => return Err(anyhow!("unknown subcommand: {other}")),
    }
    Ok(true)
}

/// Global flag set either before or after the subcommand
#[must_use]
pub fn global_flag(matches: &ArgMatches, name: &str) -> bool {
    matches.get_flag(name)
        || matches
            .subcommand()
            .is_some_and(|(_, args)| args.get_flag(name))
}

fn global_path<'a>(matches: &'a ArgMatches, args: &'a ArgMatches, name: &str) -> Option<&'a Path> {
    args.get_one::<PathBuf>(name)
        .or_else(|| matches.get_one::<PathBuf>(name))
        .map(PathBuf::as_path)
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing --{name}"))
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow!("missing <{name}>"))
}

fn parse_process(raw: &str) -> Result<Process> {
    raw.parse::<Process>().map_err(|e| anyhow!(e))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load_program(args: &ArgMatches) -> Result<Program> {
    let path = path_arg(args, "program")?;
    let program = Program::from_candidate_json(&read(path)?)
        .with_context(|| format!("decoding {}", path.display()))?;
    tracing::debug!(path = %path.display(), risks = program.risks.len(), "program loaded");
    Ok(program)
}

fn emit<T: serde::Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
