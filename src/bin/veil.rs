//! Command-line interface for veil
//!
//! Usage:
//!   veil obfuscate `<path>` [--preset `<name>`] [--config `<file>`] [--out `<file>`]
//!                  [--lua51|--luau] [--pretty] [--seed `<n>`] [--stats]   - Obfuscate a file
//!   veil tokenize `<path>` [--luau]                                     - Print tokens as JSON
//!   veil list-presets                                                 - List built-in presets
//!   veil list-steps                                                   - List registered steps

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use veil::veil::pipeline::{preset, PRESET_NAMES};
use veil::veil::transforms::step_names;
use veil::{tokenize, Dialect, Pipeline, PipelineConfig};

fn main() {
    let matches = Command::new("veil")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A source-to-source obfuscator for Lua 5.1 and LuaU")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output to stderr"),
        )
        .subcommand(
            Command::new("obfuscate")
                .about("Obfuscate a Lua file")
                .arg(
                    Arg::new("path")
                        .help("Path to the Lua file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("preset")
                        .long("preset")
                        .short('p')
                        .help("Built-in preset (Minify, Weak, Medium, Strong)")
                        .conflicts_with("config"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .help("Pipeline configuration file (.json, .yaml, .yml)"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .help("Output file, '-' for stdout [default: <path>.obfuscated.lua]"),
                )
                .arg(
                    Arg::new("lua51")
                        .long("lua51")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("luau")
                        .help("Read and write Lua 5.1"),
                )
                .arg(
                    Arg::new("luau")
                        .long("luau")
                        .action(ArgAction::SetTrue)
                        .help("Read and write LuaU"),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .action(ArgAction::SetTrue)
                        .help("Indented output, one statement per line"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(i64))
                        .help("Random seed, values <= 0 seed from the clock"),
                )
                .arg(
                    Arg::new("stats")
                        .long("stats")
                        .action(ArgAction::SetTrue)
                        .help("Print run statistics as JSON to stderr"),
                ),
        )
        .subcommand(
            Command::new("tokenize")
                .about("Print the token stream of a Lua file as JSON")
                .arg(
                    Arg::new("path")
                        .help("Path to the Lua file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("luau")
                        .long("luau")
                        .action(ArgAction::SetTrue)
                        .help("Tokenize as LuaU"),
                ),
        )
        .subcommand(Command::new("list-presets").about("List built-in presets"))
        .subcommand(Command::new("list-steps").about("List registered transform steps"))
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    let result = match matches.subcommand() {
        Some(("obfuscate", obfuscate_matches)) => handle_obfuscate_command(obfuscate_matches),
        Some(("tokenize", tokenize_matches)) => handle_tokenize_command(tokenize_matches),
        Some(("list-presets", _)) => {
            handle_list_presets_command();
            Ok(())
        }
        Some(("list-steps", _)) => {
            handle_list_steps_command();
            Ok(())
        }
        _ => unreachable!(),
    };

    if let Err(message) = result {
        eprintln!("error: {}", message);
        std::process::exit(1);
    }
}

/// `VEIL_LOG` picks the filter, `--verbose` forces debug.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("VEIL_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_source(path: &str) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e))
}

fn default_output_path(path: &str) -> PathBuf {
    Path::new(path).with_extension("obfuscated.lua")
}

fn load_config(matches: &ArgMatches) -> Result<PipelineConfig, String> {
    let mut config = match (
        matches.get_one::<String>("config"),
        matches.get_one::<String>("preset"),
    ) {
        (Some(file), _) => PipelineConfig::load(file).map_err(|e| e.to_string())?,
        (None, Some(name)) => preset(name).map_err(|e| e.to_string())?,
        (None, None) => PipelineConfig::default(),
    };

    if matches.get_flag("lua51") {
        config.lua_version = Dialect::Lua51;
    }
    if matches.get_flag("luau") {
        config.lua_version = Dialect::LuaU;
    }
    if matches.get_flag("pretty") {
        config.pretty_print = true;
    }
    if let Some(seed) = matches.get_one::<i64>("seed") {
        config.seed = *seed;
    }
    Ok(config)
}

/// Handle the obfuscate command
fn handle_obfuscate_command(matches: &ArgMatches) -> Result<(), String> {
    let path = matches
        .get_one::<String>("path")
        .ok_or("missing input path")?;
    let config = load_config(matches)?;
    let source = read_source(path)?;

    let mut pipeline = Pipeline::from_config(config).map_err(|e| e.to_string())?;
    let output = pipeline.apply(&source, path).map_err(|e| e.to_string())?;

    match matches.get_one::<String>("out").map(String::as_str) {
        Some("-") => print!("{}", output),
        Some(out) => write_output(Path::new(out), &output)?,
        None => write_output(&default_output_path(path), &output)?,
    }

    if matches.get_flag("stats") {
        let stats = serde_json::to_string_pretty(pipeline.stats()).map_err(|e| e.to_string())?;
        eprintln!("{}", stats);
    }
    Ok(())
}

fn write_output(path: &Path, output: &str) -> Result<(), String> {
    std::fs::write(path, output).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

/// Handle the tokenize command
fn handle_tokenize_command(matches: &ArgMatches) -> Result<(), String> {
    let path = matches
        .get_one::<String>("path")
        .ok_or("missing input path")?;
    let dialect = if matches.get_flag("luau") {
        Dialect::LuaU
    } else {
        Dialect::Lua51
    };
    let source = read_source(path)?;
    let tokens = tokenize(&source, dialect).map_err(|e| e.to_string())?;
    let records: Vec<_> = tokens.iter().map(|token| token.record()).collect();
    let json = serde_json::to_string_pretty(&records).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

/// Handle the list-presets command
fn handle_list_presets_command() {
    println!("Available presets:\n");
    for name in PRESET_NAMES {
        let steps = preset(name)
            .map(|config| {
                config
                    .steps
                    .iter()
                    .map(|step| step.name.clone())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if steps.is_empty() {
            println!("  {}", name);
        } else {
            println!("  {:<8} {}", name, steps);
        }
    }
}

/// Handle the list-steps command
fn handle_list_steps_command() {
    println!("Available steps:\n");
    for name in step_names() {
        println!("  {}", name);
    }
}
