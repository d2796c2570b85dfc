use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use jsinline_core::TransformOptions;
use jsinline_driver::{diagnostics_json, emit_diagnostics, load_options, transform_file, DriverError};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(DriverError::Diagnostics) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    diagnostics_json: bool,
}

enum Command {
    Help,
    Version,
    Run(Args),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command, DriverError> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--config" | "--out" => {
                let Some(value) = args.next() else {
                    return Err(DriverError::Usage(format!("{arg} needs a value")));
                };
                if arg == "--config" {
                    parsed.config = Some(PathBuf::from(value));
                } else {
                    parsed.out = Some(PathBuf::from(value));
                }
            }
            "--diagnostics-json" => parsed.diagnostics_json = true,
            flag if flag.starts_with("--") => {
                return Err(DriverError::Usage(format!("unknown flag {flag}")));
            }
            _ if parsed.input.is_some() => {
                return Err(DriverError::Usage(format!("unexpected argument {arg}")));
            }
            _ => parsed.input = Some(PathBuf::from(arg)),
        }
    }
    Ok(Command::Run(parsed))
}

fn run() -> Result<(), DriverError> {
    let args = match parse_args(env::args().skip(1))? {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("jsinline {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Run(args) => args,
    };
    let Some(input) = args.input else {
        print_help();
        return Err(DriverError::Usage("missing input file".to_string()));
    };
    let options = match &args.config {
        Some(path) => load_options(path)?,
        None => TransformOptions::default(),
    };

    let output = transform_file(&input, &options)?;
    if args.diagnostics_json {
        println!("{}", diagnostics_json(&output)?);
    } else {
        let source = fs::read_to_string(&input).ok();
        emit_diagnostics(&output.path, source.as_deref(), &output.diagnostics);
    }
    if output.has_errors() {
        return Err(DriverError::Diagnostics);
    }

    let mut code = output.code;
    if !code.is_empty() {
        code.push('\n');
    }
    match &args.out {
        Some(path) => fs::write(path, code)?,
        None if args.diagnostics_json => {}
        None => print!("{code}"),
    }
    Ok(())
}

fn print_help() {
    println!(
        "jsinline: inline functions marked /** @inline */\n\n\
Usage:\n  jsinline <input.js> [--config <file.toml>] [--out <file>] [--diagnostics-json]\n\n\
Options:\n  --config <file>       transform options (TOML)\n  --out <file>          write the result here instead of stdout\n  --diagnostics-json    print diagnostics and stats as JSON\n\n\
Environment:\n  JSINLINE_TRACE_TIMING=1  report phase timings on stderr"
    );
}
