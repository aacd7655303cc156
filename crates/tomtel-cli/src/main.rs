//! CLI entry point for the Tomtel image runner.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use thiserror::Error;
#[cfg(test)]
use tempfile as _;
use tomtel_core::{
    disassemble_range, Completion, CoreConfig, Fault, ImmediateLayout, Machine, Memory,
    TraceEvent, TraceSink, Watchdog,
};

const USAGE_TEXT: &str = "\
Usage: tomtel <command> [options]

Commands:
  run <image> [options]     Execute a raw memory image from address 0
  disasm <image> [options]  List the instructions in a raw memory image

Run options:
  -o, --output <file>       Write the output stream to a file (default: stdout)
  --timeout-ms <n>          Wall-clock watchdog in milliseconds, 0 disables it (default: 10000)
  --max-steps <n>           Instruction budget instead of a wall-clock watchdog
  --legacy-imm32            Build bits 16..23 of 32-bit immediates from byte 4
  --trace                   Print trace events to stderr

Disasm options:
  --start <addr>            First address to decode (default: 0)
  --count <n>               Maximum rows to print (default: whole image)
  --legacy-imm32            Build bits 16..23 of 32-bit immediates from byte 4

Options:
  -h, --help                Show this help message

Exit status: 0 halted, 1 error or fault, 2 watchdog expired.
Set RUST_LOG=debug for run diagnostics.
";

/// Exit status for a run stopped by the watchdog.
const EXIT_TIMED_OUT: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("failed to read {}: {source}", path.display())]
    ReadImage { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
    #[error("execution aborted: {0}")]
    Fault(#[from] Fault),
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Disasm(DisasmArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    watchdog: Watchdog,
    legacy_imm32: bool,
    trace: bool,
}

impl RunArgs {
    const fn config(&self) -> CoreConfig {
        CoreConfig {
            watchdog: self.watchdog,
            immediate_layout: layout(self.legacy_imm32),
            tracing_enabled: self.trace,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct DisasmArgs {
    input: PathBuf,
    start: u32,
    count: Option<usize>,
    legacy_imm32: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

const fn layout(legacy_imm32: bool) -> ImmediateLayout {
    if legacy_imm32 {
        ImmediateLayout::LegacyDuplicatedHighByte
    } else {
        ImmediateLayout::LittleEndian
    }
}

fn usage(message: impl Into<String>) -> CliError {
    CliError::Usage(message.into())
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, CliError> {
    let first = args.next().ok_or_else(|| usage("missing command"))?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let parsed = match first.to_string_lossy().as_ref() {
        "run" => parse_run_args(args)?.map(Command::Run),
        "disasm" => parse_disasm_args(args)?.map(Command::Disasm),
        other => return Err(usage(format!("unknown command: {other}"))),
    };
    Ok(parsed.map_or(ParseResult::Help, ParseResult::Command))
}

/// Parses a decimal or `0x`-prefixed hexadecimal flag value.
fn parse_number(flag: &str, value: Option<OsString>) -> Result<u64, CliError> {
    let value = value.ok_or_else(|| usage(format!("missing value for {flag}")))?;
    let text = value.to_string_lossy();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| usage(format!("invalid value for {flag}: {text}")))
}

fn set_input(input: &mut Option<PathBuf>, arg: OsString) -> Result<(), CliError> {
    if arg.to_string_lossy().starts_with('-') {
        return Err(usage(format!("unknown option: {}", arg.to_string_lossy())));
    }
    if input.is_some() {
        return Err(usage("multiple input paths provided"));
    }
    *input = Some(PathBuf::from(arg));
    Ok(())
}

/// Returns `Ok(None)` when help was requested.
#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<Option<RunArgs>, CliError> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut watchdog: Option<Watchdog> = None;
    let mut watchdog_flag: Option<&str> = None;
    let mut legacy_imm32 = false;
    let mut trace = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(None);
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| usage(format!("missing value for {}", arg.to_string_lossy())))?;
            output = Some(PathBuf::from(value));
            continue;
        }

        if arg == "--timeout-ms" || arg == "--max-steps" {
            let flag = if arg == "--max-steps" {
                "--max-steps"
            } else {
                "--timeout-ms"
            };
            match watchdog_flag {
                Some(previous) if previous == flag => {
                    return Err(usage(format!("{flag} given more than once")));
                }
                Some(_) => {
                    return Err(usage("--timeout-ms and --max-steps are mutually exclusive"));
                }
                None => watchdog_flag = Some(flag),
            }
            let value = parse_number(flag, args.next())?;
            watchdog = Some(match (flag, value) {
                ("--max-steps", budget) => Watchdog::InstructionBudget(budget),
                (_, 0) => Watchdog::Unbounded,
                (_, millis) => Watchdog::WallClock(Duration::from_millis(millis)),
            });
            continue;
        }

        if arg == "--legacy-imm32" {
            legacy_imm32 = true;
            continue;
        }

        if arg == "--trace" {
            trace = true;
            continue;
        }

        set_input(&mut input, arg)?;
    }

    let input = input.ok_or_else(|| usage("missing input path"))?;
    Ok(Some(RunArgs {
        input,
        output,
        watchdog: watchdog.unwrap_or_default(),
        legacy_imm32,
        trace,
    }))
}

/// Returns `Ok(None)` when help was requested.
#[allow(clippy::while_let_on_iterator)]
fn parse_disasm_args(
    mut args: impl Iterator<Item = OsString>,
) -> Result<Option<DisasmArgs>, CliError> {
    let mut input: Option<PathBuf> = None;
    let mut start = 0_u32;
    let mut count: Option<usize> = None;
    let mut legacy_imm32 = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(None);
        }

        if arg == "--start" {
            let value = parse_number("--start", args.next())?;
            start = u32::try_from(value)
                .map_err(|_| usage(format!("address out of range: {value:#x}")))?;
            continue;
        }

        if arg == "--count" {
            let value = parse_number("--count", args.next())?;
            count = Some(usize::try_from(value).unwrap_or(usize::MAX));
            continue;
        }

        if arg == "--legacy-imm32" {
            legacy_imm32 = true;
            continue;
        }

        set_input(&mut input, arg)?;
    }

    let input = input.ok_or_else(|| usage("missing input path"))?;
    Ok(Some(DisasmArgs {
        input,
        start,
        count,
        legacy_imm32,
    }))
}

fn read_image(path: &Path) -> Result<Vec<u8>, CliError> {
    let image = fs::read(path).map_err(|source| CliError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded {} byte image from {}", image.len(), path.display());
    Ok(image)
}

fn write_output(target: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    let written = match target {
        Some(path) => fs::write(path, bytes),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes).and_then(|()| stdout.flush())
        }
    };
    written.map_err(CliError::WriteOutput)
}

/// Prints trace events to stderr as they happen.
struct StderrTrace;

impl TraceSink for StderrTrace {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::InstructionStart { pc, raw } => eprintln!("trace: {pc:08x} fetch {raw:02x}"),
            TraceEvent::MemoryWrite { addr, value } => {
                eprintln!("trace: mem[{addr:#x}] <- {value:02x}");
            }
            TraceEvent::Output { byte } => eprintln!("trace: out {byte:02x}"),
            TraceEvent::Halted { pc } => eprintln!("trace: {pc:08x} halt"),
            TraceEvent::FaultRaised { fault, pc } => eprintln!("trace: {pc:08x} fault: {fault}"),
        }
    }
}

/// Runs an image and writes whatever output it produced, even on a fault.
fn run_image(args: &RunArgs) -> Result<Completion, CliError> {
    let image = read_image(&args.input)?;
    let mut machine = Machine::with_config(image, args.config());

    let result = if args.trace {
        machine.run_traced(&mut StderrTrace)
    } else {
        machine.run()
    };

    write_output(args.output.as_deref(), machine.output().as_bytes())?;

    let outcome = result?;
    if outcome.completion == Completion::TimedOut {
        eprintln!(
            "warning: watchdog expired after {} instructions at pc {:#010x}",
            outcome.steps,
            machine.registers().pc()
        );
    }
    Ok(outcome.completion)
}

fn run_disasm(args: &DisasmArgs) -> Result<(), CliError> {
    let memory = Memory::from(read_image(&args.input)?);
    let count = args.count.unwrap_or(memory.len());

    let mut listing = String::new();
    for row in disassemble_range(args.start, count, &memory, layout(args.legacy_imm32)) {
        listing.push_str(&row.render());
        listing.push('\n');
    }
    write_output(None, listing.as_bytes())
}

fn main() {
    env_logger::init();

    let result = parse_args(env::args_os().skip(1)).and_then(|parsed| match parsed {
        ParseResult::Help => {
            println!("{USAGE_TEXT}");
            Ok(0)
        }
        ParseResult::Command(Command::Run(args)) => run_image(&args).map(|completion| {
            match completion {
                Completion::Halted => 0,
                Completion::TimedOut => EXIT_TIMED_OUT,
            }
        }),
        ParseResult::Command(Command::Disasm(args)) => run_disasm(&args).map(|()| 0),
    });

    let exit_code = match result {
        Ok(code) => code,
        Err(CliError::Usage(message)) => {
            eprintln!("error: {message}");
            eprintln!("{USAGE_TEXT}");
            1
        }
        Err(error) => {
            eprintln!("error: {error}");
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn os_args(args: &[&str]) -> impl Iterator<Item = OsString> {
        args.iter()
            .map(|arg| OsString::from(*arg))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_run_command_with_defaults() {
        let result = parse_run_args(os_args(&["image.bin"]))
            .expect("valid run args should parse")
            .expect("not a help request");

        assert_eq!(
            result,
            RunArgs {
                input: PathBuf::from("image.bin"),
                output: None,
                watchdog: Watchdog::default(),
                legacy_imm32: false,
                trace: false,
            }
        );
    }

    #[test]
    fn parses_run_command_with_all_options() {
        let result = parse_run_args(os_args(&[
            "image.bin",
            "-o",
            "out.txt",
            "--max-steps",
            "0x100",
            "--legacy-imm32",
            "--trace",
        ]))
        .expect("valid run args should parse")
        .expect("not a help request");

        assert_eq!(result.output, Some(PathBuf::from("out.txt")));
        assert_eq!(result.watchdog, Watchdog::InstructionBudget(256));
        assert_eq!(
            result.config().immediate_layout,
            ImmediateLayout::LegacyDuplicatedHighByte
        );
        assert!(result.config().tracing_enabled);
    }

    #[test]
    fn timeout_flag_selects_wall_clock_or_unbounded() {
        let timed = parse_run_args(os_args(&["a.bin", "--timeout-ms", "250"]))
            .expect("parse")
            .expect("args");
        assert_eq!(timed.watchdog, Watchdog::WallClock(Duration::from_millis(250)));

        let unbounded = parse_run_args(os_args(&["a.bin", "--timeout-ms", "0"]))
            .expect("parse")
            .expect("args");
        assert_eq!(unbounded.watchdog, Watchdog::Unbounded);
    }

    #[test]
    fn rejects_conflicting_watchdogs() {
        let error = parse_run_args(os_args(&["a.bin", "--timeout-ms", "5", "--max-steps", "5"]))
            .expect_err("conflicting watchdogs should fail");
        assert!(error.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn repeated_watchdog_flag_is_reported_as_repeated() {
        let error = parse_run_args(os_args(&["a.bin", "--timeout-ms", "5", "--timeout-ms", "6"]))
            .expect_err("repeated timeout should fail");
        assert!(error.to_string().contains("--timeout-ms given more than once"));

        let error = parse_run_args(os_args(&["a.bin", "--timeout-ms", "0", "--timeout-ms", "6"]))
            .expect_err("repeated timeout should fail");
        assert!(error.to_string().contains("--timeout-ms given more than once"));

        let error = parse_run_args(os_args(&["a.bin", "--max-steps", "5", "--max-steps", "6"]))
            .expect_err("repeated budget should fail");
        assert!(error.to_string().contains("--max-steps given more than once"));
    }

    #[test]
    fn oversized_count_saturates() {
        let result = parse_disasm_args(os_args(&["a.bin", "--count", "18446744073709551615"]))
            .expect("u64::MAX is a valid count")
            .expect("not a help request");
        assert_eq!(result.count, Some(usize::MAX));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let error = parse_run_args(os_args(&["a.bin", "--max-steps", "lots"]))
            .expect_err("non-numeric budget should fail");
        assert!(error.to_string().contains("invalid value for --max-steps"));

        let error = parse_disasm_args(os_args(&["a.bin", "--start"]))
            .expect_err("missing value should fail");
        assert!(error.to_string().contains("missing value for --start"));
    }

    #[test]
    fn parses_disasm_command() {
        let result = parse_disasm_args(os_args(&["a.bin", "--start", "0x10", "--count", "4"]))
            .expect("valid disasm args should parse")
            .expect("not a help request");

        assert_eq!(
            result,
            DisasmArgs {
                input: PathBuf::from("a.bin"),
                start: 0x10,
                count: Some(4),
                legacy_imm32: false,
            }
        );
    }

    #[test]
    fn disasm_start_must_fit_an_address() {
        let error = parse_disasm_args(os_args(&["a.bin", "--start", "0x1_0000_0000"]))
            .expect_err("hex with separators is not a number");
        assert!(matches!(error, CliError::Usage(_)));

        let error = parse_disasm_args(os_args(&["a.bin", "--start", "0x100000000"]))
            .expect_err("address beyond u32 should fail");
        assert!(error.to_string().contains("address out of range"));
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args(os_args(&["--help"])).expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));

        let result = parse_args(os_args(&["run", "-h"])).expect("subcommand help should parse");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_command_and_options() {
        let error = parse_args(os_args(&["assemble"])).expect_err("unknown command should fail");
        assert!(error.to_string().contains("unknown command"));

        let error =
            parse_args(os_args(&["run", "--fast", "a.bin"])).expect_err("unknown option");
        assert!(error.to_string().contains("unknown option: --fast"));
    }

    #[test]
    fn rejects_missing_and_duplicate_inputs() {
        let error = parse_run_args(std::iter::empty()).expect_err("missing input should fail");
        assert!(error.to_string().contains("missing input"));

        let error = parse_disasm_args(os_args(&["a.bin", "b.bin"]))
            .expect_err("two inputs should fail");
        assert!(error.to_string().contains("multiple input paths"));
    }

    #[test]
    fn missing_image_reports_the_path() {
        let error = read_image(Path::new("definitely/not/here.bin")).expect_err("no such file");
        assert!(error.to_string().contains("definitely/not/here.bin"));
    }
}
