// Command-line interface for zdelta.
//
// Subcommands:
//   encode  - write the delta from a source file to an input file
//   decode  - rebuild the input from a source file and a delta
//   config  - print build/configuration details
//
// Input defaults to stdin and output to stdout when paths are omitted.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::{debug, info};

use crate::codec::{CodecOptions, Compressor, Decompressor};
use crate::engine::Mode;
use crate::engine::deflate::DEFAULT_LEVEL;
use crate::session::StreamStats;
use crate::sizing::{
    BufferPolicy, DEFAULT_BUFFER_SIZE, ENCODE_OVERHEAD, EXPECTED_RATIO, MAX_WORKING_SET,
    MIN_BUFFER_SIZE,
};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Dictionary-delta encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "zdelta",
    version,
    about = "Create and apply binary deltas",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a delta from SOURCE to INPUT.
    Encode(CodecArgs),
    /// Apply a delta (INPUT) to SOURCE.
    Decode(CodecArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct CodecArgs {
    /// Source (dictionary) file. Omit for an empty source.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: Option<PathBuf>,

    /// Compression level (0-9). Only affects encoding.
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Output buffer size (supports K/M/G suffix, capped at the working-set limit).
    #[arg(long = "buffer-size", value_parser = parse_byte_size, default_value_t = DEFAULT_BUFFER_SIZE as u64)]
    buffer_size: u64,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    codec: CodecOptions,
    source_file: Option<PathBuf>,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let (command, args) = match cli.command {
        Cmd::Encode(args) => (Command::Encode, Some(args)),
        Cmd::Decode(args) => (Command::Decode, Some(args)),
        Cmd::Config => (Command::Config, None),
    };

    let mut opts = Options {
        command,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        codec: CodecOptions::default(),
        source_file: None,
        input_file: None,
        output_file: None,
    };

    if let Some(args) = args {
        let buffer_size = usize::try_from(args.buffer_size).unwrap_or(usize::MAX);
        opts.codec = CodecOptions {
            level: args.level,
            buffer_size: BufferPolicy::default().clamp(buffer_size),
            policy: BufferPolicy::default(),
        };
        opts.source_file = args.source;
        opts.input_file = args.input;
        // -c wins over an output path.
        opts.output_file = if args.stdout { None } else { args.output };
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("zdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("zdelta version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;

    eprintln!("ENGINE=deflate (zlib-rs, preset dictionary)");
    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("DEFAULT_BUFFER_SIZE={DEFAULT_BUFFER_SIZE}");
    eprintln!("MAX_WORKING_SET={MAX_WORKING_SET}");
    eprintln!("MIN_BUFFER_SIZE={MIN_BUFFER_SIZE}");
    eprintln!("EXPECTED_RATIO={EXPECTED_RATIO}");
    eprintln!("ENCODE_OVERHEAD={ENCODE_OVERHEAD}");

    0
}

// ---------------------------------------------------------------------------
// I/O plumbing
// ---------------------------------------------------------------------------

fn read_source(path: Option<&Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => {
            std::fs::read(path).map_err(|e| format!("source file: {}: {e}", path.display()))
        }
        None => Ok(Vec::new()),
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => {
            std::fs::read(path).map_err(|e| format!("input file: {}: {e}", path.display()))
        }
        None => {
            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .map_err(|e| format!("read error: {e}"))?;
            Ok(data)
        }
    }
}

fn open_output(path: Option<&Path>, force: bool) -> Result<Box<dyn Write>, String> {
    match path {
        None => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
        Some(path) => {
            if path.exists() && !force {
                return Err(format!(
                    "output file exists, use -f to overwrite: {}",
                    path.display()
                ));
            }
            let file =
                File::create(path).map_err(|e| format!("output file: {}: {e}", path.display()))?;
            Ok(Box::new(BufWriter::with_capacity(BUF_SIZE, file)))
        }
    }
}

fn report(opts: &Options, name: &str, source_len: usize, input_len: usize, stats: StreamStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "zdelta: {name}: source size: {source_len}, input size: {input_len}, \
             output size: {}, flushes: {}",
            stats.produced, stats.flushes
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": name,
            "source_size": source_len,
            "input_size": input_len,
            "output_size": stats.produced,
            "iterations": stats.iterations,
            "flushes": stats.flushes,
            "level": opts.codec.level,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => eprintln!("{text}"),
            Err(e) => eprintln!("zdelta: stats serialization failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Encode / decode commands
// ---------------------------------------------------------------------------

fn cmd_codec(opts: &Options, mode: Mode) -> Result<(), String> {
    let source = read_source(opts.source_file.as_deref())?;
    let input = read_input(opts.input_file.as_deref())?;
    let mut output = open_output(opts.output_file.as_deref(), opts.force)?;
    debug!(
        "{mode:?}: source {} bytes, input {} bytes, buffer {} bytes",
        source.len(),
        input.len(),
        opts.codec.buffer_size
    );

    let (name, stats) = match mode {
        Mode::Encode => {
            let mut compressor = Compressor::with_options(opts.codec.clone());
            compressor
                .write_delta(&source, &input, &mut output)
                .map_err(|e| format!("encode error: {e}"))?;
            ("encode", compressor.last_stats().unwrap_or_default())
        }
        Mode::Decode => {
            let mut decompressor = Decompressor::with_options(opts.codec.clone());
            decompressor
                .write_target(&source, &input, &mut output)
                .map_err(|e| format!("decode error: {e}"))?;
            ("decode", decompressor.last_stats().unwrap_or_default())
        }
    };

    output
        .flush()
        .map_err(|e| format!("write flush error: {e}"))?;
    info!("{name} wrote {} bytes", stats.produced);
    report(opts, name, source.len(), input.len(), stats);
    Ok(())
}

fn exit_code(result: Result<(), String>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("zdelta: {msg}");
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let default_filter = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Config => cmd_config(),
        Command::Encode => exit_code(cmd_codec(&opts, Mode::Encode)),
        Command::Decode => exit_code(cmd_codec(&opts, Mode::Decode)),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
