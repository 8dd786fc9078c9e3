// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 gpt2md contributors

//! Command-line interface for gpt2md.
//!
//! This binary provides the `gpt2md` command for converting ChatGPT
//! conversation exports from JSON to Markdown, one file at a time or a
//! whole directory per invocation.

use gpt2md::{parser, renderer};
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

/// Conventional input folder used when no arguments are given; the
/// matching output folder is this name suffixed with `_md`.
const DEFAULT_INPUT_DIR: &str = "conversations";

/// Where to write the rendered output in single-file mode.
enum OutputTarget {
    /// Write to the specified file.
    File(PathBuf),
    /// Write to stdout.
    Stdout,
}

/// The resolved operating mode.
enum Mode {
    /// Convert one `.json` file.
    Single {
        input: PathBuf,
        output: OutputTarget,
    },
    /// Convert every `.json` file directly inside a directory.
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
    },
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    show_system: bool,
    show_tools: bool,
    show_timestamps: bool,
    show_model: bool,
    heading_offset: u8,
    quiet: bool,
    dry_run: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("input path not found: {}", path.display()))]
    NotFound { path: PathBuf },

    #[snafu(display("input must be a .json file or a directory: {}", path.display()))]
    InvalidInput { path: PathBuf },

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{failed} of {total} files failed to convert"))]
    ConversionsFailed { failed: usize, total: usize },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert ChatGPT conversation exports to Markdown

Usage: {name} [OPTIONS] [INPUT] [OUTPUT]

Arguments:
  [INPUT]   A conversation .json file, or a directory of exports
            (default: {default_dir}/)
  [OUTPUT]  Output file or directory, or - for stdout in single-file mode
            (default: input with .md extension, or <INPUT>_md/ for directories)

Metadata display (use --show-* or --hide-*):
      --show-timestamps     Include timestamps (default: on)
      --hide-timestamps     Hide timestamps
      --show-model          Include model slugs (default: on)
      --hide-model          Hide model slugs
      --show-system         Include system messages (default: off)
      --hide-system         Hide system messages
      --show-tools          Include tool messages (default: off)
      --hide-tools          Hide tool messages
  -v, --verbose             Alias for --show-tools

Other options:
      --heading-offset <N>  Shift heading levels by N (0-5, default: 0)
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be converted without writing
  -h, --help                Print help
  -V, --version             Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        default_dir = DEFAULT_INPUT_DIR,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    // Defaults: system and tools off, timestamps and model on
    let mut show_system = false;
    let mut show_tools = false;
    let mut show_timestamps = true;
    let mut show_model = true;
    let mut heading_offset: u8 = 0;
    let mut quiet = false;
    let mut dry_run = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            // Show/hide flags - last one wins
            Long("show-system") => show_system = true,
            Long("hide-system") => show_system = false,
            Short('v') | Long("verbose" | "show-tools") => show_tools = true,
            Long("hide-tools") => show_tools = false,
            Long("show-timestamps") => show_timestamps = true,
            Long("hide-timestamps") => show_timestamps = false,
            Long("show-model") => show_model = true,
            Long("hide-model") => show_model = false,
            Long("heading-offset") => {
                let val: u8 = parser
                    .value()?
                    .parse()
                    .map_err(|_| "heading-offset must be a number 0-5")?;
                if val > 5 {
                    return Err("heading-offset must be 0-5".into());
                }
                heading_offset = val;
            }
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            Value(val) if output.is_none() => output = Some(val.parse()?),
            Value(val) => return Err(Value(val).unexpected()),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output,
        show_system,
        show_tools,
        show_timestamps,
        show_model,
        heading_offset,
        quiet,
        dry_run,
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", env!("CARGO_PKG_NAME"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    match resolve_mode(&cli)? {
        Mode::Single { input, output } => convert_single(&input, &output, &cli),
        Mode::Batch {
            input_dir,
            output_dir,
        } => convert_batch(&input_dir, &output_dir, &cli),
    }
}

/// Decides between single-file and batch mode and fills in the default
/// output locations.
fn resolve_mode(cli: &Cli) -> Result<Mode, Error> {
    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));

    ensure!(input.exists(), NotFoundSnafu { path: &input });

    if input.is_file() {
        ensure!(
            input.extension().is_some_and(|ext| ext == "json"),
            InvalidInputSnafu { path: &input }
        );
        let output = match &cli.output {
            None => OutputTarget::File(input.with_extension("md")),
            Some(out) if out == Path::new("-") => OutputTarget::Stdout,
            Some(out) if out.extension().is_some_and(|ext| ext == "md") => {
                OutputTarget::File(out.clone())
            }
            // Anything else is treated as an output directory
            Some(out) => OutputTarget::File(out.join(md_file_name(&input)?)),
        };
        Ok(Mode::Single { input, output })
    } else if input.is_dir() {
        let output_dir = cli.output.clone().unwrap_or_else(|| sibling_md_dir(&input));
        Ok(Mode::Batch {
            input_dir: input,
            output_dir,
        })
    } else {
        InvalidInputSnafu { path: input }.fail()
    }
}

/// Returns `<stem>.md` for an input path.
fn md_file_name(input: &Path) -> Result<String, Error> {
    let stem = input.file_stem().context(InvalidFilenameSnafu)?;
    Ok(format!("{}.md", stem.to_string_lossy()))
}

/// Returns the default batch output directory: a sibling of `input`
/// named `<input>_md`.
fn sibling_md_dir(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map_or_else(|| DEFAULT_INPUT_DIR.into(), |name| name.to_string_lossy().into_owned());
    input.with_file_name(format!("{name}_md"))
}

/// Collects all `.json` files directly inside `dir`, in name order.
fn collect_input_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
        })
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

/// Creates render options from CLI arguments.
#[allow(clippy::missing_const_for_fn)]
fn make_render_options(cli: &Cli) -> renderer::RenderOptions {
    renderer::RenderOptions {
        show_system: cli.show_system,
        show_tools: cli.show_tools,
        show_timestamps: cli.show_timestamps,
        show_model: cli.show_model,
        heading_offset: cli.heading_offset,
    }
}

/// Reads, parses, and renders one export file.
fn convert(input: &Path, cli: &Cli) -> Result<String, Error> {
    let json = std::fs::read_to_string(input).context(ReadFileSnafu { path: input })?;
    let export = parser::parse_conversation(&json).context(ParseFileSnafu { path: input })?;
    let messages = export
        .active_branch()
        .context(ParseFileSnafu { path: input })?;

    let opts = make_render_options(cli);
    Ok(renderer::render_conversation(&export, &messages, &opts))
}

/// Processes a single file to its resolved output target.
fn convert_single(input: &Path, output: &OutputTarget, cli: &Cli) -> Result<(), Error> {
    match output {
        OutputTarget::Stdout => {
            if cli.dry_run {
                eprintln!("Would output {}", input.display());
                return Ok(());
            }
            let markdown = convert(input, cli)?;
            print!("{markdown}");
        }
        OutputTarget::File(path) => {
            if cli.dry_run {
                eprintln!("Would write {}", path.display());
                return Ok(());
            }
            let markdown = convert(input, cli)?;
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).context(CreateOutputDirSnafu { path: parent })?;
            }
            std::fs::write(path, &markdown).context(WriteFileSnafu { path })?;
            if !cli.quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

/// Processes every export in `input_dir`, isolating per-file failures.
fn convert_batch(input_dir: &Path, output_dir: &Path, cli: &Cli) -> Result<(), Error> {
    let files = collect_input_files(input_dir);

    if !cli.dry_run {
        std::fs::create_dir_all(output_dir).context(CreateOutputDirSnafu { path: output_dir })?;
    }

    let mut failed = 0usize;
    for file in &files {
        if let Err(err) = convert_into_dir(file, output_dir, cli) {
            eprintln!("{err}");
            failed += 1;
        }
    }

    if !cli.quiet {
        eprintln!("Converted {} of {} files", files.len() - failed, files.len());
    }

    ensure!(
        failed == 0,
        ConversionsFailedSnafu {
            failed,
            total: files.len(),
        }
    );
    Ok(())
}

/// Converts one file into the batch output directory.
fn convert_into_dir(input: &Path, out_dir: &Path, cli: &Cli) -> Result<(), Error> {
    let out_path = out_dir.join(md_file_name(input)?);

    if cli.dry_run {
        eprintln!("Would write {}", out_path.display());
        return Ok(());
    }

    let markdown = convert(input, cli)?;
    std::fs::write(&out_path, &markdown).context(WriteFileSnafu { path: &out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {}", out_path.display());
    }
    Ok(())
}
