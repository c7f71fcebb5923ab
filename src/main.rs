//! GPK CLI - Command-line tool for unpacking GPK game archives.
//!
//! This is the main entry point for the `gpk` command-line application.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};

use gpk::prelude::*;

/// GPK - game archive unpacking tool
#[derive(Parser)]
#[command(name = "gpk")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    unpack: UnpackArgs,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Unpack every archive under a game directory
#[derive(Args)]
struct UnpackArgs {
    /// Game directory containing `packs/`
    #[arg(env = "GPK_GAME_ROOT")]
    game_root: Option<PathBuf>,

    /// Output directory (defaults to the game directory)
    #[arg(short, long, env = "GPK_OUTPUT")]
    output: Option<PathBuf>,

    /// Inflate DFLT payloads instead of writing stored bytes
    #[arg(long)]
    decode: bool,

    /// Strip the compression header in front of Ogg streams
    #[arg(long)]
    strip_ogg_header: bool,

    /// Unpack archives concurrently
    #[arg(long)]
    parallel: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract files from a single GPK archive
    Extract {
        /// Path to the GPK file
        #[arg(short, long, env = "GPK_INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, env = "GPK_OUTPUT")]
        output: PathBuf,

        /// Inflate DFLT payloads instead of writing stored bytes
        #[arg(long)]
        decode: bool,

        /// Strip the compression header in front of Ogg streams
        #[arg(long)]
        strip_ogg_header: bool,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List contents of a GPK archive
    List {
        /// Path to the GPK file
        #[arg(short, long, env = "GPK_INPUT")]
        input: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,

        /// Print entries as JSON
        #[arg(long, conflicts_with = "detailed")]
        json: bool,
    },

    /// Write the decrypted and decompressed index table
    DumpIndex {
        /// Path to the GPK file
        #[arg(short, long, env = "GPK_INPUT")]
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Some(Commands::Extract {
            input,
            output,
            decode,
            strip_ogg_header,
            filter,
        }) => {
            let options = ExtractOptions {
                decode_payloads: decode,
                strip_compr_header: strip_ogg_header,
            };
            cmd_extract(&input, &output, options, filter.as_deref(), cli.quiet)?;
        }
        Some(Commands::List {
            input,
            filter,
            detailed,
            json,
        }) => {
            cmd_list(&input, filter.as_deref(), detailed, json)?;
        }
        Some(Commands::DumpIndex { input, output }) => {
            cmd_dump_index(&input, &output)?;
        }
        None => {
            cmd_unpack(cli.unpack, cli.quiet)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn cmd_unpack(args: UnpackArgs, quiet: bool) -> Result<()> {
    let Some(game_root) = args.game_root else {
        bail!("No game directory given (pass GAME_ROOT or set GPK_GAME_ROOT)");
    };
    let output = args.output.unwrap_or_else(|| game_root.clone());
    let options = ExtractOptions {
        decode_payloads: args.decode,
        strip_compr_header: args.strip_ogg_header,
    };

    let start = Instant::now();
    let mut packs = PackSet::mount(&game_root)
        .with_context(|| format!("Failed to mount {}", game_root.display()))?;

    if packs.is_empty() {
        if packs.failed().is_empty() {
            bail!("No GPK archives found in {}", game_root.display());
        }
        bail!("All {} archives failed to load", packs.failed().len());
    }

    info!(
        "Mounted {} archives in {:?} ({} failed)",
        packs.len(),
        start.elapsed(),
        packs.failed().len()
    );

    let total: u64 = packs
        .archives()
        .iter()
        .map(|archive| archive.entry_count() as u64)
        .sum();
    let pb = progress_bar(total, quiet)?;

    let start = Instant::now();
    let summaries = if args.parallel {
        packs.unpack_all_parallel(&output, options, |_, _, _| pb.inc(1))
    } else {
        packs.unpack_all_with(&output, options, |name, _, _| {
            pb.set_message(name.to_string());
            pb.inc(1);
            ControlFlow::Continue(())
        })
    };
    pb.finish_and_clear();

    let mut failures = 0;
    let mut extracted = 0;
    for summary in &summaries {
        failures += summary.report.failures.len();
        extracted += summary.report.extracted;
        println!(
            "{}: {} files, {} bytes -> {}",
            summary.name,
            summary.report.extracted,
            summary.report.bytes_written,
            summary.output_dir.display()
        );
    }

    println!(
        "Unpacked {} archives in {:?} ({} errors)",
        summaries.len(),
        start.elapsed(),
        failures
    );

    if extracted == 0 && failures > 0 {
        bail!("No files could be extracted ({} errors)", failures);
    }

    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: &Path,
    options: ExtractOptions,
    filter: Option<&str>,
    quiet: bool,
) -> Result<()> {
    println!("Opening GPK archive: {}", input.display());

    let start = Instant::now();
    let mut archive = GpkArchive::open(input).context("Failed to open GPK archive")?;
    println!(
        "Loaded {} entries in {:?}",
        archive.entry_count(),
        start.elapsed()
    );

    let pattern = compile_filter(filter)?;
    let selected = archive
        .iter()
        .filter(|e| name_matches(pattern.as_ref(), &e.name))
        .count();

    println!("Extracting {} entries...", selected);
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let pb = progress_bar(selected as u64, quiet)?;
    let start = Instant::now();
    let report = Extractor::new(output)
        .with_options(options)
        .run_matching(
            &mut archive,
            |e| name_matches(pattern.as_ref(), &e.name),
            |_, _| {
                pb.inc(1);
                ControlFlow::Continue(())
            },
        );
    pb.finish_with_message("Done");

    println!(
        "Extracted {} entries ({} bytes) in {:?}",
        report.extracted,
        report.bytes_written,
        start.elapsed()
    );

    if !report.is_success() {
        for (name, err) in &report.failures {
            warn!("{}: {}", name, err);
        }
        bail!("{} entries failed to extract", report.failures.len());
    }

    Ok(())
}

fn cmd_list(input: &Path, filter: Option<&str>, detailed: bool, json: bool) -> Result<()> {
    let archive = GpkArchive::open(input).context("Failed to open GPK archive")?;
    let pattern = compile_filter(filter)?;

    let entries: Vec<&Entry> = archive
        .iter()
        .filter(|e| name_matches(pattern.as_ref(), &e.name))
        .collect();

    if json {
        let text = serde_json::to_string_pretty(&entries).context("Failed to serialize entries")?;
        println!("{}", text);
        return Ok(());
    }

    for entry in &entries {
        if detailed {
            let header = &entry.header;
            println!(
                "{:>10} {:>10} {:>10} {} {}",
                header.offset,
                header.comprlen,
                header.uncomprlen,
                if header.is_deflated() { "D" } else { " " },
                entry.name
            );
        } else {
            println!("{}", entry.name);
        }
    }

    println!("\nTotal: {} entries", entries.len());

    Ok(())
}

fn cmd_dump_index(input: &Path, output: &Path) -> Result<()> {
    let mut archive = GpkArchive::open(input).context("Failed to open GPK archive")?;
    let table = archive.index_bytes().context("Failed to decode index")?;

    fs::write(output, &table).context("Failed to write output file")?;
    println!(
        "Wrote {} index bytes ({} entries) to {}",
        table.len(),
        archive.entry_count(),
        output.display()
    );

    Ok(())
}

fn progress_bar(len: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(Pattern::new)
        .transpose()
        .context("Invalid filter pattern")
}

/// No filter matches everything.
fn name_matches(pattern: Option<&Pattern>, name: &str) -> bool {
    pattern.map_or(true, |p| glob_matches(p, name))
}
