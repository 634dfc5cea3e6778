//! xrni CLI - The `xrni` command.
//!
//! Converts SFZ instruments and SF2 banks into XRNI instruments and
//! maintains existing XRNI files (tags, comments, sample encoding).
//!
//! # Architecture
//!
//! - **xrni-core**: instrument model, conversion pipeline, SF2 banks, configuration
//! - **xrni-sfz**: SFZ parsing and region mapping

mod convert;
mod encode;
mod metadata;
mod reencode;
mod sf2;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use xrni_core::{ConvertConfig, Encoding};

/// xrni - sampler instrument conversion
#[derive(Parser, Debug)]
#[command(name = "xrni")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert SFZ and SF2 instruments to XRNI and edit XRNI files", long_about = None)]
struct Args {
    /// Debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert SFZ files into XRNI instruments
    Sfz(ConvertArgs),

    /// Convert every instrument of SF2 banks into XRNI instruments
    Sf2(ConvertArgs),

    /// Display or change XRNI tags
    Tag(TagArgs),

    /// Display or change XRNI comments
    Comment(CommentArgs),

    /// Re-encode the samples of XRNI instruments
    Reencode(ReencodeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ConvertArgs {
    /// Input files (SFZ instruments or SF2 banks)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Output directory [default: current directory]
    #[arg(short, long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Template instrument (bundled templates are found by name)
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Keep keyzones as written instead of covering the whole keyboard
    #[arg(long)]
    pub no_expand: bool,

    /// Replace existing instruments
    #[arg(short, long)]
    pub force: bool,

    /// Report source parameters that could not be converted
    #[arg(short = 'u', long)]
    pub show_unused: bool,
}

#[derive(ClapArgs, Debug)]
pub struct TagArgs {
    /// Input files in XRNI format
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Add a tag
    #[arg(short, long = "add", value_name = "TAG")]
    pub add: Vec<String>,

    /// Remove a tag
    #[arg(short, long = "remove", value_name = "TAG")]
    pub remove: Vec<String>,

    /// Clear all tags
    #[arg(short, long)]
    pub clear: bool,
}

#[derive(ClapArgs, Debug)]
pub struct CommentArgs {
    /// Input files in XRNI format
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Append to the comment
    #[arg(short, long, conflicts_with_all = ["edit", "remove"])]
    pub append: bool,

    /// Replace the comment
    #[arg(short, long, conflicts_with = "remove")]
    pub edit: bool,

    /// Remove the comment
    #[arg(short, long)]
    pub remove: bool,

    /// Message text [default: read from standard input]
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ReencodeArgs {
    /// Input files in XRNI format
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Target format: flac or ogg
    #[arg(short, long = "encode", value_name = "FORMAT")]
    pub encoding: Option<Encoding>,

    /// Sample index to re-encode [default: all]
    #[arg(short, long = "sample", value_name = "INDEX")]
    pub samples: Vec<usize>,

    /// Output directory [default: next to the input]
    #[arg(short, long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.debug, args.quiet);

    let config = match &args.config {
        Some(path) => ConvertConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ConvertConfig::default(),
    };

    match args.command {
        Commands::Sfz(sfz) => convert::run(sfz, config),
        Commands::Sf2(sf2) => sf2::run(sf2, config),
        Commands::Tag(tag) => metadata::tag(tag),
        Commands::Comment(comment) => metadata::comment(comment),
        Commands::Reencode(reencode) => reencode::run(reencode, config),
    }
}

fn init_logger(debug: bool, quiet: bool) {
    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Run `op` on every file, logging failures without stopping the batch.
pub(crate) fn for_each_file<F>(files: &[PathBuf], action: &str, mut op: F) -> Result<()>
where
    F: FnMut(&PathBuf) -> Result<()>,
{
    let mut failed = 0;
    for file in files {
        if let Err(err) = op(file) {
            log::error!("Failed to {} {}: {:#}", action, file.display(), err);
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, files.len());
    }
    Ok(())
}
