//! `tar-diff`: generate a binary delta describing how to transform one tar
//! archive into another.

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use tardiff::options::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_BSDIFF_SIZE};
use tardiff::{cli, Options};

/// Generate a delta file transforming OLD_TAR into NEW_TAR.
#[derive(Parser, Debug)]
#[command(name = "tar-diff", version, about)]
struct Args {
    /// Old (base) tar archive, optionally gzip-compressed.
    old_tar: PathBuf,
    /// New (target) tar archive, optionally gzip-compressed.
    new_tar: PathBuf,
    /// Output delta file path.
    delta_out: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Suppress all logging except errors.
    #[arg(short, long)]
    quiet: bool,

    /// zstd compression level applied to the opcode stream (1-22).
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    compression_level: i32,
    /// Largest old/new file pair bsdiff will attempt, in bytes (0 = unbounded).
    #[arg(long, default_value_t = DEFAULT_MAX_BSDIFF_SIZE)]
    max_bsdiff_size: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_logging(args.verbose, args.quiet);

    let options = Options::new()
        .with_compression_level(args.compression_level)
        .with_max_bsdiff_size(args.max_bsdiff_size);

    let out = File::create(&args.delta_out)?;
    tardiff::generate_delta(&args.old_tar, &args.new_tar, &options, out)?;

    if !args.quiet {
        let written = std::fs::metadata(&args.delta_out)?.len();
        println!(
            "{} {} -> {} ({})",
            "tar-diff:".green().bold(),
            args.old_tar.display(),
            args.delta_out.display(),
            cli::format_size(written)
        );
    }

    Ok(())
}
