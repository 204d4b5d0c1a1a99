//! `tar-patch`: apply a delta file produced by `tar-diff` against the old
//! tar archive, reconstructing the new one.

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use tardiff::cli;

/// Reconstruct NEW_TAR from a delta file produced by tar-diff and OLD_TAR.
#[derive(Parser, Debug)]
#[command(name = "tar-patch", version, about)]
struct Args {
    /// Delta file produced by tar-diff.
    delta_in: PathBuf,
    /// Old (base) tar archive, optionally gzip-compressed.
    old_tar: PathBuf,
    /// Output path for the reconstructed tar archive.
    new_tar_out: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Suppress all logging except errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli::init_logging(args.verbose, args.quiet);

    let delta_file = File::open(&args.delta_in)?;
    let mut out = File::create(&args.new_tar_out)?;
    tardiff::apply_delta(delta_file, &args.old_tar, &mut out)?;

    if !args.quiet {
        let written = std::fs::metadata(&args.new_tar_out)?.len();
        println!(
            "{} {} -> {} ({})",
            "tar-patch:".green().bold(),
            args.delta_in.display(),
            args.new_tar_out.display(),
            cli::format_size(written)
        );
    }

    Ok(())
}
