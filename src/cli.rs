//! Shared plumbing for the `tar-diff` and `tar-patch` binaries: logging
//! setup and byte-count formatting.

use tracing_subscriber::EnvFilter;

/// Initialize `tracing` output from a `-v`/`-q` verbosity count:
/// quiet -> error, 0 -> warn, 1 -> info, 2 -> debug, 3+ -> trace.
/// `RUST_LOG` overrides this when set.
pub fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Render a byte count as a human-readable size (`1.50 MiB`, `42 B`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}
