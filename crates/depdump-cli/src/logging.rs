//! Diagnostic output on stderr.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the `-q`/`-v` flags.
///
/// Dependencies stay at `warn` so `-vvv` only opens up this tool's own spans.
pub fn directive(quiet: bool, verbose: u8) -> String {
    if quiet {
        return "error".to_string();
    }
    let level = match verbose {
        0 => return "warn".to_string(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,depdump={level},depdump_core={level}")
}

/// Install the stderr subscriber. Calling this twice is a no-op.
pub fn init(quiet: bool, verbose: u8) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose > 1)
                .without_time()
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(EnvFilter::new(directive(quiet, verbose)))
        .try_init();
}
