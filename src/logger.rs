//! `tracing` setup for the `cjs-lexer` binary.
//!
//! Logs go to stderr so stdout stays machine-readable JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. `verbose` wins over `quiet`; with neither,
/// `RUST_LOG` is honoured before falling back to warnings only.
pub fn init_logger(verbose: bool, quiet: bool) {
    tracing_subscriber::registry().with(level_filter(verbose, quiet)).with(stderr_layer()).init();
}

fn level_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("cjs_lexer_core=debug,cjs_lexer=debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer().with_writer(std::io::stderr).with_target(false).compact()
}

