use std::sync::{Mutex, PoisonError};

use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Layer, Registry};

lazy_static! {
    static ref LOG_INSTALLED: Mutex<bool> = Mutex::new(false);
}

/// Filter used when `RUST_LOG` is unset or empty: only our own warnings.
pub const DEFAULT_FILTER: &str = "xray=warn";

/// Build the filter from `RUST_LOG` if it holds anything, otherwise fall back
/// to `DEFAULT_FILTER`.  An unparseable value also falls back.
pub fn env_filter() -> EnvFilter {
    // Shell wrappers frequently export RUST_LOG unconditionally but empty,
    // which shouldn't count as asking for anything.
    match std::env::var("RUST_LOG") {
        Ok(rustlog) if !rustlog.is_empty() => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        _ => EnvFilter::new(DEFAULT_FILTER),
    }
}

/// Install the global subscriber.  Safe to call repeatedly; only the first
/// call does anything, and a subscriber installed by someone else is left
/// alone.  Returns whether this call installed it.
pub fn init_logging() -> bool {
    let mut installed = LOG_INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
    if *installed {
        return false;
    }

    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        // Output usually ends up in log files, where ANSI and wall times are
        // noise.
        .with_ansi(false)
        .without_time()
        .with_filter(env_filter())
        .boxed();

    let result = Registry::default().with(vec![layer]).try_init();
    if let Err(err) = &result {
        eprintln!("xray logging not installed: {}", err);
    }
    *installed = true;
    result.is_ok()
}
