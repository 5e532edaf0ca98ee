//! Logging setup for the binaries.
//!
//! Everything goes to standard output, cron collects it. The level defaults to `info` and can be
//! changed with `RUST_LOG`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::RadarDataErr;

/// Level used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
pub fn init_logging() -> Result<(), RadarDataErr> {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .try_init()
        .map_err(|err| RadarDataErr::GeneralError(err.to_string()))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
