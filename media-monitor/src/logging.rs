use crate::config::Config;
use crate::types::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Map the configured level name onto a tracing filter directive.
pub fn filter_directive(log_level: &str, debug: bool) -> &'static str {
    if debug {
        return "debug";
    }
    match log_level {
        "DEBUG" => "debug",
        "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `LOG_LEVEL` when set.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.log_level, config.debug)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // try_init: a second call (tests, embedding) keeps the first subscriber
    match (&config.log_file, config.json_logging) {
        (Some(path), true) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder.json().with_writer(Mutex::new(file)).try_init();
        }
        (Some(path), false) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
        }
        (None, true) => {
            let _ = builder.json().try_init();
        }
        (None, false) => {
            let _ = builder.try_init();
        }
    }
    Ok(())
}
