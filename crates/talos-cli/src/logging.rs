use std::fs::OpenOptions;
use std::sync::Mutex;
use talos_config::LoggingConfig;
use talos_core::{Result, TalosError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Resolve the log level: `--verbose` > `--quiet` > `--log-level` > config.
pub fn resolve_level<'a>(
    verbose: bool,
    quiet: bool,
    flag: Option<&'a str>,
    configured: &'a str,
) -> &'a str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        flag.unwrap_or(configured)
    }
}

/// Install the global subscriber. Logs go to stderr, and are also appended
/// to `config.file` when one is set. `RUST_LOG` wins over `level`.
pub fn init(config: &LoggingConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    TalosError::Config(format!("cannot open log file {}: {e}", path.display()))
                })?;
            install(
                std::io::stderr.and(Mutex::new(file)),
                filter,
                &config.format,
                false,
            )
        }
        None => install(std::io::stderr, filter, &config.format, true),
    }
}

fn install<W>(writer: W, filter: EnvFilter, format: &str, ansi: bool) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);

    let installed = match format {
        "json" => builder.json().with_target(true).try_init(),
        "compact" => builder.compact().with_target(false).try_init(),
        _ => builder.with_target(false).try_init(),
    };
    installed.map_err(|e| TalosError::Config(format!("cannot initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_level() {
        assert_eq!(resolve_level(true, false, Some("warn"), "info"), "debug");
        assert_eq!(resolve_level(false, true, Some("warn"), "info"), "error");
        assert_eq!(resolve_level(false, false, Some("warn"), "info"), "warn");
        assert_eq!(resolve_level(false, false, None, "trace"), "trace");
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LoggingConfig {
            file: Some(dir.path().join("missing").join("talos.log")),
            ..LoggingConfig::default()
        };
        let err = init(&config, "info").unwrap_err();
        assert!(err.to_string().contains("cannot open log file"));
    }
}
