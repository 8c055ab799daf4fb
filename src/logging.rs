//! Server logging setup
//!
//! Logging starts from the default log4rs file before the application
//! configuration is read, so configuration warnings are not lost. Once the
//! configuration is known, a different log file it names replaces the early
//! setup.

use log::{info, warn};
use log4rs::config::{Config, Deserializers};
use log4rs::Handle;
use std::path::Path;

use crate::config::LoggingConfig;

/// Parse a log4rs YAML file without installing it
pub fn load_log_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    log4rs::config::load_config_file(path.as_ref(), Deserializers::default()).map_err(|e| e.to_string())
}

/// Install logging from `config_file`, falling back to env_logger.
///
/// Returns the log4rs handle when log4rs was installed.
pub fn init(config_file: &str) -> Option<Handle> {
    match load_log_config(config_file) {
        Ok(config) => log4rs::init_config(config).ok(),
        Err(e) => {
            let _ = env_logger::try_init();
            warn!("Could not load log configuration from {}: {}. Using env_logger", config_file, e);
            None
        }
    }
}

/// Switch to the log file named by the loaded configuration, if it differs
/// from the one logging started with.
pub fn reconfigure(handle: Option<&Handle>, started_with: &str, logging: &LoggingConfig) {
    if logging.config_file == started_with {
        return;
    }
    let Some(handle) = handle else {
        warn!(
            "Log configuration {} ignored: env_logger is already installed",
            logging.config_file
        );
        return;
    };
    match load_log_config(&logging.config_file) {
        Ok(config) => {
            handle.set_config(config);
            info!("Logging reconfigured from {}", logging.config_file);
        }
        Err(e) => warn!(
            "Could not load log configuration from {}: {}. Keeping {}",
            logging.config_file, e, started_with
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_console_config() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "appenders:\n  stdout:\n    kind: console\n    encoder:\n      pattern: \"[{{X(op)(-)}}] {{m}}{{n}}\"\nroot:\n  level: info\n  appenders:\n    - stdout\n"
        )
        .unwrap();
        assert!(load_log_config(file.path()).is_ok());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_log_config(dir.path().join("absent.yaml")).is_err());
    }

    #[test]
    fn test_default_logging_file_is_the_early_one() {
        assert_eq!(LoggingConfig::default().config_file, crate::config::DEFAULT_LOG_CONFIG_PATH);
    }
}
