//! Shared command setup: configuration and logging.

use std::path::{Path, PathBuf};

use sonarlayer::config::{config_file_path, ConfigFile};
use sonarlayer::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the logging guard, kept alive for the
/// duration of a command.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load the configuration and start logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file; the default path otherwise
    /// * `verbose` - Mirror log output to stderr
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging = init_logging(&default_log_dir(), default_log_file(), verbose)
            .map_err(|e| CliError::Logging(e.to_string()))?;

        Ok(Self {
            config,
            config_path,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    /// Record the command and its configuration source in the log.
    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            config = %self.config_path.display(),
            namespace = %self.config.layer.namespace,
            "SonarLayer starting"
        );
    }
}
