//! CLI error type and exit codes.

use std::fmt;
use std::process;

use sonarlayer::cache::CacheError;
use sonarlayer::config::ConfigFileError;
use sonarlayer::executor::PoolError;
use sonarlayer::layer::LayerError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, validated or written.
    Config(String),
    /// Logging could not be initialised.
    Logging(String),
    /// The cache could not be opened or maintained.
    Cache(String),
    /// The worker pool or layer could not be assembled.
    Pipeline(String),
    /// The rendered image could not be written.
    Output(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Logging(_) => 3,
            CliError::Cache(_) => 4,
            CliError::Pipeline(_) => 5,
            CliError::Output(_) => 6,
        }
    }

    /// Print the error and exit.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        process::exit(self.exit_code());
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialise logging: {}", msg),
            CliError::Cache(msg) => write!(f, "Cache error: {}", msg),
            CliError::Pipeline(msg) => write!(f, "Pipeline error: {}", msg),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e.to_string())
    }
}

impl From<PoolError> for CliError {
    fn from(e: PoolError) -> Self {
        CliError::Pipeline(e.to_string())
    }
}

impl From<LayerError> for CliError {
    fn from(e: LayerError) -> Self {
        CliError::Pipeline(e.to_string())
    }
}

impl From<image::ImageError> for CliError {
    fn from(e: image::ImageError) -> Self {
        CliError::Output(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            CliError::Config(String::new()),
            CliError::Logging(String::new()),
            CliError::Cache(String::new()),
            CliError::Pipeline(String::new()),
            CliError::Output(String::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(CliError::exit_code).collect();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| *c != 0 && *c != 1));
    }

    #[test]
    fn test_display() {
        let error = CliError::Config("bad namespace".to_string());
        assert_eq!(error.to_string(), "Configuration error: bad namespace");
    }
}
