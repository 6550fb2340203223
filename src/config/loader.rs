// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        // Substitute environment variables
        let content = Self::substitute_env_vars(&content);

        // Parse YAML
        let config: RecorderConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

        // Validate configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${SLOWQUERY_SOCKET:-/tmp/collector.sock} -> /tmp/collector.sock (if unset)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = default_value {
                        default.to_string()
                    } else {
                        // Keep original if no default and var not found
                        format!("${{{}}}", var_name)
                    }
                }
            }
        })
        .to_string()
    }

    /// Validate configuration
    fn validate(config: &RecorderConfig) -> Result<()> {
        if config.tracking.log_min_duration < -1 {
            bail!("tracking.log_min_duration must be -1 (disabled) or >= 0");
        }

        if config.tracking.max_file_size_kb < -1 {
            bail!("tracking.max_file_size_kb must be -1 (unlimited) or >= 0");
        }

        if config.collector.recv_timeout_secs == 0 {
            bail!("collector.recv_timeout_secs must be > 0");
        }

        if config.storage.path.as_os_str().is_empty() {
            bail!("storage.path cannot be empty");
        }

        if config.collector.socket_path.as_os_str().is_empty() {
            bail!("collector.socket_path cannot be empty");
        }

        Ok(())
    }
}
