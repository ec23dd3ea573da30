//! Configuration loading for the desired rule.
//!
//! A rule can come from a YAML file, environment variables and the command
//! line. Sources are merged with that precedence (command line wins), then
//! resolved into a [`DesiredRuleSpec`].

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, FirewallError, Result};

use super::spec::{DesiredRuleSpec, RuleInput};

/// Environment variable holding the service account key file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment override for the project.
pub const PROJECT_ENV: &str = "FIREWALL_RULE_PROJECT";

/// Environment override for the network.
pub const NETWORK_ENV: &str = "FIREWALL_RULE_NETWORK";

/// Configuration parser for the desired rule.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a rule from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<RuleInput> {
        let path = self.resolve(path.as_ref());
        info!("Loading rule from: {}", path.display());

        if !path.exists() {
            return Err(FirewallError::Config(ConfigError::FileNotFound { path }));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            FirewallError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(&path))
    }

    /// Parses a rule from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<RuleInput> {
        debug!("Parsing YAML rule");

        serde_yaml::from_str(content).map_err(|e| {
            FirewallError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    /// Reads the environment overrides.
    #[must_use]
    pub fn env_overrides(&self) -> RuleInput {
        let project = std::env::var(PROJECT_ENV).ok();
        if project.is_some() {
            debug!("Overriding project from environment");
        }
        let network = std::env::var(NETWORK_ENV).ok();
        if network.is_some() {
            debug!("Overriding network from environment");
        }

        RuleInput {
            project,
            network,
            ..RuleInput::default()
        }
    }

    /// Merges the rule file (if any), the environment and the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or a required field is
    /// missing from every source.
    pub fn resolve_rule(
        &self,
        file: Option<&Path>,
        command_line: RuleInput,
    ) -> Result<DesiredRuleSpec> {
        let from_file = file
            .map(|path| self.load_file(path))
            .transpose()?
            .unwrap_or_default();

        from_file
            .merge(self.env_overrides())
            .merge(command_line)
            .into_spec()
            .map_err(|field| FirewallError::Config(ConfigError::missing_field(field)))
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                FirewallError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the service account key file from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is not set.
    pub fn get_credentials_path() -> Result<PathBuf> {
        std::env::var_os(CREDENTIALS_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                FirewallError::Config(ConfigError::MissingEnvVar {
                    name: String::from(CREDENTIALS_ENV),
                })
            })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RULE_YAML: &str = r"
name: allow-game
project: demo
network: default
tcp:
  - 22
  - 20000-20005
udp: 53
tags: [game, ssh]
source: 10.0.0.0/8
description: game servers
";

    #[test]
    fn test_parse_rule_yaml() {
        let input = ConfigParser::new().parse_yaml(RULE_YAML, None).unwrap();
        let spec = input.into_spec().unwrap();
        assert_eq!(spec.name, "allow-game");
        assert_eq!(spec.allow(), "tcp:22,tcp:20000-20005,udp:53");
        assert_eq!(spec.target_tags, vec!["game", "ssh"]);
        assert_eq!(spec.description, "game servers");
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = ConfigParser::new().parse_yaml("name: [", None).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_load_file_relative_to_base() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("rule.yaml"), RULE_YAML).expect("Failed to write rule");

        let parser = ConfigParser::new().with_base_path(dir.path());
        let input = parser.load_file("rule.yaml").unwrap();
        assert_eq!(input.name.as_deref(), Some("allow-game"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = ConfigParser::new()
            .load_file(dir.path().join("missing.yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            FirewallError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("rule.yaml");
        std::fs::write(&path, RULE_YAML).expect("Failed to write rule");

        let command_line = RuleInput {
            tcp: Some(String::from("443")),
            description: Some(String::new()),
            ..RuleInput::default()
        };
        let spec = ConfigParser::new()
            .resolve_rule(Some(&path), command_line)
            .unwrap();
        assert_eq!(spec.tcp_ports.as_str(), "443");
        assert_eq!(spec.description, "");
        assert_eq!(spec.udp_ports.as_str(), "53");
    }

    #[test]
    fn test_missing_required_field() {
        let command_line = RuleInput {
            name: Some(String::from("allow-ssh")),
            ..RuleInput::default()
        };
        let err = ConfigParser::new().resolve_rule(None, command_line).unwrap_err();
        assert!(matches!(
            err,
            FirewallError::Config(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_dotenv_missing_is_ok() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        assert!(ConfigParser::new().with_base_path(dir.path()).load_dotenv().is_ok());
    }
}
