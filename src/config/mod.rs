use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Per-service configuration block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ServiceConfig {
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Top-level ideaminer config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct IdeaMinerConfig {
    pub youtube: Option<ServiceConfig>,
    pub gemini: Option<ServiceConfig>,
}

impl IdeaMinerConfig {
    /// Load config from ~/.ideaminer/config.toml. Returns default if the file
    /// doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(IdeaMinerConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;
        let config: IdeaMinerConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {e}")))?;
        Ok(config)
    }

    /// Get service config by name.
    pub fn service_config(&self, service: &str) -> Option<&ServiceConfig> {
        match service {
            "youtube" => self.youtube.as_ref(),
            "gemini" => self.gemini.as_ref(),
            _ => None,
        }
    }

    /// Persist an API key for a service, creating the file if needed.
    pub fn set_api_key(&mut self, service: &str, key: &str, path: &Path) -> Result<()> {
        let slot = match service {
            "youtube" => self.youtube.get_or_insert_with(ServiceConfig::default),
            "gemini" => self.gemini.get_or_insert_with(ServiceConfig::default),
            _ => {
                return Err(Error::Config(format!(
                    "Unknown service: {service}. Supported: youtube, gemini"
                )))
            }
        };
        slot.api_key = Some(key.to_string());

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create {}: {e}", parent.display())))?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Display config with secrets redacted.
    pub fn display_redacted(&self) -> String {
        let mut lines = Vec::new();
        if let Some(ref yt) = self.youtube {
            lines.push("[youtube]".to_string());
            display_service_config(&mut lines, yt);
        }
        if let Some(ref gm) = self.gemini {
            lines.push("[gemini]".to_string());
            display_service_config(&mut lines, gm);
        }
        if lines.is_empty() {
            lines.push("(no services configured)".to_string());
        }
        lines.join("\n")
    }
}

fn display_service_config(lines: &mut Vec<String>, sc: &ServiceConfig) {
    if let Some(ref key) = sc.api_key {
        let redacted = if key.len() > 8 {
            format!("{}...{}", &key[..4], &key[key.len() - 4..])
        } else {
            "****".to_string()
        };
        lines.push(format!("  api_key = \"{}\"", redacted));
    }
    if let Some(ref cmd) = sc.api_key_command {
        lines.push(format!("  api_key_command = \"{}\"", cmd));
    }
    if let Some(ref url) = sc.base_url {
        lines.push(format!("  base_url = \"{}\"", url));
    }
    if let Some(ref model) = sc.model {
        lines.push(format!("  model = \"{}\"", model));
    }
}

/// Resolve a credential through the chain: CLI flag > env var > config key > config command.
pub fn resolve_credential(
    cli_flag: Option<&str>,
    env_var_name: &str,
    config: Option<&ServiceConfig>,
) -> Result<String> {
    // 1. CLI flag
    if let Some(key) = cli_flag {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return Ok(val);
        }
    }

    if let Some(sc) = config {
        // 3. Config file api_key
        if let Some(ref key) = sc.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        // 4. External command
        if let Some(ref cmd) = sc.api_key_command {
            if !cmd.is_empty() {
                let output = std::process::Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .map_err(|e| {
                        Error::Config(format!("Failed to run api_key_command: {cmd}: {e}"))
                    })?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::Config(format!(
                        "api_key_command failed (exit {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    )));
                }

                let secret = String::from_utf8(output.stdout)
                    .map_err(|_| Error::Config("api_key_command output is not valid UTF-8".into()))?
                    .trim()
                    .to_string();

                if !secret.is_empty() {
                    return Ok(secret);
                }
            }
        }
    }

    Err(Error::MissingCredential(format!(
        "No API key found. Provide via --api-key, {} env var, or ~/.ideaminer/config.toml",
        env_var_name
    )))
}

/// Path to the config file: ~/.ideaminer/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;
    Ok(home.join(".ideaminer").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.ideaminer/config.toml
# Credential resolution order: CLI flag > env var > api_key > api_key_command

[youtube]
# api_key = "your-youtube-data-api-key"
# api_key_command = "your-secrets-manager-command-here"

[gemini]
# api_key = "your-gemini-api-key"
# api_key_command = "your-secrets-manager-command-here"
# model = "gemini-3-flash-preview"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create {}: {e}", parent.display())))?;
    }
    std::fs::write(&path, default_config_template())
        .map_err(|e| Error::Config(format!("Failed to write {}: {e}", path.display())))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = IdeaMinerConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.youtube.is_none());
        assert!(config.gemini.is_none());
    }

    #[test]
    fn set_api_key_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = IdeaMinerConfig::default();
        config.set_api_key("youtube", "yt-secret", &path).unwrap();
        config.set_api_key("gemini", "gm-secret", &path).unwrap();

        let loaded = IdeaMinerConfig::load_from(&path).unwrap();
        assert_eq!(loaded.youtube.unwrap().api_key.as_deref(), Some("yt-secret"));
        assert_eq!(loaded.gemini.unwrap().api_key.as_deref(), Some("gm-secret"));
    }

    #[test]
    fn set_api_key_rejects_unknown_service() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = IdeaMinerConfig::default();
        assert!(config.set_api_key("vimeo", "x", &path).is_err());
    }

    #[test]
    fn resolve_prefers_cli_flag() {
        let sc = ServiceConfig {
            api_key: Some("from-config".into()),
            ..Default::default()
        };
        let key =
            resolve_credential(Some("from-flag"), "IDEAMINER_TEST_UNSET_1", Some(&sc)).unwrap();
        assert_eq!(key, "from-flag");
    }

    #[test]
    fn resolve_prefers_env_over_config() {
        std::env::set_var("IDEAMINER_TEST_KEY_2", "from-env");
        let sc = ServiceConfig {
            api_key: Some("from-config".into()),
            ..Default::default()
        };
        let key = resolve_credential(None, "IDEAMINER_TEST_KEY_2", Some(&sc)).unwrap();
        std::env::remove_var("IDEAMINER_TEST_KEY_2");
        assert_eq!(key, "from-env");
    }

    #[test]
    fn resolve_falls_back_to_config_key() {
        let sc = ServiceConfig {
            api_key: Some("from-config".into()),
            ..Default::default()
        };
        let key = resolve_credential(None, "IDEAMINER_TEST_UNSET_3", Some(&sc)).unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn resolve_reports_missing_credential() {
        let err = resolve_credential(None, "IDEAMINER_TEST_UNSET_4", None).unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
        assert!(err.to_string().contains("IDEAMINER_TEST_UNSET_4"));
    }

    #[test]
    fn redacted_display_hides_key_body() {
        let config = IdeaMinerConfig {
            youtube: Some(ServiceConfig {
                api_key: Some("AIzaSyA-very-long-key-9xYz".into()),
                ..Default::default()
            }),
            gemini: None,
        };
        let shown = config.display_redacted();
        assert!(shown.contains("AIza...9xYz"));
        assert!(!shown.contains("very-long"));
    }
}
