use anidb_udp_core::{AniDbSettings, SecureString, UdpConfig};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `ANIDB_UDP_ACCOUNT__USERNAME`
const ENV_PREFIX: &str = "ANIDB_UDP_";

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub udp: UdpConfig,

    #[serde(default)]
    pub account: AccountConfig,
}

/// Account and server section of the config file
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
    pub server_address: String,
    pub server_port: u16,
    pub client_port: u16,
}

impl Default for AccountConfig {
    fn default() -> Self {
        let settings = AniDbSettings::default();
        Self {
            username: settings.username,
            password: String::new(),
            server_address: settings.server_address,
            server_port: settings.server_port,
            client_port: settings.client_port,
        }
    }
}

impl AccountConfig {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn to_settings(&self) -> AniDbSettings {
        AniDbSettings {
            username: self.username.clone(),
            password: SecureString::new(self.password.as_str()),
            server_address: self.server_address.clone(),
            server_port: self.server_port,
            client_port: self.client_port,
        }
    }
}

/// Locates and loads the layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Use an explicit config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn default_config_path() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("anidb-udp/config.toml");
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("anidb-udp")
            .join("config.toml")
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|jail| {
            let manager = ConfigManager::with_path(jail.directory().join("missing.toml"));
            let config = manager.load().map_err(|e| e.to_string())?;

            assert_eq!(config.udp, UdpConfig::default());
            assert_eq!(config.account.server_address, "api.anidb.net");
            assert_eq!(config.account.server_port, 9000);
            assert!(!config.account.has_credentials());
            Ok(())
        });
    }

    #[test]
    fn test_file_values_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [udp]
                client_name = "myclient"
                ping_frequency_secs = 60

                [account]
                username = "someone"
                password = "hunter2"
                client_port = 4600
                "#,
            )?;

            let manager = ConfigManager::with_path(jail.directory().join("config.toml"));
            let config = manager.load().map_err(|e| e.to_string())?;

            assert_eq!(config.udp.client_name, "myclient");
            assert_eq!(config.udp.ping_frequency_secs, 60);
            assert_eq!(config.udp.force_logout_secs, 600);
            assert!(config.account.has_credentials());

            let settings = config.account.to_settings();
            assert_eq!(settings.client_port, 4600);
            assert_eq!(settings.server_port, 9000);
            assert_eq!(settings.password.expose_secret(), "hunter2");
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [account]
                username = "from_file"
                "#,
            )?;
            jail.set_env("ANIDB_UDP_ACCOUNT__USERNAME", "from_env");
            jail.set_env("ANIDB_UDP_UDP__PULSE_INTERVAL_SECS", "10");

            let manager = ConfigManager::with_path(jail.directory().join("config.toml"));
            let config = manager.load().map_err(|e| e.to_string())?;

            assert_eq!(config.account.username, "from_env");
            assert_eq!(config.udp.pulse_interval_secs, 10);
            Ok(())
        });
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[udp]\nping_frequency_secs = \"often\"\n")?;

            let manager = ConfigManager::with_path(jail.directory().join("config.toml"));
            assert!(manager.load().is_err());
            Ok(())
        });
    }
}
