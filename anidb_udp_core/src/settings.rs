//! AniDB account and server settings
//!
//! The handler never persists anything itself. It reads settings from, and
//! writes accepted credentials back through, a [`SettingsProvider`].

use crate::error::{Result, ValidationError};
use crate::security::SecureString;
use std::sync::{PoisonError, RwLock};

/// Account credentials and server location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AniDbSettings {
    pub username: String,
    pub password: SecureString,
    pub server_address: String,
    pub server_port: u16,
    pub client_port: u16,
}

impl Default for AniDbSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: SecureString::default(),
            server_address: crate::protocol::DEFAULT_SERVER.to_string(),
            server_port: crate::protocol::DEFAULT_PORT,
            client_port: crate::protocol::DEFAULT_CLIENT_PORT,
        }
    }
}

impl AniDbSettings {
    /// Settings for the default server with the given account
    pub fn with_credentials(username: impl Into<String>, password: impl Into<SecureString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Both username and password are present
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Check the server location
    pub fn validate_endpoint(&self) -> Result<()> {
        if self.server_address.trim().is_empty() {
            return Err(ValidationError::invalid_configuration("server address is empty").into());
        }
        if self.server_port == 0 {
            return Err(
                ValidationError::invalid_configuration("server port must be positive").into(),
            );
        }
        if self.client_port == 0 {
            return Err(
                ValidationError::invalid_configuration("client port must be positive").into(),
            );
        }
        Ok(())
    }
}

/// Source and sink for [`AniDbSettings`]
pub trait SettingsProvider: Send + Sync {
    /// Current settings
    fn load(&self) -> AniDbSettings;

    /// Persist updated settings
    fn save(&self, settings: &AniDbSettings) -> Result<()>;
}

/// Settings held in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemorySettingsProvider {
    settings: RwLock<AniDbSettings>,
}

impl MemorySettingsProvider {
    pub fn new(settings: AniDbSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl SettingsProvider for MemorySettingsProvider {
    fn load(&self) -> AniDbSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, settings: &AniDbSettings) -> Result<()> {
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_settings() {
        let settings = AniDbSettings::default();
        assert_eq!(settings.server_address, "api.anidb.net");
        assert_eq!(settings.server_port, 9000);
        assert_eq!(settings.client_port, 4556);
        assert!(!settings.has_credentials());
    }

    #[test]
    fn test_has_credentials() {
        assert!(AniDbSettings::with_credentials("user", "pass").has_credentials());
        assert!(!AniDbSettings::with_credentials("user", "").has_credentials());
        assert!(!AniDbSettings::with_credentials("", "pass").has_credentials());
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(AniDbSettings::default().validate_endpoint().is_ok());

        let settings = AniDbSettings {
            server_address: "  ".to_string(),
            ..AniDbSettings::default()
        };
        assert!(matches!(
            settings.validate_endpoint(),
            Err(Error::Validation(ValidationError::InvalidConfiguration { .. }))
        ));

        let settings = AniDbSettings {
            server_port: 0,
            ..AniDbSettings::default()
        };
        assert!(settings.validate_endpoint().is_err());

        let settings = AniDbSettings {
            client_port: 0,
            ..AniDbSettings::default()
        };
        assert!(settings.validate_endpoint().is_err());
    }

    #[test]
    fn test_memory_provider_round_trip() {
        let provider = MemorySettingsProvider::default();
        let settings = AniDbSettings::with_credentials("user", "secret");
        provider.save(&settings).unwrap();
        assert_eq!(provider.load(), settings);
    }
}
