//! Bot Configuration
//!
//! Everything here is fixed at process start; nothing is reloaded.
//! - Discord credentials and API endpoint
//! - Registration channel, verified role and tournament roster
//! - Storage path and HTTP listener

use crate::eligibility::DEFAULT_VERIFIED_ROLE;
use crate::error::ConfigError;
use crate::platform::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Messages scanned when looking for an existing prompt
pub const DEFAULT_HISTORY_WINDOW: u8 = 50;

/// Discord caps one history page at 100 messages
pub const MAX_HISTORY_WINDOW: u8 = 100;

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Discord API access
    pub discord: DiscordConfig,
    /// Registration behaviour
    pub registration: RegistrationConfig,
    /// Interactions endpoint listener
    pub server: ServerConfig,
    /// SQLite database file
    pub database_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig::default(),
            registration: RegistrationConfig::default(),
            server: ServerConfig::default(),
            database_path: PathBuf::from("registrations.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token; usually supplied through `DISCORD_TOKEN` rather than the file
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,
    /// Hex-encoded Ed25519 application public key
    pub public_key: Option<String>,
    pub api_base_url: String,
    /// Guild the bot serves, used to resolve role names
    pub guild_id: Option<GuildId>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            public_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            guild_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Channel that hosts the registration prompt
    pub channel_id: Option<ChannelId>,
    /// Role name (or role id) a member needs to register
    pub verified_role: String,
    /// Open tournaments; empty disables registration
    pub tournaments: Vec<String>,
    pub history_window: u8,
    /// Budget for platform lookups inside an interaction handler
    pub response_deadline_ms: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            verified_role: DEFAULT_VERIFIED_ROLE.to_string(),
            tournaments: Vec::new(),
            history_window: DEFAULT_HISTORY_WINDOW,
            response_deadline_ms: 2000,
        }
    }
}

impl RegistrationConfig {
    pub fn response_deadline(&self) -> Duration {
        Duration::from_millis(self.response_deadline_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl BotConfig {
    /// Load a TOML config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Check the values the bot cannot run without. The registration channel
    /// is not one of them: a missing channel only disables the prompt step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.discord.bot_token.as_deref() {
            Some(token) if !token.trim().is_empty() => {}
            _ => return Err(ConfigError::Missing("discord.bot_token")),
        }

        let key = self
            .discord
            .public_key
            .as_deref()
            .ok_or(ConfigError::Missing("discord.public_key"))?;
        let decoded = hex::decode(key.trim()).map_err(|e| ConfigError::Invalid {
            field: "discord.public_key",
            reason: e.to_string(),
        })?;
        if decoded.len() != 32 {
            return Err(ConfigError::Invalid {
                field: "discord.public_key",
                reason: format!("expected 32 bytes, got {}", decoded.len()),
            });
        }

        if self.registration.verified_role.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "registration.verified_role",
                reason: "must not be empty".to_string(),
            });
        }
        if self.registration.history_window == 0
            || self.registration.history_window > MAX_HISTORY_WINDOW
        {
            return Err(ConfigError::Invalid {
                field: "registration.history_window",
                reason: format!("must be between 1 and {}", MAX_HISTORY_WINDOW),
            });
        }
        if self.registration.tournaments.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "registration.tournaments",
                reason: "tournament names must not be blank".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_KEY: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    fn valid_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.discord.bot_token = Some("token".to_string());
        config.discord.public_key = Some(VALID_KEY.to_string());
        config.registration.channel_id = Some(ChannelId(1377744313840173096));
        config
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.registration.verified_role, DEFAULT_VERIFIED_ROLE);
        assert_eq!(config.registration.history_window, 50);
        assert!(config.registration.tournaments.is_empty());
        assert_eq!(config.discord.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_toml() {
        let config = BotConfig::from_toml(
            r#"
            database_path = "/data/registrations.db"

            [discord]
            guild_id = 1371506090382069881

            [registration]
            channel_id = "1377744313840173096"
            tournaments = ["Spring Showdown 2025"]
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.guild_id, Some(GuildId(1371506090382069881)));
        assert_eq!(
            config.registration.channel_id,
            Some(ChannelId(1377744313840173096))
        );
        assert_eq!(config.registration.tournaments, vec!["Spring Showdown 2025"]);
        assert_eq!(config.registration.verified_role, DEFAULT_VERIFIED_ROLE);
        assert_eq!(config.database_path, PathBuf::from("/data/registrations.db"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            BotConfig::from_toml("registration = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.discord.bot_token = Some("  ".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("discord.bot_token"))
        ));

        let mut config = valid_config();
        config.discord.public_key = Some("abcd".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = valid_config();
        config.registration.channel_id = None;
        assert!(config.validate().is_ok());

        let mut config = valid_config();
        config.registration.history_window = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.registration.tournaments = vec![" ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = BotConfig::from_file(Path::new("/nonexistent/registrar.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
