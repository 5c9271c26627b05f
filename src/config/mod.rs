#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::RoomId;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use toml_config::TomlConfig;

pub const DEFAULT_BASE_URL: &str = "https://stregsystem.fklub.dk/api";
pub const DEFAULT_ROOM: RoomId = 10;

/// 最終生效的設定，由嵌入環境注入 client 與 session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub default_room: RoomId,
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_room: DEFAULT_ROOM,
            log_level: None,
        }
    }
}

impl AppConfig {
    pub fn new(base_url: impl Into<String>, default_room: RoomId) -> Self {
        Self {
            base_url: base_url.into(),
            default_room,
            log_level: None,
        }
    }

    /// Layers explicit overrides over a TOML file over the built-in defaults.
    pub fn layered(
        file: Option<&TomlConfig>,
        base_url: Option<String>,
        default_room: Option<RoomId>,
    ) -> Result<Self> {
        let defaults = Self::default();
        let backend = file.map(|f| f.backend.clone()).unwrap_or_default();

        let config = Self {
            base_url: base_url
                .or(backend.base_url)
                .unwrap_or(defaults.base_url),
            default_room: default_room
                .or(backend.default_room)
                .unwrap_or(defaults.default_room),
            log_level: file.and_then(|f| f.log_level().map(str::to_string)),
        };

        config.validate()?;
        Ok(config)
    }
}

impl ConfigProvider for AppConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_room(&self) -> RoomId {
        self.default_room
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validate_positive_number("default_room", self.default_room, 1)?;
        Ok(())
    }
}
