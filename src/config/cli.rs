use crate::config::toml_config::TomlConfig;
use crate::config::AppConfig;
use crate::domain::model::RoomId;
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "stregsystem-pos")]
#[command(about = "Point-of-sale client for the stregsystem")]
pub struct CliConfig {
    /// API root of the stregsystem backend
    #[arg(long, env = "STREG_BASE_URL")]
    pub base_url: Option<String>,

    /// Room whose products are sold
    #[arg(long, env = "STREG_ROOM")]
    pub room: Option<RoomId>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Check whether the stregsystem can be reached
    Check,
    /// List the products sold in the room
    Products,
    /// Show a member's profile
    Profile { username: String },
    /// Show a member's current balance
    Balance { username: String },
    /// Buy products: `buy alice 14 32:2`
    Buy {
        username: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
}

impl CliConfig {
    /// 讀取設定檔並套用命令列參數
    pub fn resolve(&self) -> Result<AppConfig> {
        let file = match &self.config {
            Some(path) => {
                let file = TomlConfig::from_file(path)?;
                file.validate()?;
                Some(file)
            }
            None => None,
        };

        AppConfig::layered(file.as_ref(), self.base_url.clone(), self.room)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Profile { username } | Command::Balance { username } => {
                validate_non_empty_string("username", username)
            }
            Command::Buy { username, items } => {
                validate_non_empty_string("username", username)?;
                validate_non_empty_string("items", &items.join(" "))
            }
            Command::Check | Command::Products => Ok(()),
        }
    }
}
