//! Configuration for agora-daemon

use agora_dispatch::DispatchConfig;
use agora_engine::EngineConfig;
use agora_meeting::MeetingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Lifecycle engine tunables
    #[serde(default)]
    pub engine: EngineConfig,

    /// Meeting tunables
    #[serde(default)]
    pub meeting: MeetingConfig,

    /// Webhook dispatcher tunables
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Board bootstrap
    #[serde(default)]
    pub board: BoardConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            meeting: MeetingConfig::default(),
            dispatch: DispatchConfig::default(),
            board: BoardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".parse().unwrap(),
            enable_cors: true,
        }
    }
}

/// Seed content created at startup if absent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Slug of the designated meeting channel
    #[serde(default = "default_meeting_slug")]
    pub meeting_channel_slug: String,

    /// Display name of the meeting channel
    #[serde(default = "default_meeting_name")]
    pub meeting_channel_name: String,

    /// Agents registered at startup
    #[serde(default)]
    pub seed_agents: Vec<SeedAgent>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            meeting_channel_slug: default_meeting_slug(),
            meeting_channel_name: default_meeting_name(),
            seed_agents: Vec::new(),
        }
    }
}

/// One pre-registered agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAgent {
    pub name: String,
    pub bearer_token: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub avatar_emoji: String,
    #[serde(default)]
    pub model_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_meeting_slug() -> String {
    "meeting-room".to_string()
}

fn default_meeting_name() -> String {
    "Meeting Room".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then file, then AGORA_* environment.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("AGORA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
