//! Configuration module
//!
//! Handles loading and saving ShowLink configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::VirtualEngine;
use crate::protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_UDP_PORT};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// UDP listener settings
    #[serde(default)]
    pub udp: UdpConfig,

    /// Serial port settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Cuelists loaded into the built-in engine
    #[serde(default)]
    pub show: ShowConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Human-readable name for this controller
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            verbose: false,
        }
    }
}

/// UDP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    /// Listen for UDP commands
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interface to bind to (default: all)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Receive buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    Ipv4Addr::UNSPECIFIED.to_string()
}

fn default_port() -> u16 {
    DEFAULT_UDP_PORT
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_address: default_bind_address(),
            port: default_port(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl UdpConfig {
    /// Socket address to bind
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Serial configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Listen on a serial port
    #[serde(default)]
    pub enabled: bool,
    /// Device path or name
    #[serde(default = "default_serial_port")]
    pub port: String,
    /// Line speed
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

fn default_serial_port() -> String {
    if cfg!(target_os = "windows") {
        "COM1".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}

fn default_baud_rate() -> u32 {
    9600
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

/// Show layout for the built-in engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShowConfig {
    #[serde(default)]
    pub cuelists: Vec<CuelistConfig>,
}

/// A single cuelist definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuelistConfig {
    pub id: u16,
    /// Number of cues
    pub cues: u32,
    /// Mutex group membership
    #[serde(default)]
    pub mutex_group: Option<u16>,
}

impl ShowConfig {
    /// Build an engine holding the configured cuelists
    pub fn build_engine(&self) -> VirtualEngine {
        let mut engine = VirtualEngine::new();
        for cuelist in &self.cuelists {
            engine.add_cuelist(cuelist.id, cuelist.cues, cuelist.mutex_group);
        }
        engine
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("showlink/config.toml")),
            Some(PathBuf::from("./showlink.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Sample configuration with a serial port and one mutex group
pub fn sample_config() -> Config {
    Config {
        general: GeneralConfig {
            name: "Stage Left Rack".to_string(),
            verbose: false,
        },
        serial: SerialConfig {
            enabled: true,
            ..Default::default()
        },
        show: ShowConfig {
            cuelists: vec![
                CuelistConfig {
                    id: 1,
                    cues: 12,
                    mutex_group: None,
                },
                CuelistConfig {
                    id: 10,
                    cues: 1,
                    mutex_group: Some(1),
                },
                CuelistConfig {
                    id: 11,
                    cues: 1,
                    mutex_group: Some(1),
                },
            ],
        },
        ..Default::default()
    }
}
