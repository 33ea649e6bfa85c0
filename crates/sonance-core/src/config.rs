//! Engine configuration files.
//!
//! [`EngineConfig`] collects the settings a system needs before `System_Init`
//! and a few that are applied right after it. It round-trips through TOML:
//!
//! ```toml
//! max_channels = 256
//! init_flags = 65536
//! sample_rate = 48000
//! speaker_mode = "stereo"
//! software_channels = 64
//! network_timeout_ms = 5000
//!
//! [dsp_buffer]
//! length = 512
//! count = 4
//!
//! [stream_buffer]
//! size = 16384
//! unit = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ArgumentError;
use crate::flags::{InitFlags, SpeakerMode, TimeUnit};

/// Upper bound on the virtual channel count the engine accepts.
pub const MAX_CHANNELS_LIMIT: u32 = 4095;

/// Errors that can occur while loading, saving or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field is out of range
    #[error("invalid config: {0}")]
    Invalid(#[from] ArgumentError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ArgumentError {
    ArgumentError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

/// Mixer block size and ring length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DspBufferConfig {
    /// Samples per mix block.
    pub length: u32,
    /// Number of blocks in the ring.
    pub count: i32,
}

/// Per-stream file buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamBufferConfig {
    /// Buffer size in `unit`.
    pub size: u32,
    /// Unit of `size`.
    #[serde(default = "default_stream_unit")]
    pub unit: TimeUnit,
}

fn default_stream_unit() -> TimeUnit {
    TimeUnit::RAW_BYTES
}

fn default_max_channels() -> u32 {
    512
}

/// Settings applied while creating a system.
///
/// Everything except `max_channels` and `init_flags` is optional; `None`
/// leaves the engine default in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum virtual channels.
    #[serde(default = "default_max_channels")]
    pub max_channels: u32,

    /// Initialization flags.
    #[serde(default)]
    pub init_flags: InitFlags,

    /// Software mixer sample rate in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// Software mixer speaker layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_mode: Option<SpeakerMode>,

    /// Mixer buffer layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsp_buffer: Option<DspBufferConfig>,

    /// Real (software mixed) voice count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_channels: Option<u32>,

    /// Default stream file buffer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_buffer: Option<StreamBufferConfig>,

    /// Timeout for network streams, applied after init.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_timeout_ms: Option<u32>,

    /// Proxy for network streams (`host:port`), applied after init.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_proxy: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            init_flags: InitFlags::NORMAL,
            sample_rate: None,
            speaker_mode: None,
            dsp_buffer: None,
            software_channels: None,
            stream_buffer: None,
            network_timeout_ms: None,
            network_proxy: None,
        }
    }
}

impl EngineConfig {
    /// Config with `max_channels` and everything else default.
    pub fn new(max_channels: u32) -> Self {
        Self {
            max_channels,
            ..Self::default()
        }
    }

    /// Set the init flags.
    pub fn with_init_flags(mut self, flags: InitFlags) -> Self {
        self.init_flags = flags;
        self
    }

    /// Set the mixer sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Set the mixer buffer layout.
    pub fn with_dsp_buffer(mut self, length: u32, count: i32) -> Self {
        self.dsp_buffer = Some(DspBufferConfig { length, count });
        self
    }

    /// Load a config from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the config to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Range checks that would otherwise surface as `INVALID_PARAM` from the
    /// engine.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.max_channels == 0 || self.max_channels > MAX_CHANNELS_LIMIT {
            return Err(invalid(
                "max_channels",
                format!("{} is outside 1..={MAX_CHANNELS_LIMIT}", self.max_channels),
            ));
        }
        if let Some(rate) = self.sample_rate
            && !(8_000..=192_000).contains(&rate)
        {
            return Err(invalid(
                "sample_rate",
                format!("{rate} Hz is outside 8000..=192000"),
            ));
        }
        if let Some(buffer) = self.dsp_buffer
            && (buffer.length == 0 || buffer.count < 2)
        {
            return Err(invalid(
                "dsp_buffer",
                "length must be positive and count at least 2",
            ));
        }
        if let Some(channels) = self.software_channels
            && channels > MAX_CHANNELS_LIMIT
        {
            return Err(invalid(
                "software_channels",
                format!("{channels} exceeds {MAX_CHANNELS_LIMIT}"),
            ));
        }
        if let Some(stream) = self.stream_buffer
            && stream.size == 0
        {
            return Err(invalid("stream_buffer", "size must be positive"));
        }
        if let Some(timeout) = self.network_timeout_ms
            && i32::try_from(timeout).is_err()
        {
            return Err(invalid(
                "network_timeout_ms",
                format!("{timeout} does not fit in 31 bits"),
            ));
        }
        if let Some(proxy) = &self.network_proxy
            && proxy.contains('\0')
        {
            return Err(invalid(
                "network_proxy",
                "contains a NUL byte",
            ));
        }
        Ok(())
    }
}
