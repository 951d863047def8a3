use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BOUNDARY_THRESHOLD: u32 = 2;
pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_SPACING: f32 = 20.0;
pub const DEFAULT_WINDOW_SIZE: usize = 10;
pub const DEFAULT_CENTER_OFFSET: usize = 4;

const DEFAULT_VARIANT_NAMES: [&str; 10] = [
    "room.corridor",
    "room.office",
    "room.server_closet",
    "room.break_room",
    "room.stairwell",
    "room.archive",
    "room.lab",
    "room.lobby",
    "room.storage",
    "room.workshop",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomVariant {
    pub name: String,
}

impl RoomVariant {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub variants: Vec<RoomVariant>,
    pub spacing: f32,
    pub window_size: usize,
    /// Number of slots placed to the left of the actor's initial slot.
    pub center_offset: usize,
    pub detection_interval: Duration,
    pub boundary_threshold: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            variants: DEFAULT_VARIANT_NAMES
                .iter()
                .map(|name| RoomVariant::new(*name))
                .collect(),
            spacing: DEFAULT_SPACING,
            window_size: DEFAULT_WINDOW_SIZE,
            center_offset: DEFAULT_CENTER_OFFSET,
            detection_interval: DEFAULT_DETECTION_INTERVAL,
            boundary_threshold: DEFAULT_BOUNDARY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("room variant list is empty; at least one variant is required")]
    NoVariants,
    #[error("spacing must be a positive finite number, got {0}")]
    InvalidSpacing(f32),
    #[error("window size must be at least 1")]
    ZeroWindowSize,
    #[error("center offset {center_offset} must be less than window size {window_size}")]
    CenterOffsetOutOfRange {
        center_offset: usize,
        window_size: usize,
    },
    #[error("detection interval must be non-zero")]
    ZeroDetectionInterval,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config json: {message}")]
    Parse { message: String },
    #[error("failed to parse config json at {path}: {message}")]
    ParseAt { path: String, message: String },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfigFile {
    pub variants: Vec<String>,
    pub spacing: f32,
    pub window_size: usize,
    pub center_offset: usize,
    pub detection_interval_ms: u64,
    #[serde(default = "default_boundary_threshold")]
    pub boundary_threshold: u32,
}

fn default_boundary_threshold() -> u32 {
    DEFAULT_BOUNDARY_THRESHOLD
}

impl StreamConfigFile {
    pub fn into_config(self) -> StreamConfig {
        StreamConfig {
            variants: self.variants.into_iter().map(RoomVariant::new).collect(),
            spacing: self.spacing,
            window_size: self.window_size,
            center_offset: self.center_offset,
            detection_interval: Duration::from_millis(self.detection_interval_ms),
            boundary_threshold: self.boundary_threshold,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variants.is_empty() {
            return Err(ConfigError::NoVariants);
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing(self.spacing));
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if self.center_offset >= self.window_size {
            return Err(ConfigError::CenterOffsetOutOfRange {
                center_offset: self.center_offset,
                window_size: self.window_size,
            });
        }
        if self.detection_interval.is_zero() {
            return Err(ConfigError::ZeroDetectionInterval);
        }
        Ok(())
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    pub fn variant(&self, index: usize) -> Option<&RoomVariant> {
        self.variants.get(index)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigLoadError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file = match serde_path_to_error::deserialize::<_, StreamConfigFile>(&mut deserializer)
        {
            Ok(file) => file,
            Err(error) => {
                let path = error.path().to_string();
                let message = error.into_inner().to_string();
                if path.is_empty() || path == "." {
                    return Err(ConfigLoadError::Parse { message });
                }
                return Err(ConfigLoadError::ParseAt { path, message });
            }
        };
        let config = file.into_config();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigLoadError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}
