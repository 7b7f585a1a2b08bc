use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "speed-toggle.toml";

pub const TOGGLE_KEY: &str = "x";
pub const PAUSE_KEY: &str = "z";
pub const FAST_RATE: f64 = 2.0;
pub const NORMAL_RATE: f64 = 1.0;
pub const VISIBLE_MS: u64 = 1500;
pub const FADE_MS: u64 = 300;
pub const NOTIFICATION_ID: &str = "speed-toggle-notification";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub toggle: String,
    pub pause: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            toggle: TOGGLE_KEY.to_string(),
            pause: PAUSE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub fast: f64,
    pub normal: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            fast: FAST_RATE,
            normal: NORMAL_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub element_id: String,
    pub visible_ms: u64,
    pub fade_ms: u64,
}

impl NotificationConfig {
    pub fn visible_for(&self) -> Duration {
        Duration::from_millis(self.visible_ms)
    }

    pub fn fade_for(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    /// Total time from insertion until the element is gone.
    pub fn lifetime(&self) -> Duration {
        self.visible_for() + self.fade_for()
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            element_id: NOTIFICATION_ID.to_string(),
            visible_ms: VISIBLE_MS,
            fade_ms: FADE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keys: KeyConfig,
    pub speed: SpeedConfig,
    pub notification: NotificationConfig,
}

impl Config {
    pub fn read(file: &mut impl Read) -> anyhow::Result<Self> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn read_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut file = File::open(path).context("Failed to open config file")?;
        Self::read(&mut file)
    }

    /// Loads the given file, or `speed-toggle.toml` from the working directory if it exists,
    /// falling back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(config_path) => Self::read_path(config_path),
            None => {
                let default_config = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_config.exists() {
                    log::info!("Using default config file {DEFAULT_CONFIG_PATH}");
                    Self::read_path(default_config)
                } else {
                    log::debug!("No config file found; using built-in defaults");
                    Ok(Config::default())
                }
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, key) in [("toggle", &self.keys.toggle), ("pause", &self.keys.pause)] {
            if key.is_empty() {
                return Err(anyhow!("The {name} key must not be empty"));
            }
        }
        for (name, rate) in [("fast", self.speed.fast), ("normal", self.speed.normal)] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(anyhow!("The {name} rate must be a positive number, got {rate}"));
            }
        }
        Ok(())
    }
}
