use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::genai::payload::ImageFormat;
use crate::genai::provider::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::genai::transport::RetryConfig;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub image_format: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

/// Values given on the command line; they win over env and profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub image_format: Option<String>,
}

/// Effective settings after CLI > env > profile > default resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model: String,
    pub base_url: String,
    pub image_format: ImageFormat,
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Settings {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            timeout_secs: self.timeout_secs,
            retries: self.retries,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

pub fn resolve(overrides: &Overrides) -> Result<Settings, String> {
    let profile = match overrides.profile.as_deref() {
        Some(name) => load_profile(name)?,
        None => ProfileConfig::default(),
    };
    let defaults = RetryConfig::default();

    let model = overrides
        .model
        .clone()
        .or_else(|| env_value("MM_MODEL"))
        .or(profile.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let base_url = overrides
        .base_url
        .clone()
        .or_else(|| env_value("MM_BASE_URL"))
        .or(profile.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let image_format = match overrides.image_format.as_deref() {
        Some(raw) => Some(parse_image_format(raw, "--image-format")?),
        None => match env_value("MM_IMAGE_FORMAT") {
            Some(raw) => Some(parse_image_format(&raw, "MM_IMAGE_FORMAT")?),
            None => profile
                .image_format
                .as_deref()
                .map(|raw| parse_image_format(raw, "profile image_format"))
                .transpose()?,
        },
    }
    .unwrap_or_default();

    let timeout_secs = match overrides.timeout {
        Some(value) => Some(value),
        None => env_number("MM_TIMEOUT")?.or(profile.timeout),
    };
    // A zero timeout would fail every request before it is sent.
    if timeout_secs == Some(0) {
        return Err("Invalid timeout '0'. Expected a positive number of seconds.".to_string());
    }
    let retries = match overrides.retries {
        Some(value) => value,
        None => env_number("MM_RETRIES")?
            .or(profile.retries)
            .unwrap_or(defaults.retries),
    };
    let retry_delay_ms = match overrides.retry_delay {
        Some(value) => value,
        None => env_number("MM_RETRY_DELAY")?
            .or(profile.retry_delay)
            .unwrap_or(defaults.retry_delay_ms),
    };

    Ok(Settings {
        model,
        base_url,
        image_format,
        timeout_secs,
        retries,
        retry_delay_ms,
    })
}

pub fn load_profile(name: &str) -> Result<ProfileConfig, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;
    profiles.get(name).cloned().ok_or_else(|| {
        format!(
            "Profile '{}' not found in config file '{}'.",
            name,
            path.display()
        )
    })
}

/// Checks the config file parses and every (or the named) profile is valid.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, String> {
    let path = config_path()?;
    let profiles = read_profiles(&path)?;

    let selected: Vec<(&String, &ProfileConfig)> = match profile {
        Some(name) => {
            let (key, value) = profiles.get_key_value(name).ok_or_else(|| {
                format!(
                    "Profile '{}' not found in config file '{}'.",
                    name,
                    path.display()
                )
            })?;
            vec![(key, value)]
        }
        None => profiles.iter().collect(),
    };

    for (name, config) in selected {
        if let Some(raw) = config.image_format.as_deref() {
            parse_image_format(raw, &format!("image_format in profile '{name}'"))?;
        }
        if config.model.as_deref().is_some_and(|model| model.trim().is_empty()) {
            return Err(format!("Profile '{name}' has an empty model."));
        }
    }

    Ok(path)
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config file '{}': {err}", path.display()))?;

    let config: ConfigFile = toml::from_str(&raw)
        .map_err(|err| format!("Failed to parse config file '{}': {err}", path.display()))?;

    config.profiles.ok_or_else(|| {
        format!(
            "Config file '{}' does not contain a [profiles] section.",
            path.display()
        )
    })
}

fn parse_image_format(raw: &str, source: &str) -> Result<ImageFormat, String> {
    ImageFormat::parse(raw)
        .ok_or_else(|| format!("Invalid {source} '{raw}'. Supported values: png, jpeg."))
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    env_value(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                format!("Invalid {name} '{raw}'. Expected a non-negative integer.")
            })
        })
        .transpose()
}

fn config_path() -> Result<PathBuf, String> {
    if let Some(path) = env_value("MM_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = env_value("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("mmchat").join("config.toml"));
    }

    let home = env::var("HOME").map_err(|_| {
        "Cannot resolve config path: set MM_CONFIG or HOME/XDG_CONFIG_HOME.".to_string()
    })?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("mmchat")
        .join("config.toml"))
}
