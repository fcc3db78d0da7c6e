use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Location;

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "WEATHERAPI_KEY";

/// Base URLs for every external service. Overridable so tests can point
/// them at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub weather_api: String,
    pub reverse_geocode: String,
    pub ip_primary: String,
    pub ip_secondary: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather_api: "https://api.weatherapi.com".to_string(),
            reverse_geocode: "https://nominatim.openstreetmap.org".to_string(),
            ip_primary: "https://ipapi.co".to_string(),
            ip_secondary: "https://ipwho.is".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Key validation probe.
    pub validation_secs: u64,
    /// Forecast, search, reverse geocode and IP lookups.
    pub request_secs: u64,
    /// Device geolocation.
    pub geolocation_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { validation_secs: 5, request_secs: 10, geolocation_secs: 10 }
    }
}

impl Timeouts {
    pub fn validation(&self) -> Duration {
        Duration::from_secs(self.validation_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn geolocation(&self) -> Duration {
        Duration::from_secs(self.geolocation_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NamedPoint {
    pub fn to_location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.name.clone())
    }
}

/// Default used when the runtime's timezone or language points at a known
/// region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalDefault {
    #[serde(flatten)]
    pub point: NamedPoint,
    /// IANA timezone names, matched exactly.
    pub timezones: Vec<String>,
    /// Language tags, matched as prefixes (`sw` matches `sw_KE.UTF-8`).
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackLocations {
    pub regional: RegionalDefault,
    pub global: NamedPoint,
    /// Coordinates used for the key validation probe.
    pub probe: NamedPoint,
}

impl Default for FallbackLocations {
    fn default() -> Self {
        Self {
            regional: RegionalDefault {
                point: NamedPoint {
                    name: "Nairobi, Kenya".to_string(),
                    latitude: -1.2921,
                    longitude: 36.8219,
                },
                timezones: vec![
                    "Africa/Nairobi".to_string(),
                    "Africa/Kampala".to_string(),
                    "Africa/Dar_es_Salaam".to_string(),
                    "Africa/Addis_Ababa".to_string(),
                ],
                languages: vec!["sw".to_string(), "en-KE".to_string()],
            },
            global: NamedPoint {
                name: "London, United Kingdom".to_string(),
                latitude: 51.5074,
                longitude: -0.1278,
            },
            probe: NamedPoint {
                name: "London".to_string(),
                latitude: 51.5074,
                longitude: -0.1278,
            },
        }
    }
}

/// Fixed device position, standing in for GPS on hosts without one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DeviceConfig {
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WeatherAPI.com key. `WEATHERAPI_KEY` takes precedence when set.
    pub api_key: Option<String>,

    /// Sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: String,

    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    pub fallback: FallbackLocations,
    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            user_agent: concat!("farm-weather/", env!("CARGO_PKG_VERSION")).to_string(),
            endpoints: Endpoints::default(),
            timeouts: Timeouts::default(),
            fallback: FallbackLocations::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Load config from disk (or defaults on first run) and apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env_key(std::env::var(API_KEY_ENV).ok());
        Ok(cfg)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "farm-dashboard", "farm-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// A non-blank environment value replaces the stored key.
    pub fn apply_env_key(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    /// Returns the API key if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }
}
