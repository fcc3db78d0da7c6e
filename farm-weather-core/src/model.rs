use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved geographic point with a best-effort display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self { latitude, longitude, name: name.into() }
    }

    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Query string accepted by the forecast provider (`lat,lon`).
    pub fn query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A location returned by the provider's search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmLocation {
    pub id: String,
    pub name: String,
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl FarmLocation {
    pub fn display_name(&self) -> String {
        [&self.name, &self.region, &self.country]
            .into_iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionCategory {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Snow,
    Thunderstorm,
    Mist,
}

impl ConditionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionCategory::Clear => "Clear",
            ConditionCategory::Clouds => "Clouds",
            ConditionCategory::Rain => "Rain",
            ConditionCategory::Drizzle => "Drizzle",
            ConditionCategory::Snow => "Snow",
            ConditionCategory::Thunderstorm => "Thunderstorm",
            ConditionCategory::Mist => "Mist",
        }
    }
}

impl std::fmt::Display for ConditionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub category: ConditionCategory,
    /// OpenWeather-style numeric id (200, 300, ..., 804). Kept for icon
    /// compatibility only.
    pub legacy_id: u16,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub observed_at: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub wind_direction_deg: u16,
    pub condition: WeatherCondition,
    pub uv_index: f64,
    pub visibility_m: f64,
    pub pressure_hpa: f64,
    pub cloud_cover_pct: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub condition: WeatherCondition,
    /// Probability of precipitation, 0.0..=1.0.
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperatures {
    pub min: f64,
    pub max: f64,
    pub day: f64,
    pub night: f64,
    pub evening: f64,
    pub morning: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: DateTime<Utc>,
    pub temperature: DailyTemperatures,
    pub condition: WeatherCondition,
    pub precipitation_probability: f64,
    pub humidity_pct: u8,
    pub wind_speed_ms: f64,
    pub wind_direction_deg: u16,
    pub rain_mm: f64,
    pub snow_cm: f64,
}

/// Where a `WeatherData` snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Synthetic,
}

impl DataSource {
    pub fn is_live(&self) -> bool {
        matches!(self, DataSource::Live)
    }
}

/// Provider-agnostic weather snapshot.
///
/// `hourly` and `daily` are never empty: when live data is unavailable they
/// are filled by [`crate::synthetic::generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub location: Location,
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyStatus {
    pub valid: bool,
    pub message: String,
}

impl ApiKeyStatus {
    pub fn valid() -> Self {
        Self { valid: true, message: "API key is valid".to_string() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self { valid: false, message: message.into() }
    }
}

/// Result of a full resolution: key probe, location chain and fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResolution {
    pub api_key_status: ApiKeyStatus,
    pub location: Location,
    pub weather: WeatherData,
    pub source: DataSource,
}
