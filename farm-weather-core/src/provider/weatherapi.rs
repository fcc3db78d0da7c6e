use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    config::Timeouts,
    model::{
        CurrentConditions, DailyForecast, DailyTemperatures, DataSource, FarmLocation,
        HourlyForecast, Location, WeatherData,
    },
    normalize::{
        clamp_percent, condition_from_text, km_to_m, kph_to_ms, normalize_degrees,
        percent_to_probability,
    },
    WeatherError,
};

use super::WeatherProvider;

const FORECAST_DAYS: u8 = 7;
const HOURLY_LIMIT: usize = 24;
const DEFAULT_VISIBILITY_KM: f64 = 10.0;

const MORNING_HOUR: usize = 8;
const EVENING_HOUR: usize = 18;
const NIGHT_HOUR: usize = 23;
const MIDDAY_HOUR: usize = 12;

/// WeatherAPI.com client.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    probe: Location,
    timeouts: Timeouts,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        probe: Location,
        timeouts: Timeouts,
    ) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(timeouts.request()).build()?;

        Ok(Self { api_key, base_url, probe, timeouts, http })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(WeatherError::Unauthorized);
        }

        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message: provider_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    #[instrument(skip(self))]
    async fn validate_key(&self) -> Result<(), WeatherError> {
        let _: serde_json::Value = self
            .get_json(
                "/v1/current.json",
                &[("q", self.probe.query())],
                self.timeouts.validation(),
            )
            .await?;

        Ok(())
    }

    #[instrument(skip(self, location), fields(location = %location.name))]
    async fn forecast(&self, location: &Location) -> Result<WeatherData, WeatherError> {
        let parsed: WaForecastResponse = self
            .get_json(
                "/v1/forecast.json",
                &[
                    ("q", location.query()),
                    ("days", FORECAST_DAYS.to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ],
                self.timeouts.request(),
            )
            .await?;

        debug!(
            provider_location = %parsed.location.name,
            days = parsed.forecast.forecastday.len(),
            "received forecast"
        );

        map_forecast(parsed, location)
    }

    async fn search(&self, query: &str) -> Result<Vec<FarmLocation>, WeatherError> {
        let results: Vec<WaSearchResult> = self
            .get_json("/v1/search.json", &[("q", query.to_string())], self.timeouts.request())
            .await?;

        Ok(results.into_iter().map(WaSearchResult::into_farm_location).collect())
    }
}

/// Map a forecast payload into [`WeatherData`].
///
/// All field guessing for this provider lives here: missing numeric fields
/// default to zero, missing visibility to 10 km, missing feels-like to the
/// air temperature, and the morning/evening/night temperatures are sampled
/// from the 08:00/18:00/23:00 hourly buckets when present.
fn map_forecast(
    resp: WaForecastResponse,
    location: &Location,
) -> Result<WeatherData, WeatherError> {
    let days = &resp.forecast.forecastday;
    if days.is_empty() {
        return Err(WeatherError::Parse("response contained no forecastday data".into()));
    }

    let anchor = resp.current.last_updated_epoch.or(resp.location.localtime_epoch);
    let current = map_current(&resp.current);
    let hourly = map_hourly(days, anchor);
    if hourly.is_empty() {
        return Err(WeatherError::Parse("response contained no hourly data".into()));
    }
    let daily = days.iter().take(FORECAST_DAYS as usize).map(map_day).collect();

    let location = if location.name.trim().is_empty() {
        Location::new(location.latitude, location.longitude, resp.location.display_name())
    } else {
        location.clone()
    };

    Ok(WeatherData { location, current, hourly, daily, source: DataSource::Live })
}

fn map_current(c: &WaCurrent) -> CurrentConditions {
    CurrentConditions {
        observed_at: c.last_updated_epoch.and_then(unix_to_utc).unwrap_or_else(Utc::now),
        temperature_c: c.temp_c,
        feels_like_c: c.feelslike_c.unwrap_or(c.temp_c),
        humidity_pct: clamp_percent(c.humidity),
        wind_speed_ms: kph_to_ms(c.wind_kph),
        wind_direction_deg: normalize_degrees(c.wind_degree),
        condition: condition_from_text(&c.condition.text, &c.condition.icon),
        uv_index: c.uv,
        visibility_m: km_to_m(c.vis_km.unwrap_or(DEFAULT_VISIBILITY_KM)),
        pressure_hpa: c.pressure_mb,
        cloud_cover_pct: clamp_percent(c.cloud),
    }
}

fn map_hourly(days: &[WaForecastDay], anchor: Option<i64>) -> Vec<HourlyForecast> {
    let all = || days.iter().flat_map(|d| d.hour.iter());

    // The hour containing `anchor` starts at most 3600s before it.
    let upcoming: Vec<&WaHour> = match anchor {
        Some(ts) => all().filter(|h| h.time_epoch > ts - 3600).take(HOURLY_LIMIT).collect(),
        None => Vec::new(),
    };

    let hours: Vec<&WaHour> = if upcoming.is_empty() {
        all().take(HOURLY_LIMIT).collect()
    } else {
        upcoming
    };

    hours
        .into_iter()
        .filter_map(|h| {
            Some(HourlyForecast {
                time: unix_to_utc(h.time_epoch)?,
                temperature_c: h.temp_c,
                condition: condition_from_text(&h.condition.text, &h.condition.icon),
                precipitation_probability: percent_to_probability(
                    h.chance_of_rain.max(h.chance_of_snow),
                ),
            })
        })
        .collect()
}

fn map_day(d: &WaForecastDay) -> DailyForecast {
    let day = &d.day;
    let hour_temp = |idx: usize| d.hour.get(idx).map(|h| h.temp_c);

    DailyForecast {
        date: unix_to_utc(d.date_epoch).unwrap_or_else(Utc::now),
        temperature: DailyTemperatures {
            min: day.mintemp_c,
            max: day.maxtemp_c,
            day: day.avgtemp_c,
            night: hour_temp(NIGHT_HOUR).unwrap_or(day.mintemp_c),
            evening: hour_temp(EVENING_HOUR).unwrap_or(day.avgtemp_c),
            morning: hour_temp(MORNING_HOUR).unwrap_or(day.avgtemp_c),
        },
        condition: condition_from_text(&day.condition.text, &day.condition.icon),
        precipitation_probability: percent_to_probability(day.daily_chance_of_rain),
        humidity_pct: clamp_percent(day.avghumidity),
        wind_speed_ms: kph_to_ms(day.maxwind_kph),
        wind_direction_deg: d
            .hour
            .get(MIDDAY_HOUR)
            .map(|h| normalize_degrees(h.wind_degree))
            .unwrap_or(0),
        rain_mm: day.totalprecip_mm,
        snow_cm: day.totalsnow_cm,
    }
}

/// Pull `error.message` out of a WeatherAPI error body, or fall back to the
/// (truncated) raw body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<WaErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| truncate_body(body))
}

#[derive(Debug, Deserialize)]
struct WaErrorBody {
    error: WaErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WaErrorDetail {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaLocation {
    name: String,
    region: String,
    country: String,
    localtime_epoch: Option<i64>,
}

impl WaLocation {
    fn display_name(&self) -> String {
        [&self.name, &self.region, &self.country]
            .into_iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCondition {
    text: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCurrent {
    last_updated_epoch: Option<i64>,
    temp_c: f64,
    feelslike_c: Option<f64>,
    humidity: f64,
    wind_kph: f64,
    wind_degree: f64,
    condition: WaCondition,
    uv: f64,
    vis_km: Option<f64>,
    pressure_mb: f64,
    cloud: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaHour {
    time_epoch: i64,
    temp_c: f64,
    condition: WaCondition,
    chance_of_rain: f64,
    chance_of_snow: f64,
    wind_degree: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaDay {
    maxtemp_c: f64,
    mintemp_c: f64,
    avgtemp_c: f64,
    maxwind_kph: f64,
    avghumidity: f64,
    daily_chance_of_rain: f64,
    totalprecip_mm: f64,
    totalsnow_cm: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date_epoch: i64,
    #[serde(default)]
    day: WaDay,
    #[serde(default)]
    hour: Vec<WaHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    #[serde(default)]
    location: WaLocation,
    current: WaCurrent,
    forecast: WaForecast,
}

#[derive(Debug, Deserialize)]
struct WaSearchResult {
    id: Option<i64>,
    name: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    lat: f64,
    lon: f64,
}

impl WaSearchResult {
    fn into_farm_location(self) -> FarmLocation {
        let id = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("{},{}", self.lat, self.lon));

        FarmLocation {
            id,
            name: self.name,
            region: self.region,
            country: self.country,
            latitude: self.lat,
            longitude: self.lon,
        }
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConditionCategory;
    use serde_json::json;

    const DAY0: i64 = 1_700_006_400; // 2023-11-15T00:00:00Z

    const CLOUDY_ICON: &str = "//cdn.weatherapi.com/weather/64x64/day/116.png";
    const RAIN_ICON: &str = "//cdn.weatherapi.com/weather/64x64/day/302.png";

    fn hour(idx: i64, temp: f64, text: &str, rain: f64) -> serde_json::Value {
        json!({
            "time_epoch": DAY0 + idx * 3600,
            "temp_c": temp,
            "condition": { "text": text, "icon": CLOUDY_ICON },
            "chance_of_rain": rain,
            "chance_of_snow": 0,
            "wind_degree": 90 + idx
        })
    }

    fn sample(hours: usize) -> serde_json::Value {
        let hours: Vec<_> =
            (0..hours as i64).map(|i| hour(i, 10.0 + i as f64, "Partly cloudy", 20.0)).collect();
        json!({
            "location": {
                "name": "Nakuru",
                "region": "Nakuru",
                "country": "Kenya",
                "localtime_epoch": DAY0 + 5 * 3600
            },
            "current": {
                "last_updated_epoch": DAY0 + 5 * 3600 + 900,
                "temp_c": 21.0,
                "feelslike_c": 20.0,
                "humidity": 64,
                "wind_kph": 36.0,
                "wind_degree": 200,
                "condition": { "text": "Partly cloudy", "icon": CLOUDY_ICON },
                "uv": 7.0,
                "vis_km": 8.5,
                "pressure_mb": 1016.0,
                "cloud": 40
            },
            "forecast": {
                "forecastday": [{
                    "date_epoch": DAY0,
                    "day": {
                        "maxtemp_c": 27.0,
                        "mintemp_c": 12.0,
                        "avgtemp_c": 19.0,
                        "maxwind_kph": 18.0,
                        "avghumidity": 70,
                        "daily_chance_of_rain": 85,
                        "totalprecip_mm": 4.2,
                        "totalsnow_cm": 0.0,
                        "condition": { "text": "Moderate rain", "icon": RAIN_ICON }
                    },
                    "hour": hours
                }]
            }
        })
    }

    /// `count` consecutive days of 24 hours each, current as of `anchor`.
    fn several_days(count: i64, anchor: i64) -> serde_json::Value {
        let mut value = sample(24);
        let template = value["forecast"]["forecastday"][0].clone();

        let days: Vec<_> = (0..count)
            .map(|d| {
                let mut day = template.clone();
                day["date_epoch"] = json!(DAY0 + d * 86_400);
                day["hour"] = (d * 24..d * 24 + 24).map(|i| hour(i, 15.0, "Sunny", 0.0)).collect();
                day
            })
            .collect();

        value["forecast"]["forecastday"] = json!(days);
        value["current"]["last_updated_epoch"] = json!(anchor);
        value
    }

    fn parse(value: serde_json::Value) -> WaForecastResponse {
        serde_json::from_value(value).expect("sample should deserialize")
    }

    fn here() -> Location {
        Location::new(-0.3031, 36.08, "Nakuru Farm")
    }

    #[test]
    fn current_conditions_are_normalized() {
        let data = map_forecast(parse(sample(24)), &here()).unwrap();
        let c = &data.current;

        assert!((c.wind_speed_ms - 10.0).abs() < 1e-9);
        assert_eq!(c.condition.category, ConditionCategory::Clouds);
        assert_eq!(c.condition.legacy_id, 801);
        assert_eq!(c.condition.icon, "116");
        assert_eq!(c.visibility_m, 8500.0);
        assert_eq!(c.humidity_pct, 64);
        assert_eq!(c.wind_direction_deg, 200);
        assert_eq!(c.feels_like_c, 20.0);
        assert_eq!(data.source, DataSource::Live);
        assert_eq!(data.location.name, "Nakuru Farm");
    }

    #[test]
    fn daily_temperatures_sample_hour_buckets() {
        let data = map_forecast(parse(sample(24)), &here()).unwrap();
        let t = &data.daily[0].temperature;

        assert_eq!(t.morning, 18.0);
        assert_eq!(t.evening, 28.0);
        assert_eq!(t.night, 33.0);
        assert_eq!(t.day, 19.0);
        assert_eq!(data.daily[0].condition.category, ConditionCategory::Rain);
        assert_eq!(data.daily[0].precipitation_probability, 0.85);
        assert!((data.daily[0].wind_speed_ms - 5.0).abs() < 1e-9);
        assert_eq!(data.daily[0].wind_direction_deg, 102);
    }

    #[test]
    fn daily_temperatures_fall_back_without_hours() {
        let data = map_forecast(parse(sample(6)), &here()).unwrap();
        let t = &data.daily[0].temperature;

        assert_eq!(t.morning, 19.0);
        assert_eq!(t.evening, 19.0);
        assert_eq!(t.night, 12.0);
        assert_eq!(data.daily[0].wind_direction_deg, 0);
    }

    #[test]
    fn hourly_starts_at_current_hour() {
        let data = map_forecast(parse(sample(24)), &here()).unwrap();

        assert_eq!(data.hourly.len(), 19);
        assert_eq!(data.hourly[0].time.timestamp(), DAY0 + 5 * 3600);
        assert_eq!(data.hourly[0].precipitation_probability, 0.2);
    }

    #[test]
    fn hourly_window_runs_into_the_next_day() {
        let anchor = DAY0 + 12 * 3600 + 1800;
        let data = map_forecast(parse(several_days(2, anchor)), &here()).unwrap();

        assert_eq!(data.hourly.len(), 24);
        assert_eq!(data.hourly[0].time.timestamp(), DAY0 + 12 * 3600);
        assert_eq!(data.hourly[12].time.timestamp(), DAY0 + 86_400);
        assert_eq!(data.hourly[23].time.timestamp(), DAY0 + 35 * 3600);
        assert_eq!(data.daily.len(), 2);
    }

    #[test]
    fn daily_is_capped_at_seven_days() {
        let data = map_forecast(parse(several_days(9, DAY0)), &here()).unwrap();

        assert_eq!(data.daily.len(), 7);
        assert_eq!(data.daily[6].date.timestamp(), DAY0 + 6 * 86_400);
        assert_eq!(data.hourly.len(), 24);
        assert_eq!(data.hourly[0].time.timestamp(), DAY0);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let mut value = sample(24);
        value["current"] = json!({ "temp_c": 15.5 });
        let data = map_forecast(parse(value), &here()).unwrap();

        assert_eq!(data.current.feels_like_c, 15.5);
        assert_eq!(data.current.visibility_m, 10_000.0);
        assert_eq!(data.current.condition.category, ConditionCategory::Clear);
        assert_eq!(data.current.condition.icon, "113");
        // no anchor on current, but location.localtime_epoch still is one
        assert_eq!(data.hourly[0].time.timestamp(), DAY0 + 5 * 3600);
    }

    #[test]
    fn empty_forecast_is_parse_error() {
        let mut value = sample(24);
        value["forecast"]["forecastday"] = json!([]);
        let err = map_forecast(parse(value), &here()).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn no_hours_is_parse_error() {
        let err = map_forecast(parse(sample(0)), &here()).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn blank_location_name_takes_provider_name() {
        let data = map_forecast(parse(sample(24)), &Location::new(-0.3, 36.1, "")).unwrap();
        assert_eq!(data.location.name, "Nakuru, Nakuru, Kenya");
    }

    #[test]
    fn provider_message_extracts_error_text() {
        let body = r#"{"error":{"code":2008,"message":"API key has been disabled."}}"#;
        assert_eq!(provider_message(body), "API key has been disabled.");
        assert_eq!(provider_message("gateway down"), "gateway down");
    }

    #[test]
    fn truncate_body_is_char_safe() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }

    #[test]
    fn search_result_without_id_uses_coordinates() {
        let r: WaSearchResult =
            serde_json::from_value(json!({ "name": "Kitale", "lat": 1.02, "lon": 35.0 })).unwrap();
        let farm = r.into_farm_location();
        assert_eq!(farm.id, "1.02,35");
        assert_eq!(farm.country, "");
    }
}
