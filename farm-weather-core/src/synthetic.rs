//! Deterministic placeholder weather used whenever live data is unavailable.
//!
//! The output depends only on the location and the anchor time, so callers
//! always get shape-correct data (24 hourly, 7 daily entries) even offline.

use chrono::{DateTime, Duration, DurationRound, Utc};
use std::f64::consts::PI;

use crate::{
    model::{
        ConditionCategory, CurrentConditions, DailyForecast, DailyTemperatures, DataSource,
        HourlyForecast, Location, WeatherCondition, WeatherData,
    },
    normalize::categorize,
};

pub const HOURLY_LEN: usize = 24;
pub const DAILY_LEN: usize = 7;

const EQUATORIAL_LAT: f64 = 10.0;
const EQUATORIAL_BASELINE_C: f64 = 26.0;
const TEMPERATE_BASELINE_C: f64 = 18.0;
const DIURNAL_AMPLITUDE_C: f64 = 6.0;

const DAILY_PATTERN: [(&str, &str); DAILY_LEN] = [
    ("Sunny", "113"),
    ("Partly cloudy", "116"),
    ("Moderate rain", "302"),
    ("Sunny", "113"),
    ("Overcast", "122"),
    ("Light drizzle", "266"),
    ("Sunny", "113"),
];

pub fn baseline_temperature(location: &Location) -> f64 {
    if location.latitude.abs() <= EQUATORIAL_LAT {
        EQUATORIAL_BASELINE_C
    } else {
        TEMPERATE_BASELINE_C
    }
}

pub fn generate_now(location: &Location) -> WeatherData {
    generate(location, Utc::now())
}

pub fn generate(location: &Location, anchor: DateTime<Utc>) -> WeatherData {
    let base = baseline_temperature(location);
    let start = anchor.duration_trunc(Duration::hours(1)).unwrap_or(anchor);

    let hourly = (0..HOURLY_LEN).map(|h| hourly_entry(base, start, h)).collect();
    let daily = (0..DAILY_LEN).map(|d| daily_entry(base, start, d)).collect();

    let current = CurrentConditions {
        observed_at: start,
        temperature_c: base,
        feels_like_c: base + 1.0,
        humidity_pct: 65,
        wind_speed_ms: 3.5,
        wind_direction_deg: 90,
        condition: condition("Partly cloudy", "116"),
        uv_index: if base > TEMPERATE_BASELINE_C { 7.0 } else { 4.0 },
        visibility_m: 10_000.0,
        pressure_hpa: 1013.0,
        cloud_cover_pct: 40,
    };

    WeatherData {
        location: location.clone(),
        current,
        hourly,
        daily,
        source: DataSource::Synthetic,
    }
}

fn hourly_entry(base: f64, start: DateTime<Utc>, h: usize) -> HourlyForecast {
    let phase = 2.0 * PI * (h as f64 - 9.0) / 24.0;
    let rainy = h % 5 == 0;

    HourlyForecast {
        time: start + Duration::hours(h as i64),
        temperature_c: round1(base + DIURNAL_AMPLITUDE_C * phase.sin()),
        condition: if rainy { condition("Light rain", "296") } else { condition("Sunny", "113") },
        precipitation_probability: if rainy { 0.6 } else { 0.1 },
    }
}

fn daily_entry(base: f64, start: DateTime<Utc>, d: usize) -> DailyForecast {
    let (text, icon) = DAILY_PATTERN[d % DAILY_LEN];
    let cond = condition(text, icon);
    let spread = (d % 3) as f64;

    let (precipitation_probability, rain_mm) = match cond.category {
        ConditionCategory::Rain => (0.8, 6.0),
        ConditionCategory::Drizzle => (0.5, 1.5),
        _ => (0.1, 0.0),
    };

    let min = base - 7.0 + spread;
    let max = base + 5.0 + spread;

    DailyForecast {
        date: start.duration_trunc(Duration::days(1)).unwrap_or(start) + Duration::days(d as i64),
        temperature: DailyTemperatures {
            min,
            max,
            day: base + spread,
            night: min + 1.0,
            evening: base + spread - 2.0,
            morning: min + 3.0,
        },
        condition: cond,
        precipitation_probability,
        humidity_pct: 60 + (d as u8 % 3) * 5,
        wind_speed_ms: 3.0 + spread,
        wind_direction_deg: (90 + d as u16 * 30) % 360,
        rain_mm,
        snow_cm: 0.0,
    }
}

fn condition(text: &str, icon: &str) -> WeatherCondition {
    let (category, legacy_id) = categorize(text);
    WeatherCondition {
        category,
        legacy_id,
        description: text.to_string(),
        icon: icon.to_string(),
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
