//! Farm-operations advice derived from a weather snapshot.

use crate::model::{ConditionCategory, WeatherData};

pub const HEAT_STRESS_C: f64 = 30.0;
pub const FROST_RISK_C: f64 = 5.0;
pub const HIGH_UV_INDEX: f64 = 6.0;
pub const HIGH_WIND_MS: f64 = 20.0;
pub const RAIN_LIKELY: f64 = 0.70;
pub const RAIN_LOOKAHEAD_HOURS: usize = 12;

/// Recommendations for the given snapshot. Rules are applied in a fixed order
/// and each appends independently.
pub fn advise(weather: &WeatherData) -> Vec<String> {
    let mut advice = Vec::new();
    let current = &weather.current;

    if current.temperature_c > HEAT_STRESS_C {
        advice.push("High temperatures may cause heat stress in crops and livestock.".to_string());
        advice.push(
            "Irrigate early in the morning or late in the evening to reduce evaporation."
                .to_string(),
        );
    }

    if current.temperature_c < FROST_RISK_C {
        advice.push("Frost risk: cover sensitive crops and seedlings overnight.".to_string());
        advice.push("Protect irrigation lines and water troughs from freezing.".to_string());
    }

    match current.condition.category {
        ConditionCategory::Clear => {
            advice.push("Good conditions for field work, planting and harvesting.".to_string());
            if current.uv_index > HIGH_UV_INDEX {
                advice.push(format!(
                    "UV index is high ({:.0}): limit midday exposure for workers and animals.",
                    current.uv_index
                ));
            }
        }
        ConditionCategory::Clouds => {
            advice.push("Cloudy conditions are suitable for most field operations.".to_string());
        }
        ConditionCategory::Rain | ConditionCategory::Drizzle => {
            advice.push(
                "Delay spraying of pesticides and fertilizers until the rain stops.".to_string(),
            );
            advice.push("Check field drainage to prevent waterlogging.".to_string());
        }
        ConditionCategory::Thunderstorm => {
            advice.push("Secure equipment and keep workers out of open fields.".to_string());
            advice.push(
                "Inspect crops and structures for damage after the storm passes.".to_string(),
            );
        }
        ConditionCategory::Snow => {
            advice.push("Protect crops and move livestock to sheltered areas.".to_string());
        }
        ConditionCategory::Mist => {
            advice.push("Delay spraying until the fog lifts to avoid uneven coverage.".to_string());
            advice.push("Reduced visibility: take care when operating machinery.".to_string());
        }
    }

    if current.wind_speed_ms > HIGH_WIND_MS {
        advice.push(
            "Strong winds: secure greenhouses and loose structures, and postpone spraying."
                .to_string(),
        );
    }

    let max_rain = weather
        .hourly
        .iter()
        .take(RAIN_LOOKAHEAD_HOURS)
        .map(|h| h.precipitation_probability)
        .fold(0.0_f64, f64::max);

    if max_rain > RAIN_LIKELY {
        advice.push(format!(
            "{}% chance of rain in the next 12 hours: plan irrigation accordingly.",
            (max_rain * 100.0).round()
        ));
    }

    advice
}
