//! Unit conversions and condition-text classification.

use crate::model::{ConditionCategory, WeatherCondition};

/// Icon code used when the provider omits one or sends something unparseable.
pub const DEFAULT_ICON: &str = "113";

/// Ordered keyword table. The first keyword found in the condition text wins,
/// so "Thundery rain" is a thunderstorm, not rain.
const CONDITION_KEYWORDS: &[(&str, ConditionCategory, u16)] = &[
    ("thunder", ConditionCategory::Thunderstorm, 200),
    ("drizzle", ConditionCategory::Drizzle, 300),
    ("rain", ConditionCategory::Rain, 500),
    ("snow", ConditionCategory::Snow, 600),
    ("mist", ConditionCategory::Mist, 700),
    ("fog", ConditionCategory::Mist, 700),
    ("clear", ConditionCategory::Clear, 800),
    ("sunny", ConditionCategory::Clear, 800),
    ("cloud", ConditionCategory::Clouds, 801),
    ("overcast", ConditionCategory::Clouds, 804),
];

pub fn kph_to_ms(kph: f64) -> f64 {
    kph / 3.6
}

pub fn ms_to_kph(ms: f64) -> f64 {
    ms * 3.6
}

pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Classify free-text condition into a category and legacy numeric id.
pub fn categorize(text: &str) -> (ConditionCategory, u16) {
    let lower = text.to_lowercase();

    CONDITION_KEYWORDS
        .iter()
        .find(|(keyword, _, _)| lower.contains(keyword))
        .map(|&(_, category, id)| (category, id))
        .unwrap_or((ConditionCategory::Clear, 800))
}

/// Extract the icon code from a provider icon URL such as
/// `//cdn.weatherapi.com/weather/64x64/day/116.png`.
pub fn icon_code(icon_url: &str) -> String {
    icon_url
        .rsplit('/')
        .next()
        .and_then(|file| file.strip_suffix(".png"))
        .filter(|stem| !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_ICON.to_string())
}

pub fn condition_from_text(text: &str, icon_url: &str) -> WeatherCondition {
    let (category, legacy_id) = categorize(text);
    let description = if text.trim().is_empty() {
        category.as_str().to_string()
    } else {
        text.trim().to_string()
    };

    WeatherCondition { category, legacy_id, description, icon: icon_code(icon_url) }
}

/// Provider percentages (0..=100) to a probability (0.0..=1.0).
pub fn percent_to_probability(pct: f64) -> f64 {
    (pct / 100.0).clamp(0.0, 1.0)
}

/// Normalize degrees into 0..=359.
pub fn normalize_degrees(deg: f64) -> u16 {
    deg.rem_euclid(360.0).round() as u16 % 360
}

pub fn clamp_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_keyword_wins() {
        let (cat, id) = categorize("Heavy Thunderstorm with Rain");
        assert_eq!(cat, ConditionCategory::Thunderstorm);
        assert_eq!(id, 200);
    }

    #[test]
    fn drizzle_beats_rain() {
        assert_eq!(categorize("Freezing drizzle and rain").0, ConditionCategory::Drizzle);
    }

    #[test]
    fn keyword_table() {
        assert_eq!(categorize("Patchy light rain"), (ConditionCategory::Rain, 500));
        assert_eq!(categorize("Blowing snow"), (ConditionCategory::Snow, 600));
        assert_eq!(categorize("Freezing fog"), (ConditionCategory::Mist, 700));
        assert_eq!(categorize("Mist"), (ConditionCategory::Mist, 700));
        assert_eq!(categorize("Sunny"), (ConditionCategory::Clear, 800));
        assert_eq!(categorize("Partly cloudy"), (ConditionCategory::Clouds, 801));
        assert_eq!(categorize("Overcast"), (ConditionCategory::Clouds, 804));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(categorize("CLEAR").0, ConditionCategory::Clear);
        assert_eq!(categorize("tHuNdEr").0, ConditionCategory::Thunderstorm);
    }

    #[test]
    fn unmatched_is_clear() {
        assert_eq!(categorize("Haze"), (ConditionCategory::Clear, 800));
        assert_eq!(categorize(""), (ConditionCategory::Clear, 800));
    }

    #[test]
    fn kph_round_trip() {
        for kph in [0.0, 1.0, 36.0, 123.456, 250.0] {
            assert!((ms_to_kph(kph_to_ms(kph)) - kph).abs() < 1e-6);
        }
        assert!((kph_to_ms(36.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn visibility_to_metres() {
        assert_eq!(km_to_m(10.0), 10_000.0);
    }

    #[test]
    fn temperature_round_trip() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 1e-9);
        assert!((fahrenheit_to_celsius(celsius_to_fahrenheit(21.5)) - 21.5).abs() < 1e-9);
    }

    #[test]
    fn icon_from_url() {
        assert_eq!(icon_code("//cdn.weatherapi.com/weather/64x64/day/116.png"), "116");
        assert_eq!(icon_code("//cdn.weatherapi.com/weather/64x64/night/weird.png"), DEFAULT_ICON);
        assert_eq!(icon_code(""), DEFAULT_ICON);
    }

    #[test]
    fn blank_description_uses_category() {
        let cond = condition_from_text("  ", "");
        assert_eq!(cond.description, "Clear");
        assert_eq!(cond.icon, DEFAULT_ICON);
    }

    #[test]
    fn degrees_and_percent_helpers() {
        assert_eq!(normalize_degrees(360.0), 0);
        assert_eq!(normalize_degrees(-90.0), 270);
        assert_eq!(normalize_degrees(359.6), 0);
        assert_eq!(clamp_percent(104.0), 100);
        assert_eq!(percent_to_probability(85.0), 0.85);
        assert_eq!(percent_to_probability(150.0), 1.0);
    }
}
