use std::fs;

use crate::{
    Location,
    config::{FallbackLocations, RegionalDefault},
};

/// Timezone and language of the running process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleHints {
    pub timezone: Option<String>,
    pub language: Option<String>,
}

impl LocaleHints {
    /// Read `TZ` (falling back to `/etc/timezone`) and `LC_ALL` / `LANG`.
    pub fn from_env() -> Self {
        let timezone = non_empty(std::env::var("TZ").ok())
            .map(|tz| tz.trim_start_matches(':').to_string())
            .or_else(|| non_empty(fs::read_to_string("/etc/timezone").ok()));

        let language = non_empty(std::env::var("LC_ALL").ok())
            .or_else(|| non_empty(std::env::var("LANG").ok()));

        Self { timezone, language }
    }

    pub fn matches(&self, region: &RegionalDefault) -> bool {
        let tz_match = self
            .timezone
            .as_deref()
            .is_some_and(|tz| region.timezones.iter().any(|t| t == tz));

        let lang_match = self.language.as_deref().map(normalize_language).is_some_and(|lang| {
            region.languages.iter().any(|pref| {
                let pref = normalize_language(pref);
                lang == pref || lang.starts_with(&format!("{pref}-"))
            })
        });

        tz_match || lang_match
    }
}

/// `en_KE.UTF-8` -> `en-ke`
fn normalize_language(tag: &str) -> String {
    tag.split(['.', '@']).next().unwrap_or_default().replace('_', "-").to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Regional default when the hints match the configured region, global
/// default otherwise.
pub fn locale_default(hints: &LocaleHints, fallback: &FallbackLocations) -> Location {
    if hints.matches(&fallback.regional) {
        fallback.regional.point.to_location()
    } else {
        fallback.global.to_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(tz: Option<&str>, lang: Option<&str>) -> LocaleHints {
        LocaleHints { timezone: tz.map(Into::into), language: lang.map(Into::into) }
    }

    #[test]
    fn nairobi_timezone_picks_regional_default() {
        let hints = hints(Some("Africa/Nairobi"), None);
        let loc = locale_default(&hints, &FallbackLocations::default());
        assert_eq!((loc.latitude, loc.longitude), (-1.2921, 36.8219));
        assert!(loc.name.contains("Nairobi"));
    }

    #[test]
    fn swahili_locale_picks_regional_default() {
        let fallback = FallbackLocations::default();
        assert!(hints(None, Some("sw_KE.UTF-8")).matches(&fallback.regional));
        assert!(hints(None, Some("en_KE.UTF-8")).matches(&fallback.regional));
        assert!(!hints(None, Some("en_US.UTF-8")).matches(&fallback.regional));
        assert!(!hints(None, Some("swedish")).matches(&fallback.regional));
    }

    #[test]
    fn unknown_region_picks_global_default() {
        let fallback = FallbackLocations::default();
        let loc = locale_default(&hints(Some("Europe/Berlin"), Some("de_DE.UTF-8")), &fallback);
        assert_eq!(loc, fallback.global.to_location());
    }

    #[test]
    fn no_hints_picks_global_default() {
        let fallback = FallbackLocations::default();
        assert_eq!(
            locale_default(&LocaleHints::default(), &fallback),
            fallback.global.to_location()
        );
    }

    #[test]
    fn language_normalization() {
        assert_eq!(normalize_language("en_KE.UTF-8"), "en-ke");
        assert_eq!(normalize_language("sw@latin"), "sw");
        assert_eq!(normalize_language("C"), "c");
    }
}
