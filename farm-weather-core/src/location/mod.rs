//! Location resolution: an ordered chain of strategies that always ends in a
//! concrete [`Location`].

use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, info, warn};

use crate::{Config, Location, LocationError, config::FallbackLocations};

pub mod device;
pub mod ip;
pub mod locale;
pub mod reverse;

pub use device::{DevicePosition, DeviceStrategy, FixedPosition, NoDevice, device_from_position};
pub use ip::{IpService, IpStrategy};
pub use locale::LocaleHints;
pub use reverse::ReverseGeocoder;

/// One way of finding out where the user is.
#[async_trait]
pub trait LocationStrategy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn locate(&self) -> Result<Location, LocationError>;
}

/// Strategies tried strictly in order; the first `Ok` wins. When every
/// strategy fails the locale heuristic picks a configured default.
#[derive(Debug)]
pub struct LocationChain {
    strategies: Vec<Box<dyn LocationStrategy>>,
    hints: LocaleHints,
    fallback: FallbackLocations,
}

impl LocationChain {
    pub fn new(
        strategies: Vec<Box<dyn LocationStrategy>>,
        hints: LocaleHints,
        fallback: FallbackLocations,
    ) -> Self {
        Self { strategies, hints, fallback }
    }

    /// Device geolocation, then IP geolocation, then the locale heuristic.
    pub fn from_config(
        config: &Config,
        device: Box<dyn DevicePosition>,
    ) -> Result<Self, LocationError> {
        let geocoder = ReverseGeocoder::new(
            config.endpoints.reverse_geocode.clone(),
            &config.user_agent,
            config.timeouts.request(),
        )?;

        let strategies: Vec<Box<dyn LocationStrategy>> = vec![
            Box::new(DeviceStrategy::new(device, geocoder, config.timeouts.geolocation())),
            Box::new(IpStrategy::from_config(config)?),
        ];

        Ok(Self::new(strategies, LocaleHints::from_env(), config.fallback.clone()))
    }

    pub fn with_hints(mut self, hints: LocaleHints) -> Self {
        self.hints = hints;
        self
    }

    pub async fn resolve(&self) -> Location {
        for strategy in &self.strategies {
            debug!(strategy = strategy.name(), "trying location strategy");

            match strategy.locate().await {
                Ok(location) if location.has_valid_coordinates() => {
                    info!(
                        strategy = strategy.name(),
                        name = %location.name,
                        lat = location.latitude,
                        lon = location.longitude,
                        "resolved location"
                    );
                    return location;
                }
                Ok(location) => {
                    warn!(
                        strategy = strategy.name(),
                        lat = location.latitude,
                        lon = location.longitude,
                        "strategy returned out-of-range coordinates"
                    );
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "location strategy failed");
                }
            }
        }

        let location = locale::locale_default(&self.hints, &self.fallback);
        info!(name = %location.name, "using locale default location");
        location
    }
}

/// Join place-name parts with `", "`, skipping blanks and repeats
/// ("Nairobi, Nairobi County, Kenya" rather than "Nairobi, Nairobi, ...").
pub(crate) fn join_place_parts<'a>(
    parts: impl IntoIterator<Item = Option<&'a str>>,
) -> Option<String> {
    let mut seen: Vec<&str> = Vec::new();

    for part in parts.into_iter().flatten().map(str::trim) {
        if !part.is_empty() && !seen.iter().any(|s| s.eq_ignore_ascii_case(part)) {
            seen.push(part);
        }
    }

    if seen.is_empty() { None } else { Some(seen.join(", ")) }
}
