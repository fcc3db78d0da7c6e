//! Top-level orchestration: key probe, location chain, live fetch with
//! synthetic fallback.

use futures::future::join_all;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::{
    ApiKeyStatus, Config, FarmLocation, Location, LocationError, WeatherData, WeatherError,
    WeatherResolution,
    config::API_KEY_ENV,
    location::{LocationChain, device_from_position},
    provider::{WeatherProvider, provider_from_config},
    synthetic,
};

#[derive(Debug)]
pub struct WeatherService {
    provider: Option<Arc<dyn WeatherProvider>>,
    chain: LocationChain,
    key_status: OnceCell<ApiKeyStatus>,
}

impl WeatherService {
    /// Build the service from config. A missing key is not an error: the
    /// service then serves synthetic data.
    pub fn from_config(config: &Config) -> Result<Self, LocationError> {
        let device = device_from_position(config.device.position());
        let chain = LocationChain::from_config(config, device)?;
        Ok(Self::new(config, chain))
    }

    pub fn new(config: &Config, chain: LocationChain) -> Self {
        let provider = match provider_from_config(config) {
            Ok(provider) => Some(provider),
            Err(WeatherError::MissingApiKey) => {
                info!("{API_KEY_ENV} is not configured; using simulated weather data");
                None
            }
            Err(err) => {
                warn!(error = %err, "failed to initialise weather provider");
                None
            }
        };

        Self::with_provider(provider, chain)
    }

    pub fn with_provider(provider: Option<Arc<dyn WeatherProvider>>, chain: LocationChain) -> Self {
        Self { provider, chain, key_status: OnceCell::new() }
    }

    /// Probe the provider and remember the answer for the lifetime of the
    /// service. Transient failures are reported but not remembered, so the
    /// next call probes again.
    pub async fn validate_api_key(&self) -> ApiKeyStatus {
        match self.key_status.get_or_try_init(|| self.probe_key()).await {
            Ok(status) => status.clone(),
            Err(transient) => transient,
        }
    }

    /// `Err` carries a status that must not be cached.
    async fn probe_key(&self) -> Result<ApiKeyStatus, ApiKeyStatus> {
        let Some(provider) = &self.provider else {
            return Ok(key_status_from_error(&WeatherError::MissingApiKey));
        };

        match provider.validate_key().await {
            Ok(()) => Ok(ApiKeyStatus::valid()),
            Err(err) if err.is_transient() => {
                warn!(error = %err, "API key probe did not get through, will retry");
                Err(key_status_from_error(&err))
            }
            Err(err) => {
                warn!(error = %err, "API key validation failed");
                Ok(key_status_from_error(&err))
            }
        }
    }

    pub async fn resolve_location(&self) -> Location {
        self.chain.resolve().await
    }

    /// Live forecast for `location`, or synthetic data if anything goes wrong.
    #[instrument(skip(self, location), fields(location = %location.name))]
    pub async fn fetch(&self, location: &Location) -> WeatherData {
        let Some(provider) = &self.provider else {
            debug!("no API key, returning synthetic data");
            return synthetic::generate_now(location);
        };

        if !location.has_valid_coordinates() {
            warn!(lat = location.latitude, lon = location.longitude, "invalid coordinates");
            return synthetic::generate_now(location);
        }

        match provider.forecast(location).await {
            Ok(data) => {
                info!("fetched live forecast");
                data
            }
            Err(err) => {
                warn!(error = %err, "forecast failed, returning synthetic data");
                synthetic::generate_now(location)
            }
        }
    }

    /// Fetch every location concurrently. A failing location gets synthetic
    /// data; the others are unaffected. Keyed by [`FarmLocation::id`].
    pub async fn fetch_many(&self, farms: &[FarmLocation]) -> HashMap<String, WeatherData> {
        let fetches = farms.iter().map(|farm| async move {
            let data = self.fetch(&farm.to_location()).await;
            (farm.id.clone(), data)
        });

        join_all(fetches).await.into_iter().collect()
    }

    /// Location suggestions for a free-text query. Empty on any failure.
    pub async fn search_locations(&self, query: &str) -> Vec<FarmLocation> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let Some(provider) = &self.provider else {
            debug!("no API key, location search unavailable");
            return Vec::new();
        };

        match provider.search(query).await {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, %query, "location search failed");
                Vec::new()
            }
        }
    }

    /// Validate the key, resolve a location, fetch weather for it.
    pub async fn resolve(&self) -> WeatherResolution {
        let api_key_status = self.validate_api_key().await;
        let location = self.resolve_location().await;

        let weather = if api_key_status.valid {
            self.fetch(&location).await
        } else {
            debug!(reason = %api_key_status.message, "skipping live fetch");
            synthetic::generate_now(&location)
        };

        WeatherResolution { api_key_status, location, source: weather.source, weather }
    }
}

/// Human-readable key status. Keeps "bad key" distinguishable from "offline".
pub fn key_status_from_error(err: &WeatherError) -> ApiKeyStatus {
    let message = match err {
        WeatherError::MissingApiKey => {
            format!("{API_KEY_ENV} is not configured; set it or run `farm-weather configure`")
        }
        WeatherError::Unauthorized => "API key is invalid or inactive (HTTP 401)".to_string(),
        WeatherError::Status { status, message } if message.trim().is_empty() => {
            format!("Weather provider returned HTTP {status}")
        }
        WeatherError::Status { status, message } => {
            format!("Weather provider returned HTTP {status}: {message}")
        }
        WeatherError::NoResponse(detail) => {
            format!("No response from weather provider; check the network connection ({detail})")
        }
        WeatherError::Request(detail) => format!("Request to weather provider failed ({detail})"),
        WeatherError::Parse(detail) => format!("API key validation failed: {detail}"),
    };

    ApiKeyStatus::invalid(message)
}
