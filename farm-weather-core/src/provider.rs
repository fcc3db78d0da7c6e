use crate::{
    Config, FarmLocation, Location, WeatherData, WeatherError,
    provider::weatherapi::WeatherApiProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod weatherapi;

/// A forecast provider: key probe, forecast and location search.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// One cheap request to check the credential is accepted.
    async fn validate_key(&self) -> Result<(), WeatherError>;

    /// Live forecast for `location`, normalized into [`WeatherData`].
    async fn forecast(&self, location: &Location) -> Result<WeatherData, WeatherError>;

    async fn search(&self, query: &str) -> Result<Vec<FarmLocation>, WeatherError>;
}

/// Construct the WeatherAPI.com provider from config.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
    let api_key = config.api_key().ok_or(WeatherError::MissingApiKey)?;

    let provider = WeatherApiProvider::new(
        api_key.to_owned(),
        config.endpoints.weather_api.clone(),
        config.fallback.probe.to_location(),
        config.timeouts.clone(),
    )?;

    Ok(Arc::new(provider))
}
