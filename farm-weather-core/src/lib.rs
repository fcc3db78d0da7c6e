//! Core library for the farm dashboard's weather panel.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - A location resolver chain (device, IP, locale defaults)
//! - The WeatherAPI.com client and the normalized weather model
//! - Synthetic fallback data and farm-operations advice
//!
//! It is used by `farm-weather-cli`, but can also be reused by other binaries or services.

pub mod advice;
pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod service;
pub mod synthetic;

pub use advice::advise;
pub use config::Config;
pub use error::{LocationError, WeatherError};
pub use location::{LocaleHints, LocationChain, LocationStrategy};
pub use model::{
    ApiKeyStatus, ConditionCategory, DataSource, FarmLocation, Location, WeatherData,
    WeatherResolution,
};
pub use provider::WeatherProvider;
pub use service::WeatherService;
