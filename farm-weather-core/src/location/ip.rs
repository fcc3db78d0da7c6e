//! IP-based geolocation with a primary and a secondary provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{Config, Location, LocationError};

use super::{LocationStrategy, join_place_parts};

/// Supported IP geolocation services. Each names its fields differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpService {
    /// ipapi.co: `GET /json/`
    IpApiCo,
    /// ipwho.is: `GET /`, better coverage for East African ISPs.
    IpWhoIs,
}

impl IpService {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpService::IpApiCo => "ipapi.co",
            IpService::IpWhoIs => "ipwho.is",
        }
    }

    fn path(&self) -> &'static str {
        match self {
            IpService::IpApiCo => "/json/",
            IpService::IpWhoIs => "/",
        }
    }

    fn parse(&self, body: &str) -> Result<Location, LocationError> {
        let parse_err =
            |e: serde_json::Error| LocationError::Lookup(format!("{}: {e}", self.as_str()));

        match self {
            IpService::IpApiCo => serde_json::from_str::<IpApiCoResponse>(body)
                .map_err(parse_err)?
                .into_location(),
            IpService::IpWhoIs => serde_json::from_str::<IpWhoIsResponse>(body)
                .map_err(parse_err)?
                .into_location(),
        }
    }
}

impl std::fmt::Display for IpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct IpApiCoResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
}

impl IpApiCoResponse {
    fn into_location(self) -> Result<Location, LocationError> {
        if self.error {
            return Err(LocationError::Lookup(format!(
                "ipapi.co: {}",
                self.reason.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        let (latitude, longitude) = self
            .latitude
            .zip(self.longitude)
            .ok_or_else(|| LocationError::Lookup("ipapi.co: missing coordinates".into()))?;

        let name = join_place_parts([
            self.city.as_deref(),
            self.region.as_deref(),
            self.country_name.as_deref(),
        ])
        .unwrap_or_else(|| format!("{latitude:.4}, {longitude:.4}"));

        Ok(Location::new(latitude, longitude, name))
    }
}

#[derive(Debug, Deserialize)]
struct IpWhoIsResponse {
    #[serde(default = "default_true")]
    success: bool,
    message: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

fn default_true() -> bool {
    true
}

impl IpWhoIsResponse {
    fn into_location(self) -> Result<Location, LocationError> {
        if !self.success {
            return Err(LocationError::Lookup(format!(
                "ipwho.is: {}",
                self.message.unwrap_or_else(|| "lookup failed".to_string())
            )));
        }

        let (latitude, longitude) = self
            .latitude
            .zip(self.longitude)
            .ok_or_else(|| LocationError::Lookup("ipwho.is: missing coordinates".into()))?;

        let name = join_place_parts([
            self.city.as_deref(),
            self.region.as_deref(),
            self.country.as_deref(),
        ])
        .unwrap_or_else(|| format!("{latitude:.4}, {longitude:.4}"));

        Ok(Location::new(latitude, longitude, name))
    }
}

#[derive(Debug, Clone)]
struct IpLookup {
    service: IpService,
    base_url: String,
}

/// Tries each configured IP service in order.
#[derive(Debug, Clone)]
pub struct IpStrategy {
    lookups: Vec<IpLookup>,
    http: Client,
}

impl IpStrategy {
    pub fn new(services: Vec<(IpService, String)>, http: Client) -> Self {
        let lookups = services
            .into_iter()
            .map(|(service, base_url)| IpLookup { service, base_url })
            .collect();

        Self { lookups, http }
    }

    pub fn from_config(config: &Config) -> Result<Self, LocationError> {
        let http = Client::builder()
            .timeout(config.timeouts.request())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self::new(
            vec![
                (IpService::IpApiCo, config.endpoints.ip_primary.clone()),
                (IpService::IpWhoIs, config.endpoints.ip_secondary.clone()),
            ],
            http,
        ))
    }

    async fn lookup(&self, lookup: &IpLookup) -> Result<Location, LocationError> {
        let url = format!("{}{}", lookup.base_url.trim_end_matches('/'), lookup.service.path());

        let res = self.http.get(&url).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(LocationError::Lookup(format!(
                "{} returned status {status}",
                lookup.service
            )));
        }

        lookup.service.parse(&body)
    }
}

#[async_trait]
impl LocationStrategy for IpStrategy {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn locate(&self) -> Result<Location, LocationError> {
        let mut last_err = LocationError::Lookup("no IP geolocation services configured".into());

        for lookup in &self.lookups {
            match self.lookup(lookup).await {
                Ok(location) => return Ok(location),
                Err(err) => {
                    debug!(service = %lookup.service, error = %err, "IP geolocation failed");
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipapi_co_fields() {
        let body = r#"{
            "ip": "41.90.0.1", "city": "Nairobi", "region": "Nairobi County",
            "country_name": "Kenya", "latitude": -1.2841, "longitude": 36.8155
        }"#;
        let loc = IpService::IpApiCo.parse(body).unwrap();
        assert_eq!(loc.name, "Nairobi, Nairobi County, Kenya");
        assert_eq!(loc.latitude, -1.2841);
    }

    #[test]
    fn ipapi_co_error_flag() {
        let body = r#"{"error":true,"reason":"RateLimited"}"#;
        let err = IpService::IpApiCo.parse(body).unwrap_err();
        assert!(err.to_string().contains("RateLimited"));
    }

    #[test]
    fn ipwho_is_fields() {
        let body = r#"{
            "success": true, "city": "Kampala", "region": "Central",
            "country": "Uganda", "latitude": 0.3476, "longitude": 32.5825
        }"#;
        let loc = IpService::IpWhoIs.parse(body).unwrap();
        assert_eq!(loc.name, "Kampala, Central, Uganda");
    }

    #[test]
    fn ipwho_is_failure() {
        let body = r#"{"success":false,"message":"Reserved range"}"#;
        let err = IpService::IpWhoIs.parse(body).unwrap_err();
        assert!(err.to_string().contains("Reserved range"));
    }

    #[test]
    fn missing_name_uses_coordinates() {
        let body = r#"{"latitude":1.5,"longitude":2.25}"#;
        assert_eq!(IpService::IpWhoIs.parse(body).unwrap().name, "1.5000, 2.2500");
    }

    #[test]
    fn garbage_is_lookup_error() {
        assert!(matches!(IpService::IpApiCo.parse("<html>"), Err(LocationError::Lookup(_))));
    }
}
