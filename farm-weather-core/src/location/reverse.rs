//! Reverse geocoding via Nominatim (OpenStreetMap).

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::LocationError;

use super::join_place_parts;

#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    fn display_name(&self) -> Option<String> {
        let place = self
            .city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
            .or(self.hamlet.as_deref());

        join_place_parts([
            place,
            self.county.as_deref(),
            self.state.as_deref(),
            self.country.as_deref(),
        ])
    }
}

impl ReverseGeocoder {
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(
        base_url: String,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, LocationError> {
        let http = Client::builder().timeout(timeout).user_agent(user_agent).build()?;

        Ok(Self { base_url, http })
    }

    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, LocationError> {
        let url = format!("{}/reverse", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(LocationError::Lookup(format!(
                "reverse geocode returned status {}",
                res.status()
            )));
        }

        let body: NominatimResponse = res.json().await?;

        let name = body
            .address
            .and_then(|addr| addr.display_name())
            .ok_or_else(|| LocationError::Lookup("reverse geocode returned no address".into()))?;

        debug!(%name, "reverse geocoded");
        Ok(name)
    }
}
