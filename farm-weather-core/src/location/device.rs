use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};
use tracing::debug;

use crate::{Location, LocationError};

use super::{LocationStrategy, ReverseGeocoder};

/// Name used when the device position is known but reverse geocoding fails.
pub const CURRENT_LOCATION: &str = "Current Location";

/// Source of a device-reported position (GPS, OS location service, ...).
#[async_trait]
pub trait DevicePosition: Send + Sync + Debug {
    async fn position(&self, high_accuracy: bool) -> Result<(f64, f64), LocationError>;
}

/// A position known up front, e.g. from `--lat/--lon` or the `[device]`
/// config section.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
impl DevicePosition for FixedPosition {
    async fn position(&self, _high_accuracy: bool) -> Result<(f64, f64), LocationError> {
        Ok((self.latitude, self.longitude))
    }
}

/// Host without any location hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDevice;

#[async_trait]
impl DevicePosition for NoDevice {
    async fn position(&self, _high_accuracy: bool) -> Result<(f64, f64), LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Build the device source from optional fixed coordinates.
pub fn device_from_position(position: Option<(f64, f64)>) -> Box<dyn DevicePosition> {
    match position {
        Some((latitude, longitude)) => Box::new(FixedPosition { latitude, longitude }),
        None => Box::new(NoDevice),
    }
}

#[derive(Debug)]
pub struct DeviceStrategy {
    device: Box<dyn DevicePosition>,
    geocoder: ReverseGeocoder,
    timeout: Duration,
}

impl DeviceStrategy {
    pub fn new(
        device: Box<dyn DevicePosition>,
        geocoder: ReverseGeocoder,
        timeout: Duration,
    ) -> Self {
        Self { device, geocoder, timeout }
    }
}

#[async_trait]
impl LocationStrategy for DeviceStrategy {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn locate(&self) -> Result<Location, LocationError> {
        let (latitude, longitude) = tokio::time::timeout(self.timeout, self.device.position(true))
            .await
            .map_err(|_| LocationError::Timeout)??;

        let name = match self.geocoder.reverse(latitude, longitude).await {
            Ok(name) => name,
            Err(err) => {
                debug!(error = %err, "reverse geocoding failed, using generic name");
                CURRENT_LOCATION.to_string()
            }
        };

        Ok(Location::new(latitude, longitude, name))
    }
}
