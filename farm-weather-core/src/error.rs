use thiserror::Error;

/// Failures talking to the forecast provider.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("No API key configured. Set WEATHERAPI_KEY or run `farm-weather configure`.")]
    MissingApiKey,

    #[error("API key is invalid or inactive")]
    Unauthorized,

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("no response from provider: {0}")]
    NoResponse(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

impl WeatherError {
    /// Failures that say nothing about the key itself and may clear up on
    /// a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, WeatherError::NoResponse(_) | WeatherError::Request(_))
    }
}

// Request URLs carry the API key as a query parameter, so it is stripped
// before the error is ever formatted.
impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() || err.is_connect() {
            WeatherError::NoResponse(err.to_string())
        } else if err.is_decode() {
            WeatherError::Parse(err.to_string())
        } else {
            WeatherError::Request(err.to_string())
        }
    }
}

/// Failures of a single location strategy.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("device geolocation is not supported")]
    Unsupported,

    #[error("location request timed out")]
    Timeout,

    #[error("location lookup failed: {0}")]
    Lookup(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            LocationError::Timeout
        } else {
            LocationError::Lookup(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_message_names_env_var() {
        assert!(WeatherError::MissingApiKey.to_string().contains("WEATHERAPI_KEY"));
    }

    #[test]
    fn unauthorized_message_says_invalid() {
        assert!(WeatherError::Unauthorized.to_string().contains("invalid"));
    }

    #[test]
    fn only_network_failures_are_transient() {
        assert!(WeatherError::NoResponse("timeout".into()).is_transient());
        assert!(WeatherError::Request("reset".into()).is_transient());
        assert!(!WeatherError::Unauthorized.is_transient());
        assert!(!WeatherError::Status { status: 403, message: String::new() }.is_transient());
        assert!(!WeatherError::Parse("eof".into()).is_transient());
    }

    #[tokio::test]
    async fn reqwest_errors_drop_the_request_url() {
        // Nothing listens on the discard port.
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/v1/current.json?key=SECRET123")
            .send()
            .await
            .unwrap_err();

        let weather = WeatherError::from(err).to_string();
        assert!(weather.starts_with("no response"), "{weather}");
        assert!(!weather.contains("SECRET123"), "{weather}");
    }
}
