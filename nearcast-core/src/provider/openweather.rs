use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::{config::DEFAULT_ENDPOINT, model::Coordinates};

use super::{FetchError, WeatherSource, check_status};

#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl OpenWeatherSource {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// `<endpoint>?lat=..&lon=..&appid=..&units=metric`
    pub fn request_url(&self, coords: Coordinates) -> Result<Url, FetchError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ],
        )
        .map_err(|e| FetchError::Url(e.to_string()))
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn fetch(&self, coords: Coordinates) -> Result<Value, FetchError> {
        let url = self.request_url(coords)?;
        debug!(%coords, "requesting current weather");

        let res = self.http.get(url).send().await.map_err(FetchError::Transport)?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        let body = res.text().await.map_err(FetchError::Body)?;

        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Json(e.to_string()))?;

        check_status(parsed)
    }
}
