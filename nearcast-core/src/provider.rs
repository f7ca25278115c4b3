use async_trait::async_trait;
use serde_json::Value;

use crate::{Config, model::Coordinates};

pub mod icons;
pub mod openweather;

pub use icons::{HttpIconLoader, IconLoader};
pub use openweather::OpenWeatherSource;

/// Status code the weather API reports for a usable reading.
pub const SUCCESS_CODE: i64 = 200;

/// Why a fetch produced no result. Only ever logged; users see one generic notice.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server answered with HTTP {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("response is not a JSON object: {0}")]
    Json(String),
    #[error("response has no usable `cod` field")]
    MissingCod,
    #[error("response reported status {0}")]
    Status(i64),
}

/// A source of current conditions by coordinates.
#[async_trait]
pub trait WeatherSource: Send + Sync + std::fmt::Debug {
    /// Fetch the raw weather document. `Ok` implies `cod == 200`.
    async fn fetch(&self, coords: Coordinates) -> Result<Value, FetchError>;
}

/// Construct the OpenWeather source from config.
pub fn source_from_config(config: &Config) -> anyhow::Result<OpenWeatherSource> {
    let api_key = config.require_api_key()?;
    Ok(OpenWeatherSource::new(api_key.to_owned()).with_endpoint(config.endpoint.clone()))
}

/// Reads `cod`, which the API sends as a number on success and as a string on errors.
pub fn status_code(json: &Value) -> Option<i64> {
    match json.get("cod")? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts a parsed document only if it is an object whose `cod` is 200.
pub fn check_status(json: Value) -> Result<Value, FetchError> {
    if !json.is_object() {
        return Err(FetchError::Json("top-level value is not an object".to_string()));
    }

    match status_code(&json) {
        Some(SUCCESS_CODE) => Ok(json),
        Some(other) => Err(FetchError::Status(other)),
        None => Err(FetchError::MissingCod),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_code_accepts_number_and_string() {
        assert_eq!(status_code(&json!({"cod": 200})), Some(200));
        assert_eq!(status_code(&json!({"cod": "404"})), Some(404));
        assert_eq!(status_code(&json!({"cod": 200.0})), Some(200));
        assert_eq!(status_code(&json!({"cod": true})), None);
        assert_eq!(status_code(&json!({})), None);
    }

    #[test]
    fn non_success_cod_is_rejected_whatever_else_is_present() {
        let body = json!({
            "cod": 401,
            "name": "London",
            "sys": {"country": "GB"},
            "main": {"temp": 15.5, "humidity": 80, "pressure": 1012},
            "dt": 1700000000
        });

        assert!(matches!(check_status(body), Err(FetchError::Status(401))));
    }

    #[test]
    fn success_cod_is_accepted() {
        let body = json!({"cod": 200, "name": "London"});
        assert_eq!(check_status(body.clone()).unwrap(), body);
    }

    #[test]
    fn missing_cod_and_non_object_are_rejected() {
        assert!(matches!(check_status(json!({"name": "x"})), Err(FetchError::MissingCod)));
        assert!(matches!(check_status(json!([1, 2])), Err(FetchError::Json(_))));
    }

    #[test]
    fn source_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = source_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn source_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());
        assert!(source_from_config(&cfg).is_ok());
    }
}
