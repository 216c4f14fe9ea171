//! `fetch weather in <city>` against the OpenWeather current-weather API.

use crate::config::FetchConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("missing query")]
    MissingQuery,
    #[error("unsupported query")]
    Unsupported,
    #[error("no API key configured (set OPENWEATHER_API_KEY or fetch.api_key)")]
    MissingApiKey,
    #[error("city '{0}' not found")]
    CityNotFound(String),
    #[error("API key rejected")]
    Unauthorized,
    #[error("weather service returned HTTP {0}")]
    Status(u16),
    #[error("error fetching weather: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchQuery {
    Weather { city: String },
}

pub fn parse_query(query: &str) -> Result<FetchQuery, FetchError> {
    let query = query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if query.is_empty() {
        return Err(FetchError::MissingQuery);
    }
    match query.strip_prefix("weather in ") {
        Some(city) if !city.trim().is_empty() => Ok(FetchQuery::Weather {
            city: city.trim().to_string(),
        }),
        _ => Err(FetchError::Unsupported),
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: Vec<WeatherCondition>,
    main: WeatherMain,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub description: String,
    pub temperature: f64,
    pub units: String,
}

impl WeatherReport {
    pub fn from_json(city: &str, units: &str, body: &str) -> Result<Self, FetchError> {
        let response: WeatherResponse = serde_json::from_str(body)?;
        let description = response
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self {
            city: city.to_string(),
            description,
            temperature: response.main.temp,
            units: units.to_string(),
        })
    }

    fn unit_symbol(&self) -> &'static str {
        match self.units.as_str() {
            "imperial" => "°F",
            "standard" => "K",
            _ => "°C",
        }
    }
}

impl std::fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Weather in {}: {}, Temperature: {}{}",
            title_case(&self.city),
            self.description,
            self.temperature,
            self.unit_symbol()
        )
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct WeatherClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl WeatherClient {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn current(&self, city: &str) -> Result<WeatherReport, FetchError> {
        let api_key = self
            .config
            .resolved_api_key()
            .ok_or(FetchError::MissingApiKey)?;

        tracing::debug!(city, "Fetching weather");
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("q", city),
                ("appid", api_key.as_str()),
                ("units", self.config.units.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::CityNotFound(city.to_string()));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        WeatherReport::from_json(city, &self.config.units, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weather_query() {
        assert_eq!(
            parse_query("Weather in  New York").unwrap(),
            FetchQuery::Weather {
                city: "new york".to_string()
            }
        );
        assert!(matches!(parse_query(""), Err(FetchError::MissingQuery)));
        assert!(matches!(parse_query("stocks"), Err(FetchError::Unsupported)));
        assert!(matches!(parse_query("weather in "), Err(FetchError::Unsupported)));
    }

    #[test]
    fn test_report_from_json() {
        let body = r#"{"weather":[{"id":800,"main":"Clear","description":"clear sky"}],"main":{"temp":21.5,"humidity":40},"cod":200}"#;
        let report = WeatherReport::from_json("new york", "metric", body).unwrap();
        assert_eq!(report.description, "clear sky");
        assert_eq!(
            report.to_string(),
            "Weather in New York: clear sky, Temperature: 21.5°C"
        );
    }

    #[test]
    fn test_report_bad_json() {
        assert!(matches!(
            WeatherReport::from_json("x", "metric", "{}"),
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        if std::env::var(crate::config::API_KEY_ENV).is_ok() {
            return;
        }
        let client = WeatherClient::new(FetchConfig::default());
        assert!(matches!(
            client.current("paris").await,
            Err(FetchError::MissingApiKey)
        ));
    }
}
