//! covid2019-api time-series client
//!
//! Fetches the confirmed, deaths and recovered time series from the public
//! covid2019-api service and parses them into `TimeSeriesPayload`s.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use super::{Category, LocationSeries, TimeSeriesPayload, TimeSeriesSource};

/// Base URL for the covid2019 API
pub const DEFAULT_API_BASE_URL: &str = "https://covid2019-api.herokuapp.com";

/// Errors that can occur when fetching time-series data
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("HTTP error {status}: {url}")]
    Http { status: u16, url: String },

    /// HTTP request failed before a response arrived
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

/// Client for fetching time series from the covid2019 API
#[derive(Debug, Clone)]
pub struct Covid19ApiClient {
    client: Client,
    base_url: String,
}

impl Default for Covid19ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Covid19ApiClient {
    /// Create a new client against the public API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }

    /// Create a new client against a different host, e.g. a mirror
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Endpoint URL for a category
    pub fn endpoint(&self, category: Category) -> String {
        format!(
            "{}/timeseries/{}",
            self.base_url.trim_end_matches('/'),
            category.key()
        )
    }

    /// Fetch and parse the time series for one category
    ///
    /// # Returns
    /// * `Ok(TimeSeriesPayload)` - The parsed payload
    /// * `Err(ApiError::Http)` - If the server answers with a non-success status
    /// * `Err(ApiError)` - If the request or parsing fails
    pub async fn fetch_time_series(
        &self,
        category: Category,
    ) -> Result<TimeSeriesPayload, ApiError> {
        let url = self.endpoint(category);
        info!(%category, %url, "fetching time series");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                url,
            });
        }

        let text = response.text().await?;
        parse_payload(category, &text)
    }
}

impl TimeSeriesSource for Covid19ApiClient {
    async fn fetch(&self, category: Category) -> Result<TimeSeriesPayload, ApiError> {
        self.fetch_time_series(category).await
    }
}

/// Parse a raw API response body for `category`
///
/// The body is an object with a `dt` member naming the current date and a member
/// named after the category holding the location rows.
pub fn parse_payload(category: Category, body: &str) -> Result<TimeSeriesPayload, ApiError> {
    let mut root: serde_json::Map<String, Value> = serde_json::from_str(body)?;

    let current_date = match root.remove("dt") {
        Some(Value::String(date)) => date,
        _ => return Err(ApiError::MissingField("dt".to_string())),
    };

    let rows = root
        .remove(category.key())
        .ok_or_else(|| ApiError::MissingField(category.key().to_string()))?;
    let rows: Vec<ApiLocation> = serde_json::from_value(rows)?;

    Ok(TimeSeriesPayload {
        category,
        current_date,
        locations: rows.into_iter().map(LocationSeries::from).collect(),
    })
}

/// A single location row as sent by the API
#[derive(Debug, Deserialize)]
struct ApiLocation {
    #[serde(rename = "Country/Region")]
    country_region: String,
    #[serde(rename = "Province/State", default)]
    province_state: Option<String>,
    /// Date counts, either inline or grouped under a nested object
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl From<ApiLocation> for LocationSeries {
    fn from(row: ApiLocation) -> Self {
        let mut dates = BTreeMap::new();
        for (key, value) in row.rest {
            match value {
                Value::Object(nested) => {
                    for (date, count) in nested {
                        if let Some(count) = date_count(&date, &count) {
                            dates.insert(date, count);
                        }
                    }
                }
                other => {
                    if let Some(count) = date_count(&key, &other) {
                        dates.insert(key, count);
                    }
                }
            }
        }

        LocationSeries {
            country_region: row.country_region,
            province_state: row.province_state.filter(|p| !p.is_empty()),
            dates,
        }
    }
}

/// Count for `key` if it names a date such as `3/1/20` or `2020-03-01`
fn date_count(key: &str, value: &Value) -> Option<u64> {
    if looks_like_date(key) {
        as_count(value)
    } else {
        None
    }
}

fn looks_like_date(key: &str) -> bool {
    ['/', '-'].iter().any(|sep| {
        let parts: Vec<&str> = key.split(*sep).collect();
        parts.len() == 3
            && parts
                .iter()
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
    })
}

/// Interpret a JSON number as a count. Some rows carry floats like `12.0`.
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Row shape with counts grouped under a nested object
    const NESTED_RESPONSE: &str = r#"{
        "dt": "3/1/20",
        "confirmed": [
            {"Country/Region": "Chile", "Province/State": "", "dt": {"3/1/20": 5}}
        ]
    }"#;

    /// Row shape with counts as top-level members
    const INLINE_RESPONSE: &str = r#"{
        "dt": "3/2/20",
        "ts": 1583193600,
        "deaths": [
            {
                "Country/Region": "China",
                "Province/State": "Hubei",
                "Coordinates": {"Lat": 30.9756, "Long": 112.2707},
                "3/1/20": 2803,
                "3/2/20": 2834
            },
            {
                "Country/Region": "Italy",
                "Province/State": null,
                "3/1/20": 34,
                "3/2/20": 52.0
            }
        ]
    }"#;

    #[test]
    fn test_parse_nested_dates() {
        let payload = parse_payload(Category::Confirmed, NESTED_RESPONSE).unwrap();

        assert_eq!(payload.category, Category::Confirmed);
        assert_eq!(payload.current_date, "3/1/20");
        assert_eq!(payload.locations.len(), 1);

        let chile = &payload.locations[0];
        assert_eq!(chile.country_region, "Chile");
        assert_eq!(chile.province_state, None);
        assert_eq!(chile.count_on("3/1/20"), Some(5));
    }

    #[test]
    fn test_parse_inline_dates() {
        let payload = parse_payload(Category::Deaths, INLINE_RESPONSE).unwrap();

        assert_eq!(payload.current_date, "3/2/20");
        let hubei = &payload.locations[0];
        assert_eq!(hubei.title(), "China / Hubei");
        assert_eq!(hubei.count_on("3/2/20"), Some(2834));
        // Coordinates are not dates
        assert!(!hubei.dates.contains_key("Lat"));
        assert_eq!(hubei.dates.len(), 2);

        let italy = &payload.locations[1];
        assert_eq!(italy.province_state, None);
        assert_eq!(italy.count_on("3/2/20"), Some(52));
    }

    #[test]
    fn test_parse_ignores_integer_members_that_are_not_dates() {
        let body = r#"{
            "dt": "3/1/20",
            "confirmed": [
                {
                    "Country/Region": "Thailand",
                    "Province/State": "",
                    "Coordinates": {"Lat": 15, "Long": 101},
                    "Population": 69800000,
                    "dt": {"3/1/20": 42, "2020-03-02": 43}
                }
            ]
        }"#;

        let payload = parse_payload(Category::Confirmed, body).unwrap();

        let thailand = &payload.locations[0];
        assert_eq!(
            thailand.dates.keys().collect::<Vec<_>>(),
            ["2020-03-02", "3/1/20"]
        );
        assert_eq!(thailand.count_on("3/1/20"), Some(42));
    }

    #[test]
    fn test_looks_like_date() {
        assert!(looks_like_date("3/1/20"));
        assert!(looks_like_date("2020-03-01"));
        assert!(!looks_like_date("Lat"));
        assert!(!looks_like_date("3/1"));
        assert!(!looks_like_date("3//20"));
        assert!(!looks_like_date("3/1/20x"));
    }

    #[test]
    fn test_parse_missing_category_field() {
        let result = parse_payload(Category::Recovered, NESTED_RESPONSE);
        assert!(matches!(result, Err(ApiError::MissingField(f)) if f == "recovered"));
    }

    #[test]
    fn test_parse_missing_current_date() {
        let result = parse_payload(Category::Confirmed, r#"{"confirmed": []}"#);
        assert!(matches!(result, Err(ApiError::MissingField(f)) if f == "dt"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let result = parse_payload(Category::Confirmed, "<html>Application Error</html>");
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_endpoint_urls() {
        let client = Covid19ApiClient::new();
        assert_eq!(
            client.endpoint(Category::Confirmed),
            "https://covid2019-api.herokuapp.com/timeseries/confirmed"
        );
        assert_eq!(
            client.endpoint(Category::Deaths),
            "https://covid2019-api.herokuapp.com/timeseries/deaths"
        );

        let mirror = Covid19ApiClient::with_base_url("http://localhost:8080/");
        assert_eq!(
            mirror.endpoint(Category::Recovered),
            "http://localhost:8080/timeseries/recovered"
        );
    }

    #[test]
    fn test_http_error_message() {
        let err = ApiError::Http {
            status: 500,
            url: "https://covid2019-api.herokuapp.com/timeseries/deaths".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error 500: https://covid2019-api.herokuapp.com/timeseries/deaths"
        );
    }
}
