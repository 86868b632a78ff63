//! Core data models for COVID-19 Radar
//!
//! This module contains the time-series types shared by the API client, the
//! cache and the list rendering, plus the `TimeSeriesSource` seam the fetch
//! routine is written against.

pub mod covid_api;

pub use covid_api::{ApiError, Covid19ApiClient};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// One of the three reported case counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Confirmed,
    Deaths,
    Recovered,
}

impl Category {
    /// All categories, in fetch and display order
    pub const ALL: [Category; 3] = [Category::Confirmed, Category::Deaths, Category::Recovered];

    /// Lowercase name used as cache key, endpoint path segment and payload field
    pub fn key(self) -> &'static str {
        match self {
            Category::Confirmed => "confirmed",
            Category::Deaths => "deaths",
            Category::Recovered => "recovered",
        }
    }

    /// Capitalized label shown in the stats view
    pub fn label(self) -> &'static str {
        match self {
            Category::Confirmed => "Confirmed",
            Category::Deaths => "Deaths",
            Category::Recovered => "Recovered",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Cumulative counts for one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSeries {
    /// Country or region name
    pub country_region: String,
    /// Province or state, if the country is split into sub-regions
    pub province_state: Option<String>,
    /// Cumulative count keyed by the upstream date string (e.g. "3/1/20")
    pub dates: BTreeMap<String, u64>,
}

impl LocationSeries {
    /// Display title: "Country" or "Country / Province"
    pub fn title(&self) -> String {
        match &self.province_state {
            Some(province) => format!("{} / {}", self.country_region, province),
            None => self.country_region.clone(),
        }
    }

    /// Count reported on `date`, if any
    pub fn count_on(&self, date: &str) -> Option<u64> {
        self.dates.get(date).copied()
    }
}

/// A full time-series snapshot for one category
///
/// Rows are index-aligned across categories: row `i` of the confirmed payload
/// describes the same location as row `i` of the deaths and recovered payloads
/// fetched in the same generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPayload {
    /// Which count this payload holds
    pub category: Category,
    /// Date key of the most recent report
    pub current_date: String,
    /// One row per location, in upstream order
    pub locations: Vec<LocationSeries>,
}

/// Anything that can produce a time-series payload for a category
pub trait TimeSeriesSource {
    /// Fetch the current payload for `category`
    fn fetch(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<TimeSeriesPayload, ApiError>>;
}
