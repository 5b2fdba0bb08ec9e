//! Datadog metrics query API.
//!
//! Each declared field is one query against `/api/v1/query`. Counter fields
//! get the `.as_count()` suffix.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use ureq::Agent;

use super::poller::Fetch;
use super::{FetchResult, SourceError};
use crate::field::{Field, GraphSpec, all_fields};
use crate::storage::Point;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How far back the first query reaches.
const INITIAL_LOOKBACK_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    /// `[milliseconds, value]` pairs; a null value marks a gap.
    #[serde(default)]
    pointlist: Vec<(f64, Option<f64>)>,
    /// End of the series window, milliseconds.
    #[serde(default)]
    end: Option<f64>,
}

/// Queries every declared field once per cycle.
pub struct DatadogFetcher {
    agent: Agent,
    api_key: String,
    app_key: String,
    base_url: String,
    fields: Vec<Field>,
    /// Lower query bound, seconds since epoch. Moves forward as data arrives.
    from: i64,
    /// Newest point already returned for each field, aligned with `fields`.
    /// `from` is inclusive, so consecutive windows share their boundary
    /// point; anything at or before this mark is dropped.
    newest: Vec<Option<DateTime<Utc>>>,
}

impl DatadogFetcher {
    pub fn new(api_key: &str, app_key: &str, base_url: &str, specs: &[GraphSpec]) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let fields: Vec<Field> = all_fields(specs).cloned().collect();
        Self {
            agent,
            api_key: api_key.to_string(),
            app_key: app_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            newest: vec![None; fields.len()],
            fields,
            from: Utc::now().timestamp() - INITIAL_LOOKBACK_SECS,
        }
    }

    fn query(&self, field: &Field, to: i64) -> Result<QueryResponse, SourceError> {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .agent
            .get(&url)
            .set("DD-API-KEY", &self.api_key)
            .set("DD-APPLICATION-KEY", &self.app_key)
            .query("from", &self.from.to_string())
            .query("to", &to.to_string())
            .query("query", &query_string(field))
            .call()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let parsed: QueryResponse = response
            .into_json()
            .map_err(|e| SourceError::Malformed(format!("{}: {}", field.name, e)))?;

        if let Some(error) = &parsed.error {
            return Err(SourceError::Http(format!("{}: {}", field.name, error)));
        }
        Ok(parsed)
    }
}

fn query_string(field: &Field) -> String {
    if field.counter {
        format!("{}.as_count()", field.name)
    } else {
        field.name.clone()
    }
}

/// Converts the first series of a response into points. Gaps are skipped.
fn series_points(response: &QueryResponse) -> Result<Vec<Point>, SourceError> {
    let Some(series) = response.series.first() else {
        return Ok(Vec::new());
    };

    series
        .pointlist
        .iter()
        .filter_map(|(ms, value)| value.map(|v| (*ms, v)))
        .map(|(ms, v)| {
            DateTime::from_timestamp_millis(ms as i64)
                .map(|ts| Point::new(ts, v))
                .ok_or_else(|| SourceError::Malformed(format!("timestamp out of range: {}", ms)))
        })
        .collect()
}

impl Fetch for DatadogFetcher {
    fn name(&self) -> &'static str {
        "datadog"
    }

    fn fetch(&mut self) -> Result<FetchResult, SourceError> {
        let to = Utc::now().timestamp();
        let mut newest_end = self.from;
        let mut result = FetchResult::new();
        let mut repeated = 0usize;

        for (index, field) in self.fields.iter().enumerate() {
            let response = self.query(field, to)?;
            if response.series.len() > 1 {
                warn!(
                    query = %query_string(field),
                    series = response.series.len(),
                    "query returned several series, using the first"
                );
            }
            if let Some(end) = response.series.first().and_then(|s| s.end) {
                newest_end = newest_end.max((end / 1000.0) as i64);
            }

            result.declare(&field.id);
            let seen = self.newest[index];
            for point in series_points(&response)? {
                if seen.is_some_and(|t| point.timestamp <= t) {
                    repeated += 1;
                    continue;
                }
                if self.newest[index].is_none_or(|t| point.timestamp > t) {
                    self.newest[index] = Some(point.timestamp);
                }
                result.push(&field.id, point);
            }
        }

        debug!(
            from = self.from,
            to,
            next_from = newest_end,
            repeated,
            "datadog fetch"
        );
        self.from = newest_end;
        Ok(result)
    }
}
