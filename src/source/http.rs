//! Polling of an expvar-style JSON endpoint.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;
use ureq::Agent;

use super::json::to_fetch_result;
use super::poller::Fetch;
use super::{FetchResult, SourceError};
use crate::field::{Field, GraphSpec, all_fields};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches one JSON document per cycle and maps it onto the declared fields.
pub struct HttpFetcher {
    agent: Agent,
    url: String,
    fields: Vec<Field>,
}

impl HttpFetcher {
    pub fn new(url: &str, specs: &[GraphSpec]) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            url: url.to_string(),
            fields: all_fields(specs).cloned().collect(),
        }
    }
}

impl Fetch for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(&mut self) -> Result<FetchResult, SourceError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        let body = response.into_string()?;
        let now = Utc::now();

        let doc: Value = serde_json::from_str(&body)?;
        let result = to_fetch_result(&doc, &self.fields, now)?;
        debug!(url = %self.url, fields = result.len(), "http fetch");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::parse_specs;
    use std::thread;

    fn serve_once(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string(body).with_status_code(status);
                let _ = request.respond(response);
            }
        });
        format!("http://{}/debug/vars", addr)
    }

    #[test]
    fn test_fetch_maps_document_to_fields() {
        let url = serve_once(200, r#"{"mem": {"heap": 1024, "sys": 2048}, "threads": 7}"#);
        let specs = parse_specs(&["mem.heap+mem.sys", "threads"]).unwrap();
        let mut fetcher = HttpFetcher::new(&url, &specs);

        let result = fetcher.fetch().unwrap();
        assert_eq!(result.get("0.0.mem.heap").unwrap()[0].value, 1024.0);
        assert_eq!(result.get("0.1.mem.sys").unwrap()[0].value, 2048.0);
        assert_eq!(result.get("1.0.threads").unwrap()[0].value, 7.0);
    }

    #[test]
    fn test_error_status_is_http_error() {
        let url = serve_once(500, "oops");
        let specs = parse_specs(&["a"]).unwrap();
        let err = HttpFetcher::new(&url, &specs).fetch().unwrap_err();
        assert!(matches!(err, SourceError::Http(_)));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let url = serve_once(200, "not json");
        let specs = parse_specs(&["a"]).unwrap();
        let err = HttpFetcher::new(&url, &specs).fetch().unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
