//! JSON line stream, typically standard input.
//!
//! Every line is one JSON object and one fetch cycle. End of input is a
//! clean end of stream.

use std::io::{self, BufRead, BufReader, Stdin};

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::json::to_fetch_result;
use super::{FetchResult, Source, SourceError};
use crate::field::{Field, GraphSpec, all_fields};

/// Reads JSON documents line by line from any buffered reader.
pub struct StreamSource<R> {
    reader: Option<R>,
    fields: Vec<Field>,
    line: String,
    line_no: u64,
}

impl StreamSource<BufReader<Stdin>> {
    pub fn stdin(specs: &[GraphSpec]) -> Self {
        Self::new(BufReader::new(io::stdin()), specs)
    }
}

impl<R: BufRead + Send> StreamSource<R> {
    pub fn new(reader: R, specs: &[GraphSpec]) -> Self {
        Self {
            reader: Some(reader),
            fields: all_fields(specs).cloned().collect(),
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead + Send> Source for StreamSource<R> {
    fn next_result(&mut self) -> Result<Option<FetchResult>, SourceError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        loop {
            self.line.clear();
            if reader.read_line(&mut self.line)? == 0 {
                debug!(lines = self.line_no, "end of input");
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            let doc: Value = serde_json::from_str(text).map_err(|e| {
                SourceError::Malformed(format!("line {}: {}", self.line_no, e))
            })?;
            return to_fetch_result(&doc, &self.fields, Utc::now()).map(Some);
        }
    }

    fn close(&mut self) {
        self.reader = None;
    }
}
