//! Decodes NDJSON lines into typed records.
//!
//! Each line is decoded on its own. A line that is not valid JSON, or not the
//! expected shape, is logged and skipped so one corrupt line never ends the
//! stream. Lines of the form `{"error": "..."}` decode to
//! [`StreamFrame::Error`] regardless of the record type.

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::Result;

/// A record type that can appear in an NDJSON response stream.
pub trait StreamRecord: DeserializeOwned + Send + 'static {
    /// Whether this record is the last one the server will send.
    fn is_terminal(&self) -> bool;
}

/// Untyped records end on either terminal convention.
impl StreamRecord for serde_json::Value {
    fn is_terminal(&self) -> bool {
        self["done"].as_bool() == Some(true) || self["status"].as_str() == Some("success")
    }
}

/// One decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame<T> {
    /// A regular record.
    Record(T),
    /// An `{"error": "..."}` payload reported by the server.
    Error(String),
}

/// Decode one line. Returns `None` for blank or malformed lines.
pub fn parse_line<T: DeserializeOwned>(line: &str) -> Option<StreamFrame<T>> {
    if line.trim().is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, len = line.len(), "skipping malformed NDJSON line");
            return None;
        }
    };

    if let Some(message) = value.get("error").and_then(serde_json::Value::as_str) {
        return Some(StreamFrame::Error(message.to_string()));
    }

    match serde_json::from_value(value) {
        Ok(record) => Some(StreamFrame::Record(record)),
        Err(e) => {
            tracing::warn!(error = %e, len = line.len(), "skipping NDJSON line with unexpected shape");
            None
        }
    }
}

/// Map a stream of lines to a stream of frames, dropping lines that fail to
/// decode. Upstream errors pass through.
pub fn records<T, S>(lines: S) -> impl Stream<Item = Result<StreamFrame<T>>> + Send + 'static
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<String>> + Send + 'static,
{
    lines.filter_map(|line| {
        futures::future::ready(match line {
            Ok(line) => parse_line(&line).map(Ok),
            Err(e) => Some(Err(e)),
        })
    })
}
