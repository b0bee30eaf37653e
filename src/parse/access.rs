use crate::format::{CompiledFormat, Field, FormatCache, TimeEncoding, COMBINED_FORMAT};
use crate::parse::timestamp;
use chrono::{DateTime, Utc};
use regex::Captures;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAccessRecord {
    pub ip_address: String,
    /// Milliseconds since the epoch on the wire, `null` when unparseable
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    pub method: String,
    pub path: String,
    pub http_version: String,
    pub status: Option<u16>,
    pub response_size: Option<u64>,
    pub referrer: String,
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_time: Option<f64>,
}

/// Turns raw access log lines into records using compiled `log_format` strings.
#[derive(Debug, Clone)]
pub struct AccessParser {
    formats: Arc<FormatCache>,
}

impl AccessParser {
    pub fn new(formats: Arc<FormatCache>) -> Self {
        Self { formats }
    }

    /// Parse `lines` with `format`, or the `combined` format when none is given.
    /// Lines that do not match are dropped.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S], format: Option<&str>) -> Vec<ParsedAccessRecord> {
        let compiled = self.formats.compile(format.unwrap_or(COMBINED_FORMAT));
        parse_lines(&compiled, lines)
    }
}

pub fn parse_lines<S: AsRef<str>>(compiled: &CompiledFormat, lines: &[S]) -> Vec<ParsedAccessRecord> {
    let records: Vec<ParsedAccessRecord> = lines
        .iter()
        .filter_map(|line| parse_line(compiled, line.as_ref()))
        .collect();

    if records.len() < lines.len() {
        tracing::trace!(
            dropped = lines.len() - records.len(),
            format = %compiled.source_format,
            "Dropped lines not matching log format"
        );
    }

    records
}

pub fn parse_line(compiled: &CompiledFormat, line: &str) -> Option<ParsedAccessRecord> {
    let caps = compiled.captures(line)?;
    let text = |field: Field| capture(compiled, &caps, field).unwrap_or_default().to_string();

    let timestamp = capture(compiled, &caps, Field::Timestamp).and_then(|value| {
        timestamp::normalize(value, compiled.time_encoding.unwrap_or(TimeEncoding::Local))
    });

    Some(ParsedAccessRecord {
        ip_address: text(Field::IpAddress),
        timestamp,
        method: text(Field::Method),
        path: text(Field::Path),
        http_version: text(Field::HttpVersion),
        status: capture(compiled, &caps, Field::Status).and_then(|v| v.parse().ok()),
        response_size: capture(compiled, &caps, Field::ResponseSize).and_then(|v| v.parse().ok()),
        referrer: text(Field::Referrer),
        user_agent: text(Field::UserAgent),
        request_time: capture(compiled, &caps, Field::RequestTime).and_then(|v| v.parse().ok()),
    })
}

fn capture<'l>(compiled: &CompiledFormat, caps: &Captures<'l>, field: Field) -> Option<&'l str> {
    compiled
        .group(field)
        .and_then(|group| caps.get(group))
        .map(|m| m.as_str())
}
