use crate::parse::timestamp::parse_error_time;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_LEVEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedErrorRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub pid: u32,
    pub tid: String,
    pub cid: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Fixed sub-patterns for NGINX error log lines. Each one is applied to the
/// line independently, so fragments may appear in any order or not at all.
#[derive(Debug)]
pub struct ErrorLineParser {
    timestamp: Regex,
    level: Regex,
    process: Regex,
    connection: Regex,
    client: Regex,
    server: Regex,
    request: Regex,
    referrer: Regex,
    host: Regex,
}

impl Default for ErrorLineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorLineParser {
    pub fn new() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("error log pattern is valid");
        Self {
            timestamp: re(r"(\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2})"),
            level: re(r"\[(debug|info|notice|warn|error|crit|alert|emerg)\]"),
            process: re(r"(\d+)#(\d+):"),
            connection: re(r"\d+#\d+: \*(\d+)"),
            client: re(r"client: ([^,]+)"),
            server: re(r"server: ([^,]+)"),
            request: re(r#"request: "([^"]*)""#),
            referrer: re(r#"referrer: "([^"]*)""#),
            host: re(r#"host: "([^"]*)""#),
        }
    }

    /// Parse every non-blank line.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Vec<ParsedErrorRecord> {
        lines
            .iter()
            .map(|line| line.as_ref())
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.parse_line(line))
            .collect()
    }

    pub fn parse_line(&self, line: &str) -> ParsedErrorRecord {
        let timestamp = self
            .timestamp
            .captures(line)
            .and_then(|caps| parse_error_time(&caps[1]).ok())
            .unwrap_or_else(Utc::now);

        let level_match = self.level.captures(line);
        let level = level_match
            .as_ref()
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| UNKNOWN_LEVEL.to_string());

        let process = self.process.captures(line);
        let pid = process
            .as_ref()
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0);
        let tid = process
            .as_ref()
            .map(|caps| caps[2].to_string())
            .unwrap_or_default();

        let connection = self.connection.captures(line).and_then(|caps| caps.get(1));
        let cid = connection.map(|m| m.as_str().to_string()).unwrap_or_default();

        // Free text starts after the most specific marker present.
        let message_start = connection
            .map(|m| m.end())
            .or_else(|| process.as_ref().and_then(|caps| caps.get(0)).map(|m| m.end()))
            .or_else(|| level_match.as_ref().and_then(|caps| caps.get(0)).map(|m| m.end()))
            .unwrap_or(0);
        let message = line[message_start..].trim().to_string();

        let fragment = |re: &Regex| re.captures(line).map(|caps| caps[1].trim().to_string());

        ParsedErrorRecord {
            timestamp,
            level,
            pid,
            tid,
            cid,
            message,
            client_address: fragment(&self.client),
            server_address: fragment(&self.server),
            request: fragment(&self.request),
            referrer: fragment(&self.referrer),
            host: fragment(&self.host),
        }
    }
}

/// Convenience wrapper building a one-off parser.
pub fn parse_errors<S: AsRef<str>>(lines: &[S]) -> Vec<ParsedErrorRecord> {
    ErrorLineParser::new().parse(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"2024/01/10 08:30:00 [error] 1234#5678: *42 open() "/usr/share/nginx/html/favicon.ico" failed (2: No such file or directory), client: 10.0.0.7, server: example.com, request: "GET /favicon.ico HTTP/1.1", host: "example.com", referrer: "https://example.com/""#;

    #[test]
    fn test_parse_full_line() {
        let record = ErrorLineParser::new().parse_line(FULL);

        assert_eq!(record.timestamp.to_rfc3339(), "2024-01-10T08:30:00+00:00");
        assert_eq!(record.level, "error");
        assert_eq!(record.pid, 1234);
        assert_eq!(record.tid, "5678");
        assert_eq!(record.cid, "42");
        assert!(record.message.starts_with("open() \"/usr/share/nginx/html/favicon.ico\" failed"));
        assert_eq!(record.client_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(record.server_address.as_deref(), Some("example.com"));
        assert_eq!(record.request.as_deref(), Some("GET /favicon.ico HTTP/1.1"));
        assert_eq!(record.host.as_deref(), Some("example.com"));
        assert_eq!(record.referrer.as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_message_after_pid_when_no_connection() {
        let line = "2024/01/10 08:30:00 [notice] 1#1: signal process started";
        let record = ErrorLineParser::new().parse_line(line);

        assert_eq!(record.level, "notice");
        assert_eq!(record.cid, "");
        assert_eq!(record.message, "signal process started");
        assert!(record.client_address.is_none());
    }

    #[test]
    fn test_star_in_message_is_not_a_connection() {
        let line = "2024/01/10 08:30:00 [alert] 1#1: worker *5 exited";
        let record = ErrorLineParser::new().parse_line(line);

        assert_eq!(record.cid, "");
        assert_eq!(record.message, "worker *5 exited");
    }

    #[test]
    fn test_missing_level_and_timestamp() {
        let before = Utc::now();
        let record = ErrorLineParser::new().parse_line("something odd happened");

        assert_eq!(record.level, UNKNOWN_LEVEL);
        assert_eq!(record.pid, 0);
        assert_eq!(record.message, "something odd happened");
        assert!(record.timestamp >= before);
    }

    #[test]
    fn test_fragments_in_any_order() {
        let line = r#"2024/01/10 08:30:00 [warn] 7#7: *3 upstream slow, host: "a.test", client: 1.2.3.4"#;
        let record = ErrorLineParser::new().parse_line(line);

        assert_eq!(record.host.as_deref(), Some("a.test"));
        assert_eq!(record.client_address.as_deref(), Some("1.2.3.4"));
        assert!(record.request.is_none());
    }

    #[test]
    fn test_blank_lines_filtered() {
        let lines = vec!["", "   ", "2024/01/10 08:30:00 [crit] 1#1: boom", "\t"];
        let records = parse_errors(&lines);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, "crit");
    }
}
