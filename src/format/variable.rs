use serde::{Deserialize, Serialize};

/// Canonical attributes of a parsed access record that a format variable can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    IpAddress,
    Timestamp,
    Method,
    Path,
    HttpVersion,
    Status,
    ResponseSize,
    Referrer,
    UserAgent,
    RequestTime,
}

/// How a captured timestamp has to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    /// `10/Jan/2024:08:30:00 +0000`
    Local,
    /// `2024-01-10T08:30:00+00:00`
    Iso8601,
}

/// The `log_format` variables the compiler knows how to match structurally.
///
/// Anything not listed here is compiled as an opaque, unlabeled capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    RemoteAddr,
    RemoteUser,
    TimeLocal,
    TimeIso8601,
    Request,
    RequestMethod,
    RequestUri,
    ServerProtocol,
    Status,
    BodyBytesSent,
    HttpReferer,
    HttpUserAgent,
    RequestTime,
}

impl Variable {
    pub fn lookup(name: &str) -> Option<Self> {
        let variable = match name {
            "remote_addr" => Variable::RemoteAddr,
            "remote_user" => Variable::RemoteUser,
            "time_local" => Variable::TimeLocal,
            "time_iso8601" => Variable::TimeIso8601,
            "request" => Variable::Request,
            "request_method" => Variable::RequestMethod,
            "request_uri" | "uri" => Variable::RequestUri,
            "server_protocol" => Variable::ServerProtocol,
            "status" => Variable::Status,
            "body_bytes_sent" | "bytes_sent" => Variable::BodyBytesSent,
            "http_referer" => Variable::HttpReferer,
            "http_user_agent" => Variable::HttpUserAgent,
            "request_time" => Variable::RequestTime,
            _ => return None,
        };
        Some(variable)
    }

    /// Regex fragment for this variable. Every group in the fragment is a
    /// capturing group and lines up with `fields()`.
    pub fn fragment(self) -> &'static str {
        match self {
            Variable::RemoteAddr => r"([0-9A-Fa-f:.]+)",
            Variable::RemoteUser => r"(\S+)",
            Variable::TimeLocal => r"(\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} [+-]\d{4})",
            Variable::TimeIso8601 => {
                r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2}))"
            }
            Variable::Request => r"([A-Z]+) (\S+) (HTTP/[0-9.]+)",
            Variable::RequestMethod => r"([A-Z]+)",
            Variable::RequestUri => r"(\S+)",
            Variable::ServerProtocol => r"(HTTP/[0-9.]+)",
            Variable::Status => r"(\d{3})",
            Variable::BodyBytesSent => r"(\d+)",
            Variable::HttpReferer | Variable::HttpUserAgent => r#"([^"]*)"#,
            Variable::RequestTime => r"(\d+(?:\.\d+)?)",
        }
    }

    /// Record attribute fed by each capturing group of `fragment()`, in order.
    /// `None` marks a group that is captured but carries no canonical meaning.
    pub fn fields(self) -> &'static [Option<Field>] {
        match self {
            Variable::RemoteAddr => &[Some(Field::IpAddress)],
            Variable::RemoteUser => &[None],
            Variable::TimeLocal | Variable::TimeIso8601 => &[Some(Field::Timestamp)],
            Variable::Request => &[
                Some(Field::Method),
                Some(Field::Path),
                Some(Field::HttpVersion),
            ],
            Variable::RequestMethod => &[Some(Field::Method)],
            Variable::RequestUri => &[Some(Field::Path)],
            Variable::ServerProtocol => &[Some(Field::HttpVersion)],
            Variable::Status => &[Some(Field::Status)],
            Variable::BodyBytesSent => &[Some(Field::ResponseSize)],
            Variable::HttpReferer => &[Some(Field::Referrer)],
            Variable::HttpUserAgent => &[Some(Field::UserAgent)],
            Variable::RequestTime => &[Some(Field::RequestTime)],
        }
    }

    pub fn time_encoding(self) -> Option<TimeEncoding> {
        match self {
            Variable::TimeLocal => Some(TimeEncoding::Local),
            Variable::TimeIso8601 => Some(TimeEncoding::Iso8601),
            _ => None,
        }
    }
}

/// Fragment used for variables missing from the table.
pub const UNKNOWN_FRAGMENT: &str = r"(\S+)";

/// Fragment used for unknown variables wrapped in double quotes, where the
/// value may legitimately contain spaces.
pub const UNKNOWN_QUOTED_FRAGMENT: &str = r#"([^"]*)"#;
