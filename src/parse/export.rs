use crate::parse::access::ParsedAccessRecord;
use chrono::SecondsFormat;

const HEADER: [&str; 10] = [
    "ipAddress",
    "timestamp",
    "method",
    "path",
    "httpVersion",
    "status",
    "responseSize",
    "referrer",
    "userAgent",
    "requestTime",
];

/// Render access records as CSV with a header row. Absent values become empty
/// cells so they stay distinguishable from zero.
pub fn to_csv(records: &[ParsedAccessRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER.iter().map(|h| h.to_string()));

    for record in records {
        push_row(
            &mut out,
            [
                record.ip_address.clone(),
                record
                    .timestamp
                    .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
                    .unwrap_or_default(),
                record.method.clone(),
                record.path.clone(),
                record.http_version.clone(),
                optional(record.status),
                optional(record.response_size),
                record.referrer.clone(),
                record.user_agent.clone(),
                optional(record.request_time),
            ],
        );
    }

    out
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn push_row(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let row: Vec<String> = cells.into_iter().map(|cell| escape(&cell)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
