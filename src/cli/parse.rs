use crate::classify::{Domain, UserAgentClassifier};
use crate::format::FormatCache;
use crate::parse::{to_csv, AccessParser, ErrorLineParser};
use crate::source::{read_from, ArchiveCache, LogKind, LogRole};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Inferred from the file name when not given.
    pub role: Option<LogRole>,
    pub format: Option<String>,
    pub output: OutputFormat,
    pub summary: bool,
}

/// Parse a whole log file (plain or `.gz`) and print the records.
pub async fn run(path: &Path, options: &ParseOptions) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = render_file(path, options).await?;
    print!("{}", rendered);
    Ok(())
}

pub async fn render_file(path: &Path, options: &ParseOptions) -> Result<String, Box<dyn std::error::Error>> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let role = options.role.unwrap_or_else(|| LogRole::from_filename(&filename));

    let lines = if LogKind::from_filename(&filename) == Some(LogKind::Archived) {
        ArchiveCache::new().read_archive(path).await?.logs
    } else {
        read_from(path, 0, role).await?.lines
    };
    info!(path = %path.display(), role = %role, lines = lines.len(), "Read log file");

    render_lines(&lines, role, options)
}

pub fn render_lines(
    lines: &[String],
    role: LogRole,
    options: &ParseOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut rendered = match (role, options.output) {
        (LogRole::Error, OutputFormat::Csv) => {
            return Err("CSV output is only available for access logs".into());
        }
        (LogRole::Error, OutputFormat::Json) => {
            serde_json::to_string_pretty(&ErrorLineParser::new().parse(lines))?
        }
        (LogRole::Access, output) => {
            let parser = AccessParser::new(Arc::new(FormatCache::new()));
            let records = parser.parse(lines, options.format.as_deref());
            info!(lines = lines.len(), records = records.len(), "Parsed access log");

            if options.summary {
                let classifier = UserAgentClassifier::new();
                for record in &records {
                    classifier.classify(&record.user_agent);
                }
                // stdout stays machine-readable.
                eprint!("{}", summarize(&classifier));
            }

            match output {
                OutputFormat::Json => serde_json::to_string_pretty(&records)?,
                OutputFormat::Csv => to_csv(&records),
            }
        }
    };

    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(rendered)
}

/// Per-domain counts in the classifier's current order, skipping unseen labels.
pub fn summarize(classifier: &UserAgentClassifier) -> String {
    let mut out = String::new();
    for (name, domain) in [("Devices", Domain::Device), ("Operating systems", Domain::Os), ("Clients", Domain::Client)] {
        let _ = writeln!(out, "{}:", name);
        for (label, count) in classifier.snapshot(domain) {
            if count > 0 {
                let _ = writeln!(out, "  {:<20} {}", label, count);
            }
        }
    }
    out
}
