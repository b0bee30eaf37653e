use super::variable::{
    Field, TimeEncoding, Variable, UNKNOWN_FRAGMENT, UNKNOWN_QUOTED_FRAGMENT,
};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Optional single leading token some vendors put in front of the configured
/// format (e.g. `example.com:443`). Non-capturing and tried lazily, so it never
/// shifts group indices and only kicks in when the plain body does not match.
const VENDOR_PREFIX: &str = r"^(?:\S+\s+)??";

/// Trailing whitespace is tolerated, anything else after the last token is not.
const LINE_END: &str = r"\s*$";

const OPAQUE_PATTERN: &str = r"^(.*)$";

/// NGINX `combined` format, used when the caller does not supply one.
pub const COMBINED_FORMAT: &str = r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Variable(String),
}

/// A `log_format` string compiled into a matcher plus a field -> group map.
#[derive(Debug)]
pub struct CompiledFormat {
    pub source_format: String,
    pub matcher: Regex,
    pub fields: HashMap<Field, usize>,
    pub time_encoding: Option<TimeEncoding>,
}

impl CompiledFormat {
    /// Whether the format had no recognised variables and matches whole lines
    /// as a single unlabeled field.
    pub fn is_opaque(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn group(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn captures<'l>(&self, line: &'l str) -> Option<Captures<'l>> {
        self.matcher.captures(line)
    }

    fn opaque(source_format: &str) -> Self {
        Self {
            source_format: source_format.to_string(),
            matcher: Regex::new(OPAQUE_PATTERN).expect("opaque pattern is valid"),
            fields: HashMap::new(),
            time_encoding: None,
        }
    }
}

/// Compile a format string. Never fails: unknown variables become opaque
/// captures and a format without any known variable matches the whole line.
pub fn compile_format(format: &str) -> CompiledFormat {
    let tokens = tokenize(format);

    let has_known = tokens
        .iter()
        .any(|t| matches!(t, Token::Variable(name) if Variable::lookup(name).is_some()));
    if !has_known {
        return CompiledFormat::opaque(format);
    }

    let mut pattern = String::from(VENDOR_PREFIX);
    let mut fields = HashMap::new();
    let mut time_encoding = None;
    let mut group = 1;

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Literal(text) => pattern.push_str(&regex::escape(text)),
            Token::Variable(name) => match Variable::lookup(name) {
                Some(variable) => {
                    pattern.push_str(variable.fragment());
                    for field in variable.fields() {
                        if let Some(field) = field {
                            if !fields.contains_key(field) {
                                fields.insert(*field, group);
                                if *field == Field::Timestamp {
                                    time_encoding = variable.time_encoding();
                                }
                            }
                        }
                        group += 1;
                    }
                }
                None => {
                    if is_quoted(&tokens, index) {
                        pattern.push_str(UNKNOWN_QUOTED_FRAGMENT);
                    } else {
                        pattern.push_str(UNKNOWN_FRAGMENT);
                    }
                    group += 1;
                }
            },
        }
    }
    pattern.push_str(LINE_END);

    match Regex::new(&pattern) {
        Ok(matcher) => CompiledFormat {
            source_format: format.to_string(),
            matcher,
            fields,
            time_encoding,
        },
        Err(e) => {
            tracing::warn!(format = %format, error = %e, "Format compiled to invalid regex, matching whole lines");
            CompiledFormat::opaque(format)
        }
    }
}

fn is_quoted(tokens: &[Token], index: usize) -> bool {
    let before = index
        .checked_sub(1)
        .and_then(|i| tokens.get(i))
        .map(|t| matches!(t, Token::Literal(text) if text.ends_with('"')))
        .unwrap_or(false);
    let after = tokens
        .get(index + 1)
        .map(|t| matches!(t, Token::Literal(text) if text.starts_with('"')))
        .unwrap_or(false);
    before && after
}

/// Split a format into literal runs and `$name` / `${name}` placeholders.
/// A `$` that does not start a valid name is kept as literal text.
fn tokenize(format: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = format.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }

        let braced = matches!(chars.peek(), Some((_, '{')));
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }

        let closed = if braced {
            if matches!(chars.peek(), Some((_, '}'))) {
                chars.next();
                true
            } else {
                false
            }
        } else {
            true
        };

        if name.is_empty() || !closed {
            literal.push('$');
            if braced {
                literal.push('{');
            }
            literal.push_str(&name);
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(Token::Variable(name));
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    tokens
}

/// Process-lifetime memo of compiled formats keyed by the literal format string.
#[derive(Debug, Default)]
pub struct FormatCache {
    compiled: Mutex<HashMap<String, Arc<CompiledFormat>>>,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, format: &str) -> Arc<CompiledFormat> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = compiled.get(format) {
            return Arc::clone(existing);
        }

        let fresh = Arc::new(compile_format(format));
        tracing::debug!(
            format = %format,
            fields = fresh.fields.len(),
            "Compiled log format"
        );
        compiled.insert(format.to_string(), Arc::clone(&fresh));
        fresh
    }

    pub fn len(&self) -> usize {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"192.168.1.1 - - [10/Jan/2024:08:30:00 +0000] "GET /api/data HTTP/1.1" 200 1234 "https://example.com" "Mozilla/5.0""#;

    fn field<'l>(compiled: &CompiledFormat, caps: &Captures<'l>, field: Field) -> &'l str {
        let group = compiled.group(field).unwrap();
        caps.get(group).unwrap().as_str()
    }

    #[test]
    fn test_combined_format_fields() {
        let compiled = compile_format(COMBINED_FORMAT);
        let caps = compiled.captures(LINE).unwrap();

        assert_eq!(field(&compiled, &caps, Field::IpAddress), "192.168.1.1");
        assert_eq!(field(&compiled, &caps, Field::Timestamp), "10/Jan/2024:08:30:00 +0000");
        assert_eq!(field(&compiled, &caps, Field::Method), "GET");
        assert_eq!(field(&compiled, &caps, Field::Path), "/api/data");
        assert_eq!(field(&compiled, &caps, Field::HttpVersion), "HTTP/1.1");
        assert_eq!(field(&compiled, &caps, Field::Status), "200");
        assert_eq!(field(&compiled, &caps, Field::ResponseSize), "1234");
        assert_eq!(field(&compiled, &caps, Field::Referrer), "https://example.com");
        assert_eq!(field(&compiled, &caps, Field::UserAgent), "Mozilla/5.0");
        assert_eq!(compiled.time_encoding, Some(TimeEncoding::Local));
    }

    #[test]
    fn test_request_expands_to_consecutive_groups() {
        let compiled = compile_format(COMBINED_FORMAT);
        let method = compiled.group(Field::Method).unwrap();
        assert_eq!(compiled.group(Field::Path), Some(method + 1));
        assert_eq!(compiled.group(Field::HttpVersion), Some(method + 2));
    }

    #[test]
    fn test_vendor_prefix_does_not_shift_groups() {
        let compiled = compile_format(COMBINED_FORMAT);
        let prefixed = format!("example.com:443 {}", LINE);

        let plain = compiled.captures(LINE).unwrap();
        let vendor = compiled.captures(&prefixed).unwrap();

        for f in [Field::IpAddress, Field::Status, Field::UserAgent] {
            assert_eq!(field(&compiled, &plain, f), field(&compiled, &vendor, f));
        }
    }

    #[test]
    fn test_unknown_variable_is_unlabeled_capture() {
        let compiled = compile_format("$remote_addr $upstream_addr $status");
        let caps = compiled.captures("10.0.0.1 10.0.0.9:8080 502").unwrap();

        assert_eq!(compiled.group(Field::IpAddress), Some(1));
        assert_eq!(compiled.group(Field::Status), Some(3));
        assert_eq!(field(&compiled, &caps, Field::Status), "502");
    }

    #[test]
    fn test_quoted_unknown_variable_allows_spaces() {
        let compiled = compile_format(r#"$remote_addr "$http_x_forwarded_for" $status"#);
        let caps = compiled
            .captures(r#"10.0.0.1 "1.1.1.1, 2.2.2.2" 200"#)
            .unwrap();
        assert_eq!(field(&compiled, &caps, Field::Status), "200");
    }

    #[test]
    fn test_empty_format_is_opaque() {
        let compiled = compile_format("");
        assert!(compiled.is_opaque());
        let caps = compiled.captures("anything at all").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "anything at all");
    }

    #[test]
    fn test_unrecognized_format_is_opaque() {
        let compiled = compile_format("$foo | $bar");
        assert!(compiled.is_opaque());
        assert!(compiled.captures("x | y").is_some());
    }

    #[test]
    fn test_braced_variables_and_stray_dollar() {
        let compiled = compile_format("${remote_addr} $ ${status}");
        let caps = compiled.captures("10.0.0.1 $ 204").unwrap();
        assert_eq!(field(&compiled, &caps, Field::IpAddress), "10.0.0.1");
        assert_eq!(field(&compiled, &caps, Field::Status), "204");
    }

    #[test]
    fn test_literal_brackets_are_matched_verbatim() {
        let compiled = compile_format("[$status] ($request_time)");
        assert!(compiled.captures("[200] (0.005)").is_some());
        assert!(compiled.captures("200 0.005").is_none());
    }

    #[test]
    fn test_trailing_text_is_rejected() {
        let compiled = compile_format("$remote_addr $status");

        assert!(compiled.captures("10.0.0.1 2000").is_none());
        assert!(compiled.captures("10.0.0.1 200 junk junk").is_none());

        let caps = compiled.captures("10.0.0.1 200 ").unwrap();
        assert_eq!(field(&compiled, &caps, Field::Status), "200");
    }

    #[test]
    fn test_cache_returns_same_instance() {
        let cache = FormatCache::new();
        let first = cache.compile(COMBINED_FORMAT);
        let second = cache.compile(COMBINED_FORMAT);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.compile("$status");
        assert_eq!(cache.len(), 2);
    }
}
