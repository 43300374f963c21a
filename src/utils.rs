use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Unique subsequence of `urls`, first occurrence wins.
///
/// Keys are compared byte for byte; no normalization happens here.
pub fn dedup_urls<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.iter()
        .map(AsRef::as_ref)
        .filter(|url| seen.insert(*url))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum UrlNormalizeError {
    Parse(url::ParseError),
    MissingHost,
}

impl std::fmt::Display for UrlNormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlNormalizeError::Parse(e) => write!(f, "invalid URL: {e}"),
            UrlNormalizeError::MissingHost => f.write_str("missing host in URL"),
        }
    }
}

impl std::error::Error for UrlNormalizeError {}

/// Turns user input such as `example.com/path` into a probe-able URL.
pub fn normalize_url(raw: &str) -> Result<Url, UrlNormalizeError> {
    let raw = raw.trim();
    let candidate = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let parsed = Url::parse(&candidate).map_err(UrlNormalizeError::Parse)?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(UrlNormalizeError::MissingHost),
    }
}

/// Reads one URL per line, skipping blanks and `#` comments.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{seconds}.{millis:03}s")
    } else {
        format!("{millis}ms")
    }
}

/// Shortens `s` to at most `max_len` characters, marking the cut with `...`.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
