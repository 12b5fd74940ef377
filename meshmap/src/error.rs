use std::time::Duration;
use thiserror::Error;

/// Failure to retrieve a whole dataset or a region partition.
///
/// Previously loaded data stays usable when one of these is returned;
/// callers decide whether to surface it or retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    /// Connection, DNS or transport failure
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    /// No response within the configured bound
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    /// Local file could not be read
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    /// Body was received but could not be read as text
    #[error("cannot decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            FetchError::Io { .. } | FetchError::Decode { .. } => false,
        }
    }

    /// Location (URL or path) the failed request was addressed to.
    pub fn location(&self) -> &str {
        match self {
            FetchError::Http { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Decode { url, .. } => url,
            FetchError::Io { path, .. } => path,
        }
    }
}

/// One malformed record inside a line-delimited partition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct RecordParseError {
    /// 1-based line number in the raw partition text
    pub line: usize,
    pub message: String,
}

/// Errors returned by the region loader and the mesh dataset loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("region `{0}` is not part of the region table")]
    UnknownRegion(String),
    /// The whole-dataset file was fetched but is not a usable FeatureCollection
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let url = "http://example.test/a".to_string();
        assert!(FetchError::Http { url: url.clone(), status: 503 }.is_transient());
        assert!(FetchError::Http { url: url.clone(), status: 429 }.is_transient());
        assert!(!FetchError::Http { url: url.clone(), status: 404 }.is_transient());
        assert!(FetchError::Timeout {
            url: url.clone(),
            after: Duration::from_secs(1)
        }
        .is_transient());
        assert!(!FetchError::Decode {
            url,
            message: "bad".into()
        }
        .is_transient());
    }

    #[test]
    fn test_record_parse_error_display() {
        let err = RecordParseError {
            line: 7,
            message: "expected value".into(),
        };
        assert_eq!(err.to_string(), "line 7: expected value");
    }
}
