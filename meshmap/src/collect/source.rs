//! Data source abstraction for mesh datasets and building partitions.

use std::future::Future;

use crate::error::FetchError;

/// Fetches a dataset or partition as text.
///
/// There is no `Send` bound: loading runs on a single cooperative thread
/// (the UI event loop in the browser) and browser fetch futures are not
/// `Send`.
pub trait DataSource {
    /// Retrieve the full text at `location` (URL or relative path).
    fn fetch_text(&self, location: &str) -> impl Future<Output = Result<String, FetchError>>;
}

impl<S: DataSource> DataSource for &S {
    fn fetch_text(&self, location: &str) -> impl Future<Output = Result<String, FetchError>> {
        (**self).fetch_text(location)
    }
}

#[cfg(feature = "native")]
pub use native::{retry_transient, FileSource, HttpSource};

#[cfg(feature = "native")]
mod native {
    use std::future::Future;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tracing::{debug, warn};

    use super::DataSource;
    use crate::config::FetchConfig;
    use crate::error::FetchError;

    /// Run `op` with a per-attempt timeout, retrying transient failures with
    /// exponential backoff until `config.max_attempts` is reached.
    pub async fn retry_transient<F, Fut>(
        location: &str,
        config: &FetchConfig,
        mut op: F,
    ) -> Result<String, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, FetchError>>,
    {
        let timeout = config.timeout();
        let max_attempts = config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: location.to_string(),
                    after: timeout,
                }),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = config.backoff_delay(attempt);
                    warn!(
                        location,
                        attempt,
                        ?delay,
                        error = %err,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// HTTP source backed by an async reqwest client.
    #[derive(Clone)]
    pub struct HttpSource {
        client: reqwest::Client,
        base_url: Option<String>,
        config: FetchConfig,
    }

    impl HttpSource {
        pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| FetchError::Network {
                    url: String::new(),
                    message: format!("failed to create HTTP client: {}", e),
                })?;

            Ok(HttpSource {
                client,
                base_url: None,
                config,
            })
        }

        /// Resolve relative locations against `base_url`.
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = Some(base_url.into());
            self
        }

        pub fn resolve(&self, location: &str) -> String {
            let absolute = location.starts_with("http://") || location.starts_with("https://");
            match (&self.base_url, absolute) {
                (Some(base), false) => format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    location.trim_start_matches('/')
                ),
                _ => location.to_string(),
            }
        }

        async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
            let response = self.client.get(url).send().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                        after: self.config.timeout(),
                    }
                } else {
                    FetchError::Network {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|e| FetchError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
        }
    }

    impl DataSource for HttpSource {
        async fn fetch_text(&self, location: &str) -> Result<String, FetchError> {
            let url = self.resolve(location);
            debug!(%url, "GET");
            retry_transient(&url, &self.config, || self.fetch_once(&url)).await
        }
    }

    /// Reads datasets from a local directory, e.g. an unpacked `web_data/`.
    #[derive(Debug, Clone)]
    pub struct FileSource {
        root: PathBuf,
    }

    impl FileSource {
        pub fn new(root: impl AsRef<Path>) -> Self {
            FileSource {
                root: root.as_ref().to_path_buf(),
            }
        }

        pub fn root(&self) -> &Path {
            &self.root
        }
    }

    impl DataSource for FileSource {
        async fn fetch_text(&self, location: &str) -> Result<String, FetchError> {
            let path = self.root.join(location);
            debug!(path = %path.display(), "reading");
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| FetchError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
        }
    }

}
