use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unreadable response from {url}: {message}")]
    Body { url: String, message: String },
    #[error("invalid url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("could not build http client: {0}")]
    Client(String),
}

/// Raw HTTP GET boundary. Implementations return the body of a 2xx response.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Produces the rendered HTML of a job board page. Boards that need a real
/// browser plug in here; the default fetches the server-rendered markup.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|err| FetchError::Body {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

pub struct HttpPageRenderer {
    fetcher: Arc<dyn HttpFetch>,
}

impl HttpPageRenderer {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        self.fetcher.get_text(url).await
    }
}

/// Spaces out successive calls against one backend by a fixed delay. The
/// first call goes through immediately.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let start = {
            let mut slot = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let start = match *slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *slot = Some(start + self.delay);
            start
        };

        if start > now {
            tokio::time::sleep_until(start).await;
        }
    }
}

/// Appends query pairs to `base`, keeping any query it already carries.
pub(crate) fn with_query(base: &str, pairs: &[(&str, String)]) -> Result<String, FetchError> {
    let mut url = Url::parse(base).map_err(|err| FetchError::InvalidUrl {
        url: base.to_string(),
        message: err.to_string(),
    })?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Deserializes a JSON body, attributing failures to the url it came from.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    url: &str,
    body: &str,
) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|err| FetchError::Body {
        url: url.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_query_keeps_existing_parameters() {
        let url = with_query(
            "https://api.lever.co/v0/postings/netflix?mode=json",
            &[("skip", "100".to_string()), ("limit", "100".to_string())],
        )
        .expect("valid url");

        assert_eq!(
            url,
            "https://api.lever.co/v0/postings/netflix?mode=json&skip=100&limit=100"
        );
    }

    #[test]
    fn with_query_rejects_relative_urls() {
        let error = with_query("/jobs", &[]).expect_err("relative url");
        assert!(matches!(error, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn throttle_spaces_calls_by_delay() {
        let throttle = Throttle::new(Duration::from_millis(40));
        let started = Instant::now();

        throttle.wait().await;
        assert!(started.elapsed() < Duration::from_millis(40));

        throttle.wait().await;
        throttle.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn zero_delay_never_sleeps() {
        let throttle = Throttle::new(Duration::ZERO);
        let started = Instant::now();
        for _ in 0..10 {
            throttle.wait().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
