//! Sample data sources.
//!
//! A source hands the session exactly two payloads. The round-robin order is
//! owned by [`SamplePair`]: `next` is what gets added (or replaced from), and
//! `alternate` is what a replace swaps in.

use std::time::Duration;

use catalog::{BoxFuture, DatasetPayload, id_for_data};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// A payload the session can put on the map.
pub type SamplePayload = DatasetPayload;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid sample data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected exactly two sample datasets, got {0}")]
    Count(usize),
}

/// The two payloads of a session, in round-robin order.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePair {
    next: SamplePayload,
    alternate: SamplePayload,
}

impl SamplePair {
    pub fn new(next: SamplePayload, alternate: SamplePayload) -> Self {
        Self { next, alternate }
    }

    pub fn next(&self) -> &SamplePayload {
        &self.next
    }

    pub fn alternate(&self) -> &SamplePayload {
        &self.alternate
    }

    /// `(a, b)` becomes `(b, a)`.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.next, &mut self.alternate);
    }
}

/// Supplies the sample pair.
///
/// Implementations must be `Send + Sync` so the fetch can run on its own task.
pub trait SampleDataSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<SamplePair, SourceError>>;
}

/// Fixed pair held in memory.
#[derive(Debug, Clone)]
pub struct StaticSampleSource {
    pair: SamplePair,
    delay: Duration,
}

impl StaticSampleSource {
    pub fn new(pair: SamplePair) -> Self {
        Self {
            pair,
            delay: Duration::ZERO,
        }
    }

    /// Two small point datasets bundled with the crate.
    pub fn builtin() -> Self {
        Self::new(SamplePair::new(
            SamplePayload::new(
                "earthquakes",
                "Earthquakes",
                Value::String(
                    "time,latitude,longitude,magnitude\n\
                     2024-01-01T03:10:00Z,37.77,-122.42,3.1\n\
                     2024-01-02T11:45:00Z,34.05,-118.24,4.4\n\
                     2024-01-03T22:05:00Z,36.17,-115.14,2.7\n"
                        .to_string(),
                ),
            ),
            SamplePayload::new(
                "cities",
                "Cities",
                Value::String(
                    "name,latitude,longitude,population\n\
                     San Francisco,37.77,-122.42,808437\n\
                     Los Angeles,34.05,-118.24,3820914\n\
                     Las Vegas,36.17,-115.14,656274\n"
                        .to_string(),
                ),
            ),
        ))
    }

    /// Simulates a slow fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SampleDataSource for StaticSampleSource {
    fn fetch(&self) -> BoxFuture<'_, Result<SamplePair, SourceError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.pair.clone())
        })
    }
}

/// Entry of the JSON document served by [`HttpSampleSource`].
#[derive(Debug, Deserialize)]
struct RawSample {
    #[serde(default)]
    id: Option<String>,
    label: String,
    data: Value,
}

/// Parses `[{"id"?, "label", "data"}, {...}]` into a pair, in document order.
///
/// Entries without an id get a content-derived one.
pub fn parse_sample_pair(body: &[u8]) -> Result<SamplePair, SourceError> {
    let raw: Vec<RawSample> = serde_json::from_slice(body)?;
    if raw.len() != 2 {
        return Err(SourceError::Count(raw.len()));
    }
    let mut payloads = raw.into_iter().map(|r| {
        let id = match r.id {
            Some(id) if !id.trim().is_empty() => id.into(),
            _ => id_for_data(&r.data),
        };
        SamplePayload {
            id,
            label: r.label,
            data: r.data,
        }
    });
    match (payloads.next(), payloads.next()) {
        (Some(a), Some(b)) => Ok(SamplePair::new(a, b)),
        _ => Err(SourceError::Count(0)),
    }
}

/// Fetches the pair as JSON over HTTP.
pub struct HttpSampleSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSampleSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl SampleDataSource for HttpSampleSource {
    fn fetch(&self) -> BoxFuture<'_, Result<SamplePair, SourceError>> {
        Box::pin(async move {
            debug!("fetching sample data from {}", self.url);
            let resp = self.client.get(&self.url).send().await?;
            if !resp.status().is_success() {
                return Err(SourceError::Status(resp.status()));
            }
            let body = resp.bytes().await?;
            let pair = parse_sample_pair(&body)?;
            info!(
                "loaded sample data: {} / {}",
                pair.next().label,
                pair.alternate().label
            );
            Ok(pair)
        })
    }
}
