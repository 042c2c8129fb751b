//! Sample sources and the query-window fallback cascade
//!
//! A [`SampleSource`] answers range and instant queries with a
//! [`SampleSeries`]. [`fetch_with_fallback`] walks from the full lookback
//! window to the last hour to a single instant value and keeps the first
//! non-empty answer.

mod prometheus;

pub use prometheus::{PrometheusSource, DEFAULT_TIMEOUT_SECS};

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::SampleSeries;

/// Hours covered by the short fallback window
pub const RECENT_WINDOW_HOURS: u32 = 1;

/// Errors raised while fetching samples
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("invalid source url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("query endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("query was not successful: {0}")]
    Query(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Time window used for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchWindow {
    /// Full historical lookback
    Lookback { days: u32 },
    /// Short recent window
    Recent { hours: u32 },
    /// Single current value
    Instant,
}

impl FetchWindow {
    /// Span covered by a range window; `None` for instant queries
    pub fn span(&self) -> Option<Duration> {
        match self {
            FetchWindow::Lookback { days } => Some(Duration::days(i64::from(*days))),
            FetchWindow::Recent { hours } => Some(Duration::hours(i64::from(*hours))),
            FetchWindow::Instant => None,
        }
    }

    /// Resolution step for range queries, in seconds
    pub fn step_secs(&self) -> u64 {
        match self {
            FetchWindow::Lookback { .. } => 300,
            FetchWindow::Recent { .. } | FetchWindow::Instant => 60,
        }
    }

    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            FetchWindow::Lookback { .. } => "lookback",
            FetchWindow::Recent { .. } => "recent",
            FetchWindow::Instant => "instant",
        }
    }

    /// The windows tried for a metric, most informative first
    pub fn cascade(lookback_days: u32) -> [FetchWindow; 3] {
        [
            FetchWindow::Lookback {
                days: lookback_days,
            },
            FetchWindow::Recent {
                hours: RECENT_WINDOW_HOURS,
            },
            FetchWindow::Instant,
        ]
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchWindow::Lookback { days } => write!(f, "{}d", days),
            FetchWindow::Recent { hours } => write!(f, "{}h", hours),
            FetchWindow::Instant => write!(f, "instant"),
        }
    }
}

/// Backend capable of answering metric queries
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Samples for `query` over a range window ending now
    async fn range(&self, query: &str, span: Duration, step_secs: u64)
        -> Result<SampleSeries, SourceError>;

    /// Current value(s) of `query`
    async fn instant(&self, query: &str) -> Result<SampleSeries, SourceError>;

    /// Samples for `query` in the given window
    async fn fetch(&self, query: &str, window: FetchWindow) -> Result<SampleSeries, SourceError> {
        match window.span() {
            Some(span) => self.range(query, span, window.step_secs()).await,
            None => self.instant(query).await,
        }
    }
}

/// Fetch samples, falling back to narrower windows while results are empty.
///
/// Source errors count as an empty window. Returns the first non-empty
/// series with the window that produced it, or an empty series and `None`.
pub async fn fetch_with_fallback(
    source: &dyn SampleSource,
    query: &str,
    lookback_days: u32,
) -> (SampleSeries, Option<FetchWindow>) {
    for window in FetchWindow::cascade(lookback_days) {
        match source.fetch(query, window).await {
            Ok(series) if !series.is_empty() => {
                debug!(window = %window, samples = series.len(), "Fetched samples");
                return (series, Some(window));
            }
            Ok(_) => {
                info!(window = %window, query = %query, "No data in window, falling back");
            }
            Err(e) => {
                debug!(window = %window, query = %query, error = %e, "Error querying source");
            }
        }
    }
    (Vec::new(), None)
}
