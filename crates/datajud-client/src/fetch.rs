//! Search-after pagination loop.
//!
//! One request in flight at a time. Pages are appended to a single
//! accumulator; nothing is deduplicated here. Any failure ends the loop and
//! the pages collected so far are still returned.

use std::fmt;
use std::time::Duration;

use datajud_core::{PageCursor, RawRecord, SearchRequest};
use tracing::{info, warn};

use crate::backend::SearchBackend;
use crate::config::ClientConfig;
use crate::SearchError;

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back empty.
    Exhausted,
    /// The configured page limit was reached.
    PageLimit,
    /// The last hit of a page carried no sort values to continue from.
    MissingCursor,
    /// The server returned a cursor already used in this run.
    StalledCursor,
    /// Non-2xx response.
    Server { status: u16, body: String },
    /// Connection, timeout or decode failure.
    Transport(String),
}

impl StopReason {
    /// True when the run ended before the server ran out of hits.
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Server { .. } | StopReason::Transport(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => f.write_str("no more results"),
            StopReason::PageLimit => f.write_str("page limit reached"),
            StopReason::MissingCursor => f.write_str("last hit had no sort values"),
            StopReason::StalledCursor => f.write_str("cursor already visited"),
            StopReason::Server { status, body } => write!(f, "server returned {status}: {body}"),
            StopReason::Transport(msg) => write!(f, "connection error: {msg}"),
        }
    }
}

/// Result of one extraction run.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Every hit from every page, in fetch order.
    pub records: Vec<RawRecord>,
    /// Non-empty pages fetched.
    pub pages: u32,
    pub stop: StopReason,
}

/// Drives a [`SearchBackend`] through every page of a search.
pub struct Fetcher<B> {
    backend: B,
    page_delay: Duration,
    max_pages: Option<u32>,
}

impl<B: SearchBackend> Fetcher<B> {
    /// No delay, no page limit.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            page_delay: Duration::ZERO,
            max_pages: None,
        }
    }

    /// Delay and page limit taken from the run configuration.
    pub fn from_config(backend: B, config: &ClientConfig) -> Self {
        Self {
            backend,
            page_delay: config.page_delay,
            max_pages: config.max_pages,
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch every page matching `request`'s window and filter.
    pub async fn fetch_all(&self, request: &SearchRequest) -> FetchOutcome {
        let mut records: Vec<RawRecord> = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        let mut seen: Vec<PageCursor> = Vec::new();
        let mut pages = 0u32;

        let stop = loop {
            let body = request.page_body(cursor.as_ref());
            let page = match self.backend.search(&body).await {
                Ok(page) => page,
                Err(SearchError::Server { status, body }) => {
                    if status == 401 {
                        warn!(status, body = %body, "API rejected the key");
                    } else {
                        warn!(status, body = %body, "unexpected server response");
                    }
                    break StopReason::Server { status, body };
                }
                Err(e) => {
                    warn!(error = %e, "search request failed");
                    break StopReason::Transport(e.to_string());
                }
            };

            if page.is_empty() {
                info!(total = records.len(), "no more results");
                break StopReason::Exhausted;
            }

            pages += 1;
            let fetched = page.len();
            let next = page.last().and_then(RawRecord::cursor);
            records.extend(page);
            info!(page = pages, fetched, total = records.len(), "fetched page");

            if self.max_pages.is_some_and(|max| pages >= max) {
                break StopReason::PageLimit;
            }
            let Some(next) = next else {
                warn!(page = pages, "last hit has no sort values, cannot continue");
                break StopReason::MissingCursor;
            };
            if seen.contains(&next) {
                warn!(page = pages, "cursor already visited");
                break StopReason::StalledCursor;
            }
            seen.push(next.clone());
            cursor = Some(next);

            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        };

        FetchOutcome {
            records,
            pages,
            stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use datajud_core::{QuerySpec, SearchWindow};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records every request body.
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<Vec<RawRecord>, SearchError>>>,
        requests: Mutex<Vec<Value>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<Vec<RawRecord>, SearchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        async fn search(&self, body: &Value) -> Result<Vec<RawRecord>, SearchError> {
            self.requests.lock().unwrap().push(body.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// `n` hits with descending dates and ascending ids, starting at `offset`.
    fn page(offset: usize, n: usize) -> Vec<RawRecord> {
        (offset..offset + n)
            .map(|i| {
                let date = 1_700_000_000_000i64 - (i as i64) * 1000;
                let id = format!("{i:07}-00.2023.8.09.0051");
                RawRecord {
                    source: json!({ "numeroProcesso": id }),
                    sort: Some(vec![json!(date), json!(id)]),
                }
            })
            .collect()
    }

    fn request() -> SearchRequest {
        let d = |day| {
            NaiveDate::from_ymd_opt(2023, 5, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        SearchRequest::new(SearchWindow::new(d(1), d(30)).unwrap(), QuerySpec::lgpd())
    }

    #[tokio::test]
    async fn accumulates_until_empty_page() {
        let backend = ScriptedBackend::new(vec![Ok(page(0, 100)), Ok(page(100, 37)), Ok(vec![])]);
        let fetcher = Fetcher::new(&backend);
        let outcome = fetcher.fetch_all(&request()).await;

        assert_eq!(outcome.records.len(), 137);
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn threads_cursor_from_last_hit() {
        let first = page(0, 100);
        let last_sort = first.last().unwrap().sort.clone().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(first), Ok(vec![])]);
        Fetcher::new(&backend).fetch_all(&request()).await;

        let reqs = backend.requests();
        assert!(reqs[0].get("search_after").is_none());
        assert_eq!(reqs[1]["search_after"], Value::Array(last_sort));
    }

    #[tokio::test]
    async fn cursors_are_monotonic_and_never_revisited() {
        let backend = ScriptedBackend::new(vec![
            Ok(page(0, 100)),
            Ok(page(100, 100)),
            Ok(page(200, 5)),
            Ok(vec![]),
        ]);
        Fetcher::new(&backend).fetch_all(&request()).await;

        let cursors: Vec<Value> = backend
            .requests()
            .iter()
            .filter_map(|r| r.get("search_after").cloned())
            .collect();
        assert_eq!(cursors.len(), 3);
        for pair in cursors.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert_ne!(a, b);
            let (da, db) = (a[0].as_i64().unwrap(), b[0].as_i64().unwrap());
            assert!(da >= db, "dates must not increase");
            if da == db {
                assert!(a[1].as_str() < b[1].as_str());
            }
        }
    }

    #[tokio::test]
    async fn server_error_keeps_partial_results() {
        let backend = ScriptedBackend::new(vec![
            Ok(page(0, 100)),
            Err(SearchError::Server {
                status: 500,
                body: "boom".into(),
            }),
            Ok(page(100, 100)),
        ]);
        let outcome = Fetcher::new(&backend).fetch_all(&request()).await;

        assert_eq!(outcome.records.len(), 100);
        assert_eq!(
            outcome.stop,
            StopReason::Server {
                status: 500,
                body: "boom".into()
            }
        );
        assert!(outcome.stop.is_failure());
        // No retry after the failure.
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn transport_error_on_first_page_returns_empty() {
        let decode = serde_json::from_str::<Value>("{").unwrap_err();
        let backend = ScriptedBackend::new(vec![Err(SearchError::Json(decode))]);
        let outcome = Fetcher::new(&backend).fetch_all(&request()).await;

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.pages, 0);
        assert!(matches!(outcome.stop, StopReason::Transport(ref m) if m.contains("JSON")));
    }

    #[tokio::test]
    async fn page_limit_stops_early() {
        let backend = ScriptedBackend::new(vec![Ok(page(0, 100)), Ok(page(100, 100))]);
        let outcome = Fetcher::new(&backend)
            .with_max_pages(Some(1))
            .fetch_all(&request())
            .await;

        assert_eq!(outcome.records.len(), 100);
        assert_eq!(outcome.stop, StopReason::PageLimit);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn missing_sort_stops_instead_of_restarting() {
        let mut hits = page(0, 3);
        hits[2].sort = None;
        let backend = ScriptedBackend::new(vec![Ok(hits), Ok(page(0, 3))]);
        let outcome = Fetcher::new(&backend).fetch_all(&request()).await;

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.stop, StopReason::MissingCursor);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn repeated_page_is_accumulated_then_stops() {
        let backend = ScriptedBackend::new(vec![Ok(page(0, 10)), Ok(page(0, 10))]);
        let outcome = Fetcher::new(&backend).fetch_all(&request()).await;

        // Duplicates stay in the result set; dedup happens after flattening.
        assert_eq!(outcome.records.len(), 20);
        assert_eq!(outcome.stop, StopReason::StalledCursor);
    }

    #[tokio::test]
    async fn cycling_cursor_is_caught() {
        // Pages end on cursors A, B, then A again.
        let backend = ScriptedBackend::new(vec![
            Ok(page(0, 5)),
            Ok(page(5, 5)),
            Ok(page(0, 5)),
            Ok(page(10, 5)),
        ]);
        let outcome = Fetcher::new(&backend).fetch_all(&request()).await;

        assert_eq!(outcome.stop, StopReason::StalledCursor);
        assert_eq!(outcome.records.len(), 15);
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_pages() {
        let backend = ScriptedBackend::new(vec![Ok(page(0, 2)), Ok(page(2, 2)), Ok(vec![])]);
        let start = tokio::time::Instant::now();
        Fetcher::new(&backend)
            .with_page_delay(Duration::from_secs(3))
            .fetch_all(&request())
            .await;

        assert!(start.elapsed() >= Duration::from_secs(6));
    }
}
