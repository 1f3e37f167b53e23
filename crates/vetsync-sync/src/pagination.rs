//! # Pagination Walker
//!
//! Drives `?page=N` collection retrieval against a source that may loop,
//! wrap around or stop advancing without telling anyone.
//!
//! ## Walk Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  page = 1, seen = {}, accepted = 0                                      │
//! │                                                                         │
//! │  loop:                                                                  │
//! │    body = fetch(endpoint, page=N)                                       │
//! │      None                        → end: SourceUnavailable               │
//! │    items = body | body.data                                             │
//! │      neither an array            → end: UnexpectedPayload               │
//! │      empty                       → end: Exhausted                       │
//! │    seen_fraction(items) > 0.90   → end: RepeatedContent                 │
//! │    for each unseen item:                                                │
//! │      seen += id, accepted += 1, emit item                               │
//! │      accepted == cap             → end: LimitReached (no more fetches)  │
//! │    page += 1, sleep(page_delay)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repeat threshold is a heuristic observed on one clinic system; it is
//! configurable through [`WalkConfig::duplicate_threshold`].

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::source::SourceClient;
use vetsync_core::payload::source_key;

// =============================================================================
// Configuration
// =============================================================================

/// Walk parameters.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// A page whose already-seen fraction exceeds this ends the walk.
    pub duplicate_threshold: f64,

    /// Hard cap on accepted items.
    pub max_items: Option<usize>,

    /// Sleep between two page fetches.
    pub page_delay: Duration,

    /// When false the endpoint is fetched once, without a `page` parameter.
    pub paginated: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        WalkConfig {
            duplicate_threshold: 0.90,
            max_items: None,
            page_delay: Duration::from_millis(200),
            paginated: true,
        }
    }
}

impl WalkConfig {
    /// Configuration for an endpoint that returns everything at once.
    pub fn single_page() -> Self {
        WalkConfig {
            paginated: false,
            page_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

// =============================================================================
// Walk Outcome
// =============================================================================

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkEnd {
    /// An empty page, or the single page of an unpaginated endpoint.
    Exhausted,
    /// The source served mostly already-seen ids.
    RepeatedContent,
    /// The hard cap was hit.
    LimitReached,
    /// The source returned no data for a page.
    SourceUnavailable,
    /// The body was neither an array nor a `{data: [...]}` envelope.
    UnexpectedPayload,
}

impl WalkEnd {
    /// True when the walk did not reach a natural end.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, WalkEnd::SourceUnavailable | WalkEnd::UnexpectedPayload)
    }
}

/// Result of one [`PaginationWalker::next_page`] call.
#[derive(Debug)]
pub enum PageStep {
    /// Newly seen items of the page (may be empty).
    Items(Vec<Value>),
    /// The walk is over.
    Done(WalkEnd),
}

// =============================================================================
// Walker
// =============================================================================

/// Stateful page iterator over one endpoint.
#[derive(Debug)]
pub struct PaginationWalker {
    endpoint: String,
    params: Vec<(&'static str, String)>,
    config: WalkConfig,
    page: u32,
    seen: HashSet<String>,
    accepted: usize,
    fetches: usize,
    end: Option<WalkEnd>,
}

impl PaginationWalker {
    pub fn new(endpoint: impl Into<String>, config: WalkConfig) -> Self {
        PaginationWalker {
            endpoint: endpoint.into(),
            params: Vec::new(),
            config,
            page: 1,
            seen: HashSet::new(),
            accepted: 0,
            fetches: 0,
            end: None,
        }
    }

    /// Adds a fixed query parameter sent with every page.
    pub fn with_param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Items handed downstream so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Fetches issued so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Why the walk stopped, once it has.
    pub fn end(&self) -> Option<WalkEnd> {
        self.end
    }

    fn finish(&mut self, end: WalkEnd) -> PageStep {
        self.end = Some(end);
        PageStep::Done(end)
    }

    /// Fetches the next page and returns its unseen items.
    pub async fn next_page<S>(&mut self, source: &S) -> PageStep
    where
        S: SourceClient + ?Sized,
    {
        if let Some(end) = self.end {
            return PageStep::Done(end);
        }

        if self.fetches > 0 && !self.config.page_delay.is_zero() {
            tokio::time::sleep(self.config.page_delay).await;
        }

        let mut params = self.params.clone();
        if self.config.paginated {
            params.push(("page", self.page.to_string()));
        }

        self.fetches += 1;
        let Some(body) = source.fetch(&self.endpoint, &params).await else {
            warn!(endpoint = %self.endpoint, page = self.page, "No data for page");
            return self.finish(WalkEnd::SourceUnavailable);
        };

        let Some(items) = unwrap_items(body) else {
            warn!(endpoint = %self.endpoint, page = self.page, "Unexpected page shape");
            return self.finish(WalkEnd::UnexpectedPayload);
        };

        if items.is_empty() {
            debug!(endpoint = %self.endpoint, page = self.page, "Empty page, walk complete");
            return self.finish(WalkEnd::Exhausted);
        }

        let repeated = items
            .iter()
            .filter_map(source_key)
            .filter(|key| self.seen.contains(key))
            .count();
        let fraction = repeated as f64 / items.len() as f64;
        if fraction > self.config.duplicate_threshold {
            info!(
                endpoint = %self.endpoint,
                page = self.page,
                fraction,
                "Page repeats already-seen records, ending walk"
            );
            return self.finish(WalkEnd::RepeatedContent);
        }

        let mut fresh = Vec::with_capacity(items.len() - repeated);
        for item in items {
            // Items without an id cannot be deduplicated; they go downstream
            // and fail validation there.
            if let Some(key) = source_key(&item) {
                if !self.seen.insert(key) {
                    continue;
                }
            }

            fresh.push(item);
            self.accepted += 1;

            if self.config.max_items == Some(self.accepted) {
                info!(
                    endpoint = %self.endpoint,
                    accepted = self.accepted,
                    "Item cap reached"
                );
                self.end = Some(WalkEnd::LimitReached);
                return PageStep::Items(fresh);
            }
        }

        if self.config.paginated {
            self.page += 1;
        } else {
            self.end = Some(WalkEnd::Exhausted);
        }

        PageStep::Items(fresh)
    }
}

/// Accepts a raw array or an object carrying a `data` array.
pub(crate) fn unwrap_items(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{page_of, ScriptedSource};
    use serde_json::json;

    fn config(max_items: Option<usize>) -> WalkConfig {
        WalkConfig {
            max_items,
            page_delay: Duration::ZERO,
            ..WalkConfig::default()
        }
    }

    async fn drain(walker: &mut PaginationWalker, source: &ScriptedSource) -> (usize, WalkEnd) {
        let mut total = 0;
        loop {
            match walker.next_page(source).await {
                PageStep::Items(items) => total += items.len(),
                PageStep::Done(end) => return (total, end),
            }
        }
    }

    #[tokio::test]
    async fn test_repeating_page_terminates_on_second_fetch() {
        let source = ScriptedSource::new().repeat("/pets", page_of(1..=50));
        let mut walker = PaginationWalker::new("/pets", config(None));

        let (accepted, end) = drain(&mut walker, &source).await;

        assert_eq!(accepted, 50);
        assert_eq!(end, WalkEnd::RepeatedContent);
        assert_eq!(source.calls("/pets"), 2);
    }

    #[tokio::test]
    async fn test_cap_stops_fetching() {
        let source = ScriptedSource::new()
            .page("/pets", page_of(1..=100))
            .page("/pets", page_of(101..=200))
            .page("/pets", page_of(201..=300));
        let mut walker = PaginationWalker::new("/pets", config(Some(120)));

        match walker.next_page(&source).await {
            PageStep::Items(items) => assert_eq!(items.len(), 100),
            other => panic!("unexpected {:?}", other),
        }
        match walker.next_page(&source).await {
            PageStep::Items(items) => assert_eq!(items.len(), 20),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            walker.next_page(&source).await,
            PageStep::Done(WalkEnd::LimitReached)
        ));

        assert_eq!(walker.accepted(), 120);
        assert_eq!(source.calls("/pets"), 2);
    }

    #[tokio::test]
    async fn test_empty_page_exhausts() {
        let source = ScriptedSource::new()
            .page("/pets", page_of(1..=3))
            .page("/pets", json!([]));
        let mut walker = PaginationWalker::new("/pets", config(None));

        assert_eq!(drain(&mut walker, &source).await, (3, WalkEnd::Exhausted));
    }

    #[tokio::test]
    async fn test_envelope_and_raw_array_are_both_accepted() {
        let source = ScriptedSource::new()
            .page("/agendamentos", json!({"data": [{"id": 1}, {"id": 2}]}))
            .page("/agendamentos", json!([{"id": 3}]))
            .page("/agendamentos", json!({"data": []}));
        let mut walker = PaginationWalker::new("/agendamentos", config(None));

        assert_eq!(drain(&mut walker, &source).await, (3, WalkEnd::Exhausted));
    }

    #[tokio::test]
    async fn test_partial_overlap_keeps_only_new_items() {
        // 5 of 10 already seen: below the threshold, walk continues
        let source = ScriptedSource::new()
            .page("/pets", page_of(1..=10))
            .page("/pets", page_of(6..=15))
            .page("/pets", json!([]));
        let mut walker = PaginationWalker::new("/pets", config(None));

        assert_eq!(drain(&mut walker, &source).await, (15, WalkEnd::Exhausted));
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let source = ScriptedSource::new()
            .page("/pets", page_of(1..=10))
            .page("/pets", page_of(6..=15));
        let mut walker = PaginationWalker::new(
            "/pets",
            WalkConfig {
                duplicate_threshold: 0.4,
                ..config(None)
            },
        );

        assert_eq!(drain(&mut walker, &source).await, (10, WalkEnd::RepeatedContent));
    }

    #[tokio::test]
    async fn test_absent_page_ends_walk() {
        let source = ScriptedSource::new();
        let mut walker = PaginationWalker::new("/pets", config(None));

        let (accepted, end) = drain(&mut walker, &source).await;
        assert_eq!(accepted, 0);
        assert_eq!(end, WalkEnd::SourceUnavailable);
        assert!(end.is_abnormal());
    }

    #[tokio::test]
    async fn test_unexpected_shape() {
        let source = ScriptedSource::new().page("/pets", json!({"items": []}));
        let mut walker = PaginationWalker::new("/pets", config(None));

        assert_eq!(drain(&mut walker, &source).await, (0, WalkEnd::UnexpectedPayload));
    }

    #[tokio::test]
    async fn test_single_page_endpoint_fetches_once() {
        let source = ScriptedSource::new().repeat("/clientes", page_of(1..=4));
        let mut walker = PaginationWalker::new("/clientes", WalkConfig::single_page());

        assert_eq!(drain(&mut walker, &source).await, (4, WalkEnd::Exhausted));
        assert_eq!(source.calls("/clientes"), 1);
        assert_eq!(source.last_params("/clientes"), Some(vec![]));
    }

    #[tokio::test]
    async fn test_fixed_params_and_page_number_are_sent() {
        let source = ScriptedSource::new().page("/agendamentos", json!([]));
        let mut walker = PaginationWalker::new("/agendamentos", config(None))
            .with_param("data_inicio", "2022-01-01");

        drain(&mut walker, &source).await;
        assert_eq!(
            source.last_params("/agendamentos"),
            Some(vec![
                ("data_inicio".to_string(), "2022-01-01".to_string()),
                ("page".to_string(), "1".to_string()),
            ])
        );
    }
}
