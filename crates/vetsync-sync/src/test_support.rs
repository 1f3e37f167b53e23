//! In-process [`SourceClient`] for tests.
//!
//! Responses are scripted per endpoint: queued pages are served once each in
//! order, a fixed response is served forever, and anything else is `None`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::source::{QueryParams, SourceClient};

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<Value>,
    fixed: Option<Value>,
    calls: usize,
    last_params: Vec<(String, String)>,
}

/// Scripted source with per-endpoint call counting.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, endpoint: &str, edit: impl FnOnce(&mut Script)) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap();
            edit(scripts.entry(endpoint.to_string()).or_default());
        }
        self
    }

    /// Queues one response; served once, after previously queued ones.
    pub fn page(self, endpoint: &str, body: Value) -> Self {
        self.script(endpoint, |s| s.queued.push_back(body))
    }

    /// Serves `body` on every call once the queue is drained.
    pub fn repeat(self, endpoint: &str, body: Value) -> Self {
        self.script(endpoint, |s| s.fixed = Some(body))
    }

    /// Number of fetches issued against `endpoint`.
    pub fn calls(&self, endpoint: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(endpoint)
            .map_or(0, |s| s.calls)
    }

    /// Parameters of the most recent fetch against `endpoint`.
    pub fn last_params(&self, endpoint: &str) -> Option<Vec<(String, String)>> {
        self.scripts
            .lock()
            .unwrap()
            .get(endpoint)
            .filter(|s| s.calls > 0)
            .map(|s| s.last_params.clone())
    }
}

#[async_trait]
impl SourceClient for ScriptedSource {
    async fn fetch(&self, endpoint: &str, params: &QueryParams<'_>) -> Option<Value> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(endpoint.to_string()).or_default();

        script.calls += 1;
        script.last_params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        script.queued.pop_front().or_else(|| script.fixed.clone())
    }
}

/// A page of minimal `{"id": n}` items.
pub fn page_of(ids: impl IntoIterator<Item = i64>) -> Value {
    Value::Array(ids.into_iter().map(|id| json!({ "id": id })).collect())
}
