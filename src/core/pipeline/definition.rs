use serde::Serialize;

use super::step::Step;

pub const DEFAULT_CACHE_SECONDS: u32 = 60;
pub const DEFAULT_CACHE_SCOPE: &str = "webapp";

/// Response-cache directive declared on the `pipeline` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDirective {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub time_to_live_seconds: u32,
    pub time_to_idle_seconds: u32,
    pub scope: String,
    pub include_headers: bool,
}

impl Default for CacheDirective {
    fn default() -> Self {
        Self {
            enabled: false,
            key: None,
            time_to_live_seconds: DEFAULT_CACHE_SECONDS,
            time_to_idle_seconds: DEFAULT_CACHE_SECONDS,
            scope: DEFAULT_CACHE_SCOPE.to_string(),
            include_headers: false,
        }
    }
}

/// Ordered, immutable step list produced from one pipeline definition.
///
/// Insertion order is execution order. Once built a `Pipeline` is never
/// mutated, so it can sit behind an `Arc` and serve concurrent requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    steps: Vec<Step>,
    cache: CacheDirective,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>, cache: CacheDirective) -> Self {
        Self { steps, cache }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn cache(&self) -> &CacheDirective {
        &self.cache
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}
