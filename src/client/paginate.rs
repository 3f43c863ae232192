//! Generic page-by-page accumulation.
//!
//! [`ApiClient::paginate`] repeatedly issues a request with an
//! escalating page indicator (an explicit page number, or a next-page
//! token extracted from the prior response) and concatenates the
//! extracted result arrays. Strategies with irregular termination
//! conditions implement their own loops on top of
//! [`ApiClient::request`] instead; this utility covers the regular
//! cases.

use crate::client::api_client::ApiClient;
use crate::client::request::{RequestSpec, ResponseEnvelope};
use crate::core::error::Result;

use serde_json::{json, Value};

/// Configuration for one pagination run.
#[derive(Debug, Clone)]
pub struct PageSpec {
    /// The request re-issued for every page. Its query is extended with
    /// the page indicator each round.
    pub request: RequestSpec,

    /// Dot-separated path to the result array in the response body.
    pub data_path: String,

    /// Query parameter carrying the page number. When set, the number
    /// starts at [`start_page`](Self::start_page) and increments by one
    /// each round.
    pub page_param: Option<String>,

    /// First page number sent.
    pub start_page: u64,

    /// Requested page size; a page shorter than this stops the run.
    pub page_size: Option<u64>,

    /// Query parameter carrying the page size, when the server expects
    /// one.
    pub page_size_param: Option<String>,

    /// Dot-separated path to the next-page token in the response body.
    /// When set, an absent or falsy token stops the run.
    pub next_token_path: Option<String>,

    /// Query parameter carrying the next-page token.
    pub token_param: Option<String>,

    /// Maximum number of pages to fetch.
    pub max_pages: usize,

    /// Whether an empty page stops the run.
    pub stop_when_empty: bool,
}

impl PageSpec {
    /// Creates a pagination spec over the given request with defaults:
    /// results under `items`, ten pages at most, stop on empty.
    pub fn new(request: RequestSpec) -> Self {
        Self {
            request,
            data_path: "items".to_string(),
            page_param: None,
            start_page: 1,
            page_size: None,
            page_size_param: None,
            next_token_path: None,
            token_param: None,
            max_pages: 10,
            stop_when_empty: true,
        }
    }

    /// Sets the result-array path.
    pub fn with_data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Enables page-number mode with the given parameter name.
    pub fn with_page_param(mut self, param: impl Into<String>) -> Self {
        self.page_param = Some(param.into());
        self
    }

    /// Sets the first page number.
    pub fn with_start_page(mut self, page: u64) -> Self {
        self.start_page = page;
        self
    }

    /// Sets the expected page size, optionally sent under the given
    /// parameter name.
    pub fn with_page_size(mut self, size: u64, param: Option<&str>) -> Self {
        self.page_size = Some(size);
        self.page_size_param = param.map(str::to_string);
        self
    }

    /// Enables next-token mode: the token is read from `token_path` in
    /// each response and sent back under `param`.
    pub fn with_next_token(mut self, token_path: impl Into<String>, param: impl Into<String>) -> Self {
        self.next_token_path = Some(token_path.into());
        self.token_param = Some(param.into());
        self
    }

    /// Sets the page budget.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sets whether an empty page stops the run.
    pub fn with_stop_when_empty(mut self, stop: bool) -> Self {
        self.stop_when_empty = stop;
        self
    }
}

/// The accumulated result of a pagination run.
#[derive(Debug, Clone)]
pub struct PageSet {
    /// All extracted items, concatenated in fetch order.
    pub items: Vec<Value>,
    /// The raw response envelopes, one per fetched page.
    pub responses: Vec<ResponseEnvelope>,
}

impl ApiClient {
    /// Fetches pages until a stop condition is met and returns the
    /// concatenated items plus the raw responses.
    ///
    /// Stop conditions, checked after each page: the extracted page is
    /// empty (when `stop_when_empty`), the page is shorter than the
    /// requested page size, the next-page token is absent or falsy (in
    /// token mode), or `max_pages` is reached.
    pub async fn paginate(&self, spec: PageSpec) -> Result<PageSet> {
        let mut items = Vec::new();
        let mut responses = Vec::new();
        let mut token: Option<String> = None;

        for round in 0..spec.max_pages {
            let mut request = spec.request.clone();
            if let Some(param) = &spec.page_param {
                request = request.with_query(param.clone(), json!(spec.start_page + round as u64));
            }
            if let (Some(param), Some(size)) = (&spec.page_size_param, spec.page_size) {
                request = request.with_query(param.clone(), json!(size));
            }
            if let (Some(param), Some(current)) = (&spec.token_param, &token) {
                request = request.with_query(param.clone(), json!(current));
            }

            let envelope = self.request(request).await?;
            let page = extract_items(&envelope, &spec.data_path);
            let count = page.len();
            items.extend(page);

            let next = spec
                .next_token_path
                .as_deref()
                .and_then(|path| token_at(&envelope, path));
            responses.push(envelope);

            tracing::debug!(round, count, total = items.len(), "fetched page");

            if count == 0 && spec.stop_when_empty {
                break;
            }
            if spec.page_size.is_some_and(|size| (count as u64) < size) {
                break;
            }
            if spec.next_token_path.is_some() {
                match next {
                    Some(value) => token = Some(value),
                    None => break,
                }
            }
        }

        Ok(PageSet { items, responses })
    }
}

/// Extracts the result array at `path`: an array yields its elements, a
/// non-null singleton yields itself, anything else yields an empty page.
fn extract_items(envelope: &ResponseEnvelope, path: &str) -> Vec<Value> {
    match envelope.data_at(path) {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(singleton) => vec![singleton.clone()],
    }
}

/// Reads a next-page token, treating null, `false`, and the empty
/// string as absent.
fn token_at(envelope: &ResponseEnvelope, path: &str) -> Option<String> {
    match envelope.data_at(path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
