#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::rc::Rc;
use std::time::Duration;

use reqwest::blocking::Client as ReqwestClient;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
pub const HN_ITEM_URL: &str = "https://news.ycombinator.com/item";

/// The only network boundary: GET a URL and decode it as JSON.
pub trait RemoteClient {
    fn fetch_json(&self, url: &str) -> Result<Value>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<ReqwestClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("hn-browse/{}", crate::VERSION),
            timeout: Duration::from_secs(20),
            http_client: None,
        }
    }
}

pub struct HttpClient {
    http: ReqwestClient,
    user_agent: String,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("http client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => ReqwestClient::builder().timeout(config.timeout).build()?,
        };

        Ok(Self {
            http,
            user_agent: config.user_agent,
        })
    }
}

impl RemoteClient for HttpClient {
    fn fetch_json(&self, url: &str) -> Result<Value> {
        debug!(url, "GET");
        let transport = |err: reqwest::Error| Error::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        };

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "non-success response");
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(transport)?;
        serde_json::from_str(&body).map_err(|err| Error::decode(url, err))
    }
}

/// A remote client bound to an API root, which knows how item and list
/// URLs are laid out.
pub struct Api {
    client: Box<dyn RemoteClient>,
    base_url: String,
}

impl Api {
    pub fn new(client: Box<dyn RemoteClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn item_url(&self, id: i64) -> String {
        format!("{}/item/{}.json", self.base_url, id)
    }

    /// Absolute endpoints pass through; anything else is joined onto the
    /// API root.
    pub fn resolve(&self, endpoint: &str) -> String {
        if Url::parse(endpoint).is_ok() {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub fn fetch_json(&self, url: &str) -> Result<Value> {
        self.client.fetch_json(url)
    }
}

pub fn permalink(id: i64) -> String {
    format!("{HN_ITEM_URL}?id={id}")
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    responses: RefCell<HashMap<String, Result<Value>>>,
    calls: RefCell<Vec<String>>,
}

/// In-memory client serving canned JSON by URL. Clones share state, so a
/// test can keep one handle to inspect calls after handing another to an
/// `Api`.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockClient {
    state: Rc<MockState>,
}

#[cfg(test)]
impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: impl Into<String>, value: Value) -> &Self {
        self.state
            .responses
            .borrow_mut()
            .insert(url.into(), Ok(value));
        self
    }

    pub fn fail(&self, url: impl Into<String>, err: Error) -> &Self {
        self.state.responses.borrow_mut().insert(url.into(), Err(err));
        self
    }

    /// Serves `value` at the item URL for its own `id` field under `base`.
    pub fn item(&self, base: &str, value: Value) -> &Self {
        let id = value.get("id").and_then(Value::as_i64).unwrap_or_default();
        self.respond(format!("{}/item/{}.json", base.trim_end_matches('/'), id), value)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.state
            .calls
            .borrow()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.calls.borrow().len()
    }
}

#[cfg(test)]
impl RemoteClient for MockClient {
    fn fetch_json(&self, url: &str) -> Result<Value> {
        self.state.calls.borrow_mut().push(url.to_string());
        match self.state.responses.borrow().get(url) {
            Some(response) => response.clone(),
            None => Err(Error::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
