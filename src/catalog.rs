use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::Api;
use crate::error::{Error, Result};
use crate::item::ContentNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoryType {
    #[default]
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl StoryType {
    pub const ALL: [StoryType; 6] = [
        StoryType::Top,
        StoryType::New,
        StoryType::Best,
        StoryType::Ask,
        StoryType::Show,
        StoryType::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Top => "topstories",
            StoryType::New => "newstories",
            StoryType::Best => "beststories",
            StoryType::Ask => "askstories",
            StoryType::Show => "showstories",
            StoryType::Job => "jobstories",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StoryType::Top => "Top stories",
            StoryType::New => "New stories",
            StoryType::Best => "Best stories",
            StoryType::Ask => "Top asks",
            StoryType::Show => "Show HN",
            StoryType::Job => "Jobs",
        }
    }

    pub fn feed_spec(&self) -> FeedSpec {
        FeedSpec {
            name: self.display_name().to_string(),
            endpoint: format!("{}.json", self.as_str()),
        }
    }
}

/// A named list endpoint. Relative endpoints are resolved against the API
/// root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub endpoint: String,
}

pub fn default_feeds() -> Vec<FeedSpec> {
    StoryType::ALL.iter().map(StoryType::feed_spec).collect()
}

/// A story list: its ids are fetched once, and the nodes built from them
/// are cached by id.
pub struct Feed {
    url: String,
    api: Rc<Api>,
    ids: OnceCell<Vec<i64>>,
    nodes: RefCell<HashMap<i64, Rc<ContentNode>>>,
}

impl Feed {
    pub fn new(url: impl Into<String>, api: Rc<Api>) -> Self {
        Self {
            url: url.into(),
            api,
            ids: OnceCell::new(),
            nodes: RefCell::new(HashMap::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ids(&self) -> Result<&[i64]> {
        let ids = self.ids.get_or_try_init(|| {
            debug!(url = %self.url, "loading feed ids");
            let value = self.api.fetch_json(&self.url)?;
            if value.is_null() {
                return Err(Error::decode(&self.url, "feed list does not exist"));
            }
            serde_json::from_value::<Vec<i64>>(value).map_err(|err| Error::decode(&self.url, err))
        })?;
        Ok(ids.as_slice())
    }

    pub fn id_count(&self) -> Result<usize> {
        Ok(self.ids()?.len())
    }

    pub fn id_at(&self, index: usize) -> Result<i64> {
        let ids = self.ids()?;
        ids.get(index).copied().ok_or(Error::InvalidPostIndex {
            index,
            len: ids.len(),
        })
    }

    pub fn node_at(&self, index: usize) -> Result<Rc<ContentNode>> {
        let id = self.id_at(index)?;
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes
            .entry(id)
            .or_insert_with(|| Rc::new(ContentNode::new(id, self.api.clone())));
        Ok(node.clone())
    }
}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("url", &self.url)
            .field("ids", &self.ids.get().map(Vec::len))
            .field("cached_nodes", &self.nodes.borrow().len())
            .finish()
    }
}

/// The fixed, ordered set of feeds the user can browse. Realized feeds are
/// kept per endpoint for the life of the catalog.
pub struct FeedCatalog {
    api: Rc<Api>,
    feeds: Vec<FeedSpec>,
    realized: RefCell<HashMap<String, Rc<Feed>>>,
}

impl FeedCatalog {
    pub fn new(api: Rc<Api>, feeds: Vec<FeedSpec>) -> Self {
        Self {
            api,
            feeds,
            realized: RefCell::new(HashMap::new()),
        }
    }

    pub fn feed_names(&self) -> impl Iterator<Item = &str> {
        self.feeds.iter().map(|feed| feed.name.as_str())
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    pub fn feed_name(&self, index: usize) -> Option<&str> {
        self.feeds.get(index).map(|feed| feed.name.as_str())
    }

    /// The feed at `index` with its id list already fetched. Nothing is
    /// cached when the fetch fails.
    pub fn feed_at(&self, index: usize) -> Result<Rc<Feed>> {
        let spec = self.feeds.get(index).ok_or(Error::InvalidFeedIndex {
            index,
            len: self.feeds.len(),
        })?;
        let url = self.api.resolve(&spec.endpoint);

        if let Some(feed) = self.realized.borrow().get(&url) {
            return Ok(feed.clone());
        }

        let feed = Rc::new(Feed::new(url.clone(), self.api.clone()));
        feed.ids()?;
        self.realized.borrow_mut().insert(url, feed.clone());
        Ok(feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;
    use serde_json::json;

    const BASE: &str = "http://api.test/v0";

    fn catalog(mock: &MockClient) -> FeedCatalog {
        let api = Rc::new(Api::new(Box::new(mock.clone()), BASE));
        FeedCatalog::new(
            api,
            vec![StoryType::Top.feed_spec(), StoryType::Ask.feed_spec()],
        )
    }

    #[test]
    fn names_follow_configuration_order() {
        let mock = MockClient::new();
        let catalog = catalog(&mock);
        let names: Vec<_> = catalog.feed_names().collect();
        assert_eq!(names, vec!["Top stories", "Top asks"]);
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn feed_at_realizes_and_memoizes() {
        let mock = MockClient::new();
        mock.respond(format!("{BASE}/askstories.json"), json!([7, 8, 9]));
        let catalog = catalog(&mock);
        let feed = catalog.feed_at(1).unwrap();
        let again = catalog.feed_at(1).unwrap();
        assert!(Rc::ptr_eq(&feed, &again));
        assert_eq!(feed.id_count().unwrap(), 3);
        assert_eq!(feed.id_at(2).unwrap(), 9);
        assert_eq!(mock.calls_to(&format!("{BASE}/askstories.json")), 1);
    }

    #[test]
    fn feed_at_rejects_bad_index() {
        let mock = MockClient::new();
        let catalog = catalog(&mock);
        assert_eq!(
            catalog.feed_at(2).unwrap_err(),
            Error::InvalidFeedIndex { index: 2, len: 2 }
        );
    }

    #[test]
    fn failed_realization_is_not_cached() {
        let mock = MockClient::new();
        let catalog = catalog(&mock);
        assert!(catalog.feed_at(0).unwrap_err().is_transport());
        mock.respond(format!("{BASE}/topstories.json"), json!([1]));
        assert_eq!(catalog.feed_at(0).unwrap().id_count().unwrap(), 1);
    }

    #[test]
    fn malformed_list_is_decode_error() {
        let mock = MockClient::new();
        mock.respond(format!("{BASE}/topstories.json"), json!({"not": "a list"}));
        let catalog = catalog(&mock);
        assert!(matches!(catalog.feed_at(0), Err(Error::Decode { .. })));
    }

    #[test]
    fn node_at_is_memoized_and_bounded() {
        let mock = MockClient::new();
        mock.respond(format!("{BASE}/topstories.json"), json!([5, 6]));
        let catalog = catalog(&mock);
        let feed = catalog.feed_at(0).unwrap();
        let node = feed.node_at(1).unwrap();
        assert_eq!(node.id(), 6);
        assert!(Rc::ptr_eq(&node, &feed.node_at(1).unwrap()));
        assert_eq!(
            feed.id_at(2).unwrap_err(),
            Error::InvalidPostIndex { index: 2, len: 2 }
        );
        assert!(matches!(
            feed.node_at(2),
            Err(Error::InvalidPostIndex { .. })
        ));
    }
}
