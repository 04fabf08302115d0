use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use serde::Deserialize;
use tracing::debug;

use crate::client::{self, Api};
use crate::error::{Error, Result};
use crate::text;

/// Raw item payload as served by `/item/<id>.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemData {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub kids: Vec<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub descendants: Option<i64>,
}

/// One remote item (story, job, poll or comment). The payload is fetched on
/// first access and kept for the node's lifetime; children are created on
/// demand and cached in this node only.
pub struct ContentNode {
    id: i64,
    api: Rc<Api>,
    data: OnceCell<ItemData>,
    children: RefCell<HashMap<i64, Rc<ContentNode>>>,
}

impl ContentNode {
    pub fn new(id: i64, api: Rc<Api>) -> Self {
        Self {
            id,
            api,
            data: OnceCell::new(),
            children: RefCell::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }

    /// Fetches the payload unless it is already cached. A failed fetch is
    /// not cached.
    pub fn load(&self) -> Result<&ItemData> {
        self.data.get_or_try_init(|| {
            let url = self.api.item_url(self.id);
            debug!(id = self.id, "loading item");
            let value = self.api.fetch_json(&url)?;
            if value.is_null() {
                return Err(Error::decode(&url, "item does not exist"));
            }
            serde_json::from_value(value).map_err(|err| Error::decode(&url, err))
        })
    }

    pub fn title(&self) -> Result<Option<&str>> {
        Ok(self.load()?.title.as_deref())
    }

    pub fn url(&self) -> Result<Option<&str>> {
        Ok(self.load()?.url.as_deref().filter(|url| !url.is_empty()))
    }

    pub fn kind(&self) -> Result<&str> {
        Ok(self.load()?.kind.as_str())
    }

    pub fn score(&self) -> Result<i64> {
        Ok(self.load()?.score.unwrap_or(0))
    }

    pub fn raw_text(&self) -> Result<Option<&str>> {
        Ok(self.load()?.text.as_deref())
    }

    pub fn author(&self) -> Result<Option<&str>> {
        Ok(self.load()?.by.as_deref())
    }

    pub fn parent(&self) -> Result<Option<i64>> {
        Ok(self.load()?.parent)
    }

    pub fn child_ids(&self) -> Result<&[i64]> {
        Ok(self.load()?.kids.as_slice())
    }

    pub fn child_count(&self) -> Result<usize> {
        Ok(self.child_ids()?.len())
    }

    pub fn has_children(&self) -> Result<bool> {
        Ok(self.child_count()? > 0)
    }

    /// The child at `index`, created on first request and returned as the
    /// same node afterwards. The child's own payload is not fetched here.
    pub fn child_at(&self, index: usize) -> Result<Rc<ContentNode>> {
        let ids = self.child_ids()?;
        let id = *ids.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: ids.len(),
        })?;

        let mut children = self.children.borrow_mut();
        let child = children
            .entry(id)
            .or_insert_with(|| Rc::new(ContentNode::new(id, self.api.clone())));
        Ok(child.clone())
    }

    /// The item's URL, or its discussion page when it links nowhere.
    pub fn link(&self) -> Result<String> {
        Ok(match self.url()? {
            Some(url) => url.to_string(),
            None => client::permalink(self.id),
        })
    }

    /// `"{title} [{kind} / {score}] {n} comments"`
    pub fn summary_line(&self) -> Result<String> {
        let data = self.load()?;
        let title = data.title.as_deref().map(text::decode_entities);
        Ok(format!(
            "{} [{} / {}] {} comments",
            title.as_deref().unwrap_or("(untitled)"),
            data.kind,
            data.score.unwrap_or(0),
            data.kids.len()
        ))
    }

    /// Body with markup removed, `None` when the item carries no text.
    pub fn body_text(&self) -> Result<Option<String>> {
        let data = self.load()?;
        if data.deleted {
            return Ok(Some("[deleted]".to_string()));
        }
        if data.dead {
            return Ok(Some("[dead]".to_string()));
        }
        Ok(data
            .text
            .as_deref()
            .map(text::strip_markup)
            .filter(|body| !body.trim().is_empty()))
    }

    /// Body followed by the reply count, as shown for comment rows.
    pub fn reply_line(&self) -> Result<String> {
        let body = self.body_text()?.unwrap_or_default();
        let count = self.child_count()?;
        let noun = if count == 1 { "reply" } else { "replies" };
        let author = self
            .author()?
            .map(|by| format!("{by}: "))
            .unwrap_or_default();
        Ok(format!("{author}{body} [{count} {noun}]"))
    }
}

impl fmt::Debug for ContentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentNode")
            .field("id", &self.id)
            .field("loaded", &self.is_loaded())
            .field("cached_children", &self.children.borrow().len())
            .finish()
    }
}
