//! Where the user is: a chain of typed cursors, innermost first, each
//! owning its parent frame.
//!
//! ```text
//! Catalog ─descend→ Feed ─descend→ Post(root comments) ─descend→ Post(replies) …
//!         ←ascend──      ←ascend──                    ←ascend──
//! ```
//!
//! Only lazy fetches can fail. Every fallible step runs before any frame is
//! moved, so a failed transition leaves the state as it was.

use std::rc::Rc;

use tracing::{debug, info};

use crate::catalog::{Feed, FeedCatalog};
use crate::error::Result;
use crate::item::ContentNode;

/// Cyclic index into the catalog's feed names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogCursor {
    index: usize,
}

impl CatalogCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    fn advance(&mut self, count: usize) {
        if count > 0 {
            self.index = (self.index + 1) % count;
        }
    }

    fn retreat(&mut self, count: usize) {
        if count > 0 {
            self.index = (self.index + count - 1) % count;
        }
    }
}

/// Clamped index into a realized feed.
#[derive(Debug)]
pub struct FeedCursor {
    parent: CatalogCursor,
    feed: Rc<Feed>,
    index: usize,
}

impl FeedCursor {
    fn new(parent: CatalogCursor, feed: Rc<Feed>) -> Self {
        Self {
            parent,
            feed,
            index: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn parent(&self) -> &CatalogCursor {
        &self.parent
    }

    fn advance(&mut self) -> Result<()> {
        if self.index + 1 < self.feed.id_count()? {
            self.index += 1;
        }
        Ok(())
    }

    fn retreat(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// The selected post with its payload loaded, or `None` for an empty
    /// feed.
    fn open(&self) -> Result<Option<Rc<ContentNode>>> {
        if self.index >= self.feed.id_count()? {
            return Ok(None);
        }
        let post = self.feed.node_at(self.index)?;
        post.load()?;
        Ok(Some(post))
    }
}

/// A position among the children of `node`. The root frame of a post
/// focuses the post itself; each frame pushed on top of it focuses a
/// comment.
#[derive(Debug)]
pub struct CommentCursor {
    node: Rc<ContentNode>,
    index: usize,
    parent: Option<Box<CommentCursor>>,
}

impl CommentCursor {
    fn new(node: Rc<ContentNode>) -> Self {
        Self {
            node,
            index: 0,
            parent: None,
        }
    }

    pub fn node(&self) -> &Rc<ContentNode> {
        &self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<&CommentCursor> {
        self.parent.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of frames above this one.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.parent();
        while let Some(parent) = frame {
            depth += 1;
            frame = parent.parent();
        }
        depth
    }

    /// All frames from the root down to this one.
    pub fn frames(&self) -> Vec<&CommentCursor> {
        let mut frames = vec![self];
        let mut frame = self.parent();
        while let Some(parent) = frame {
            frames.push(parent);
            frame = parent.parent();
        }
        frames.reverse();
        frames
    }

    fn advance(&mut self) -> Result<()> {
        if self.index + 1 < self.node.child_count()? {
            self.index += 1;
        }
        Ok(())
    }

    fn retreat(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    fn descend(&mut self) -> Result<()> {
        if self.index >= self.node.child_count()? {
            return Ok(());
        }
        let focused = self.node.child_at(self.index)?;
        if !focused.has_children()? {
            debug!(id = focused.id(), "comment has no replies");
            return Ok(());
        }
        let parent = std::mem::replace(self, CommentCursor::new(focused));
        self.parent = Some(Box::new(parent));
        Ok(())
    }

    /// Pops this frame. Returns false at the root frame, which has nothing
    /// to pop back to.
    fn ascend(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                *self = *parent;
                true
            }
            None => false,
        }
    }
}

/// An opened post and the comment frame stack under it.
#[derive(Debug)]
pub struct PostCursor {
    parent: FeedCursor,
    post: Rc<ContentNode>,
    comments: CommentCursor,
}

impl PostCursor {
    fn new(parent: FeedCursor, post: Rc<ContentNode>) -> Self {
        let comments = CommentCursor::new(post.clone());
        Self {
            parent,
            post,
            comments,
        }
    }

    pub fn post(&self) -> &Rc<ContentNode> {
        &self.post
    }

    /// The innermost comment frame.
    pub fn comments(&self) -> &CommentCursor {
        &self.comments
    }

    pub fn parent(&self) -> &FeedCursor {
        &self.parent
    }
}

#[derive(Debug)]
pub enum Cursor {
    Catalog(CatalogCursor),
    Feed(FeedCursor),
    Post(PostCursor),
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::Catalog(CatalogCursor::default())
    }
}

impl Cursor {
    fn descend(self, catalog: &FeedCatalog) -> (Cursor, Result<()>) {
        match self {
            Cursor::Catalog(cursor) => match catalog.feed_at(cursor.index) {
                Ok(feed) => {
                    info!(feed = catalog.feed_name(cursor.index), "opened feed");
                    (Cursor::Feed(FeedCursor::new(cursor, feed)), Ok(()))
                }
                Err(err) => (Cursor::Catalog(cursor), Err(err)),
            },
            Cursor::Feed(cursor) => match cursor.open() {
                Ok(Some(post)) => {
                    info!(id = post.id(), "opened post");
                    (Cursor::Post(PostCursor::new(cursor, post)), Ok(()))
                }
                Ok(None) => (Cursor::Feed(cursor), Ok(())),
                Err(err) => (Cursor::Feed(cursor), Err(err)),
            },
            Cursor::Post(mut cursor) => {
                let result = cursor.comments.descend();
                (Cursor::Post(cursor), result)
            }
        }
    }

    fn ascend(self) -> Cursor {
        match self {
            Cursor::Catalog(cursor) => Cursor::Catalog(cursor),
            Cursor::Feed(cursor) => Cursor::Catalog(cursor.parent),
            Cursor::Post(mut cursor) => {
                if cursor.comments.ascend() {
                    Cursor::Post(cursor)
                } else {
                    Cursor::Feed(cursor.parent)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    AtCatalog,
    AtFeed,
    AtPost,
}

/// One frame of the current position, outermost first. Two states with
/// equal paths render the same view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub kind: StateKind,
    pub index: usize,
    pub id: Option<i64>,
}

pub struct NavigationState {
    catalog: Rc<FeedCatalog>,
    cursor: Cursor,
}

impl NavigationState {
    pub fn new(catalog: Rc<FeedCatalog>) -> Self {
        Self {
            catalog,
            cursor: Cursor::default(),
        }
    }

    pub fn catalog(&self) -> &FeedCatalog {
        &self.catalog
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn kind(&self) -> StateKind {
        match self.cursor {
            Cursor::Catalog(_) => StateKind::AtCatalog,
            Cursor::Feed(_) => StateKind::AtFeed,
            Cursor::Post(_) => StateKind::AtPost,
        }
    }

    pub fn advance(&mut self) -> Result<()> {
        match &mut self.cursor {
            Cursor::Catalog(cursor) => {
                cursor.advance(self.catalog.feed_count());
                Ok(())
            }
            Cursor::Feed(cursor) => cursor.advance(),
            Cursor::Post(cursor) => cursor.comments.advance(),
        }
    }

    pub fn retreat(&mut self) -> Result<()> {
        match &mut self.cursor {
            Cursor::Catalog(cursor) => cursor.retreat(self.catalog.feed_count()),
            Cursor::Feed(cursor) => cursor.retreat(),
            Cursor::Post(cursor) => cursor.comments.retreat(),
        }
        Ok(())
    }

    pub fn descend(&mut self) -> Result<()> {
        let cursor = std::mem::take(&mut self.cursor);
        let (cursor, result) = cursor.descend(&self.catalog);
        self.cursor = cursor;
        result
    }

    pub fn ascend(&mut self) -> Result<()> {
        let cursor = std::mem::take(&mut self.cursor);
        self.cursor = cursor.ascend();
        Ok(())
    }

    pub fn path(&self) -> Vec<Breadcrumb> {
        let catalog = |cursor: &CatalogCursor| Breadcrumb {
            kind: StateKind::AtCatalog,
            index: cursor.index,
            id: None,
        };
        let feed = |cursor: &FeedCursor| Breadcrumb {
            kind: StateKind::AtFeed,
            index: cursor.index,
            id: None,
        };

        match &self.cursor {
            Cursor::Catalog(cursor) => vec![catalog(cursor)],
            Cursor::Feed(cursor) => vec![catalog(&cursor.parent), feed(cursor)],
            Cursor::Post(cursor) => {
                let mut path = vec![catalog(&cursor.parent.parent), feed(&cursor.parent)];
                path.extend(cursor.comments.frames().into_iter().map(|frame| Breadcrumb {
                    kind: StateKind::AtPost,
                    index: frame.index,
                    id: Some(frame.node.id()),
                }));
                path
            }
        }
    }

    /// The URL worth opening in a browser from here: the selected story at
    /// a feed, the opened post inside a post.
    pub fn selected_link(&self) -> Result<Option<String>> {
        match &self.cursor {
            Cursor::Catalog(_) => Ok(None),
            Cursor::Feed(cursor) => {
                if cursor.index >= cursor.feed.id_count()? {
                    return Ok(None);
                }
                Ok(Some(cursor.feed.node_at(cursor.index)?.link()?))
            }
            Cursor::Post(cursor) => Ok(Some(cursor.post.link()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StoryType;
    use crate::client::{Api, MockClient};
    use crate::error::Error;
    use serde_json::json;

    const BASE: &str = "http://api.test/v0";

    // Top stories: ten posts, post 1 has comments [A, B, C], A has [A1],
    // B has [B1]. Post 3 has no comments.
    // Top asks: a single post without comments.
    fn fixture() -> (MockClient, NavigationState) {
        let mock = MockClient::new();
        mock.respond(format!("{BASE}/topstories.json"), json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        mock.respond(format!("{BASE}/askstories.json"), json!([50]));
        mock.item(BASE, json!({"id": 1, "type": "story", "title": "One", "kids": [11, 12, 13]}));
        mock.item(BASE, json!({"id": 11, "type": "comment", "text": "A", "kids": [111]}));
        mock.item(BASE, json!({"id": 12, "type": "comment", "text": "B", "kids": [121]}));
        mock.item(BASE, json!({"id": 13, "type": "comment", "text": "C"}));
        mock.item(BASE, json!({"id": 111, "type": "comment", "text": "A1"}));
        mock.item(BASE, json!({"id": 121, "type": "comment", "text": "B1"}));
        mock.item(BASE, json!({"id": 3, "type": "story", "title": "Three"}));
        mock.item(BASE, json!({"id": 50, "type": "story", "title": "Ask"}));

        let api = Rc::new(Api::new(Box::new(mock.clone()), BASE));
        let catalog = FeedCatalog::new(
            api,
            vec![StoryType::Top.feed_spec(), StoryType::Ask.feed_spec()],
        );
        (mock, NavigationState::new(Rc::new(catalog)))
    }

    fn catalog_index(state: &NavigationState) -> usize {
        match state.cursor() {
            Cursor::Catalog(cursor) => cursor.index(),
            other => panic!("expected catalog, got {other:?}"),
        }
    }

    fn feed_index(state: &NavigationState) -> usize {
        match state.cursor() {
            Cursor::Feed(cursor) => cursor.index(),
            other => panic!("expected feed, got {other:?}"),
        }
    }

    fn comments(state: &NavigationState) -> &CommentCursor {
        match state.cursor() {
            Cursor::Post(cursor) => cursor.comments(),
            other => panic!("expected post, got {other:?}"),
        }
    }

    #[test]
    fn starts_at_catalog_zero() {
        let (mock, state) = fixture();
        assert_eq!(state.kind(), StateKind::AtCatalog);
        assert_eq!(catalog_index(&state), 0);
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn catalog_wraps_both_ways() {
        let (_, mut state) = fixture();
        state.advance().unwrap();
        assert_eq!(catalog_index(&state), 1);
        state.advance().unwrap();
        assert_eq!(catalog_index(&state), 0);
        state.retreat().unwrap();
        assert_eq!(catalog_index(&state), 1);
    }

    #[test]
    fn catalog_advance_is_cyclic_from_every_index() {
        let (_, mut state) = fixture();
        let count = state.catalog().feed_count();
        for start in 0..count {
            while catalog_index(&state) != start {
                state.advance().unwrap();
            }
            for _ in 0..count {
                state.advance().unwrap();
            }
            assert_eq!(catalog_index(&state), start);
        }
    }

    #[test]
    fn descend_at_second_feed_realizes_asks() {
        let (mock, mut state) = fixture();
        state.advance().unwrap();
        state.descend().unwrap();
        assert_eq!(state.kind(), StateKind::AtFeed);
        match state.cursor() {
            Cursor::Feed(cursor) => assert_eq!(cursor.feed().url(), format!("{BASE}/askstories.json")),
            other => panic!("expected feed, got {other:?}"),
        }
        assert_eq!(mock.calls_to(&format!("{BASE}/topstories.json")), 0);
    }

    #[test]
    fn feed_index_stays_in_bounds() {
        let (_, mut state) = fixture();
        state.descend().unwrap();
        state.retreat().unwrap();
        assert_eq!(feed_index(&state), 0);
        for _ in 0..25 {
            state.advance().unwrap();
            assert!(feed_index(&state) <= 9);
        }
        assert_eq!(feed_index(&state), 9);
        state.advance().unwrap();
        assert_eq!(feed_index(&state), 9);
        for _ in 0..25 {
            state.retreat().unwrap();
        }
        assert_eq!(feed_index(&state), 0);
    }

    #[test]
    fn ascend_from_feed_returns_to_same_catalog_entry() {
        let (_, mut state) = fixture();
        state.advance().unwrap();
        state.descend().unwrap();
        state.ascend().unwrap();
        assert_eq!(state.kind(), StateKind::AtCatalog);
        assert_eq!(catalog_index(&state), 1);
        state.ascend().unwrap();
        assert_eq!(catalog_index(&state), 1);
    }

    #[test]
    fn comment_thread_descend_and_ascend() {
        let (_, mut state) = fixture();
        state.descend().unwrap();
        state.descend().unwrap();
        assert_eq!(state.kind(), StateKind::AtPost);
        assert!(comments(&state).is_root());
        assert_eq!(comments(&state).node().id(), 1);

        state.descend().unwrap();
        let frame = comments(&state);
        assert_eq!(frame.node().id(), 11);
        assert_eq!(frame.index(), 0);
        assert_eq!(frame.depth(), 1);
        assert_eq!(frame.node().child_at(0).unwrap().id(), 111);

        state.ascend().unwrap();
        assert_eq!(state.kind(), StateKind::AtPost);
        assert!(comments(&state).is_root());
        assert_eq!(comments(&state).index(), 0);
    }

    #[test]
    fn ascend_from_nested_frame_keeps_parent_index() {
        let (_, mut state) = fixture();
        state.descend().unwrap();
        state.descend().unwrap();
        state.advance().unwrap();
        assert_eq!(comments(&state).index(), 1);
        state.descend().unwrap();
        let frame = comments(&state);
        assert_eq!(frame.depth(), 1);
        assert_eq!(frame.node().id(), 12);
        state.ascend().unwrap();
        assert!(comments(&state).is_root());
        assert_eq!(comments(&state).index(), 1);
    }

    #[test]
    fn ascend_from_root_frame_discards_post() {
        let (_, mut state) = fixture();
        state.descend().unwrap();
        state.advance().unwrap();
        state.advance().unwrap();
        assert_eq!(feed_index(&state), 2);
        state.descend().unwrap();
        assert_eq!(comments(&state).node().id(), 3);
        state.ascend().unwrap();
        assert_eq!(state.kind(), StateKind::AtFeed);
        assert_eq!(feed_index(&state), 2);
    }

    #[test]
    fn descend_into_leaf_comment_is_noop() {
        let (_, mut state) = fixture();
        state.descend().unwrap();
        state.descend().unwrap();
        state.advance().unwrap();
        state.advance().unwrap();
        let before = state.path();
        state.descend().unwrap();
        assert_eq!(state.path(), before);
    }

    #[test]
    fn descend_into_post_without_comments_then_noop() {
        let (_, mut state) = fixture();
        state.advance().unwrap();
        state.descend().unwrap();
        state.descend().unwrap();
        assert_eq!(state.kind(), StateKind::AtPost);
        let before = state.path();
        state.advance().unwrap();
        state.retreat().unwrap();
        state.descend().unwrap();
        assert_eq!(state.path(), before);
    }

    #[test]
    fn failed_descend_leaves_state_unchanged() {
        let (mock, mut state) = fixture();
        mock.fail(
            format!("{BASE}/topstories.json"),
            Error::Transport {
                url: "top".into(),
                reason: "offline".into(),
            },
        );
        let before = state.path();
        assert!(state.descend().unwrap_err().is_transport());
        assert_eq!(state.path(), before);

        mock.respond(format!("{BASE}/topstories.json"), json!([99]));
        state.descend().unwrap();
        let before = state.path();
        assert!(matches!(state.descend(), Err(Error::Status { status: 404, .. })));
        assert_eq!(state.path(), before);
        assert_eq!(state.kind(), StateKind::AtFeed);
    }

    #[test]
    fn path_tracks_every_frame() {
        let (_, mut state) = fixture();
        state.descend().unwrap();
        state.descend().unwrap();
        state.descend().unwrap();
        let kinds: Vec<_> = state.path().iter().map(|crumb| crumb.kind).collect();
        assert_eq!(
            kinds,
            vec![StateKind::AtCatalog, StateKind::AtFeed, StateKind::AtPost, StateKind::AtPost]
        );
        assert_eq!(state.path()[3].id, Some(11));
    }

    #[test]
    fn selected_link_per_state() {
        let (_, mut state) = fixture();
        assert_eq!(state.selected_link().unwrap(), None);
        state.descend().unwrap();
        assert_eq!(
            state.selected_link().unwrap().as_deref(),
            Some("https://news.ycombinator.com/item?id=1")
        );
        state.descend().unwrap();
        assert_eq!(
            state.selected_link().unwrap().as_deref(),
            Some("https://news.ycombinator.com/item?id=1")
        );
    }
}
