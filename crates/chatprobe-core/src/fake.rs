//! Scripted in-memory [`DomAccessor`] for tests.
//!
//! `FakeDom` models the page as a flat registry: root queries map to node
//! lists, and (scope, query) pairs map to scoped node lists. Tests build
//! the shape they need with [`FakeDom::add`], [`FakeDom::add_in`] and
//! [`FakeDom::detached`], mutate it between ticks through a clone, and
//! assert on the recorded interactions afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::dom::{DomAccessor, Key, Query};
use crate::error::DriverError;
use crate::locator::LocatorTable;
use crate::state::ScreenState;

/// Identifier of a fake node. Stable across clones of the same `FakeDom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Handle(u64);

/// One fake fragment. Doubles as its own builder.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    text: String,
    attrs: HashMap<String, String>,
    css: HashMap<String, String>,
    image: Option<Vec<u8>>,
}

impl Node {
    pub(crate) fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub(crate) fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub(crate) fn css(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.css.insert(property.into(), value.into());
        self
    }

    pub(crate) fn image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    nodes: HashMap<u64, Node>,
    roots: HashMap<Query, Vec<u64>>,
    scoped: HashMap<(u64, Query), Vec<u64>>,
    fail: Option<DriverError>,
    fail_export: Option<DriverError>,
    clicked: Vec<Handle>,
    typed: Vec<String>,
    pressed: Vec<Key>,
    close_count: usize,
    qr_image: Vec<u8>,
}

impl Inner {
    fn insert(&mut self, node: Node) -> Handle {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        Handle(id)
    }

    fn node(&self, handle: &Handle) -> Result<&Node, DriverError> {
        self.nodes
            .get(&handle.0)
            .ok_or_else(|| DriverError::stale("fake node removed"))
    }
}

/// Shared scripted page. Clones view the same state, so a test can hand
/// one clone to the monitor and keep another for mid-run mutation.
#[derive(Clone, Default)]
pub(crate) struct FakeDom {
    inner: Arc<Mutex<Inner>>,
}

impl FakeDom {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                qr_image: vec![0xBA],
                ..Inner::default()
            })),
        }
    }

    /// Start building a fragment.
    pub(crate) fn node() -> Node {
        Node::default()
    }

    /// Register a fragment under a root query.
    pub(crate) fn add(&self, query: &Query, node: Node) -> Handle {
        let mut inner = self.inner.lock().unwrap();
        let handle = inner.insert(node);
        inner
            .roots
            .entry(query.clone())
            .or_default()
            .push(handle.0);
        handle
    }

    /// Register a fragment under a (scope, query) pair.
    pub(crate) fn add_in(&self, scope: &Handle, query: &Query, node: Node) -> Handle {
        let mut inner = self.inner.lock().unwrap();
        let handle = inner.insert(node);
        inner
            .scoped
            .entry((scope.0, query.clone()))
            .or_default()
            .push(handle.0);
        handle
    }

    /// Create a fragment no query resolves to, usable only as a handle.
    pub(crate) fn detached(&self, node: Node) -> Handle {
        self.inner.lock().unwrap().insert(node)
    }

    /// Unregister every fragment under a root query.
    pub(crate) fn remove(&self, query: &Query) {
        self.inner.lock().unwrap().roots.remove(query);
    }

    /// Fail the next accessor call with `error`, then resume normal
    /// behavior.
    pub(crate) fn fail_next(&self, error: DriverError) {
        self.inner.lock().unwrap().fail = Some(error);
    }

    /// Fail only the next image export with `error`, leaving lookups
    /// untouched. Scripts the "canvas found but its content is gone by
    /// export time" race.
    pub(crate) fn fail_export_next(&self, error: DriverError) {
        self.inner.lock().unwrap().fail_export = Some(error);
    }

    /// Rewrite the screen-level markers so classification yields `state`.
    /// A QR screen gets a canvas carrying the current QR image bytes.
    pub(crate) fn set_screen(&self, locators: &LocatorTable, state: Option<ScreenState>) {
        for query in [
            &locators.logged_in,
            &locators.loading,
            &locators.qr_code,
            &locators.auth,
        ] {
            self.remove(query);
        }
        match state {
            Some(ScreenState::LoggedIn) => {
                self.add(&locators.logged_in, FakeDom::node());
            }
            Some(ScreenState::Loading) => {
                self.add(&locators.loading, FakeDom::node());
            }
            Some(ScreenState::QrAuth) => {
                let bytes = self.inner.lock().unwrap().qr_image.clone();
                self.add(&locators.qr_code, FakeDom::node().image(bytes));
            }
            Some(ScreenState::Unauthenticated) => {
                self.add(&locators.auth, FakeDom::node());
            }
            None => {}
        }
    }

    /// Replace the QR image bytes, updating any canvas already on screen.
    pub(crate) fn set_qr_image(&self, locators: &LocatorTable, bytes: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.qr_image = bytes.clone();
        let ids = inner.roots.get(&locators.qr_code).cloned().unwrap_or_default();
        for id in ids {
            if let Some(node) = inner.nodes.get_mut(&id) {
                node.image = Some(bytes.clone());
            }
        }
    }

    pub(crate) fn clicked(&self) -> Vec<Handle> {
        self.inner.lock().unwrap().clicked.clone()
    }

    pub(crate) fn typed(&self) -> Vec<String> {
        self.inner.lock().unwrap().typed.clone()
    }

    pub(crate) fn pressed(&self) -> Vec<Key> {
        self.inner.lock().unwrap().pressed.clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.inner.lock().unwrap().close_count
    }

    fn take_failure(&self) -> Result<(), DriverError> {
        match self.inner.lock().unwrap().fail.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DomAccessor for FakeDom {
    type Handle = Handle;

    async fn find(&self, query: &Query) -> Result<Vec<Handle>, DriverError> {
        self.take_failure()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .roots
            .get(query)
            .map(|ids| ids.iter().map(|id| Handle(*id)).collect())
            .unwrap_or_default())
    }

    async fn find_in(&self, scope: &Handle, query: &Query) -> Result<Vec<Handle>, DriverError> {
        self.take_failure()?;
        let inner = self.inner.lock().unwrap();
        inner.node(scope)?;
        Ok(inner
            .scoped
            .get(&(scope.0, query.clone()))
            .map(|ids| ids.iter().map(|id| Handle(*id)).collect())
            .unwrap_or_default())
    }

    async fn text_of(&self, handle: &Handle) -> Result<String, DriverError> {
        self.take_failure()?;
        Ok(self.inner.lock().unwrap().node(handle)?.text.clone())
    }

    async fn attr_of(&self, handle: &Handle, name: &str) -> Result<Option<String>, DriverError> {
        self.take_failure()?;
        Ok(self.inner.lock().unwrap().node(handle)?.attrs.get(name).cloned())
    }

    async fn css_value_of(&self, handle: &Handle, property: &str) -> Result<String, DriverError> {
        self.take_failure()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .node(handle)?
            .css
            .get(property)
            .cloned()
            .unwrap_or_else(|| "none".to_string()))
    }

    async fn click(&self, handle: &Handle) -> Result<(), DriverError> {
        self.take_failure()?;
        let mut inner = self.inner.lock().unwrap();
        inner.node(handle)?;
        inner.clicked.push(*handle);
        Ok(())
    }

    async fn send_keys(&self, handle: &Handle, text: &str) -> Result<(), DriverError> {
        self.take_failure()?;
        let mut inner = self.inner.lock().unwrap();
        inner.node(handle)?;
        inner.typed.push(text.to_string());
        Ok(())
    }

    async fn type_active(&self, text: &str) -> Result<(), DriverError> {
        self.take_failure()?;
        self.inner.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn press_active(&self, key: Key) -> Result<(), DriverError> {
        self.take_failure()?;
        self.inner.lock().unwrap().pressed.push(key);
        Ok(())
    }

    async fn export_image(&self, handle: &Handle) -> Result<Vec<u8>, DriverError> {
        self.take_failure()?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_export.take() {
            return Err(error);
        }
        inner
            .node(handle)?
            .image
            .clone()
            .ok_or_else(|| DriverError::Session("fake fragment has no image".into()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.inner.lock().unwrap().close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_returns_fragments_in_insertion_order() {
        let dom = FakeDom::new();
        let query = Query::css("div.row");
        let first = dom.add(&query, FakeDom::node().text("a"));
        let second = dom.add(&query, FakeDom::node().text("b"));

        let found = dom.find(&query).await.unwrap();
        assert_eq!(found, vec![first, second]);
    }

    #[tokio::test]
    async fn scoped_lookup_does_not_leak_across_scopes() {
        let dom = FakeDom::new();
        let query = Query::xpath("./div");
        let left = dom.detached(FakeDom::node());
        let right = dom.detached(FakeDom::node());
        dom.add_in(&left, &query, FakeDom::node());

        assert_eq!(dom.find_in(&left, &query).await.unwrap().len(), 1);
        assert!(dom.find_in(&right, &query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let dom = FakeDom::new();
        dom.fail_next(DriverError::stale("redraw"));

        assert!(dom.find(&Query::css("x")).await.is_err());
        assert!(dom.find(&Query::css("x")).await.is_ok());
    }

    #[tokio::test]
    async fn close_is_counted() {
        let dom = FakeDom::new();
        dom.close().await.unwrap();
        dom.close().await.unwrap();
        assert_eq!(dom.close_count(), 2);
    }
}
