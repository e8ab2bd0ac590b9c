//! The live editor as seen by the core: a component tree that can be
//! rendered, queried, serialized and edited in place.
//!
//! Nodes are only ever handed out as [`NodeRef`]s, generational handles that
//! go stale when the node (or the whole document) disappears. Holders must
//! check [`LiveEditor::is_attached`] before acting on one they kept across an
//! await point.

use std::fmt;

use crate::errors::Result;

pub mod canvas;
pub mod markup;

pub use canvas::{Canvas, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub(crate) document: u64,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}:{}v{}", self.document, self.index, self.generation)
    }
}

/// Read-only view of one element, handed to query predicates.
pub trait ElementLike {
    /// Lowercase tag name.
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
    /// Concatenated text of every descendant text node.
    fn text_content(&self) -> String;

    fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|t| t == class))
            .unwrap_or(false)
    }
}

pub type SelectionCallback = Box<dyn Fn(Option<NodeRef>) + Send + Sync>;

/// Keeps a selection listener registered until dropped.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

pub trait LiveEditor: Send + Sync {
    /// Replaces whatever is displayed with a new document.
    fn render(&self, markup: &str, styles: &str) -> RenderHandle;

    /// False once the document was torn down or replaced by another render.
    fn is_live(&self, handle: RenderHandle) -> bool;

    fn teardown(&self, handle: RenderHandle);

    fn selected(&self) -> Option<NodeRef>;

    /// Fails with `TargetLost` when `node` is not attached.
    fn select(&self, node: Option<NodeRef>) -> Result<()>;

    fn is_attached(&self, node: NodeRef) -> bool;

    /// Outer markup of the node; `None` when it is no longer attached.
    fn serialize(&self, node: NodeRef) -> Option<String>;

    /// Swaps the node's children for the parsed `content`.
    fn replace_content(&self, node: NodeRef, content: &str) -> Result<()>;

    /// First element in document order matching `predicate`.
    fn query(&self, predicate: &dyn Fn(&dyn ElementLike) -> bool) -> Option<NodeRef>;

    fn on_selection_change(&self, callback: SelectionCallback) -> Subscription;
}
