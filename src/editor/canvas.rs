use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use super::markup::{self, Attr, Fragment};
use super::{ElementLike, LiveEditor, NodeRef, RenderHandle, SelectionCallback, Subscription};
use crate::errors::{Result, WebmindError};

/// In-memory component tree implementing [`LiveEditor`].
///
/// Nodes live in a slot arena; freeing a slot bumps its generation so every
/// `NodeRef` still pointing at it stops resolving. Each render gets a fresh
/// document id, which retires all refs into the previous document at once.
pub struct Canvas {
    state: RwLock<State>,
    listeners: Arc<Mutex<Listeners>>,
    next_document: AtomicU64,
}

#[derive(Default)]
struct State {
    document: Option<Document>,
    selected: Option<NodeRef>,
}

type Listener = Arc<dyn Fn(Option<NodeRef>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

enum NodeData {
    Element { tag: String, attrs: Vec<Attr> },
    Text(String),
}

struct Node {
    parent: Option<u32>,
    data: NodeData,
    children: Vec<u32>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

struct Document {
    id: u64,
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<u32>,
    styles: String,
    doctype: bool,
}

impl Document {
    fn parse(id: u64, markup: &str, styles: &str) -> Self {
        let mut doc = Self {
            id,
            slots: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            styles: styles.to_string(),
            doctype: markup::has_doctype(markup),
        };
        for frag in markup::parse_fragment(markup) {
            let idx = doc.insert(frag, None);
            doc.roots.push(idx);
        }
        doc
    }

    fn alloc(&mut self, parent: Option<u32>, data: NodeData) -> u32 {
        let node = Node { parent, data, children: Vec::new() };
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize].node = Some(node);
            idx
        } else {
            self.slots.push(Slot { generation: 0, node: Some(node) });
            (self.slots.len() - 1) as u32
        }
    }

    fn insert(&mut self, frag: Fragment, parent: Option<u32>) -> u32 {
        match frag {
            Fragment::Text(t) => self.alloc(parent, NodeData::Text(t)),
            Fragment::Element { tag, attrs, children } => {
                let idx = self.alloc(parent, NodeData::Element { tag, attrs });
                let kids: Vec<u32> = children.into_iter().map(|c| self.insert(c, Some(idx))).collect();
                if let Some(node) = self.slots[idx as usize].node.as_mut() {
                    node.children = kids;
                }
                idx
            }
        }
    }

    fn release(&mut self, idx: u32) {
        let slot = &mut self.slots[idx as usize];
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        for child in node.children {
            self.release(child);
        }
        self.free.push(idx);
    }

    fn node(&self, idx: u32) -> Option<&Node> {
        self.slots.get(idx as usize).and_then(|s| s.node.as_ref())
    }

    fn resolve(&self, r: NodeRef) -> Option<u32> {
        if r.document != self.id {
            return None;
        }
        let slot = self.slots.get(r.index as usize)?;
        (slot.generation == r.generation && slot.node.is_some()).then_some(r.index)
    }

    fn node_ref(&self, idx: u32) -> NodeRef {
        NodeRef { document: self.id, index: idx, generation: self.slots[idx as usize].generation }
    }

    fn replace_children(&mut self, idx: u32, content: &str) {
        let old = match self.slots[idx as usize].node.as_mut() {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in old {
            self.release(child);
        }
        let kids: Vec<u32> = markup::parse_fragment(content)
            .into_iter()
            .map(|f| self.insert(f, Some(idx)))
            .collect();
        if let Some(node) = self.slots[idx as usize].node.as_mut() {
            node.children = kids;
        }
    }

    fn detach(&mut self, idx: u32) {
        match self.node(idx).and_then(|n| n.parent) {
            Some(parent) => {
                if let Some(p) = self.slots[parent as usize].node.as_mut() {
                    p.children.retain(|c| *c != idx);
                }
            }
            None => self.roots.retain(|r| *r != idx),
        }
        self.release(idx);
    }

    fn write_node(&self, idx: u32, out: &mut String) {
        let Some(node) = self.node(idx) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { tag, attrs } => {
                markup::write_open_tag(out, tag, attrs);
                for child in &node.children {
                    self.write_node(*child, out);
                }
                markup::write_close_tag(out, tag);
            }
        }
    }

    fn text_of(&self, idx: u32, out: &mut String) {
        let Some(node) = self.node(idx) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { .. } => {
                for child in &node.children {
                    self.text_of(*child, out);
                }
            }
        }
    }

    /// Element indices in document order.
    fn elements(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack: Vec<u32> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let Some(node) = self.node(idx) else {
                continue;
            };
            if let NodeData::Element { .. } = node.data {
                out.push(idx);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn to_html(&self) -> String {
        let mut out = String::new();
        if self.doctype {
            out.push_str("<!DOCTYPE html>\n");
        }
        for root in &self.roots {
            self.write_node(*root, &mut out);
        }
        out
    }

    fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }
}

struct ElementRef<'a> {
    doc: &'a Document,
    idx: u32,
}

impl ElementRef<'_> {
    fn data(&self) -> Option<(&str, &[Attr])> {
        match &self.doc.node(self.idx)?.data {
            NodeData::Element { tag, attrs } => Some((tag.as_str(), attrs.as_slice())),
            NodeData::Text(_) => None,
        }
    }
}

impl ElementLike for ElementRef<'_> {
    fn tag(&self) -> &str {
        self.data().map(|(tag, _)| tag).unwrap_or("")
    }

    fn attr(&self, name: &str) -> Option<&str> {
        let (_, attrs) = self.data()?;
        attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        self.doc.text_of(self.idx, &mut out);
        out
    }
}

/// `#id`, `.class` or a bare tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Tag(String),
}

impl Selector {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let valid = |v: &str| !v.is_empty() && !v.contains(char::is_whitespace);
        if let Some(id) = s.strip_prefix('#') {
            valid(id).then(|| Selector::Id(id.to_string()))
        } else if let Some(class) = s.strip_prefix('.') {
            valid(class).then(|| Selector::Class(class.to_string()))
        } else {
            valid(s).then(|| Selector::Tag(s.to_ascii_lowercase()))
        }
    }

    pub fn matches(&self, el: &dyn ElementLike) -> bool {
        match self {
            Selector::Id(id) => el.id() == Some(id.as_str()),
            Selector::Class(class) => el.has_class(class),
            Selector::Tag(tag) => el.tag() == tag,
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            next_document: AtomicU64::new(1),
        }
    }

    fn notify(&self, selected: Option<NodeRef>) {
        let listeners: Vec<Listener> = self.listeners.lock().entries.iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(selected);
        }
    }

    pub fn find(&self, selector: &Selector) -> Option<NodeRef> {
        self.query(&|el| selector.matches(el))
    }

    /// Detaches the node and its subtree from the document.
    pub fn remove(&self, node: NodeRef) -> Result<()> {
        let cleared = {
            let mut state = self.state.write();
            let state = &mut *state;
            let doc = state
                .document
                .as_mut()
                .ok_or_else(|| WebmindError::TargetLost("no document is rendered".into()))?;
            let idx = doc.resolve(node).ok_or_else(|| WebmindError::TargetLost(format!("{node} is not attached")))?;
            doc.detach(idx);
            let lost = state.selected.map(|s| doc.resolve(s).is_none()).unwrap_or(false);
            if lost {
                state.selected = None;
            }
            lost
        };
        if cleared {
            self.notify(None);
        }
        Ok(())
    }

    /// Short label like `section#hero.hero-section` for selection indicators.
    pub fn label(&self, node: NodeRef) -> Option<String> {
        let state = self.state.read();
        let doc = state.document.as_ref()?;
        let idx = doc.resolve(node)?;
        let el = ElementRef { doc, idx };
        let mut label = el.tag().to_string();
        if let Some(id) = el.id().filter(|i| !i.is_empty()) {
            label.push('#');
            label.push_str(id);
        }
        if let Some(class) = el.attr("class").and_then(|c| c.split_whitespace().next()) {
            label.push('.');
            label.push_str(class);
        }
        Some(label)
    }

    pub fn document_html(&self, handle: RenderHandle) -> Option<String> {
        let state = self.state.read();
        state.document.as_ref().filter(|d| d.id == handle.0).map(Document::to_html)
    }

    pub fn styles(&self, handle: RenderHandle) -> Option<String> {
        let state = self.state.read();
        state.document.as_ref().filter(|d| d.id == handle.0).map(|d| d.styles.clone())
    }
}

impl LiveEditor for Canvas {
    fn render(&self, markup: &str, styles: &str) -> RenderHandle {
        let id = self.next_document.fetch_add(1, Ordering::SeqCst);
        let doc = Document::parse(id, markup, styles);
        debug!(document = id, nodes = doc.live_nodes(), "canvas rendered");
        let had_selection = {
            let mut state = self.state.write();
            state.document = Some(doc);
            state.selected.take().is_some()
        };
        if had_selection {
            self.notify(None);
        }
        RenderHandle(id)
    }

    fn is_live(&self, handle: RenderHandle) -> bool {
        self.state.read().document.as_ref().map(|d| d.id == handle.0).unwrap_or(false)
    }

    fn teardown(&self, handle: RenderHandle) {
        let had_selection = {
            let mut state = self.state.write();
            if !state.document.as_ref().map(|d| d.id == handle.0).unwrap_or(false) {
                return;
            }
            state.document = None;
            state.selected.take().is_some()
        };
        debug!(document = handle.0, "canvas torn down");
        if had_selection {
            self.notify(None);
        }
    }

    fn selected(&self) -> Option<NodeRef> {
        let state = self.state.read();
        let doc = state.document.as_ref()?;
        state.selected.filter(|s| doc.resolve(*s).is_some())
    }

    fn select(&self, node: Option<NodeRef>) -> Result<()> {
        {
            let mut state = self.state.write();
            if let Some(n) = node {
                let attached = state.document.as_ref().and_then(|d| d.resolve(n)).is_some();
                if !attached {
                    return Err(WebmindError::TargetLost(format!("{n} is not attached")));
                }
            }
            if state.selected == node {
                return Ok(());
            }
            state.selected = node;
        }
        self.notify(node);
        Ok(())
    }

    fn is_attached(&self, node: NodeRef) -> bool {
        self.state.read().document.as_ref().and_then(|d| d.resolve(node)).is_some()
    }

    fn serialize(&self, node: NodeRef) -> Option<String> {
        let state = self.state.read();
        let doc = state.document.as_ref()?;
        let idx = doc.resolve(node)?;
        let mut out = String::new();
        doc.write_node(idx, &mut out);
        Some(out)
    }

    fn replace_content(&self, node: NodeRef, content: &str) -> Result<()> {
        let mut state = self.state.write();
        let doc = state
            .document
            .as_mut()
            .ok_or_else(|| WebmindError::TargetLost("no document is rendered".into()))?;
        let idx = doc.resolve(node).ok_or_else(|| WebmindError::TargetLost(format!("{node} is not attached")))?;
        doc.replace_children(idx, content);
        debug!(%node, bytes = content.len(), "canvas content replaced");
        Ok(())
    }

    fn query(&self, predicate: &dyn Fn(&dyn ElementLike) -> bool) -> Option<NodeRef> {
        let state = self.state.read();
        let doc = state.document.as_ref()?;
        doc.elements()
            .into_iter()
            .find(|idx| predicate(&ElementRef { doc, idx: *idx }))
            .map(|idx| doc.node_ref(idx))
    }

    fn on_selection_change(&self, callback: SelectionCallback) -> Subscription {
        let id = {
            let mut l = self.listeners.lock();
            l.next_id += 1;
            let id = l.next_id;
            l.entries.push((id, Arc::from(callback)));
            id
        };
        let weak: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.lock().entries.retain(|(i, _)| *i != id);
            }
        })
    }
}
