//! Host-driven in-memory document.
//!
//! The engine never talks to a browser directly. It works against this
//! document model, which the embedding host drives: the host scrolls the
//! viewport, dispatches pointer activations and mutates content, and the
//! document delivers intersection entries, mutation records and pointer
//! events over channels the same way a browser platform delivers observer
//! callbacks (asynchronously, possibly batched).
//!
//! Nodes live in an arena and are never freed. A removed node keeps its id
//! and can still be read or written, exactly like a detached browser element
//! still referenced from a closure; [`Document::is_connected`] tells the two
//! apart.

pub mod selector;
pub mod skeleton;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::OnceLock;
use tracing::warn;

pub use selector::{Selector, SelectorError};
use selector::{Combinator, Complex, Compound, Pseudo};

/// A document shared between the page session and its scheduled tasks.
pub type SharedDocument = Rc<RefCell<Document>>;

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Handle to an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Handle to an intersection or mutation observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Handle to a pointer-event listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// A layout box in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlapping region of two boxes; zero-sized when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Rect::new(x, y, 0.0, 0.0);
        }
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// CSS-style margin, positive values grow the box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margin {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// The visible window onto the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_y: 0.0,
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Options for an intersection observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionOptions {
    /// Minimum visible fraction for an element to count as intersecting
    pub threshold: f64,
    /// Adjustment applied to the viewport before intersecting
    pub root_margin: Margin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

/// A structural change under an observed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// A pointer activation delivered to a listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// The element that was activated
    pub target: NodeId,
    /// The element the listener is registered on
    pub current_target: NodeId,
    pub client_x: f64,
    pub client_y: f64,
}

#[derive(Debug, Clone)]
enum Inline {
    Text(String),
    Markup(String),
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    inline: Option<Inline>,
    rect: Option<Rect>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            style: BTreeMap::new(),
            inline: None,
            rect: None,
        }
    }
}

struct IntersectionSlot {
    options: IntersectionOptions,
    targets: BTreeMap<NodeId, bool>,
    tx: UnboundedSender<Vec<IntersectionEntry>>,
}

struct MutationSlot {
    target: NodeId,
    tx: UnboundedSender<MutationRecord>,
}

struct ClickSlot {
    target: NodeId,
    tx: UnboundedSender<PointerEvent>,
}

/// An HTML document with `<html>`, `<head>` and `<body>`.
pub struct Document {
    nodes: Vec<Node>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    title: String,
    viewport: Viewport,
    intersection: BTreeMap<ObserverId, IntersectionSlot>,
    mutation: BTreeMap<ObserverId, MutationSlot>,
    clicks: BTreeMap<ListenerId, ClickSlot>,
    next_registration: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            html: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            title: String::new(),
            viewport: Viewport::default(),
            intersection: BTreeMap::new(),
            mutation: BTreeMap::new(),
            clicks: BTreeMap::new(),
            next_registration: 0,
        };
        doc.html = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.link(doc.html, doc.head);
        doc.link(doc.html, doc.body);
        doc
    }

    /// Wrap the document for sharing with scheduled tasks.
    pub fn into_shared(self) -> SharedDocument {
        Rc::new(RefCell::new(self))
    }

    pub fn document_element(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// The `<html lang>` attribute.
    pub fn lang(&self) -> Option<String> {
        self.get_attribute(self.html, "lang")
    }

    pub fn set_lang(&mut self, lang: &str) {
        self.set_attribute(self.html, "lang", lang);
    }

    // ==================== Tree ====================

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let child = self.create_element(tag);
        self.append_child(parent, child);
        child
    }

    /// Move `child` to the end of `parent`'s children.
    ///
    /// Returns `false` (and changes nothing) when the move would create a
    /// cycle or either handle is unknown.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent) {
            return false;
        }
        self.remove(child);
        self.link(parent, child);
        self.notify_mutation(parent, vec![child], Vec::new());
        self.refresh_intersections();
        true
    }

    /// Detach a node from its parent.
    ///
    /// Removing an already-detached node is a no-op that returns `false`.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
        self.notify_mutation(parent, Vec::new(), vec![node]);
        self.refresh_intersections();
        true
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn detach_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let Some(n) = self.node_mut(node) else {
            return Vec::new();
        };
        let children = std::mem::take(&mut n.children);
        for &child in &children {
            self.nodes[child.0].parent = None;
        }
        children
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    /// Position of a node among its parent's children.
    pub fn element_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is attached to the document tree.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.html, node)
    }

    // ==================== Content ====================

    /// Concatenated text of the node and its descendants.
    ///
    /// Trusted markup contributes its text with tags stripped.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.inline {
            Some(Inline::Text(text)) => out.push_str(text),
            Some(Inline::Markup(markup)) => out.push_str(&strip_tags(markup)),
            None => {}
        }
        for &child in &n.children {
            self.collect_text(child, out);
        }
    }

    /// Replace all content with literal text.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        if self.node(node).is_none() {
            return;
        }
        let removed = self.detach_children(node);
        self.nodes[node.0].inline = Some(Inline::Text(text.to_string()));
        if !removed.is_empty() {
            self.notify_mutation(node, Vec::new(), removed);
            self.refresh_intersections();
        }
    }

    /// Append literal text after the node's current inline content.
    pub fn append_text(&mut self, node: NodeId, text: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        match &mut n.inline {
            Some(Inline::Text(existing)) => existing.push_str(text),
            Some(Inline::Markup(existing)) => existing.push_str(&escape_text(text)),
            None => n.inline = Some(Inline::Text(text.to_string())),
        }
    }

    /// Replace all content with trusted markup.
    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) {
        if self.node(node).is_none() {
            return;
        }
        let removed = self.detach_children(node);
        self.nodes[node.0].inline = Some(Inline::Markup(markup.to_string()));
        self.notify_mutation(node, Vec::new(), removed);
        self.refresh_intersections();
    }

    /// Serialized content of the node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_inner(node, &mut out);
        out
    }

    /// Serialized node including its own tag.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_outer(node, &mut out);
        out
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        format!("<!DOCTYPE html>\n{}", self.outer_html(self.html))
    }

    // ==================== Attributes ====================

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let n = self.node(node)?;
        if name == "class" {
            return (!n.classes.is_empty()).then(|| n.classes.join(" "));
        }
        n.attributes.get(name).cloned()
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let Some(n) = self.node_mut(node) else {
            return;
        };
        if name == "class" {
            n.classes = split_classes(value);
        } else {
            n.attributes.insert(name, value.to_string());
        }
    }

    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.attributes.get("id"))
            .map(String::as_str)
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        self.node(node).map(|n| n.classes.as_slice()).unwrap_or(&[])
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(n) = self.node_mut(node) {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(n) = self.node_mut(node) {
            n.classes.retain(|c| c != class);
        }
    }

    /// Replace the whole class list.
    pub fn set_class_name(&mut self, node: NodeId, class_name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.classes = split_classes(class_name);
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.style.get(property))
            .map(String::as_str)
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.style.insert(property.to_string(), value.to_string());
        }
    }

    // ==================== Geometry ====================

    pub fn rect(&self, node: NodeId) -> Option<Rect> {
        self.node(node).and_then(|n| n.rect)
    }

    /// Assign a layout box (document coordinates).
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(n) = self.node_mut(node) {
            n.rect = Some(rect);
            self.refresh_intersections();
        }
    }

    /// Layout box relative to the viewport, `None` when detached or unlaid.
    pub fn bounding_client_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.is_connected(node) {
            return None;
        }
        let rect = self.rect(node)?;
        Some(Rect::new(
            rect.x,
            rect.y - self.viewport.scroll_y,
            rect.width,
            rect.height,
        ))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_to(&mut self, scroll_y: f64) {
        self.viewport.scroll_y = scroll_y.max(0.0);
        self.refresh_intersections();
    }

    // ==================== Queries ====================

    /// First descendant of `scope` matching `selector`.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        self.query_selector_all(scope, selector).into_iter().next()
    }

    /// Descendants of `scope` matching `selector`, in document order.
    ///
    /// An invalid selector is logged and matches nothing.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(parsed) => self.select_all(scope, &parsed),
            Err(e) => {
                warn!("Ignoring invalid selector '{}': {}", selector, e);
                Vec::new()
            }
        }
    }

    /// Descendants of `scope` matching a parsed selector, in document order.
    pub fn select_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.matches(node, selector) {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector
            .alternatives
            .iter()
            .any(|complex| self.matches_complex(node, complex, complex.tail.len()))
    }

    fn matches_complex(&self, node: NodeId, complex: &Complex, index: usize) -> bool {
        let compound = if index == 0 {
            &complex.head
        } else {
            &complex.tail[index - 1].1
        };
        if !self.matches_compound(node, compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match complex.tail[index - 1].0 {
            Combinator::Child => self
                .parent(node)
                .is_some_and(|p| self.matches_complex(p, complex, index - 1)),
            Combinator::Descendant => {
                let mut current = self.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_complex(ancestor, complex, index - 1) {
                        return true;
                    }
                    current = self.parent(ancestor);
                }
                false
            }
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        if compound.tag.as_ref().is_some_and(|tag| *tag != n.tag) {
            return false;
        }
        if compound
            .id
            .as_ref()
            .is_some_and(|id| n.attributes.get("id") != Some(id))
        {
            return false;
        }
        if !compound
            .classes
            .iter()
            .all(|class| n.classes.iter().any(|c| c == class))
        {
            return false;
        }
        if !compound.attributes.iter().all(|attribute| {
            self.get_attribute(node, &attribute.name)
                .is_some_and(|value| attribute.op.matches(&value))
        }) {
            return false;
        }
        compound.pseudo.iter().all(|pseudo| {
            let Some(parent) = n.parent else {
                return false;
            };
            let mut same_type = self
                .children(parent)
                .iter()
                .filter(|&&c| self.nodes[c.0].tag == n.tag);
            match pseudo {
                Pseudo::FirstOfType => same_type.next() == Some(&node),
                Pseudo::LastOfType => same_type.last() == Some(&node),
            }
        })
    }

    // ==================== Intersection Observers ====================

    /// Register an intersection observer; entries arrive on the receiver.
    pub fn create_intersection_observer(
        &mut self,
        options: IntersectionOptions,
    ) -> (ObserverId, UnboundedReceiver<Vec<IntersectionEntry>>) {
        let (tx, rx) = unbounded();
        let id = ObserverId(self.next_id());
        self.intersection.insert(
            id,
            IntersectionSlot {
                options,
                targets: BTreeMap::new(),
                tx,
            },
        );
        (id, rx)
    }

    /// Start observing a node. An initial entry is always delivered.
    pub fn observe(&mut self, observer: ObserverId, node: NodeId) {
        let Some(options) = self.intersection.get(&observer).map(|s| s.options) else {
            return;
        };
        let entry = self.compute_entry(&options, node);
        if let Some(slot) = self.intersection.get_mut(&observer) {
            if slot.targets.contains_key(&node) {
                return;
            }
            slot.targets.insert(node, entry.is_intersecting);
            let _ = slot.tx.unbounded_send(vec![entry]);
        }
    }

    pub fn unobserve(&mut self, observer: ObserverId, node: NodeId) {
        if let Some(slot) = self.intersection.get_mut(&observer) {
            slot.targets.remove(&node);
        }
    }

    /// Drop an intersection observer. Returns whether it existed.
    pub fn disconnect_intersection(&mut self, observer: ObserverId) -> bool {
        self.intersection.remove(&observer).is_some()
    }

    pub fn intersection_observer_count(&self) -> usize {
        self.intersection.len()
    }

    fn compute_entry(&self, options: &IntersectionOptions, node: NodeId) -> IntersectionEntry {
        let ratio = match self.rect(node) {
            Some(rect) if self.is_connected(node) && rect.area() > 0.0 => {
                let m = options.root_margin;
                let root = Rect::new(
                    -m.left,
                    self.viewport.scroll_y - m.top,
                    self.viewport.width + m.left + m.right,
                    self.viewport.height + m.top + m.bottom,
                );
                rect.intersection(&root).area() / rect.area()
            }
            _ => 0.0,
        };
        IntersectionEntry {
            target: node,
            is_intersecting: ratio > 0.0 && ratio >= options.threshold,
            intersection_ratio: ratio,
        }
    }

    fn refresh_intersections(&mut self) {
        if self.intersection.is_empty() {
            return;
        }
        let mut batches: Vec<(ObserverId, Vec<IntersectionEntry>)> = Vec::new();
        for (&id, slot) in &self.intersection {
            let changed: Vec<_> = slot
                .targets
                .iter()
                .map(|(&target, &was)| (self.compute_entry(&slot.options, target), was))
                .filter(|(entry, was)| entry.is_intersecting != *was)
                .map(|(entry, _)| entry)
                .collect();
            if !changed.is_empty() {
                batches.push((id, changed));
            }
        }
        for (id, entries) in batches {
            if let Some(slot) = self.intersection.get_mut(&id) {
                for entry in &entries {
                    slot.targets.insert(entry.target, entry.is_intersecting);
                }
                let _ = slot.tx.unbounded_send(entries);
            }
        }
    }

    // ==================== Mutation Observers ====================

    /// Observe structural changes in the subtree rooted at `target`.
    pub fn observe_mutations(
        &mut self,
        target: NodeId,
    ) -> (ObserverId, UnboundedReceiver<MutationRecord>) {
        let (tx, rx) = unbounded();
        let id = ObserverId(self.next_id());
        self.mutation.insert(id, MutationSlot { target, tx });
        (id, rx)
    }

    pub fn disconnect_mutations(&mut self, observer: ObserverId) -> bool {
        self.mutation.remove(&observer).is_some()
    }

    pub fn mutation_observer_count(&self) -> usize {
        self.mutation.len()
    }

    fn notify_mutation(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.mutation.is_empty() {
            return;
        }
        let interested: Vec<ObserverId> = self
            .mutation
            .iter()
            .filter(|(_, slot)| self.contains(slot.target, target))
            .map(|(&id, _)| id)
            .collect();
        for id in interested {
            if let Some(slot) = self.mutation.get(&id) {
                let _ = slot.tx.unbounded_send(MutationRecord {
                    target,
                    added: added.clone(),
                    removed: removed.clone(),
                });
            }
        }
    }

    // ==================== Pointer Events ====================

    /// Listen for activations of `target` or any of its descendants.
    pub fn add_click_listener(
        &mut self,
        target: NodeId,
    ) -> (ListenerId, UnboundedReceiver<PointerEvent>) {
        let (tx, rx) = unbounded();
        let id = ListenerId(self.next_id());
        self.clicks.insert(id, ClickSlot { target, tx });
        (id, rx)
    }

    pub fn remove_click_listener(&mut self, listener: ListenerId) -> bool {
        self.clicks.remove(&listener).is_some()
    }

    pub fn click_listener_count(&self) -> usize {
        self.clicks.len()
    }

    /// Deliver a pointer activation at viewport coordinates.
    ///
    /// The event bubbles to listeners on every ancestor. Detached elements
    /// cannot be activated. Returns the number of listeners reached.
    pub fn dispatch_click(&mut self, target: NodeId, client_x: f64, client_y: f64) -> usize {
        if !self.is_connected(target) {
            return 0;
        }
        self.clicks.retain(|_, slot| !slot.tx.is_closed());
        let mut delivered = 0;
        for slot in self.clicks.values() {
            if !self.contains(slot.target, target) {
                continue;
            }
            let event = PointerEvent {
                target,
                current_target: slot.target,
                client_x,
                client_y,
            };
            if slot.tx.unbounded_send(event).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    // ==================== Internals ====================

    fn next_id(&mut self) -> u64 {
        self.next_registration += 1;
        self.next_registration
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    fn write_outer(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        out.push('<');
        out.push_str(&n.tag);
        if let Some(id) = n.attributes.get("id") {
            push_attribute(out, "id", id);
        }
        if !n.classes.is_empty() {
            push_attribute(out, "class", &n.classes.join(" "));
        }
        for (name, value) in &n.attributes {
            if name != "id" {
                push_attribute(out, name, value);
            }
        }
        if !n.style.is_empty() {
            let style: Vec<String> = n
                .style
                .iter()
                .map(|(property, value)| format!("{}: {}", property, value))
                .collect();
            push_attribute(out, "style", &style.join("; "));
        }
        out.push('>');
        if VOID_TAGS.contains(&n.tag.as_str()) {
            return;
        }
        self.write_inner(node, out);
        out.push_str("</");
        out.push_str(&n.tag);
        out.push('>');
    }

    fn write_inner(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.node(node) else {
            return;
        };
        if node == self.head && !self.title.is_empty() {
            out.push_str("<title>");
            out.push_str(&escape_text(&self.title));
            out.push_str("</title>");
        }
        match &n.inline {
            Some(Inline::Text(text)) => out.push_str(&escape_text(text)),
            Some(Inline::Markup(markup)) => out.push_str(markup),
            None => {}
        }
        for &child in &n.children {
            self.write_outer(child, out);
        }
    }
}

fn split_classes(value: &str) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    for class in value.split_whitespace() {
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }
    classes
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attribute(value));
    out.push('"');
}

/// Escape text for use as element content.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn strip_tags(markup: &str) -> String {
    let re = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    re.replace_all(markup, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
