//! Driver - Abstract Browser Automation Trait
//!
//! pagekit never talks to a browser itself. Everything it needs from the
//! automation backend is expressed by [`Driver`]: element lookup relative to
//! an optional root, handle primitives, window/alert/URL session calls and a
//! bounded-poll primitive that both element resolution and waits delegate to.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Page / Component / Table                                   │
//! │        │ field access                                       │
//! │        ▼                                                    │
//! │  Scope ──find_elements(locator, root)──► Driver (trait)     │
//! │                                          ├─ WebDriver client│
//! │                                          └─ MockDriver      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The trait is synchronous: one session serves one test flow and every
//! wait blocks the calling thread.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::locator::{By, Locator};
use crate::result::{DriverError, DriverResult};

/// Opaque, driver-specific reference to a live DOM element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Unique identifier assigned by the driver
    pub id: String,
}

impl ElementHandle {
    /// Create a handle from a driver id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Abstract driver trait for browser automation
///
/// Implementations wrap a real WebDriver/CDP session; [`MockDriver`] is an
/// in-memory document for unit tests.
pub trait Driver: Send + Sync {
    /// Find all elements matching `locator`, in document order.
    ///
    /// With `root` set, only descendants of that element are searched.
    fn find_elements(
        &self,
        locator: &Locator,
        root: Option<&ElementHandle>,
    ) -> DriverResult<Vec<ElementHandle>>;

    /// Click an element
    fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Type text into an element
    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    /// Clear an editable element
    fn clear(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Text content of an element
    fn text(&self, element: &ElementHandle) -> DriverResult<String>;

    /// Attribute (or property) value
    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>>;

    /// Lower-case tag name
    fn tag_name(&self, element: &ElementHandle) -> DriverResult<String>;

    /// Selected/checked state
    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Whether the element is rendered and visible
    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// URL of the active window
    fn current_url(&self) -> DriverResult<String>;

    /// All window handles, in opening order
    fn window_handles(&self) -> DriverResult<Vec<String>>;

    /// Make a window the active one
    fn switch_to_window(&self, handle: &str) -> DriverResult<()>;

    /// Text of the open alert, `None` when no alert is present
    fn alert_text(&self) -> DriverResult<Option<String>>;

    /// Accept the open alert
    fn accept_alert(&self) -> DriverResult<()>;

    /// Dismiss the open alert
    fn dismiss_alert(&self) -> DriverResult<()>;

    /// Evaluate a script in the page and return its JSON result
    fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value>;

    /// Bounded poll: call `condition` until it returns `true` or `timeout`
    /// elapses, sleeping `interval` between attempts.
    ///
    /// The condition is always evaluated at least once. Transient errors
    /// (stale handles, missing alerts) count as "not yet"; any other error
    /// aborts the poll. Returns `Ok(false)` on timeout.
    fn poll_until(
        &self,
        timeout: Duration,
        interval: Duration,
        condition: &mut dyn FnMut() -> DriverResult<bool>,
    ) -> DriverResult<bool> {
        let start = Instant::now();
        loop {
            match condition() {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(false);
            }
            std::thread::sleep(interval.min(timeout - elapsed));
        }
    }
}

// ============================================================================
// MockDriver
// ============================================================================

/// Side effect run when a mock element is clicked
pub type ClickEffect = Arc<dyn Fn(&mut MockDom) + Send + Sync>;

/// Script used by readiness checks
pub const READY_STATE_SCRIPT: &str = "return document.readyState == \"complete\";";

/// Builder for an element inserted into a [`MockDriver`]
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    tag: String,
    text: String,
    attributes: HashMap<String, String>,
    selected: bool,
    hidden: bool,
    matches: Vec<Locator>,
}

impl MockElement {
    /// Create an element with a tag name
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Register a locator this element answers to
    #[must_use]
    pub fn matching(mut self, locator: Locator) -> Self {
        self.matches.push(locator);
        self
    }

    /// Shorthand for a CSS locator match
    #[must_use]
    pub fn css(self, selector: impl Into<String>) -> Self {
        self.matching(Locator::css(selector))
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the selected/checked state
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Mark as not displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone)]
struct MockNode {
    id: String,
    parent: Option<String>,
    tag: String,
    text: String,
    attributes: HashMap<String, String>,
    selected: bool,
    displayed: bool,
    matches: Vec<Locator>,
}

impl MockNode {
    fn answers(&self, locator: &Locator) -> bool {
        if self.matches.contains(locator) {
            return true;
        }
        let attr = |name: &str| self.attributes.get(name).map(String::as_str);
        match locator.by {
            By::TagName => self.tag.eq_ignore_ascii_case(&locator.selector),
            By::Id => attr("id") == Some(locator.selector.as_str()),
            By::Name => attr("name") == Some(locator.selector.as_str()),
            By::ClassName => attr("class")
                .is_some_and(|c| c.split_whitespace().any(|c| c == locator.selector)),
            By::LinkText => self.tag == "a" && self.text.trim() == locator.selector,
            By::PartialLinkText => self.tag == "a" && self.text.contains(&locator.selector),
            By::Css | By::XPath => false,
        }
    }
}

/// In-memory document behind [`MockDriver`]
///
/// Nodes keep insertion order, which stands in for document order.
/// Selectors are not parsed: an element matches a locator it was
/// registered with, plus the obvious attribute strategies (id, name, class,
/// tag, link text).
#[derive(Default)]
pub struct MockDom {
    nodes: Vec<MockNode>,
    root_id: String,
    url: String,
    windows: Vec<String>,
    current_window: usize,
    alert: Option<String>,
    scripts: HashMap<String, serde_json::Value>,
    effects: HashMap<String, ClickEffect>,
    history: Vec<String>,
    next_id: u64,
}

impl fmt::Debug for MockDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDom")
            .field("nodes", &self.nodes.len())
            .field("url", &self.url)
            .field("windows", &self.windows)
            .field("alert", &self.alert)
            .finish_non_exhaustive()
    }
}

impl MockDom {
    fn new() -> Self {
        let mut dom = Self {
            url: "about:blank".to_string(),
            windows: vec!["window-1".to_string()],
            ..Self::default()
        };
        dom.root_id = dom.fresh_id("html");
        dom.nodes.push(MockNode {
            id: dom.root_id.clone(),
            parent: None,
            tag: "html".to_string(),
            text: String::new(),
            attributes: HashMap::new(),
            selected: false,
            displayed: true,
            matches: Vec::new(),
        });
        dom
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn node(&self, handle: &ElementHandle) -> DriverResult<&MockNode> {
        self.nodes
            .iter()
            .find(|n| n.id == handle.id)
            .ok_or_else(|| DriverError::StaleElement {
                id: handle.id.clone(),
            })
    }

    fn node_mut(&mut self, handle: &ElementHandle) -> DriverResult<&mut MockNode> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == handle.id)
            .ok_or_else(|| DriverError::StaleElement {
                id: handle.id.clone(),
            })
    }

    fn is_descendant(&self, node: &MockNode, ancestor: &str) -> bool {
        let mut parent = node.parent.as_deref();
        while let Some(id) = parent {
            if id == ancestor {
                return true;
            }
            parent = self
                .nodes
                .iter()
                .find(|n| n.id == id)
                .and_then(|n| n.parent.as_deref());
        }
        false
    }

    /// Insert an element under `parent` (the document root when `None`)
    pub fn insert(&mut self, parent: Option<&ElementHandle>, element: MockElement) -> ElementHandle {
        let id = self.fresh_id(&element.tag);
        let parent = parent.map_or_else(|| self.root_id.clone(), |p| p.id.clone());
        self.nodes.push(MockNode {
            id: id.clone(),
            parent: Some(parent),
            tag: element.tag,
            text: element.text,
            attributes: element.attributes,
            selected: element.selected,
            displayed: !element.hidden,
            matches: element.matches,
        });
        ElementHandle::new(id)
    }

    /// Remove an element and all of its descendants
    pub fn remove(&mut self, handle: &ElementHandle) {
        let doomed: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.id == handle.id || self.is_descendant(n, &handle.id))
            .map(|n| n.id.clone())
            .collect();
        self.nodes.retain(|n| !doomed.contains(&n.id));
    }

    /// Replace an element's text content
    pub fn set_text(&mut self, handle: &ElementHandle, text: impl Into<String>) {
        if let Ok(node) = self.node_mut(handle) {
            node.text = text.into();
        }
    }

    /// Show or hide an element
    pub fn set_displayed(&mut self, handle: &ElementHandle, displayed: bool) {
        if let Ok(node) = self.node_mut(handle) {
            node.displayed = displayed;
        }
    }

    /// Load a new document: changes the URL and the `<html>` identity
    pub fn navigate(&mut self, url: impl Into<String>) {
        let old_root = self.root_id.clone();
        let new_root = self.fresh_id("html");
        for node in &mut self.nodes {
            if node.id == old_root {
                node.id = new_root.clone();
            }
            if node.parent.as_deref() == Some(old_root.as_str()) {
                node.parent = Some(new_root.clone());
            }
        }
        self.root_id = new_root;
        self.url = url.into();
    }

    /// Open a new window (it does not become active)
    pub fn open_window(&mut self) -> String {
        let handle = self.fresh_id("window");
        self.windows.push(handle.clone());
        handle
    }

    /// Raise an alert dialog
    pub fn raise_alert(&mut self, text: impl Into<String>) {
        self.alert = Some(text.into());
    }

    /// Fix the result of a script
    pub fn set_script_result(&mut self, script: impl Into<String>, value: serde_json::Value) {
        let _ = self.scripts.insert(script.into(), value);
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Mock driver for unit testing
///
/// Interior mutability lets it be shared behind `Arc<dyn Driver>` while the
/// test keeps its own `Arc<MockDriver>` to arrange the document and inspect
/// the call history.
#[derive(Debug)]
pub struct MockDriver {
    dom: Mutex<MockDom>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create a driver with an empty document at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            dom: Mutex::new(MockDom::new()),
        }
    }

    /// Run `f` with exclusive access to the document
    pub fn with_dom<T>(&self, f: impl FnOnce(&mut MockDom) -> T) -> T {
        let mut dom = self.dom.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut dom)
    }

    /// Add an element under `parent` (the document root when `None`)
    pub fn add(&self, parent: Option<&ElementHandle>, element: MockElement) -> ElementHandle {
        self.with_dom(|dom| dom.insert(parent, element))
    }

    /// Register a side effect for clicks on `handle`
    pub fn on_click(
        &self,
        handle: &ElementHandle,
        effect: impl Fn(&mut MockDom) + Send + Sync + 'static,
    ) {
        let effect: ClickEffect = Arc::new(effect);
        self.with_dom(|dom| {
            let _ = dom.effects.insert(handle.id.clone(), effect);
        });
    }

    /// Fix the result of a script
    pub fn set_script_result(&self, script: impl Into<String>, value: serde_json::Value) {
        self.with_dom(|dom| dom.set_script_result(script, value));
    }

    /// Navigate to a URL
    pub fn navigate(&self, url: impl Into<String>) {
        self.with_dom(|dom| dom.navigate(url));
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.with_dom(|dom| dom.history.clone())
    }

    /// Number of recorded calls starting with `method`
    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.with_dom(|dom| dom.history.iter().filter(|c| c.starts_with(method)).count())
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.count(method) > 0
    }

    /// Current value of an attribute, bypassing the history
    #[must_use]
    pub fn attribute_of(&self, handle: &ElementHandle, name: &str) -> Option<String> {
        self.with_dom(|dom| {
            dom.node(handle)
                .ok()
                .and_then(|n| n.attributes.get(name).cloned())
        })
    }

    /// Current selected state, bypassing the history
    #[must_use]
    pub fn selected_of(&self, handle: &ElementHandle) -> bool {
        self.with_dom(|dom| dom.node(handle).is_ok_and(|n| n.selected))
    }

    fn record(&self, call: String) {
        self.with_dom(|dom| dom.history.push(call));
    }
}

impl Driver for MockDriver {
    fn find_elements(
        &self,
        locator: &Locator,
        root: Option<&ElementHandle>,
    ) -> DriverResult<Vec<ElementHandle>> {
        self.record(format!("find:{locator}"));
        self.with_dom(|dom| {
            if let Some(root) = root {
                let _ = dom.node(root)?;
            }
            Ok(dom
                .nodes
                .iter()
                .filter(|n| root.map_or(true, |r| dom.is_descendant(n, &r.id)))
                .filter(|n| n.answers(locator))
                .map(|n| ElementHandle::new(n.id.clone()))
                .collect())
        })
    }

    fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(format!("click:{element}"));
        let effect = self.with_dom(|dom| -> DriverResult<Option<ClickEffect>> {
            let node = dom.node(element)?.clone();
            let kind = node.attributes.get("type").map(String::as_str);
            match (node.tag.as_str(), kind) {
                ("input", Some("checkbox")) => {
                    let node = dom.node_mut(element)?;
                    node.selected = !node.selected;
                }
                ("input", Some("radio")) | ("option", _) => {
                    let group = node.attributes.get("name").cloned();
                    for other in &mut dom.nodes {
                        let same_group = if node.tag == "option" {
                            other.tag == "option" && other.parent == node.parent
                        } else {
                            group.is_some() && other.attributes.get("name") == group.as_ref()
                        };
                        if same_group {
                            other.selected = false;
                        }
                    }
                    dom.node_mut(element)?.selected = true;
                }
                _ => {}
            }
            Ok(dom.effects.get(&element.id).cloned())
        })?;
        if let Some(effect) = effect {
            self.with_dom(|dom| effect(dom));
        }
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        self.record(format!("send_keys:{element}:{text}"));
        self.with_dom(|dom| {
            let node = dom.node_mut(element)?;
            node.attributes
                .entry("value".to_string())
                .or_default()
                .push_str(text);
            Ok(())
        })
    }

    fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        self.record(format!("clear:{element}"));
        self.with_dom(|dom| {
            let _ = dom
                .node_mut(element)?
                .attributes
                .insert("value".to_string(), String::new());
            Ok(())
        })
    }

    fn text(&self, element: &ElementHandle) -> DriverResult<String> {
        self.with_dom(|dom| Ok(dom.node(element)?.text.clone()))
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        self.with_dom(|dom| {
            let node = dom.node(element)?;
            Ok(match name {
                "textContent" => Some(node.text.clone()),
                _ => node.attributes.get(name).cloned(),
            })
        })
    }

    fn tag_name(&self, element: &ElementHandle) -> DriverResult<String> {
        self.with_dom(|dom| Ok(dom.node(element)?.tag.clone()))
    }

    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.with_dom(|dom| Ok(dom.node(element)?.selected))
    }

    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        self.with_dom(|dom| Ok(dom.node(element)?.displayed))
    }

    fn current_url(&self) -> DriverResult<String> {
        self.record("current_url".to_string());
        self.with_dom(|dom| Ok(dom.url.clone()))
    }

    fn window_handles(&self) -> DriverResult<Vec<String>> {
        self.record("window_handles".to_string());
        self.with_dom(|dom| Ok(dom.windows.clone()))
    }

    fn switch_to_window(&self, handle: &str) -> DriverResult<()> {
        self.record(format!("switch_to_window:{handle}"));
        self.with_dom(|dom| {
            let index = dom
                .windows
                .iter()
                .position(|w| w == handle)
                .ok_or_else(|| DriverError::NoSuchWindow {
                    handle: handle.to_string(),
                })?;
            dom.current_window = index;
            Ok(())
        })
    }

    fn alert_text(&self) -> DriverResult<Option<String>> {
        self.with_dom(|dom| Ok(dom.alert.clone()))
    }

    fn accept_alert(&self) -> DriverResult<()> {
        self.record("accept_alert".to_string());
        self.with_dom(|dom| dom.alert.take().map(|_| ()).ok_or(DriverError::NoAlertPresent))
    }

    fn dismiss_alert(&self) -> DriverResult<()> {
        self.record("dismiss_alert".to_string());
        self.with_dom(|dom| dom.alert.take().map(|_| ()).ok_or(DriverError::NoAlertPresent))
    }

    fn execute_script(&self, script: &str) -> DriverResult<serde_json::Value> {
        self.record(format!("script:{script}"));
        self.with_dom(|dom| {
            Ok(match dom.scripts.get(script) {
                Some(value) => value.clone(),
                None if script.contains("document.readyState") => serde_json::Value::Bool(true),
                None => serde_json::Value::Null,
            })
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
