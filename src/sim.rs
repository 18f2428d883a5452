//! In-memory document backend.
//!
//! `SimDocument` models the live, externally-mutated document tree the
//! watcher observes: the embedding context (or a test) mutates nodes while
//! the watcher and sequencer look elements up through the normal
//! [`DocumentEngine`] interface. Activations and alerts are recorded so
//! callers can assert exactly which controls were touched, and in what
//! order.

use crate::element::{ClickResult, UIElement, UIElementAttributes, UIElementImpl};
use crate::engine::DocumentEngine;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

const FIND_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Stable handle to a node in a [`SimDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct SimNode {
    elem_id: Option<String>,
    role: String,
    name: Option<String>,
    test_id: Option<String>,
    text: String,
    value: Option<String>,
    labelled_by: Option<NodeId>,
    attrs: BTreeMap<String, String>,
    enabled: bool,
    children: Vec<NodeId>,
}

/// Declarative description of a node to insert
#[derive(Debug, Clone)]
pub struct NodeSpec {
    role: String,
    elem_id: Option<String>,
    name: Option<String>,
    test_id: Option<String>,
    text: String,
    value: Option<String>,
    labelled_by: Option<NodeId>,
    attrs: BTreeMap<String, String>,
    enabled: bool,
}

impl NodeSpec {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            elem_id: None,
            name: None,
            test_id: None,
            text: String::new(),
            value: None,
            labelled_by: None,
            attrs: BTreeMap::new(),
            enabled: true,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.elem_id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn labelled_by(mut self, label: NodeId) -> Self {
        self.labelled_by = Some(label);
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

struct DocState {
    nodes: HashMap<NodeId, SimNode>,
    root: NodeId,
    next_id: usize,
    path: String,
    clicked: Vec<NodeId>,
    alerts: Vec<String>,
    poisoned: bool,
}

/// Shared, externally mutable document tree implementing [`DocumentEngine`]
#[derive(Clone)]
pub struct SimDocument {
    state: Arc<Mutex<DocState>>,
}

impl Default for SimDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDocument {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            SimNode {
                elem_id: None,
                role: "document".to_string(),
                name: None,
                test_id: None,
                text: String::new(),
                value: None,
                labelled_by: None,
                attrs: BTreeMap::new(),
                enabled: true,
                children: Vec::new(),
            },
        );
        Self {
            state: Arc::new(Mutex::new(DocState {
                nodes,
                root,
                next_id: 1,
                path: "/".to_string(),
                clicked: Vec::new(),
                alerts: Vec::new(),
                poisoned: false,
            })),
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.lock().root
    }

    /// Insert a node under `parent` and return its handle
    pub fn insert(&self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let mut state = self.lock();
        let id = NodeId(state.next_id);
        state.next_id += 1;
        state.nodes.insert(
            id,
            SimNode {
                elem_id: spec.elem_id,
                role: spec.role,
                name: spec.name,
                test_id: spec.test_id,
                text: spec.text,
                value: spec.value,
                labelled_by: spec.labelled_by,
                attrs: spec.attrs,
                enabled: spec.enabled,
                children: Vec::new(),
            },
        );
        if let Some(p) = state.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Remove a node (and its subtree) from the document
    pub fn remove(&self, node: NodeId) {
        let mut state = self.lock();
        for n in state.nodes.values_mut() {
            n.children.retain(|c| *c != node);
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = state.nodes.remove(&id) {
                stack.extend(n.children);
            }
        }
    }

    pub fn set_text(&self, node: NodeId, text: impl Into<String>) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.text = text.into();
        }
    }

    pub fn set_value(&self, node: NodeId, value: impl Into<String>) {
        if let Some(n) = self.lock().nodes.get_mut(&node) {
            n.value = Some(value.into());
        }
    }

    /// Change the page's navigable location
    pub fn set_path(&self, path: impl Into<String>) {
        self.lock().path = path.into();
    }

    /// When poisoned, every lookup fails with an internal error. Used to
    /// exercise the watcher's error resilience.
    pub fn set_poisoned(&self, poisoned: bool) {
        self.lock().poisoned = poisoned;
    }

    /// Ordered record of every activation performed on the document
    pub fn activation_log(&self) -> Vec<NodeId> {
        self.lock().clicked.clone()
    }

    /// Human-readable activation log: test id, element id, or role of each
    /// clicked node, in click order.
    pub fn activation_names(&self) -> Vec<String> {
        let state = self.lock();
        state
            .clicked
            .iter()
            .map(|id| match state.nodes.get(id) {
                Some(n) => n
                    .test_id
                    .clone()
                    .or_else(|| n.elem_id.clone())
                    .unwrap_or_else(|| n.role.clone()),
                None => "<removed>".to_string(),
            })
            .collect()
    }

    /// Notifications surfaced so far
    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DocState> {
        // A poisoned std mutex only happens if a holder panicked; the state
        // is plain data, so continue with it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn element(&self, id: NodeId) -> UIElement {
        UIElement::new(Box::new(SimElement {
            doc: self.clone(),
            id,
        }))
    }

    fn matches_once(
        &self,
        selector: &Selector,
        scope: &[NodeId],
    ) -> Result<Vec<NodeId>, AutomationError> {
        let state = self.lock();
        if state.poisoned {
            return Err(AutomationError::Internal(
                "document backend unavailable".to_string(),
            ));
        }
        resolve_selector(&state, selector, scope)
    }

    fn find_ids(
        &self,
        selector: &Selector,
        root: Option<&UIElement>,
        timeout: Option<Duration>,
    ) -> Result<Vec<NodeId>, AutomationError> {
        let scope = match root.and_then(|el| el.as_any().downcast_ref::<SimElement>()) {
            Some(sim) => vec![sim.id],
            None => vec![self.root_id()],
        };
        let timeout = timeout.unwrap_or(Duration::ZERO);
        let deadline = Instant::now() + timeout;

        loop {
            let found = self.matches_once(selector, &scope)?;
            if !found.is_empty() || Instant::now() >= deadline {
                return Ok(found);
            }
            std::thread::sleep(FIND_POLL_INTERVAL);
        }
    }
}

fn resolve_selector(
    state: &DocState,
    selector: &Selector,
    scope: &[NodeId],
) -> Result<Vec<NodeId>, AutomationError> {
    match selector {
        Selector::Chain(parts) => {
            let mut current: Vec<NodeId> = scope.to_vec();
            for part in parts {
                // Nth narrows the current match set instead of descending
                if let Selector::Nth(i) = part {
                    current = pick_nth(&current, *i)?;
                    continue;
                }
                let mut next = Vec::new();
                for root in &current {
                    for m in collect_matches(state, part, *root)? {
                        if !next.contains(&m) {
                            next.push(m);
                        }
                    }
                }
                current = next;
                if current.is_empty() {
                    break;
                }
            }
            Ok(current)
        }
        Selector::Nth(_) => Err(AutomationError::InvalidSelector(
            "nth selector is only valid inside a chain".to_string(),
        )),
        Selector::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
        _ => {
            let mut out = Vec::new();
            for root in scope {
                for m in collect_matches(state, selector, *root)? {
                    if !out.contains(&m) {
                        out.push(m);
                    }
                }
            }
            Ok(out)
        }
    }
}

fn pick_nth(current: &[NodeId], index: i32) -> Result<Vec<NodeId>, AutomationError> {
    let len = current.len() as i32;
    let idx = if index < 0 { len + index } else { index };
    if idx < 0 || idx >= len {
        return Ok(Vec::new());
    }
    Ok(vec![current[idx as usize]])
}

/// Document-order walk of `root`'s descendants, collecting matches.
/// The scope root itself is not a candidate, mirroring how a lookup
/// scoped to a region searches inside that region.
fn collect_matches(
    state: &DocState,
    selector: &Selector,
    root: NodeId,
) -> Result<Vec<NodeId>, AutomationError> {
    let mut out = Vec::new();
    let Some(root_node) = state.nodes.get(&root) else {
        return Ok(out);
    };
    let mut stack: Vec<NodeId> = root_node.children.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let Some(node) = state.nodes.get(&id) else {
            continue;
        };
        if node_matches(state, selector, id, node)? {
            out.push(id);
        }
        stack.extend(node.children.iter().rev().copied());
    }
    Ok(out)
}

fn node_matches(
    state: &DocState,
    selector: &Selector,
    id: NodeId,
    node: &SimNode,
) -> Result<bool, AutomationError> {
    let matched = match selector {
        Selector::Role { role, name } => {
            node.role == *role
                && match name {
                    Some(n) => node
                        .name
                        .as_deref()
                        .map(|have| have.contains(n.as_str()))
                        .unwrap_or(false),
                    None => true,
                }
        }
        Selector::Id(id_str) => node.elem_id.as_deref() == Some(id_str.as_str()),
        Selector::Name(name) => node.name.as_deref() == Some(name.as_str()),
        Selector::Text(needle) => subtree_text(state, id, usize::MAX).contains(needle.as_str()),
        Selector::TestId(test_id) => node.test_id.as_deref() == Some(test_id.as_str()),
        Selector::Attributes(wanted) => wanted.iter().all(|(k, v)| {
            node.attrs
                .get(k)
                .map(|have| have.contains(v.as_str()))
                .unwrap_or(false)
        }),
        Selector::LabelContains(needle) => match node.labelled_by {
            Some(label_id) => subtree_text(state, label_id, usize::MAX).contains(needle.as_str()),
            None => false,
        },
        Selector::Invalid(reason) => {
            return Err(AutomationError::InvalidSelector(reason.clone()));
        }
        Selector::Chain(_) | Selector::Nth(_) => {
            return Err(AutomationError::InvalidSelector(format!(
                "selector {selector:?} cannot be matched against a single node"
            )));
        }
    };
    Ok(matched)
}

fn subtree_text(state: &DocState, id: NodeId, max_depth: usize) -> String {
    let mut pieces = Vec::new();
    gather_text(state, id, max_depth, &mut pieces);
    pieces.join(" ")
}

fn gather_text(state: &DocState, id: NodeId, depth_left: usize, out: &mut Vec<String>) {
    let Some(node) = state.nodes.get(&id) else {
        return;
    };
    if !node.text.is_empty() {
        out.push(node.text.clone());
    }
    if depth_left == 0 {
        return;
    }
    for child in &node.children {
        gather_text(state, *child, depth_left.saturating_sub(1), out);
    }
}

#[async_trait::async_trait]
impl DocumentEngine for SimDocument {
    fn root(&self) -> UIElement {
        self.element(self.root_id())
    }

    fn find_element(
        &self,
        selector: &Selector,
        root: Option<&UIElement>,
        timeout: Option<Duration>,
    ) -> Result<UIElement, AutomationError> {
        let found = self.find_ids(selector, root, timeout)?;
        match found.first() {
            Some(id) => Ok(self.element(*id)),
            None => Err(AutomationError::ElementNotFound(format!(
                "no element matches {selector:?}"
            ))),
        }
    }

    fn find_elements(
        &self,
        selector: &Selector,
        root: Option<&UIElement>,
        timeout: Option<Duration>,
    ) -> Result<Vec<UIElement>, AutomationError> {
        let found = self.find_ids(selector, root, timeout)?;
        Ok(found.into_iter().map(|id| self.element(id)).collect())
    }

    fn current_path(&self) -> Result<String, AutomationError> {
        Ok(self.lock().path.clone())
    }

    async fn alert(&self, message: &str) -> Result<(), AutomationError> {
        debug!(message, "surfacing alert");
        self.lock().alerts.push(message.to_string());
        Ok(())
    }
}

#[derive(Clone)]
struct SimElement {
    doc: SimDocument,
    id: NodeId,
}

impl std::fmt::Debug for SimElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimElement").field("id", &self.id).finish()
    }
}

impl SimElement {
    fn with_node<T>(
        &self,
        f: impl FnOnce(&SimNode) -> T,
    ) -> Result<T, AutomationError> {
        let state = self.doc.lock();
        state
            .nodes
            .get(&self.id)
            .map(f)
            .ok_or_else(|| AutomationError::ElementNotFound("element was removed".to_string()))
    }
}

impl UIElementImpl for SimElement {
    fn object_id(&self) -> usize {
        self.id.0
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn id(&self) -> Option<String> {
        self.with_node(|n| n.elem_id.clone()).ok().flatten()
    }

    fn role(&self) -> String {
        self.with_node(|n| n.role.clone()).unwrap_or_default()
    }

    fn attributes(&self) -> UIElementAttributes {
        let state = self.doc.lock();
        match state.nodes.get(&self.id) {
            Some(n) => UIElementAttributes {
                role: n.role.clone(),
                name: n.name.clone(),
                label: n
                    .labelled_by
                    .map(|label_id| subtree_text(&state, label_id, usize::MAX)),
                value: n.value.clone(),
                test_id: n.test_id.clone(),
                attrs: n.attrs.clone(),
            },
            None => UIElementAttributes::default(),
        }
    }

    fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        let children = self.with_node(|n| n.children.clone())?;
        Ok(children
            .into_iter()
            .map(|id| self.doc.element(id))
            .collect())
    }

    fn text(&self, max_depth: usize) -> Result<String, AutomationError> {
        let state = self.doc.lock();
        if !state.nodes.contains_key(&self.id) {
            return Err(AutomationError::ElementNotFound(
                "element was removed".to_string(),
            ));
        }
        Ok(subtree_text(&state, self.id, max_depth))
    }

    fn click(&self) -> Result<ClickResult, AutomationError> {
        let mut state = self.doc.lock();
        let node = state
            .nodes
            .get(&self.id)
            .ok_or_else(|| AutomationError::ElementNotFound("element was removed".to_string()))?;
        if !node.enabled {
            return Err(AutomationError::Internal(format!(
                "element {:?} is disabled",
                node.elem_id
            )));
        }
        let details = format!("{} ({:?})", node.role, node.test_id);
        state.clicked.push(self.id);
        Ok(ClickResult {
            method: "synthetic".to_string(),
            details,
        })
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.with_node(|n| n.enabled)
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }
}
