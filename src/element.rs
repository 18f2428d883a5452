use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use tracing::debug;

/// Result of a click/activation on an element
#[derive(Debug, Clone)]
pub struct ClickResult {
    pub method: String,
    pub details: String,
}

/// Attributes of an element in the watched document tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UIElementAttributes {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Text of the element's associated label, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Current value for input-like elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attrs: BTreeMap<String, String>,
}

/// Represents an element in a live document tree
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

impl Debug for UIElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UIElement")
            .field("id", &self.id())
            .field("role", &self.role())
            .finish()
    }
}

impl Clone for UIElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl PartialEq for UIElement {
    fn eq(&self, other: &Self) -> bool {
        self.inner.object_id() == other.inner.object_id()
    }
}

impl UIElement {
    /// Create a new UIElement from a backend implementation
    pub fn new(impl_: Box<dyn UIElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    /// Get the element's ID, if it has one
    pub fn id(&self) -> Option<String> {
        self.inner.id()
    }

    /// Get the element's role (e.g., "button", "textbox")
    pub fn role(&self) -> String {
        self.inner.role()
    }

    /// Get all attributes of the element
    pub fn attributes(&self) -> UIElementAttributes {
        self.inner.attributes()
    }

    /// Get child elements
    pub fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.inner.children()
    }

    /// Get the concatenated text content of this element and its
    /// descendants, up to `max_depth` levels down.
    pub fn text(&self, max_depth: usize) -> Result<String, AutomationError> {
        self.inner.text(max_depth)
    }

    /// Get the current value of an input-like element
    pub fn value(&self) -> Option<String> {
        self.inner.attributes().value
    }

    /// Activate the element. Performs exactly one activation; the backend
    /// decides what activation means for the element's role.
    pub fn click(&self) -> Result<ClickResult, AutomationError> {
        debug!(id = ?self.id(), role = %self.role(), "clicking element");
        self.inner.click()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled()
    }

    /// Access the backend implementation, for engine-side downcasting
    pub fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

/// Interface the document backend implements for each element
pub trait UIElementImpl: Send + Sync + Debug {
    /// Stable identity of the underlying node, for equality checks
    fn object_id(&self) -> usize;
    fn as_any(&self) -> &dyn std::any::Any;
    fn id(&self) -> Option<String>;
    fn role(&self) -> String;
    fn attributes(&self) -> UIElementAttributes;
    fn children(&self) -> Result<Vec<UIElement>, AutomationError>;
    fn text(&self, max_depth: usize) -> Result<String, AutomationError>;
    fn click(&self) -> Result<ClickResult, AutomationError>;
    fn is_enabled(&self) -> Result<bool, AutomationError>;
    fn clone_box(&self) -> Box<dyn UIElementImpl>;
}
