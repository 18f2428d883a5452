use crate::{AutomationError, Selector, UIElement};
use std::time::Duration;

/// The common trait a document backend must implement.
///
/// A backend owns a live document tree that other code may mutate at any
/// time; every lookup re-inspects the current tree. Implementations also
/// expose the page's navigable location and its user-notification surface.
#[async_trait::async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Get the root element of the document
    fn root(&self) -> UIElement;

    /// Find the first element matching a selector.
    ///
    /// With a timeout, the lookup polls the tree until a match appears or
    /// the timeout elapses. A zero timeout inspects the tree exactly once
    /// (fail-fast).
    fn find_element(
        &self,
        selector: &Selector,
        root: Option<&UIElement>,
        timeout: Option<Duration>,
    ) -> Result<UIElement, AutomationError>;

    /// Find all elements matching a selector
    fn find_elements(
        &self,
        selector: &Selector,
        root: Option<&UIElement>,
        timeout: Option<Duration>,
    ) -> Result<Vec<UIElement>, AutomationError>;

    /// Current navigable location of the page, as a path string
    fn current_path(&self) -> Result<String, AutomationError>;

    /// Surface a blocking user notification on the page
    async fn alert(&self, message: &str) -> Result<(), AutomationError>;
}
