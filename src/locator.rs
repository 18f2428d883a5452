use tracing::{debug, instrument};

use crate::element::UIElement;
use crate::engine::DocumentEngine;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// A high-level API for finding elements in the watched document
///
/// For maximum precision, prefer role|name format (e.g., "button|Update")
/// over broad selectors like "role:button" that could match multiple
/// elements.
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn DocumentEngine>,
    selector: Selector,
    text_filter: Option<String>,
    label_filter: Option<String>,
    timeout: Duration, // Default timeout for this locator instance
    root: Option<UIElement>,
}

impl Locator {
    /// Create a new locator with the given selector
    pub(crate) fn new(engine: Arc<dyn DocumentEngine>, selector: Selector) -> Self {
        Self {
            engine,
            selector,
            text_filter: None,
            label_filter: None,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            root: None,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    /// This timeout is used if no specific timeout is passed to action/wait methods.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the root element for this locator
    pub fn within(mut self, element: UIElement) -> Self {
        self.root = Some(element);
        self
    }

    /// Keep only elements whose visible text contains `needle`.
    ///
    /// Applied after the structural match, so a broad selector can be
    /// narrowed by what the user actually sees on the control.
    pub fn filter_text(mut self, needle: impl Into<String>) -> Self {
        self.text_filter = Some(needle.into());
        self
    }

    /// Keep only elements whose associated label text contains `needle`.
    ///
    /// Used for controls whose own subtree carries no text, like a radio
    /// button labelled by a separate element.
    pub fn filter_label(mut self, needle: impl Into<String>) -> Self {
        self.label_filter = Some(needle.into());
        self
    }

    /// Get all elements matching this locator, waiting up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    pub async fn all(&self, timeout: Option<Duration>) -> Result<Vec<UIElement>, AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let elements = self.engine.find_elements(
            &self.selector,
            self.root.as_ref(),
            Some(effective_timeout),
        )?;
        Ok(self.apply_filters(elements))
    }

    pub async fn first(&self, timeout: Option<Duration>) -> Result<UIElement, AutomationError> {
        let element = self.wait(timeout).await?;
        Ok(element)
    }

    /// Wait for an element matching the locator to appear, up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<UIElement, AutomationError> {
        debug!("Waiting for element matching selector: {:?}", self.selector);
        let effective_timeout = timeout.unwrap_or(self.timeout);

        // The engine's find calls are blocking and handle polling and
        // timeouts themselves, so run them in a blocking-safe thread
        // instead of stalling the async runtime.
        let this = self.clone();
        let selector_string = self.selector_string();

        task::spawn_blocking(move || {
            if this.text_filter.is_some() || this.label_filter.is_some() {
                let matches = this.engine.find_elements(
                    &this.selector,
                    this.root.as_ref(),
                    Some(effective_timeout),
                )?;
                this.apply_filters(matches).into_iter().next().ok_or_else(|| {
                    AutomationError::ElementNotFound(format!(
                        "No element matching {:?} passes filters (text {:?}, label {:?})",
                        this.selector, this.text_filter, this.label_filter
                    ))
                })
            } else {
                this.engine
                    .find_element(&this.selector, this.root.as_ref(), Some(effective_timeout))
            }
        })
        .await
        .map_err(|e| AutomationError::Internal(format!("Task join error: {e}")))?
        .map_err(|e| {
            // The engine returns ElementNotFound on timeout. Convert it to a
            // more specific Timeout error when the caller actually waited.
            if effective_timeout > Duration::ZERO {
                if let AutomationError::ElementNotFound(inner_msg) = e {
                    return AutomationError::Timeout(format!(
                        "Timed out after {effective_timeout:?} waiting for element {selector_string:?}. Original error: {inner_msg}"
                    ));
                }
            }
            e
        })
    }

    fn apply_filters(&self, elements: Vec<UIElement>) -> Vec<UIElement> {
        elements
            .into_iter()
            .filter(|el| {
                if let Some(needle) = &self.text_filter {
                    let visible = el.text(usize::MAX).unwrap_or_default();
                    if !visible.contains(needle.as_str()) {
                        return false;
                    }
                }
                if let Some(needle) = &self.label_filter {
                    let label = el.attributes().label.unwrap_or_default();
                    if !label.contains(needle.as_str()) {
                        return false;
                    }
                }
                true
            })
            .collect()
    }

    fn append_selector(&self, selector_to_append: Selector) -> Locator {
        let mut new_chain = match self.selector.clone() {
            Selector::Chain(existing_chain) => existing_chain,
            s => vec![s],
        };

        // Append the new selector, flattening if it's also a chain
        match selector_to_append {
            Selector::Chain(mut next_chain_parts) => {
                new_chain.append(&mut next_chain_parts);
            }
            s => new_chain.push(s),
        }

        Locator {
            engine: self.engine.clone(),
            selector: Selector::Chain(new_chain),
            text_filter: self.text_filter.clone(),
            label_filter: self.label_filter.clone(),
            timeout: self.timeout,
            root: self.root.clone(),
        }
    }

    /// Get a nested locator
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        self.append_selector(selector.into())
    }

    pub fn selector_string(&self) -> String {
        format!("{:?}", self.selector)
    }
}
