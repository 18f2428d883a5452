//! Condition watching and action sequencing for live document trees
//!
//! This crate watches an externally-mutated document tree for a marker
//! string and, depending on configuration, either notifies the user or
//! drives a fixed, ordered sequence of UI interactions on that page. The
//! lookup model is inspired by Playwright: selectors, locators, and
//! elements over a pluggable document backend.

use std::sync::Arc;
use tracing::instrument;

pub mod controller;
pub mod element;
pub mod engine;
pub mod errors;
pub mod locator;
pub mod messaging;
pub mod selector;
pub mod sequence;
pub mod settings;
pub mod sim;
#[cfg(test)]
mod tests;
pub mod watcher;

pub use controller::MonitoringController;
pub use element::{ClickResult, UIElement, UIElementAttributes, UIElementImpl};
pub use engine::DocumentEngine;
pub use errors::AutomationError;
pub use locator::Locator;
pub use messaging::{InboundMessage, MessageResponse, WatcherCommand};
pub use selector::Selector;
pub use sequence::{ActionSequencer, ActionStage, SequenceConfig, StagePrecondition};
pub use settings::{MonitoringSettings, SettingsStore};
pub use watcher::{ConditionWatcher, TickOutcome, WatchTarget};

/// The main entry point for watching a document
///
/// A `Page` is a cheap, cloneable handle over the shared document backend.
pub struct Page {
    engine: Arc<dyn DocumentEngine>,
}

impl Page {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self { engine }
    }

    /// Gets the root element of the watched document.
    pub fn root(&self) -> UIElement {
        self.engine.root()
    }

    #[instrument(skip(self, selector))]
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        let selector = selector.into();
        Locator::new(self.engine.clone(), selector)
    }

    /// Current navigable location of the page, as a path string.
    pub fn current_path(&self) -> Result<String, AutomationError> {
        self.engine.current_path()
    }

    /// Surface a blocking user notification on the page.
    pub async fn alert(&self, message: &str) -> Result<(), AutomationError> {
        self.engine.alert(message).await
    }
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}
