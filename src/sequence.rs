//! Ordered, interdependent UI-interaction stages.
//!
//! The sequencer is a generic interpreter over a list of stage
//! descriptors: locator, optional text/label filter, optional
//! precondition, one activation. Stages run strictly in order with a
//! configurable wait between them; the first failing stage aborts the
//! whole run. There are no retries and no rollback — partial execution
//! leaves the page in an intermediate but stable state for manual
//! recovery.

use crate::errors::AutomationError;
use crate::selector::Selector;
use crate::Page;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Check that must hold before a stage's lookup begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePrecondition {
    /// Current page path must equal the given path exactly
    PathEquals(String),
}

/// One step of the automated sequence
#[derive(Debug, Clone)]
pub struct ActionStage {
    pub name: String,
    pub selector: Selector,
    /// Keep only candidates whose visible text contains this
    pub text_filter: Option<String>,
    /// Keep only candidates whose associated label text contains this
    pub label_filter: Option<String>,
    pub precondition: Option<StagePrecondition>,
}

impl ActionStage {
    pub fn new(name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            text_filter: None,
            label_filter: None,
            precondition: None,
        }
    }

    pub fn with_text_filter(mut self, needle: impl Into<String>) -> Self {
        self.text_filter = Some(needle.into());
        self
    }

    pub fn with_label_filter(mut self, needle: impl Into<String>) -> Self {
        self.label_filter = Some(needle.into());
        self
    }

    pub fn with_precondition(mut self, precondition: StagePrecondition) -> Self {
        self.precondition = Some(precondition);
        self
    }
}

/// Deployment data for the canonical five-stage plan: which controls the
/// sequence touches and where the page must be before the final stage.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Structural locator for stage 1 candidates
    pub activator: Selector,
    /// Visible text that identifies the right activator among candidates
    pub activator_text: String,
    /// The control that expands the options panel
    pub expansion_control: Selector,
    /// The group of same-named selectable controls
    pub option_group: Selector,
    /// Marker word the target option's label must contain
    pub option_label_marker: String,
    /// The control that confirms the new selection
    pub confirm_control: Selector,
    /// The final control, activated only on the expected page
    pub final_control: Selector,
    /// Exact path the page must be at before the final stage
    pub expected_path: String,
}

impl SequenceConfig {
    /// Build the five-stage plan. Order is fixed; a stage is never skipped
    /// or reordered.
    pub fn stages(&self) -> Vec<ActionStage> {
        vec![
            ActionStage::new("activate change control", self.activator.clone())
                .with_text_filter(self.activator_text.clone()),
            ActionStage::new("expand options panel", self.expansion_control.clone()),
            ActionStage::new("select marked option", self.option_group.clone())
                .with_label_filter(self.option_label_marker.clone()),
            ActionStage::new("confirm update", self.confirm_control.clone()),
            ActionStage::new("submit", self.final_control.clone())
                .with_precondition(StagePrecondition::PathEquals(self.expected_path.clone())),
        ]
    }
}

/// Executes a stage plan against a page, one activation per stage
pub struct ActionSequencer {
    page: Page,
    stages: Vec<ActionStage>,
    wait: Duration,
}

impl ActionSequencer {
    pub fn new(page: Page, stages: Vec<ActionStage>, wait: Duration) -> Self {
        Self { page, stages, wait }
    }

    /// Run all stages in order, waiting `wait` between consecutive stages.
    ///
    /// The first stage error aborts the run and propagates to the caller;
    /// earlier stages are not undone and later stages never start.
    #[instrument(skip(self), fields(stages = self.stages.len()))]
    pub async fn run(&self) -> Result<(), AutomationError> {
        info!("starting action sequence");
        for (index, stage) in self.stages.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.wait).await;
            }
            let position = index + 1;
            self.run_stage(position, stage).await.map_err(|e| {
                error!(stage = position, name = %stage.name, error = %e, "action sequence aborted");
                e
            })?;
            info!(stage = position, name = %stage.name, "stage completed");
        }
        info!("action sequence completed");
        Ok(())
    }

    async fn run_stage(&self, position: usize, stage: &ActionStage) -> Result<(), AutomationError> {
        // Preconditions gate the stage before any lookup touches the page
        if let Some(StagePrecondition::PathEquals(expected)) = &stage.precondition {
            let current = self.page.current_path()?;
            if current != *expected {
                return Err(AutomationError::PreconditionFailed(format!(
                    "stage {position} ({}): current path {current:?} does not match {expected:?}",
                    stage.name
                )));
            }
        }

        let mut locator = self
            .page
            .locator(stage.selector.clone())
            .set_default_timeout(Duration::ZERO);
        if let Some(needle) = &stage.text_filter {
            locator = locator.filter_text(needle.clone());
        }
        if let Some(needle) = &stage.label_filter {
            locator = locator.filter_label(needle.clone());
        }

        // Fail-fast lookup: a missing element aborts the sequence with an
        // error naming the stage that failed.
        let element = locator.wait(None).await.map_err(|e| {
            AutomationError::ElementNotFound(format!("stage {position} ({}): {e}", stage.name))
        })?;

        element.click()?;
        Ok(())
    }
}
