//! Condition watching: one tick inspects the document for the marker.

use crate::errors::AutomationError;
use crate::selector::Selector;
use crate::Page;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Delay between detection and the start of the action sequence,
/// distinct from the inter-stage wait. Gives the page a moment to settle.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// What the watcher looks for, and where
#[derive(Debug, Clone)]
pub struct WatchTarget {
    /// Container region whose descendant text is scanned
    pub region: Selector,
    /// Text whose presence in the region triggers detection
    pub marker: String,
    /// Free-text input that must be non-empty before any scan occurs
    pub gate: Selector,
    /// Pause between detection and the first sequence stage
    pub settle_delay: Duration,
}

impl WatchTarget {
    pub fn new(
        region: impl Into<Selector>,
        marker: impl Into<String>,
        gate: impl Into<Selector>,
    ) -> Self {
        Self {
            region: region.into(),
            marker: marker.into(),
            gate: gate.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Outcome of a single watch tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The target region is absent from the document
    RegionMissing,
    /// The gating field is empty (or absent); the scan was skipped
    GateEmpty,
    /// The region is present but does not contain the marker
    NotFound,
    /// The marker was found
    Detected,
}

/// Inspects the document for the target condition, one tick at a time
pub struct ConditionWatcher {
    page: Page,
    target: WatchTarget,
}

impl ConditionWatcher {
    pub fn new(page: Page, target: WatchTarget) -> Self {
        Self { page, target }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Inspect the document once.
    ///
    /// Never fails: any error during inspection is logged and reported as
    /// [`TickOutcome::NotFound`] so the polling loop survives flaky pages.
    #[instrument(skip(self), fields(marker = %self.target.marker))]
    pub async fn tick(&self) -> TickOutcome {
        match self.inspect().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "tick inspection failed, treating as not found");
                TickOutcome::NotFound
            }
        }
    }

    async fn inspect(&self) -> Result<TickOutcome, AutomationError> {
        let regions = self
            .page
            .locator(self.target.region.clone())
            .all(Some(Duration::ZERO))
            .await?;
        if regions.is_empty() {
            debug!(region = %self.target.region, "target region not found");
            return Ok(TickOutcome::RegionMissing);
        }

        // The gating field must already hold text; otherwise the tick
        // silently no-ops and the loop reschedules.
        let gate_value = match self
            .page
            .locator(self.target.gate.clone())
            .wait(Some(Duration::ZERO))
            .await
        {
            Ok(field) => field.value().unwrap_or_default(),
            Err(_) => String::new(),
        };
        if gate_value.is_empty() {
            info!("gating field empty, skipping scan");
            return Ok(TickOutcome::GateEmpty);
        }

        for region in &regions {
            if region.text(usize::MAX)?.contains(self.target.marker.as_str()) {
                info!("marker found");
                return Ok(TickOutcome::Detected);
            }
        }

        debug!("marker not found");
        Ok(TickOutcome::NotFound)
    }
}
