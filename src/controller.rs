//! Top-level monitoring state machine.
//!
//! The controller owns start/stop/restart semantics and mediates between
//! the settings surface, the condition watcher, and the action sequencer.
//! At most one monitor task ever runs; rescheduling is chained (the next
//! tick is armed only after the current tick fully settles, including any
//! action sequence it triggered), so ticks never overlap even when a
//! tick's own work outlasts the poll interval.

use crate::messaging::{InboundMessage, MessageResponse, WatcherCommand};
use crate::sequence::{ActionSequencer, ActionStage};
use crate::settings::MonitoringSettings;
use crate::watcher::{ConditionWatcher, TickOutcome, WatchTarget};
use crate::Page;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the monitoring lifecycle for one page
pub struct MonitoringController {
    page: Page,
    target: WatchTarget,
    stages: Vec<ActionStage>,
    settings: MonitoringSettings,
    task: Option<MonitorTask>,
}

impl MonitoringController {
    pub fn new(page: Page, target: WatchTarget, stages: Vec<ActionStage>) -> Self {
        Self {
            page,
            target,
            stages,
            settings: MonitoringSettings::default(),
            task: None,
        }
    }

    /// Seed the controller with previously stored settings
    pub fn with_settings(mut self, settings: MonitoringSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &MonitoringSettings {
        &self.settings
    }

    /// Whether a monitor loop is currently live. A loop that halted itself
    /// after detection no longer counts.
    pub fn is_monitoring(&self) -> bool {
        self.task
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }

    /// Start monitoring. Any prior run is stopped first, so no duplicate
    /// loops can exist. With disabled settings this is a logged no-op.
    #[instrument(skip(self))]
    pub async fn start(&mut self) {
        self.stop().await;

        if !self.settings.enabled {
            info!("monitoring is disabled");
            return;
        }

        info!(interval = self.settings.interval, "starting monitoring");
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            self.page.clone(),
            self.target.clone(),
            self.stages.clone(),
            self.settings.clone(),
            cancel.clone(),
        ));
        self.task = Some(MonitorTask { cancel, handle });
    }

    /// Stop monitoring. Idempotent; safe to call from any state.
    ///
    /// Cancellation is observed at the inter-tick sleep, so a tick or
    /// action sequence already executing finishes before the task ends.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "monitor task ended abnormally");
                }
            }
            info!("monitoring stopped");
        }
    }

    /// Replace the settings wholesale and restart or stop as needed.
    ///
    /// Every update that keeps monitoring enabled restarts the loop, giving
    /// a fresh poll cadence from the moment of the update.
    #[instrument(skip(self, new_settings), fields(enabled = new_settings.enabled, interval = new_settings.interval))]
    pub async fn update_settings(&mut self, new_settings: MonitoringSettings) {
        let was_enabled = self.settings.enabled;
        info!("settings updated");
        self.settings = new_settings;

        if was_enabled != self.settings.enabled || self.settings.enabled {
            self.stop().await;
            if self.settings.enabled {
                self.start().await;
            }
        }
    }

    pub async fn handle_message(&mut self, message: InboundMessage) -> MessageResponse {
        match message {
            InboundMessage::UpdateSettings { settings } => {
                self.update_settings(settings).await;
                MessageResponse::ok()
            }
        }
    }

    /// Consume commands from the inbound queue until the channel closes,
    /// then stop monitoring (channel closure is the unload signal).
    pub async fn serve(mut self, mut rx: mpsc::Receiver<WatcherCommand>) {
        while let Some(command) = rx.recv().await {
            let response = self.handle_message(command.message).await;
            let _ = command.reply.send(response);
        }
        self.stop().await;
    }
}

impl Drop for MonitoringController {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.cancel.cancel();
        }
    }
}

async fn monitor_loop(
    page: Page,
    target: WatchTarget,
    stages: Vec<ActionStage>,
    settings: MonitoringSettings,
    cancel: CancellationToken,
) {
    let watcher = ConditionWatcher::new(page.clone(), target.clone());

    loop {
        let outcome = watcher.tick().await;

        if outcome == TickOutcome::Detected {
            // Detection always halts further polling once acted upon or
            // surfaced, whatever the flags say.
            handle_detection(&page, &target, &stages, &settings).await;
            info!("monitoring halted after detection");
            return;
        }

        // Chained rescheduling: arm the next tick only now that this one
        // has fully settled.
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(settings.poll_interval()) => {}
        }
    }
}

async fn handle_detection(
    page: &Page,
    target: &WatchTarget,
    stages: &[ActionStage],
    settings: &MonitoringSettings,
) {
    if settings.auto_change_enabled {
        info!(delay = ?target.settle_delay, "running action sequence after settle delay");
        tokio::time::sleep(target.settle_delay).await;
        let sequencer = ActionSequencer::new(page.clone(), stages.to_vec(), settings.stage_wait());
        if let Err(e) = sequencer.run().await {
            // No retry: a failed sequence stops monitoring and leaves the
            // page as-is for manual recovery.
            error!(error = %e, "action sequence failed");
        }
    } else if settings.show_alert {
        let message = format!("\"{}\" was found!", target.marker);
        if let Err(e) = page.alert(&message).await {
            warn!(error = %e, "failed to surface alert");
        }
    } else {
        info!("marker detected, no action configured");
    }
}
