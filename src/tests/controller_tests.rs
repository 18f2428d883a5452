use super::{ListingFixture, FULL_SEQUENCE};
use crate::controller::MonitoringController;
use crate::messaging::{parse_message, InboundMessage, MessageResponse, WatcherCommand};
use crate::settings::MonitoringSettings;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

fn enabled_settings() -> MonitoringSettings {
    MonitoringSettings {
        interval: 1,
        enabled: true,
        show_alert: true,
        auto_change_enabled: false,
        wait_time: 10,
    }
}

fn controller(fixture: &ListingFixture) -> MonitoringController {
    MonitoringController::new(
        fixture.page(),
        fixture.target(),
        fixture.sequence_config().stages(),
    )
}

/// Poll `cond` for up to one second
async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn disabled_settings_never_start_a_loop() {
    super::init_tracing();
    let fixture = ListingFixture::new();
    fixture.fill_gate();
    fixture.show_marker();

    let mut controller = controller(&fixture);
    controller.start().await;

    assert!(!controller.is_monitoring());
    tokio::time::sleep(Duration::from_millis(50)).await;
    // No tick ever ran: the marker sits on the page unnoticed
    assert!(fixture.doc.alerts().is_empty());
}

#[tokio::test]
async fn stop_on_idle_controller_is_a_no_op() {
    let fixture = ListingFixture::new();
    let mut controller = controller(&fixture);
    controller.stop().await;
    controller.stop().await;
    assert!(!controller.is_monitoring());
}

#[tokio::test]
async fn alert_mode_notifies_once_and_halts() {
    let fixture = ListingFixture::new();
    fixture.fill_gate();
    fixture.show_marker();

    let mut controller = controller(&fixture).with_settings(enabled_settings());
    controller.start().await;

    let doc = fixture.doc.clone();
    assert!(eventually(move || doc.alerts().len() == 1).await);
    assert!(fixture.doc.alerts()[0].contains("Express Shipping"));

    // Detection halts further polling
    assert!(eventually(|| !controller.is_monitoring()).await);
    assert!(fixture.doc.activation_log().is_empty());
}

#[tokio::test]
async fn auto_mode_runs_the_sequence_once_and_halts() {
    let fixture = ListingFixture::new();
    fixture.fill_gate();
    fixture.show_marker();

    let settings = MonitoringSettings {
        auto_change_enabled: true,
        ..enabled_settings()
    };
    let mut controller = controller(&fixture).with_settings(settings);
    controller.start().await;

    let doc = fixture.doc.clone();
    assert!(eventually(move || doc.activation_log().len() == 5).await);
    assert_eq!(fixture.doc.activation_names(), FULL_SEQUENCE);
    // Auto mode never alerts
    assert!(fixture.doc.alerts().is_empty());
    assert!(eventually(|| !controller.is_monitoring()).await);
}

#[tokio::test]
async fn detection_with_no_action_configured_still_halts() {
    let fixture = ListingFixture::new();
    fixture.fill_gate();
    fixture.show_marker();

    let settings = MonitoringSettings {
        show_alert: false,
        ..enabled_settings()
    };
    let mut controller = controller(&fixture).with_settings(settings);
    controller.start().await;

    assert!(eventually(|| !controller.is_monitoring()).await);
    assert!(fixture.doc.alerts().is_empty());
    assert!(fixture.doc.activation_log().is_empty());
}

#[tokio::test]
async fn failed_sequence_stops_monitoring_without_retry() {
    let fixture = ListingFixture::new();
    fixture.fill_gate();
    fixture.show_marker();

    let mut config = fixture.sequence_config();
    config.option_label_marker = "Teleport".to_string();
    let settings = MonitoringSettings {
        auto_change_enabled: true,
        ..enabled_settings()
    };
    let mut controller =
        MonitoringController::new(fixture.page(), fixture.target(), config.stages())
            .with_settings(settings);
    controller.start().await;

    assert!(eventually(|| !controller.is_monitoring()).await);
    // The sequence aborted at stage 3 and was never retried
    assert_eq!(
        fixture.doc.activation_names(),
        vec!["change-link", "options-trigger"]
    );
}

#[tokio::test]
async fn repeated_updates_leave_exactly_one_pending_tick() {
    let fixture = ListingFixture::new();
    fixture.fill_gate();

    let mut controller = controller(&fixture);
    for _ in 0..3 {
        controller.update_settings(enabled_settings()).await;
    }
    assert!(controller.is_monitoring());

    // Only now does the marker appear; a duplicate chain would produce a
    // second alert on its own cadence.
    fixture.show_marker();
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(fixture.doc.alerts().len(), 1);

    controller.stop().await;
}

#[tokio::test]
async fn disabling_via_update_stops_the_loop() {
    let fixture = ListingFixture::new();
    let mut controller = controller(&fixture).with_settings(enabled_settings());
    controller.start().await;
    assert!(controller.is_monitoring());

    controller
        .update_settings(MonitoringSettings {
            enabled: false,
            ..enabled_settings()
        })
        .await;
    assert!(!controller.is_monitoring());
}

#[tokio::test]
async fn serve_applies_settings_from_the_message_channel() {
    let fixture = ListingFixture::new();
    fixture.fill_gate();
    fixture.show_marker();

    let (tx, rx) = mpsc::channel(8);
    let server = tokio::spawn(controller(&fixture).serve(rx));

    let raw = serde_json::json!({
        "action": "updateSettings",
        "settings": {
            "interval": 1,
            "enabled": true,
            "showAlert": true,
            "autoChangeEnabled": false,
            "waitTime": 10,
        }
    })
    .to_string();
    let message = parse_message(&raw).expect("well-formed message");

    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(WatcherCommand {
        message,
        reply: reply_tx,
    })
    .await
    .unwrap();

    let response: MessageResponse = reply_rx.await.unwrap();
    assert!(response.success);

    let doc = fixture.doc.clone();
    assert!(eventually(move || doc.alerts().len() == 1).await);

    // Closing the channel is the unload signal
    drop(tx);
    server.await.unwrap();
}

#[test]
fn unknown_actions_are_ignored() {
    assert!(parse_message(r#"{"action":"doSomethingElse"}"#).is_none());
    assert!(matches!(
        parse_message(
            r#"{"action":"updateSettings","settings":{"interval":2,"enabled":true,"showAlert":false,"autoChangeEnabled":false,"waitTime":5}}"#
        ),
        Some(InboundMessage::UpdateSettings { .. })
    ));
}
