//! End-to-end test of the monitoring loop through the public API: settings
//! arrive over the message channel, the document mutates underneath the
//! watcher, and the action sequence drives the page.

use anyhow::Result;
use docwatch::sim::{NodeSpec, SimDocument};
use docwatch::{
    MonitoringController, MonitoringSettings, Page, Selector, SequenceConfig, WatchTarget,
    WatcherCommand,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

struct Harness {
    doc: SimDocument,
    page: Page,
    target: WatchTarget,
    config: SequenceConfig,
    status: docwatch::sim::NodeId,
    gate: docwatch::sim::NodeId,
}

fn build_harness() -> Harness {
    let doc = SimDocument::new();
    let root = doc.root_id();

    let region = doc.insert(root, NodeSpec::new("section"));
    let status = doc.insert(region, NodeSpec::new("paragraph").text("Standard Shipping"));
    let gate = doc.insert(root, NodeSpec::new("textarea").name("description"));

    doc.insert(
        root,
        NodeSpec::new("link")
            .test_id("change-link")
            .attr("data-location", "shipping_method_menu:change")
            .text("Change"),
    );
    doc.insert(root, NodeSpec::new("button").test_id("options-trigger"));
    let label = doc.insert(root, NodeSpec::new("label").text("Postal Service"));
    doc.insert(
        root,
        NodeSpec::new("radio")
            .test_id("radio-postal")
            .name("shippingMethod")
            .labelled_by(label),
    );
    doc.insert(root, NodeSpec::new("button").test_id("update-shipping"));
    doc.insert(root, NodeSpec::new("button").test_id("list-item-button"));
    doc.set_path("/listing/create");

    let page = Page::new(Arc::new(doc.clone()));
    let target = WatchTarget::new("role:section", "Express Shipping", "name:description")
        .with_settle_delay(Duration::from_millis(10));

    let mut activator_attrs = BTreeMap::new();
    activator_attrs.insert("data-location".to_string(), "shipping_method_menu".to_string());
    let config = SequenceConfig {
        activator: Selector::Attributes(activator_attrs),
        activator_text: "Change".to_string(),
        expansion_control: Selector::TestId("options-trigger".to_string()),
        option_group: Selector::Name("shippingMethod".to_string()),
        option_label_marker: "Postal".to_string(),
        confirm_control: Selector::TestId("update-shipping".to_string()),
        final_control: Selector::TestId("list-item-button".to_string()),
        expected_path: "/listing/create".to_string(),
    };

    Harness {
        doc,
        page,
        target,
        config,
        status,
        gate,
    }
}

async fn send_settings(
    tx: &mpsc::Sender<WatcherCommand>,
    settings: MonitoringSettings,
) -> Result<()> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(WatcherCommand {
        message: docwatch::InboundMessage::UpdateSettings { settings },
        reply: reply_tx,
    })
    .await?;
    let response = reply_rx.await?;
    assert!(response.success);
    Ok(())
}

#[tokio::test]
async fn message_driven_auto_change_end_to_end() -> Result<()> {
    let harness = build_harness();
    let controller = MonitoringController::new(
        harness.page.clone(),
        harness.target.clone(),
        harness.config.stages(),
    );

    let (tx, rx) = mpsc::channel(8);
    let server = tokio::spawn(controller.serve(rx));

    // Seed the page: the gating field has text, the marker is not there yet
    harness.doc.set_value(harness.gate, "Hand-thrown ceramic mug");

    send_settings(
        &tx,
        MonitoringSettings {
            interval: 1,
            enabled: true,
            show_alert: false,
            auto_change_enabled: true,
            wait_time: 10,
        },
    )
    .await?;

    // The externally-driven page flips to the marker state
    harness.doc.set_text(harness.status, "Express Shipping");

    let mut sequenced = false;
    for _ in 0..150 {
        if harness.doc.activation_log().len() == 5 {
            sequenced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(sequenced, "sequence never completed");
    assert_eq!(
        harness.doc.activation_names(),
        vec![
            "change-link",
            "options-trigger",
            "radio-postal",
            "update-shipping",
            "list-item-button"
        ]
    );
    // Auto mode surfaces no alert
    assert!(harness.doc.alerts().is_empty());

    drop(tx);
    server.await?;
    Ok(())
}

#[tokio::test]
async fn disabling_through_the_channel_stops_polling() -> Result<()> {
    let harness = build_harness();
    let controller = MonitoringController::new(
        harness.page.clone(),
        harness.target.clone(),
        harness.config.stages(),
    );

    let (tx, rx) = mpsc::channel(8);
    let server = tokio::spawn(controller.serve(rx));

    harness.doc.set_value(harness.gate, "draft text");
    send_settings(
        &tx,
        MonitoringSettings {
            interval: 1,
            enabled: true,
            show_alert: true,
            auto_change_enabled: false,
            wait_time: 10,
        },
    )
    .await?;

    send_settings(
        &tx,
        MonitoringSettings {
            enabled: false,
            ..MonitoringSettings::default()
        },
    )
    .await?;

    // Marker appears after the stop; nothing may react to it
    harness.doc.set_text(harness.status, "Express Shipping");
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(harness.doc.alerts().is_empty());
    assert!(harness.doc.activation_log().is_empty());

    drop(tx);
    server.await?;
    Ok(())
}
