mod controller_tests;

use crate::sequence::SequenceConfig;
use crate::sim::{NodeId, NodeSpec, SimDocument};
use crate::watcher::WatchTarget;
use crate::{Page, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

/// A simulated listing page with the full cast of controls the watcher and
/// sequencer touch: a scanned region, the gating description field, and the
/// five stage controls (two of them decoys).
pub struct ListingFixture {
    pub doc: SimDocument,
    pub region: NodeId,
    pub status_line: NodeId,
    pub gate: NodeId,
}

impl ListingFixture {
    pub fn new() -> Self {
        let doc = SimDocument::new();
        let root = doc.root_id();

        let region = doc.insert(root, NodeSpec::new("section"));
        let status_line = doc.insert(
            region,
            NodeSpec::new("paragraph").text("Shipping: Standard Shipping"),
        );
        let gate = doc.insert(root, NodeSpec::new("textarea").name("description"));

        // Stage 1: two activator candidates, told apart by visible text
        doc.insert(
            root,
            NodeSpec::new("link")
                .test_id("details-link")
                .attr("data-location", "shipping_method_menu:details")
                .text("Details"),
        );
        doc.insert(
            root,
            NodeSpec::new("link")
                .test_id("change-link")
                .attr("data-location", "shipping_method_menu:change")
                .text("Change"),
        );

        // Stage 2: expansion control
        doc.insert(
            root,
            NodeSpec::new("button")
                .test_id("options-trigger")
                .text("Shipping options"),
        );

        // Stage 3: radio group, each radio labelled by a separate element
        let label_a = doc.insert(root, NodeSpec::new("label").text("Courier Express"));
        let label_b = doc.insert(root, NodeSpec::new("label").text("Postal Service"));
        let label_c = doc.insert(root, NodeSpec::new("label").text("Local Pickup"));
        doc.insert(
            root,
            NodeSpec::new("radio")
                .test_id("radio-courier")
                .name("shippingMethod")
                .labelled_by(label_a),
        );
        doc.insert(
            root,
            NodeSpec::new("radio")
                .test_id("radio-postal")
                .name("shippingMethod")
                .labelled_by(label_b),
        );
        doc.insert(
            root,
            NodeSpec::new("radio")
                .test_id("radio-pickup")
                .name("shippingMethod")
                .labelled_by(label_c),
        );

        // Stages 4 and 5
        doc.insert(
            root,
            NodeSpec::new("button").test_id("update-shipping").text("Update"),
        );
        doc.insert(
            root,
            NodeSpec::new("button").test_id("list-item-button").text("List item"),
        );

        doc.set_path("/listing/create");

        Self {
            doc,
            region,
            status_line,
            gate,
        }
    }

    pub fn page(&self) -> Page {
        Page::new(Arc::new(self.doc.clone()))
    }

    pub fn target(&self) -> WatchTarget {
        WatchTarget::new("role:section", "Express Shipping", "name:description")
            .with_settle_delay(Duration::from_millis(10))
    }

    pub fn sequence_config(&self) -> SequenceConfig {
        let mut activator_attrs = BTreeMap::new();
        activator_attrs.insert("data-location".to_string(), "shipping_method_menu".to_string());
        SequenceConfig {
            activator: Selector::Attributes(activator_attrs),
            activator_text: "Change".to_string(),
            expansion_control: Selector::TestId("options-trigger".to_string()),
            option_group: Selector::Name("shippingMethod".to_string()),
            option_label_marker: "Postal".to_string(),
            confirm_control: Selector::TestId("update-shipping".to_string()),
            final_control: Selector::TestId("list-item-button".to_string()),
            expected_path: "/listing/create".to_string(),
        }
    }

    /// Put text in the gating field so scans are no longer skipped
    pub fn fill_gate(&self) {
        self.doc.set_value(self.gate, "A handmade ceramic mug, boxed.");
    }

    /// Mutate the region so it contains the marker string
    pub fn show_marker(&self) {
        self.doc
            .set_text(self.status_line, "Shipping: Express Shipping");
    }
}

pub const FULL_SEQUENCE: [&str; 5] = [
    "change-link",
    "options-trigger",
    "radio-postal",
    "update-shipping",
    "list-item-button",
];
