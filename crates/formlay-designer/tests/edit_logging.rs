#![cfg(feature = "tracing")]

//! Structured log events emitted by designer edits.
//!
//! Run:
//!   cargo test -p formlay-designer --features tracing --test edit_logging

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use formlay_core::{ComponentId, LayoutModel, Rect, Size};
use formlay_designer::{LayoutDesigner, StaticMapper};
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: events.clone(),
    });
    tracing::subscriber::with_default(subscriber, f);
    let out = events.lock().unwrap().clone();
    out
}

fn designer() -> LayoutDesigner<StaticMapper> {
    let form = ComponentId::from("form");
    let mut model = LayoutModel::new();
    model
        .create_container(form, Size::new(400, 300))
        .expect("form");
    let mut mapper = StaticMapper::new();
    mapper.set_interior("form", Rect::from_size(400, 300));
    let mut designer = LayoutDesigner::new(model, mapper);
    designer.update_current_state();
    designer
}

fn named<'a>(events: &'a [CapturedEvent], message: &str) -> Vec<&'a CapturedEvent> {
    events
        .iter()
        .filter(|event| event.message() == Some(message))
        .collect()
}

#[test]
fn committed_add_logs_drag_placement_and_commit() {
    let mut designer = designer();
    let form = ComponentId::from("form");
    let events = capture(|| {
        designer
            .add_component(ComponentId::from("a"), &form, Rect::new(10, 10, 90, 20))
            .expect("add");
    });

    let started = named(&events, "designer.drag_started");
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].fields.get("components").map(String::as_str), Some("1"));

    // One placement per axis.
    let placed = named(&events, "feeder.add");
    assert_eq!(placed.len(), 2);
    let dims: Vec<&str> = placed
        .iter()
        .filter_map(|event| event.fields.get("dim").map(String::as_str))
        .collect();
    assert!(dims.contains(&"horizontal"));
    assert!(dims.contains(&"vertical"));

    let committed = named(&events, "designer.drag_committed");
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].fields.get("changed").map(String::as_str), Some("true"));
}

#[test]
fn edits_log_below_info() {
    let mut designer = designer();
    let form = ComponentId::from("form");
    let events = capture(|| {
        designer
            .add_component(ComponentId::from("a"), &form, Rect::new(10, 10, 90, 20))
            .expect("add");
        designer
            .remove_components(&[ComponentId::from("a")])
            .expect("remove");
    });

    assert!(!named(&events, "designer.remove").is_empty());
    for event in &events {
        assert!(
            event.level >= tracing::Level::DEBUG,
            "unexpected {:?} event {:?}",
            event.level,
            event.message()
        );
        assert!(
            event.fields.keys().any(|key| key != "message"),
            "event without structured fields: {:?}",
            event.message()
        );
    }
}

#[test]
fn rejected_edit_logs_nothing() {
    let mut designer = designer();
    let events = capture(|| {
        let result = designer.remove_components(&[ComponentId::from("ghost")]);
        assert!(result.is_err());
    });
    assert!(events.is_empty());
}
