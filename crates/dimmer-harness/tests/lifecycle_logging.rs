#![forbid(unsafe_code)]

//! Integration tests: lifecycle events seen by a tracing subscriber.

use std::fmt;
use std::sync::{Arc, Mutex};

use dimmer_core::Size;
use dimmer_harness::Page;
use dimmer_widgets::modal::ModalOptionsPatch;
use pretty_assertions::assert_eq;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Clone, Default)]
struct Messages(Arc<Mutex<Vec<String>>>);

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for Messages {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.0.lock().unwrap().push(message);
        }
    }
}

const LIFECYCLE: [&str; 5] = [
    "scroll locked",
    "modal opened",
    "scroll released",
    "modal closing",
    "modal closed",
];

fn lifecycle(messages: &Messages) -> Vec<String> {
    messages
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|m| LIFECYCLE.contains(&m.as_str()))
        .cloned()
        .collect()
}

#[test]
fn open_and_close_log_in_order() {
    let messages = Messages::default();
    let subscriber = tracing_subscriber::registry().with(messages.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut page = Page::new();
        let el = page.element(Size::new(200, 150));
        page.open(el, &ModalOptionsPatch::new()).unwrap();
        page.settle().unwrap();
        page.close().unwrap();
        page.settle().unwrap();
    });
    assert_eq!(lifecycle(&messages), LIFECYCLE);
}

#[test]
fn nested_modals_lock_scroll_once() {
    let messages = Messages::default();
    let subscriber = tracing_subscriber::registry().with(messages.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut page = Page::new();
        let patch = ModalOptionsPatch::new().fade_duration_ms(0);
        let a = page.element(Size::new(200, 150));
        let b = page.element(Size::new(200, 150));
        page.open(a, &patch).unwrap();
        page.open(b, &patch).unwrap();
        page.close().unwrap();
        page.close().unwrap();
    });
    let log = lifecycle(&messages);
    let count = |needle: &str| log.iter().filter(|m| *m == needle).count();
    assert_eq!(count("scroll locked"), 1);
    assert_eq!(count("scroll released"), 1);
    assert_eq!(count("modal opened"), 2);
    assert_eq!(count("modal closed"), 2);
}
