#![allow(dead_code)]

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use serde_json::Value;
use tracing::{
    field::{Field, Visit},
    subscriber::DefaultGuard,
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, prelude::*, Layer, Registry};

use xray::{abstract_factory::SnapshotStore, kinds::Kind};

/// Records the message of every WARN event it sees.
#[derive(Clone, Default)]
pub struct WarnCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarnCapture {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn count_of(&self, message: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.as_str() == message)
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for WarnCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        self.messages
            .lock()
            .unwrap()
            .push(visitor.0.unwrap_or_default());
    }
}

/// Capture warnings emitted on this thread until the guard drops.  Tests
/// using this must run on a current-thread runtime (the `tokio::test`
/// default).
pub fn capture_warnings() -> (WarnCapture, DefaultGuard) {
    let capture = WarnCapture::default();
    let guard = tracing::subscriber::set_default(Registry::default().with(capture.clone()));
    (capture, guard)
}

pub fn store(objects: &[(Kind, Value)]) -> SnapshotStore {
    let mut store = SnapshotStore::new();
    for (kind, object) in objects {
        store.insert(*kind, object.clone()).unwrap();
    }
    store
}

pub fn named(ns: &str, name: &str) -> Value {
    serde_json::json!({ "metadata": { "name": name, "namespace": ns } })
}
