//! In-memory event capture
//!
//! The Test profile's subscriber: collects the engine's canonical events
//! so suites can assert on edit cycles, constraint prunes, and failures
//! without parsing formatted log output. The canonical fields from
//! `trellis_core_types::schema` are lifted out of each event by key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::Visit;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use trellis_core_types::schema;

/// One captured event, canonical fields lifted out of the field map
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub component: Option<String>,
    pub event: Option<String>,
    pub path: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn ident(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_IDENT).map(String::as_str)
    }

    pub fn edit_mode(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_EDIT_MODE).map(String::as_str)
    }

    pub fn constraint(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_CONSTRAINT).map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_REQUEST_ID).map(String::as_str)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_TRACE_ID).map(String::as_str)
    }

    pub fn err_kind(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_ERR_KIND).map(String::as_str)
    }

    pub fn err_status(&self) -> Option<&str> {
        self.fields.get(schema::FIELD_ERR_STATUS).map(String::as_str)
    }
}

struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor {
            fields: HashMap::new(),
        };
        event.record(&mut visitor);

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            component: visitor.fields.get(schema::FIELD_COMPONENT).cloned(),
            event: visitor.fields.get(schema::FIELD_EVENT).cloned(),
            path: visitor.fields.get(schema::FIELD_PATH).cloned(),
            fields: visitor.fields,
        };

        self.events
            .lock()
            .map(|mut events| events.push(captured))
            .ok();
    }
}

/// Shared handle over the captured event stream
#[derive(Clone)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Captured events carrying the given canonical event name
    pub fn named(&self, event: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event.as_deref() == Some(event))
            .collect()
    }

    /// Assert at least one event with the given name was captured
    ///
    /// # Panics
    ///
    /// Panics if no matching event was captured
    pub fn assert_event(&self, event: &str) {
        assert!(
            !self.named(event).is_empty(),
            "expected event {} not found in {} captured events",
            event,
            self.events().len()
        );
    }

    pub fn clear(&self) {
        self.events.lock().map(|mut e| e.clear()).ok();
    }
}

static GLOBAL_CAPTURE: OnceLock<EventCapture> = OnceLock::new();

/// Install the capture subscriber process-wide (once) and return the
/// shared handle; later calls return the same capture.
pub fn install() -> EventCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = Arc::new(Mutex::new(Vec::new()));
            let layer = CaptureLayer {
                events: Arc::clone(&events),
            };
            tracing_subscriber::registry().with(layer).init();
            EventCapture { events }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_fields_lifted() {
        let mut fields = HashMap::new();
        fields.insert(schema::FIELD_CONSTRAINT.to_string(), "depth".to_string());
        fields.insert(schema::FIELD_ERR_STATUS.to_string(), "404".to_string());
        let event = CapturedEvent {
            level: Level::DEBUG,
            component: Some("engine".to_string()),
            event: Some(schema::EVENT_PRUNED.to_string()),
            path: Some("/a/b".to_string()),
            fields,
        };
        assert_eq!(event.constraint(), Some("depth"));
        assert_eq!(event.err_status(), Some("404"));
        assert_eq!(event.ident(), None);
    }
}
