//! In-memory capture of lifecycle events for tests
//!
//! Every event is keyed by the fields vault operations log: `op`, `event`,
//! `artifact`, `digest` and, for failures, `err_code`. Anything else lands
//! in [`CapturedEvent::fields`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

#[derive(Clone, Debug, Default)]
pub struct CapturedEvent {
    pub level: Option<Level>,
    pub op: Option<String>,
    pub event: Option<String>,
    /// `name@version` of the artifact the operation ran against
    pub artifact: Option<String>,
    pub digest: Option<String>,
    pub err_code: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    fn is(&self, op: &str, event: &str) -> bool {
        self.op.as_deref() == Some(op) && self.event.as_deref() == Some(event)
    }

    fn record(&mut self, field: &Field, value: String) {
        let slot = match field.name() {
            "op" => &mut self.op,
            "event" => &mut self.event,
            "artifact" => &mut self.artifact,
            "digest" => &mut self.digest,
            "err_code" => &mut self.err_code,
            other => {
                self.fields.insert(other.to_string(), value);
                return;
            }
        };
        *slot = Some(value);
    }
}

impl Visit for CapturedEvent {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{:?}", value));
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
        let mut captured = CapturedEvent {
            level: Some(*event.metadata().level()),
            ..CapturedEvent::default()
        };
        event.record(&mut captured);
        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

/// Shared view of everything captured so far
#[derive(Clone)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    fn matching(&self, keep: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| keep(e)).cloned().collect())
            .unwrap_or_default()
    }

    /// Events for one operation, in emission order
    pub fn events_for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op.as_deref() == Some(op))
    }

    /// Events logged against one artifact, in emission order
    pub fn events_for_artifact(&self, artifact: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.artifact.as_deref() == Some(artifact))
    }

    /// # Panics
    ///
    /// Panics unless `artifact` logged `event` for `op`.
    pub fn assert_artifact_event(&self, artifact: &str, op: &str, event: &str) {
        let logged = self.events_for_artifact(artifact);
        assert!(
            logged.iter().any(|e| e.is(op, event)),
            "{} never logged op={} event={}; saw {:?}",
            artifact,
            op,
            event,
            logged
                .iter()
                .map(|e| (e.op.clone(), e.event.clone()))
                .collect::<Vec<_>>()
        );
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capturing subscriber once per test binary
///
/// Tests in one binary share the buffer, so filter by a unique op or
/// artifact.
///
/// ```
/// use vaultkeep_core::logging_facility::test_capture::init_test_capture;
/// use vaultkeep_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("ingest", artifact = "doc@1.0");
/// capture.assert_artifact_event("doc@1.0", "ingest", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let events = Arc::new(Mutex::new(Vec::new()));
            let layer = CaptureLayer {
                events: events.clone(),
            };
            // an earlier global subscriber wins; assertions then fail instead
            let _ = tracing_subscriber::registry().with(layer).try_init();
            TestCapture { events }
        })
        .clone()
}
