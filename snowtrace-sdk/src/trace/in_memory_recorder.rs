use crate::trace::{RawSpan, SpanRecorder};
use std::sync::{Arc, Mutex};

/// A span recorder that stores finished spans in memory.
///
/// Useful for tests and for debugging tracer configurations. Clones share
/// the same storage, so a clone can be handed to a tracer while the
/// original is kept for inspection.
///
/// # Example
///
/// ```
/// use snowtrace::trace::{Span, Tracer};
/// use snowtrace_sdk::trace::{BasicTracer, InMemoryRecorder};
///
/// let recorder = InMemoryRecorder::new();
/// let tracer = BasicTracer::builder()
///     .with_recorder(recorder.clone())
///     .build();
///
/// let mut span = tracer.start("say hello");
/// span.finish();
///
/// assert_eq!(recorder.finished_spans().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecorder {
    spans: Arc<Mutex<Vec<RawSpan>>>,
}

impl InMemoryRecorder {
    /// Create a new, empty recorder.
    pub fn new() -> Self {
        InMemoryRecorder::default()
    }

    /// Returns the finished spans recorded so far.
    pub fn finished_spans(&self) -> Vec<RawSpan> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .unwrap_or_default()
    }

    /// Clears the internal storage of finished spans.
    pub fn reset(&self) {
        let _ = self.spans.lock().map(|mut spans| spans.clear());
    }
}

impl SpanRecorder for InMemoryRecorder {
    fn record_span(&self, span: RawSpan) {
        let _ = self.spans.lock().map(|mut spans| spans.push(span));
    }
}
