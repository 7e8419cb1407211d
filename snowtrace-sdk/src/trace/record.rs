use serde::{Deserialize, Serialize};
use snowtrace::trace::{Event, SpanContext, SpanId};
use snowtrace::KeyValue;
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

/// The immutable record of a completed span.
///
/// A `RawSpan` is created exactly once, when its span finishes, and is the
/// unit delivered to [`SpanRecorder`]s and shipped across process
/// boundaries by the [wire codec].
///
/// [wire codec]: crate::trace::encode_span
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RawSpan {
    /// The span's context, including trace and span ids and baggage.
    pub context: SpanContext,
    /// Id of the referenced prior span, invalid for root spans.
    pub parent_span_id: SpanId,
    /// Span operation name.
    pub operation_name: Cow<'static, str>,
    /// Span start time.
    pub start_time: SystemTime,
    /// Span end time.
    pub end_time: SystemTime,
    /// Tags set on the span.
    pub tags: Vec<KeyValue>,
    /// Timed events logged on the span.
    pub logs: Vec<Event>,
}

/// The sink finished spans are delivered to.
///
/// Every span finish delivers exactly one [`RawSpan`] to the recorder of
/// the tracer that produced the span; recorders must not assume delivery
/// order across threads.
pub trait SpanRecorder: fmt::Debug + Send + Sync {
    /// Record a finished span.
    fn record_span(&self, span: RawSpan);
}

/// A recorder that immediately invokes a caller-supplied function on each
/// received span.
///
/// This is the recording backend for ad-hoc tracers whose spans are
/// collected in-process instead of being sent to a storage sink.
pub struct CallbackRecorder(Box<dyn Fn(RawSpan) + Send + Sync>);

impl CallbackRecorder {
    /// Create a recorder invoking `callback` on every finished span.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(RawSpan) + Send + Sync + 'static,
    {
        CallbackRecorder(Box::new(callback))
    }
}

impl SpanRecorder for CallbackRecorder {
    fn record_span(&self, span: RawSpan) {
        (self.0)(span)
    }
}

impl fmt::Debug for CallbackRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRecorder").finish()
    }
}

/// A recorder that discards every span.
///
/// Used when a backend is wanted only for its propagation side
/// (context continuation, baggage) and not for storage.
#[derive(Clone, Debug, Default)]
pub struct DropRecorder;

impl SpanRecorder for DropRecorder {
    fn record_span(&self, _span: RawSpan) {}
}
