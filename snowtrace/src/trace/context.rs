//! Context extensions for tracing: span and tracer bindings, async span
//! forking, and idempotent span establishment.
use crate::trace::{
    BoxedSpan, NoopTracer, SpanBuilder, SpanContext, Tracer, SNOWBALL_BAGGAGE_KEY,
};
use crate::{Context, KeyValue};
use std::sync::{Arc, Mutex};

/// The active span bound into a [`Context`], synchronized so the context
/// can be cloned across threads while the span is still live.
#[derive(Debug)]
pub(crate) struct SynchronizedSpan {
    inner: Mutex<BoxedSpan>,
}

impl SynchronizedSpan {
    pub(crate) fn new(span: BoxedSpan) -> Self {
        SynchronizedSpan {
            inner: Mutex::new(span),
        }
    }
}

/// A reference to the currently active span in a context.
#[derive(Debug)]
pub struct SpanRef<'a>(&'a SynchronizedSpan);

impl SpanRef<'_> {
    fn with_inner_mut<T, F: FnOnce(&mut BoxedSpan) -> T>(&self, f: F) -> Option<T> {
        self.0.inner.lock().ok().map(|mut locked| f(&mut locked))
    }

    /// Set a tag on the active span.
    pub fn set_tag(&self, tag: KeyValue) {
        self.with_inner_mut(|inner| inner.set_tag(tag));
    }

    /// Set a baggage item on the active span.
    pub fn set_baggage_item(&self, key: &str, value: &str) {
        self.with_inner_mut(|inner| inner.set_baggage_item(key, value));
    }

    /// Returns the value of the baggage item with the given key, if set.
    pub fn baggage_item(&self, key: &str) -> Option<String> {
        self.with_inner_mut(|inner| inner.baggage_item(key)).flatten()
    }

    /// Record a timed event on the active span.
    pub fn add_event(&self, name: String, attributes: Vec<KeyValue>) {
        self.with_inner_mut(|inner| inner.add_event(name, attributes));
    }

    /// A snapshot of the active span's [`SpanContext`], including its
    /// current baggage.
    pub fn span_context(&self) -> SpanContext {
        self.with_inner_mut(|inner| inner.span_context())
            .unwrap_or_else(SpanContext::empty_context)
    }

    /// A handle to the tracer owning the active span, degrading to the
    /// no-op tracer if the span is unreachable.
    pub fn tracer(&self) -> Box<dyn Tracer> {
        self.with_inner_mut(|inner| inner.tracer())
            .unwrap_or_else(|| Box::new(NoopTracer::new()))
    }

    /// Signals that the operation described by the active span has ended.
    pub fn finish(&self) {
        self.with_inner_mut(|inner| inner.finish());
    }
}

/// Methods for storing and retrieving tracing state in a [`Context`].
pub trait TraceContextExt {
    /// Returns a clone of this context with the given span bound as the
    /// active span.
    fn with_span(&self, span: BoxedSpan) -> Context;

    /// A reference to the active span, if one is bound.
    fn span(&self) -> Option<SpanRef<'_>>;

    /// Whether a span is bound into this context.
    fn has_active_span(&self) -> bool;

    /// Returns a clone of this context with the given tracer bound,
    /// retrievable via [`TraceContextExt::tracer`] from this context or any
    /// context derived from it.
    fn with_tracer(&self, tracer: Arc<dyn Tracer>) -> Context;

    /// The tracer bound into this context, if any.
    ///
    /// Absence is a valid result and means tracing is disabled for this
    /// call; callers fall back to a default or the no-op tracer.
    fn tracer(&self) -> Option<Arc<dyn Tracer>>;
}

/// Context entry holding the request-scoped tracer.
#[derive(Clone)]
struct BoundTracer(Arc<dyn Tracer>);

impl TraceContextExt for Context {
    fn with_span(&self, span: BoxedSpan) -> Context {
        self.with_synchronized_span(Arc::new(SynchronizedSpan::new(span)))
    }

    fn span(&self) -> Option<SpanRef<'_>> {
        self.span.as_deref().map(SpanRef)
    }

    fn has_active_span(&self) -> bool {
        self.span.is_some()
    }

    fn with_tracer(&self, tracer: Arc<dyn Tracer>) -> Context {
        self.with_value(BoundTracer(tracer))
    }

    fn tracer(&self) -> Option<Arc<dyn Tracer>> {
        self.get::<BoundTracer>().map(|bound| bound.0.clone())
    }
}

/// Finishes the span it was created for, exactly once.
///
/// Whoever receives a `SpanCloser` must eventually call [`SpanCloser::close`]
/// or the corresponding span leaks; spans are never auto-finished on drop or
/// by a timer. Calling `close` more than once is safe: later calls are
/// no-ops.
#[derive(Debug)]
pub struct SpanCloser {
    span: Mutex<Option<Arc<SynchronizedSpan>>>,
}

impl SpanCloser {
    /// A closer that does nothing, for operations that started no span.
    pub fn noop() -> Self {
        SpanCloser {
            span: Mutex::new(None),
        }
    }

    fn for_span(span: Arc<SynchronizedSpan>) -> Self {
        SpanCloser {
            span: Mutex::new(Some(span)),
        }
    }

    /// Finish the span, if it has not been finished through this closer
    /// already.
    pub fn close(&self) {
        if let Ok(mut guard) = self.span.lock() {
            if let Some(span) = guard.take() {
                SpanRef(&span).finish();
            }
        }
    }
}

/// Derives a context whose span is suitable for a task that may outlive the
/// current operation.
///
/// If `cx` carries no active span, it is returned unchanged with a no-op
/// closer. If the active span is snowball-flagged, the returned context
/// carries no span at all: a snowball span's recording tracer is ephemeral
/// and may be torn down before the detached task runs, so recording into it
/// from the fork would be a use-after-free of the recording path. Otherwise
/// a new span is started on the active span's own tracer, following from
/// its context, and bound into the returned context; the closer finishes
/// that new span.
pub fn fork_span(cx: &Context, op_name: &str) -> (Context, SpanCloser) {
    let span = match cx.span() {
        Some(span) => span,
        None => return (cx.clone(), SpanCloser::noop()),
    };

    if span.baggage_item(SNOWBALL_BAGGAGE_KEY).as_deref() == Some("1") {
        return (cx.with_span_cleared(), SpanCloser::noop());
    }

    let tracer = span.tracer();
    let new_span = tracer.build(
        SpanBuilder::from_name(op_name.to_owned()).with_follows_from(span.span_context()),
    );
    let new_span = Arc::new(SynchronizedSpan::new(new_span));

    (
        cx.with_synchronized_span(new_span.clone()),
        SpanCloser::for_span(new_span),
    )
}

/// Checks whether `cx` carries an active span and starts one named
/// `op_name` on the given tracer if not.
///
/// Idempotent: a context that already has an active span is returned
/// unchanged with a no-op closer, so an operation already being traced is
/// never double-started. The returned closer must be called once the
/// operation has been fully processed.
pub fn ensure_span(cx: &Context, tracer: &dyn Tracer, op_name: &str) -> (Context, SpanCloser) {
    if cx.has_active_span() {
        return (cx.clone(), SpanCloser::noop());
    }

    let span = Arc::new(SynchronizedSpan::new(tracer.start(op_name)));
    (
        cx.with_synchronized_span(span.clone()),
        SpanCloser::for_span(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NoopTracer;

    #[test]
    fn fork_without_span_passes_context_through() {
        let cx = Context::new();
        let (forked, closer) = fork_span(&cx, "detached");
        assert!(!forked.has_active_span());
        closer.close();
        closer.close();
    }

    #[test]
    fn ensure_is_idempotent() {
        let tracer = NoopTracer::new();
        let cx = Context::new();

        let (cx, closer) = ensure_span(&cx, &tracer, "op");
        assert!(cx.has_active_span());

        let (cx2, closer2) = ensure_span(&cx, &tracer, "op");
        assert!(cx2.has_active_span());

        closer2.close();
        closer.close();
    }

    #[test]
    fn tracer_binding_round_trips() {
        let cx = Context::new();
        assert!(cx.tracer().is_none());

        let tracer: Arc<dyn Tracer> = Arc::new(NoopTracer::new());
        let bound = cx.with_tracer(tracer);
        assert!(bound.tracer().is_some());

        // Bindings survive further derivation.
        let derived = bound.with_value(1u8);
        assert!(derived.tracer().is_some());
    }
}
