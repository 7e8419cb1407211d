//! Fan-out composition over multiple tracer backends.
use crate::propagation::{Extractor, Injector, PropagationError};
use crate::trace::{BoxedSpan, Span, SpanBuilder, SpanContext, Tracer};
use crate::KeyValue;
use std::sync::Arc;

/// A tracer that fans every span operation out to an ordered set of
/// underlying tracers.
///
/// The first tracer is authoritative for wire-context serialization:
/// [`Tracer::inject`] and [`Tracer::extract`] delegate to it alone, because
/// it is the backend responsible for correlating spans between nodes. The
/// remaining tracers observe every span start, mutation, and finish, but
/// their span contexts never cross a process boundary.
///
/// ```
/// use snowtrace::trace::{NoopTracer, TeeTracer, Tracer};
/// use std::sync::Arc;
///
/// let tee = TeeTracer::new(vec![
///     Arc::new(NoopTracer::new()),
///     Arc::new(NoopTracer::new()),
/// ]);
/// let mut span = tee.start("request");
/// span.finish();
/// ```
#[derive(Clone, Debug)]
pub struct TeeTracer {
    tracers: Vec<Arc<dyn Tracer>>,
}

impl TeeTracer {
    /// Create a new `TeeTracer` over the given tracers, first authoritative.
    ///
    /// # Panics
    ///
    /// Panics if `tracers` is empty; a tee needs at least the authoritative
    /// tracer.
    pub fn new(tracers: Vec<Arc<dyn Tracer>>) -> Self {
        assert!(
            !tracers.is_empty(),
            "TeeTracer requires at least one underlying tracer"
        );
        TeeTracer { tracers }
    }

    /// The underlying tracers, in fan-out order.
    pub fn tracers(&self) -> &[Arc<dyn Tracer>] {
        &self.tracers
    }
}

impl Tracer for TeeTracer {
    /// Starts a span on every underlying tracer and returns a composite
    /// forwarding every mutation to all of them.
    fn build(&self, builder: SpanBuilder) -> BoxedSpan {
        let spans = self
            .tracers
            .iter()
            .map(|tracer| tracer.build(builder.clone()))
            .collect();

        Box::new(TeeSpan {
            spans,
            tracer: self.clone(),
        })
    }

    /// Injection delegates to the first tracer only.
    fn inject(
        &self,
        span_context: &SpanContext,
        carrier: &mut dyn Injector,
    ) -> Result<(), PropagationError> {
        self.tracers[0].inject(span_context, carrier)
    }

    /// Extraction delegates to the first tracer only.
    fn extract(&self, carrier: &dyn Extractor) -> Result<SpanContext, PropagationError> {
        self.tracers[0].extract(carrier)
    }
}

/// Composite span produced by a [`TeeTracer`].
///
/// The span context visible to callers is the first branch's context; reads
/// go to the first branch and writes go to all branches.
#[derive(Debug)]
pub struct TeeSpan {
    spans: Vec<BoxedSpan>,
    tracer: TeeTracer,
}

impl Span for TeeSpan {
    fn set_tag(&mut self, tag: KeyValue) {
        for span in &mut self.spans {
            span.set_tag(tag.clone());
        }
    }

    fn set_baggage_item(&mut self, key: &str, value: &str) {
        for span in &mut self.spans {
            span.set_baggage_item(key, value);
        }
    }

    fn baggage_item(&self, key: &str) -> Option<String> {
        self.spans[0].baggage_item(key)
    }

    fn add_event(&mut self, name: String, attributes: Vec<KeyValue>) {
        for span in &mut self.spans {
            span.add_event(name.clone(), attributes.clone());
        }
    }

    fn span_context(&self) -> SpanContext {
        self.spans[0].span_context()
    }

    fn tracer(&self) -> Box<dyn Tracer> {
        Box::new(self.tracer.clone())
    }

    /// Finish is forwarded to every branch unconditionally; one branch
    /// refusing the finish must not starve the others of theirs.
    fn finish(&mut self) {
        for span in &mut self.spans {
            span.finish();
        }
    }
}
