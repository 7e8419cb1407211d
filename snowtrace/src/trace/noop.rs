//! No-op trace impls
//!
//! This implementation is returned by the tracer provider while tracing is
//! disabled. It is also useful for testing purposes as it is intended to
//! have minimal resource utilization and runtime impact.
use crate::propagation::{Extractor, Injector, PropagationError};
use crate::trace::{BoxedSpan, Span, SpanBuilder, SpanContext, Tracer};
use crate::KeyValue;

/// A no-op instance of a `Span`.
///
/// All mutations are accepted and discarded; the span context is invalid.
#[derive(Clone, Debug, Default)]
pub struct NoopSpan {
    _private: (),
}

impl NoopSpan {
    /// Creates a new `NoopSpan` instance.
    pub fn new() -> Self {
        NoopSpan { _private: () }
    }
}

impl Span for NoopSpan {
    fn set_tag(&mut self, _tag: KeyValue) {
        // Ignored
    }

    fn set_baggage_item(&mut self, _key: &str, _value: &str) {
        // Ignored
    }

    fn baggage_item(&self, _key: &str) -> Option<String> {
        None
    }

    fn add_event(&mut self, _name: String, _attributes: Vec<KeyValue>) {
        // Ignored
    }

    /// Returns an invalid `SpanContext`.
    fn span_context(&self) -> SpanContext {
        SpanContext::empty_context()
    }

    fn tracer(&self) -> Box<dyn Tracer> {
        Box::new(NoopTracer::new())
    }

    fn finish(&mut self) {
        // Ignored
    }
}

/// A no-op instance of a `Tracer`.
#[derive(Clone, Debug, Default)]
pub struct NoopTracer {
    _private: (),
}

impl NoopTracer {
    /// Create a new no-op tracer.
    pub fn new() -> Self {
        NoopTracer { _private: () }
    }
}

impl Tracer for NoopTracer {
    /// Starts a new `NoopSpan`.
    fn build(&self, _builder: SpanBuilder) -> BoxedSpan {
        Box::new(NoopSpan::new())
    }

    /// Ignores the carrier.
    fn inject(
        &self,
        _span_context: &SpanContext,
        _carrier: &mut dyn Injector,
    ) -> Result<(), PropagationError> {
        Ok(())
    }

    /// Always reports that the carrier holds no span context, so callers
    /// degrade to fresh (unrecorded) root spans.
    fn extract(&self, _carrier: &dyn Extractor) -> Result<SpanContext, PropagationError> {
        Err(PropagationError::SpanContextNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn noop_tracer_produces_invalid_spans() {
        let tracer = NoopTracer::new();
        let mut span = tracer.start("op");
        span.set_tag(KeyValue::new("k", "v"));
        span.set_baggage_item("sb", "1");
        assert_eq!(span.baggage_item("sb"), None);
        assert!(!span.span_context().is_valid());
        span.finish();
    }

    #[test]
    fn noop_tracer_extract_reports_not_found() {
        let tracer = NoopTracer::new();
        let carrier: HashMap<String, String> = HashMap::new();
        assert_eq!(
            tracer.extract(&carrier),
            Err(PropagationError::SpanContextNotFound)
        );
    }
}
