use crate::trace::{
    BasicSpan, DropRecorder, RandomIdGenerator, RawSpan, Sampler, SpanRecorder,
};
use snowtrace::propagation::{Extractor, Injector, PropagationError};
use snowtrace::trace::{
    BoxedSpan, Span, SpanBuilder, SpanContext, SpanId, TraceFlags, TraceId, Tracer,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Carrier field holding the trace id, in lowercase hex.
pub const TRACE_ID_FIELD: &str = "snowtrace-trace-id";
/// Carrier field holding the span id, in lowercase hex.
pub const SPAN_ID_FIELD: &str = "snowtrace-span-id";
/// Carrier field holding the sampling decision, `"1"` or `"0"`.
pub const SAMPLED_FIELD: &str = "snowtrace-sampled";
/// Prefix of carrier fields holding baggage items.
pub const BAGGAGE_FIELD_PREFIX: &str = "snowtrace-baggage-";

/// The base recording tracer.
///
/// A `BasicTracer` starts spans, propagates span contexts through text-map
/// carriers, and delivers every finished span to its configured
/// [`SpanRecorder`]. Sampling decides how much detail a span retains, not
/// whether it reaches the recorder: with `trim_unsampled_spans` enabled,
/// unsampled spans are delivered with their tags and logs stripped.
///
/// Tracers are cheap-to-clone handles sharing their configuration.
///
/// ```
/// use snowtrace::trace::{Span, Tracer};
/// use snowtrace_sdk::trace::{BasicTracer, InMemoryRecorder, Sampler};
///
/// let recorder = InMemoryRecorder::new();
/// let tracer = BasicTracer::builder()
///     .with_sampler(Sampler::AlwaysOn)
///     .with_recorder(recorder.clone())
///     .build();
///
/// let mut span = tracer.start("request");
/// span.finish();
/// assert_eq!(recorder.finished_spans().len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct BasicTracer {
    inner: Arc<TracerInner>,
}

#[derive(Debug)]
struct TracerInner {
    sampler: Sampler,
    trim_unsampled_spans: bool,
    recorder: Box<dyn SpanRecorder>,
    id_generator: RandomIdGenerator,
}

impl BasicTracer {
    /// Create a builder for configuring a new tracer.
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn trim_unsampled(&self) -> bool {
        self.inner.trim_unsampled_spans
    }

    pub(crate) fn record(&self, span: RawSpan) {
        tracing::trace!(
            operation = %span.operation_name,
            trace_id = %span.context.trace_id(),
            "span finished"
        );
        self.inner.recorder.record_span(span);
    }
}

impl Default for BasicTracer {
    /// A tracer that never samples and discards all spans.
    fn default() -> Self {
        BasicTracer::builder().build()
    }
}

impl Tracer for BasicTracer {
    fn build(&self, builder: SpanBuilder) -> BoxedSpan {
        let span_id = self.inner.id_generator.new_span_id();
        let (trace_id, parent_span_id, sampled, baggage) = match &builder.reference {
            // Referenced spans continue the reference's trace and inherit
            // its sampling decision and baggage.
            Some(reference) => {
                let parent = reference.span_context();
                (
                    parent.trace_id(),
                    parent.span_id(),
                    parent.is_sampled(),
                    parent
                        .baggage_items()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }
            None => {
                let trace_id = self.inner.id_generator.new_trace_id();
                let sampled = self.inner.sampler.should_sample(trace_id);
                (trace_id, SpanId::INVALID, sampled, HashMap::new())
            }
        };

        let mut span = BasicSpan {
            tracer: self.clone(),
            trace_id,
            span_id,
            parent_span_id,
            sampled,
            operation_name: builder.name,
            start_time: builder.start_time.unwrap_or_else(SystemTime::now),
            baggage,
            tags: Vec::new(),
            logs: Vec::new(),
            finished: false,
        };

        // Via set_tag so a sampling priority tag takes effect.
        for tag in builder.tags {
            span.set_tag(tag);
        }

        Box::new(span)
    }

    fn inject(
        &self,
        span_context: &SpanContext,
        carrier: &mut dyn Injector,
    ) -> Result<(), PropagationError> {
        carrier.set(TRACE_ID_FIELD, span_context.trace_id().to_string());
        carrier.set(SPAN_ID_FIELD, span_context.span_id().to_string());
        carrier.set(
            SAMPLED_FIELD,
            if span_context.is_sampled() { "1" } else { "0" }.to_owned(),
        );
        for (key, value) in span_context.baggage_items() {
            carrier.set(&format!("{BAGGAGE_FIELD_PREFIX}{key}"), value.clone());
        }
        Ok(())
    }

    fn extract(&self, carrier: &dyn Extractor) -> Result<SpanContext, PropagationError> {
        let trace_id_field = carrier.get(TRACE_ID_FIELD);
        let span_id_field = carrier.get(SPAN_ID_FIELD);

        // A carrier with neither id holds no span context at all, which is
        // expected for requests arriving from untraced callers.
        if trace_id_field.is_none() && span_id_field.is_none() {
            return Err(PropagationError::SpanContextNotFound);
        }

        let trace_id = trace_id_field
            .ok_or(PropagationError::Malformed("missing trace id"))
            .and_then(|raw| {
                TraceId::from_hex(raw).map_err(|_| PropagationError::Malformed("bad trace id"))
            })?;
        let span_id = span_id_field
            .ok_or(PropagationError::Malformed("missing span id"))
            .and_then(|raw| {
                SpanId::from_hex(raw).map_err(|_| PropagationError::Malformed("bad span id"))
            })?;
        if trace_id == TraceId::INVALID || span_id == SpanId::INVALID {
            return Err(PropagationError::Malformed("zero trace or span id"));
        }

        let sampled = match carrier.get(SAMPLED_FIELD) {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(_) => return Err(PropagationError::Malformed("bad sampled flag")),
            None => return Err(PropagationError::Malformed("missing sampled flag")),
        };

        let mut baggage = HashMap::new();
        for key in carrier.keys() {
            if let Some(item) = key.strip_prefix(BAGGAGE_FIELD_PREFIX) {
                if let Some(value) = carrier.get(key) {
                    baggage.insert(item.to_owned(), value.to_owned());
                }
            }
        }

        Ok(SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::default().with_sampled(sampled),
            baggage,
        ))
    }
}

/// Configuration for a [`BasicTracer`], created via [`BasicTracer::builder`].
pub struct Builder {
    sampler: Sampler,
    trim_unsampled_spans: bool,
    recorder: Box<dyn SpanRecorder>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            sampler: Sampler::default(),
            trim_unsampled_spans: true,
            recorder: Box::new(DropRecorder),
        }
    }
}

impl Builder {
    /// The sampler consulted for root spans of new traces.
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Whether unsampled spans have tags, logs, and baggage stripped.
    pub fn with_trim_unsampled_spans(mut self, trim: bool) -> Self {
        self.trim_unsampled_spans = trim;
        self
    }

    /// The sink finished spans are delivered to.
    pub fn with_recorder<R: SpanRecorder + 'static>(mut self, recorder: R) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    /// Build the configured tracer.
    pub fn build(self) -> BasicTracer {
        BasicTracer {
            inner: Arc::new(TracerInner {
                sampler: self.sampler,
                trim_unsampled_spans: self.trim_unsampled_spans,
                recorder: self.recorder,
                id_generator: RandomIdGenerator::new(),
            }),
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("sampler", &self.sampler)
            .field("trim_unsampled_spans", &self.trim_unsampled_spans)
            .finish()
    }
}
