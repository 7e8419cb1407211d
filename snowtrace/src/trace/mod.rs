//! Span creation, continuation, and composition.
//!
//! The types here track the progression of a single request across the
//! services that handle it. A trace is a tree of [`Span`]s; this module
//! covers how spans come into being at component boundaries:
//!
//! * [`join_or_new`] continues an inbound trace from a [carrier] or starts
//!   a fresh one — the join-or-create protocol used at every RPC ingress.
//! * [`fork_span`] derives a span for detached work that may outlive the
//!   operation that scheduled it.
//! * [`ensure_span`] lazily establishes a span for operations that may or
//!   may not already be traced.
//! * [`TeeTracer`] fans span events out to several backends at once.
//!
//! Spans flagged with the [`SNOWBALL_BAGGAGE_KEY`] baggage item belong to an
//! ad-hoc full-capture trace: the flag is inherited by every descendant
//! span, locally and across process boundaries, and bypasses statistical
//! sampling entirely.
//!
//! [carrier]: crate::propagation
use crate::propagation::{Extractor, PropagationError};
use crate::KeyValue;

pub(crate) mod context;
mod event;
mod noop;
mod span;
mod span_context;
mod tee;
mod tracer;

pub use self::{
    context::{ensure_span, fork_span, SpanCloser, SpanRef, TraceContextExt},
    event::Event,
    noop::{NoopSpan, NoopTracer},
    span::{BoxedSpan, Span},
    span_context::{SpanContext, SpanId, TraceFlags, TraceId},
    tee::{TeeSpan, TeeTracer},
    tracer::{SpanBuilder, SpanReference, Tracer},
};

/// Baggage key marking every span of a snowball (full-capture) trace.
///
/// The flag is set only by the snowball tracer factory and, once set,
/// propagates to all descendant spans.
pub const SNOWBALL_BAGGAGE_KEY: &str = "sb";

/// Tag key forcing the sampling decision for a span's trace.
///
/// Recording backends treat a nonzero value as "definitely sample this
/// trace", overriding the sampler.
pub const SAMPLING_PRIORITY_KEY: &str = "sampling.priority";

/// Creates a new span joined to the span context found in `carrier`, or a
/// fresh root span if there is none.
///
/// With a carrier present, extraction is attempted. On success the new span
/// *follows from* the extracted context (continuation semantics appropriate
/// for a cross-process hop, rather than a strict parent/child edge), every
/// inbound baggage item is copied onto the new span as a tag so backends
/// surface the propagated metadata as searchable attributes, and a single
/// event named after the operation is recorded. A carrier holding no span
/// context at all is not an error: the result is a fresh root span, the
/// same as passing no carrier. Any other extraction failure is returned
/// unchanged and no span is created.
///
/// The caller owns the returned span and must finish it.
pub fn join_or_new(
    tracer: &dyn Tracer,
    carrier: Option<&dyn Extractor>,
    op_name: &str,
) -> Result<BoxedSpan, PropagationError> {
    if let Some(carrier) = carrier {
        match tracer.extract(carrier) {
            Ok(parent) => {
                let mut span = tracer.build(
                    SpanBuilder::from_name(op_name.to_owned())
                        .with_follows_from(parent.clone()),
                );

                // Copy baggage items to tags so they show up in backend UIs.
                for (key, value) in parent.baggage_items() {
                    span.set_tag(KeyValue::new(key.clone(), value.clone()));
                }

                span.add_event(op_name.to_owned(), Vec::new());
                return Ok(span);
            }
            Err(PropagationError::SpanContextNotFound) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(tracer.build(SpanBuilder::from_name(op_name.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn join_without_carrier_starts_fresh() {
        let tracer = NoopTracer::new();
        let span = join_or_new(&tracer, None, "read").expect("fresh span");
        assert!(!span.span_context().is_valid());
    }

    #[test]
    fn join_with_empty_carrier_starts_fresh() {
        let tracer = NoopTracer::new();
        let carrier: HashMap<String, String> = HashMap::new();
        assert!(join_or_new(&tracer, Some(&carrier), "read").is_ok());
    }
}
