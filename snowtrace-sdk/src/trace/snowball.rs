//! Ad-hoc full-capture ("snowball") tracer construction.
use crate::trace::{BasicTracer, CallbackRecorder, RawSpan, Sampler};
use snowtrace::propagation::{Extractor, PropagationError};
use snowtrace::trace::{
    join_or_new, BoxedSpan, Span, SAMPLING_PRIORITY_KEY, SNOWBALL_BAGGAGE_KEY,
};
use snowtrace::KeyValue;

/// Creates a span that records every span of its trace through `callback`.
///
/// The returned span belongs to a fresh, isolated tracer that bypasses
/// statistical sampling entirely: snowball tracing is a deliberate,
/// explicit full capture of one trace. The root is joined to `carrier` via
/// [`join_or_new`] when one is supplied, then force-sampled and flagged
/// with the [`SNOWBALL_BAGGAGE_KEY`] baggage item so every descendant span,
/// local or remote, inherits the full-capture decision.
///
/// The tracer's lifetime is tied to the returned span's trace; detached
/// work must not carry it, which is why [`fork_span`] suppresses descendant
/// spans of snowball traces.
///
/// [`fork_span`]: snowtrace::trace::fork_span
pub fn join_or_new_snowball<F>(
    op_name: &str,
    carrier: Option<&dyn Extractor>,
    callback: F,
) -> Result<BoxedSpan, PropagationError>
where
    F: Fn(RawSpan) + Send + Sync + 'static,
{
    let tracer = BasicTracer::builder()
        .with_sampler(Sampler::AlwaysOff)
        .with_trim_unsampled_spans(true)
        .with_recorder(CallbackRecorder::new(callback))
        .build();

    let mut span = join_or_new(&tracer, carrier, op_name)?;
    // The priority tag must be set before the baggage item; baggage writes
    // on an unsampled span are ignored while trimming is enabled.
    span.set_tag(KeyValue::new(SAMPLING_PRIORITY_KEY, 1));
    span.set_baggage_item(SNOWBALL_BAGGAGE_KEY, "1");
    Ok(span)
}

/// Creates a full-fidelity tracer recording through `callback` and starts a
/// root span named `op_name` on it.
///
/// Unlike [`join_or_new_snowball`], trimming of unsampled span detail is
/// disabled, so every span started on the returned tracer keeps its tags
/// and logs regardless of sampling. Used to accumulate all spans of one
/// local transaction in the caller.
pub fn new_callback_tracer<F>(
    op_name: &str,
    callback: F,
) -> Result<(BoxedSpan, BasicTracer), PropagationError>
where
    F: Fn(RawSpan) + Send + Sync + 'static,
{
    let tracer = BasicTracer::builder()
        .with_sampler(Sampler::AlwaysOff)
        .with_trim_unsampled_spans(false)
        .with_recorder(CallbackRecorder::new(callback))
        .build();

    let span = join_or_new(&tracer, None, op_name)?;
    Ok((span, tracer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowtrace::trace::Tracer;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<RawSpan>>>, impl Fn(RawSpan) + Send + Sync) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = collected.clone();
        (collected, move |span| {
            if let Ok(mut spans) = sink.lock() {
                spans.push(span);
            }
        })
    }

    #[test]
    fn snowball_root_is_sampled_and_flagged() {
        let (collected, callback) = collector();

        let mut span = join_or_new_snowball("debug request", None, callback).expect("snowball");
        assert_eq!(span.baggage_item(SNOWBALL_BAGGAGE_KEY).as_deref(), Some("1"));
        assert!(span.span_context().is_sampled());
        span.finish();

        let spans = collected.lock().expect("collector lock");
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].context.baggage_item(SNOWBALL_BAGGAGE_KEY),
            Some("1")
        );
    }

    #[test]
    fn callback_tracer_keeps_unsampled_detail() {
        let (collected, callback) = collector();

        let (mut root, tracer) = new_callback_tracer("txn", callback).expect("tracer");
        let mut child = tracer.start("stmt");
        child.set_tag(KeyValue::new("rows", 10i64));
        child.finish();
        root.finish();

        let spans = collected.lock().expect("collector lock");
        assert_eq!(spans.len(), 2);
        // Trimming is off, so the unsampled child kept its tag.
        assert_eq!(spans[0].tags, vec![KeyValue::new("rows", 10i64)]);
    }
}
