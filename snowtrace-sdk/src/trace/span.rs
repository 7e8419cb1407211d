use crate::trace::{BasicTracer, RawSpan};
use snowtrace::trace::{
    Event, Span, SpanContext, SpanId, TraceFlags, TraceId, Tracer, SAMPLING_PRIORITY_KEY,
};
use snowtrace::{KeyValue, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::SystemTime;

/// A recording span produced by a [`BasicTracer`].
///
/// Mutating a finished span is a lifecycle violation: debug builds panic at
/// the offending call, release builds log a warning and ignore the
/// mutation.
#[derive(Debug)]
pub struct BasicSpan {
    pub(crate) tracer: BasicTracer,
    pub(crate) trace_id: TraceId,
    pub(crate) span_id: SpanId,
    pub(crate) parent_span_id: SpanId,
    pub(crate) sampled: bool,
    pub(crate) operation_name: Cow<'static, str>,
    pub(crate) start_time: SystemTime,
    pub(crate) baggage: HashMap<String, String>,
    pub(crate) tags: Vec<KeyValue>,
    pub(crate) logs: Vec<Event>,
    pub(crate) finished: bool,
}

impl BasicSpan {
    /// Whether this span's trace is currently sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    fn check_live(&self, what: &str) -> bool {
        if self.finished {
            if cfg!(debug_assertions) {
                panic!("{} on finished span {:?}", what, self.operation_name);
            }
            tracing::warn!(
                operation = %self.operation_name,
                "{} on finished span, ignored",
                what
            );
            return false;
        }
        true
    }
}

impl Span for BasicSpan {
    fn set_tag(&mut self, tag: KeyValue) {
        if !self.check_live("set_tag") {
            return;
        }

        if tag.key.as_str() == SAMPLING_PRIORITY_KEY {
            self.sampled = match &tag.value {
                Value::I64(v) => *v != 0,
                Value::F64(v) => *v != 0.0,
                Value::Bool(v) => *v,
                Value::String(_) => self.sampled,
            };
        }

        match self.tags.iter_mut().find(|existing| existing.key == tag.key) {
            Some(existing) => existing.value = tag.value,
            None => self.tags.push(tag),
        }
    }

    fn set_baggage_item(&mut self, key: &str, value: &str) {
        if !self.check_live("set_baggage_item") {
            return;
        }
        // Unsampled spans with trimming enabled carry no baggage; a forced
        // sampling decision (priority tag) must precede any baggage writes.
        if !self.sampled && self.tracer.trim_unsampled() {
            return;
        }
        self.baggage.insert(key.to_owned(), value.to_owned());
    }

    fn baggage_item(&self, key: &str) -> Option<String> {
        self.baggage.get(key).cloned()
    }

    fn add_event(&mut self, name: String, attributes: Vec<KeyValue>) {
        if !self.check_live("add_event") {
            return;
        }
        self.logs
            .push(Event::new(name, SystemTime::now(), attributes));
    }

    fn span_context(&self) -> SpanContext {
        SpanContext::new(
            self.trace_id,
            self.span_id,
            TraceFlags::default().with_sampled(self.sampled),
            self.baggage.clone(),
        )
    }

    fn tracer(&self) -> Box<dyn Tracer> {
        Box::new(self.tracer.clone())
    }

    fn finish(&mut self) {
        if !self.check_live("finish") {
            return;
        }
        self.finished = true;

        let mut tags = std::mem::take(&mut self.tags);
        let mut logs = std::mem::take(&mut self.logs);
        if !self.sampled && self.tracer.trim_unsampled() {
            tags.clear();
            logs.clear();
        }

        self.tracer.record(RawSpan {
            context: self.span_context(),
            parent_span_id: self.parent_span_id,
            operation_name: self.operation_name.clone(),
            start_time: self.start_time,
            end_time: SystemTime::now(),
            tags,
            logs,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::InMemoryRecorder;

    #[test]
    fn finish_delivers_exactly_one_record() {
        let recorder = InMemoryRecorder::new();
        let tracer = BasicTracer::builder()
            .with_recorder(recorder.clone())
            .build();

        let mut span = tracer.start("op");
        span.finish();

        assert_eq!(recorder.finished_spans().len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "set_tag on finished span")]
    fn mutation_after_finish_fails_fast() {
        let tracer = BasicTracer::builder().build();
        let mut span = tracer.start("op");
        span.finish();
        span.set_tag(KeyValue::new("k", "v"));
    }

    #[test]
    fn priority_tag_flips_sampling() {
        let recorder = InMemoryRecorder::new();
        let tracer = BasicTracer::builder()
            .with_recorder(recorder.clone())
            .build();

        let mut span = tracer.start("op");
        assert!(!span.span_context().is_sampled());

        span.set_tag(KeyValue::new(SAMPLING_PRIORITY_KEY, 1));
        assert!(span.span_context().is_sampled());
        span.set_baggage_item("user", "alice");
        span.finish();

        let spans = recorder.finished_spans();
        assert!(spans[0].context.is_sampled());
        assert_eq!(spans[0].context.baggage_item("user"), Some("alice"));
    }

    #[test]
    fn unsampled_baggage_writes_are_ignored_when_trimming() {
        let tracer = BasicTracer::builder()
            .with_trim_unsampled_spans(true)
            .build();

        let mut span = tracer.start("op");
        // Baggage first, priority second: the baggage write is lost.
        span.set_baggage_item("sb", "1");
        span.set_tag(KeyValue::new(SAMPLING_PRIORITY_KEY, 1));
        assert_eq!(span.baggage_item("sb"), None);
        span.finish();
    }

    #[test]
    fn unsampled_detail_is_trimmed_from_record() {
        let recorder = InMemoryRecorder::new();
        let tracer = BasicTracer::builder()
            .with_trim_unsampled_spans(true)
            .with_recorder(recorder.clone())
            .build();

        let mut span = tracer.start("op");
        span.set_tag(KeyValue::new("k", "v"));
        span.add_event("something happened".to_owned(), Vec::new());
        span.finish();

        let spans = recorder.finished_spans();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].tags.is_empty());
        assert!(spans[0].logs.is_empty());
    }
}
