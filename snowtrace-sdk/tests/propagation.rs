//! End-to-end flows across the propagation layer and the recording engine:
//! joining inbound traces, snowball capture, async forking, tee fan-out,
//! and the span wire codec.
use snowtrace::trace::{
    ensure_span, fork_span, join_or_new, Span, TeeTracer, TraceContextExt, Tracer,
    SNOWBALL_BAGGAGE_KEY,
};
use snowtrace::{Context, KeyValue};
use snowtrace_sdk::trace::{
    decode_span, encode_span, join_or_new_snowball, BasicTracer, InMemoryRecorder, RawSpan,
    Sampler,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn recording_tracer(sampler: Sampler) -> (BasicTracer, InMemoryRecorder) {
    let recorder = InMemoryRecorder::new();
    let tracer = BasicTracer::builder()
        .with_sampler(sampler)
        .with_recorder(recorder.clone())
        .build();
    (tracer, recorder)
}

#[test]
fn join_with_untraced_carrier_starts_fresh_root() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);

    // An empty carrier means "no inbound trace", not an error.
    let carrier: HashMap<String, String> = HashMap::new();
    let mut span = join_or_new(&tracer, Some(&carrier), "read").expect("fresh root");
    span.finish();

    let spans = recorder.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].operation_name, "read");
    assert_eq!(spans[0].context.baggage_items().count(), 0);
    assert!(spans[0].logs.is_empty());
}

#[test]
fn join_without_carrier_starts_fresh_root() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);

    let mut span = join_or_new(&tracer, None, "read").expect("fresh root");
    span.finish();

    let spans = recorder.finished_spans();
    assert_eq!(spans[0].operation_name, "read");
    assert_eq!(spans[0].context.baggage_items().count(), 0);
}

#[test]
fn join_continues_inbound_trace_and_surfaces_baggage_as_tags() {
    let (client_tracer, _) = recording_tracer(Sampler::AlwaysOn);
    let (server_tracer, server_recorder) = recording_tracer(Sampler::AlwaysOn);

    let mut outbound = client_tracer.start("client.request");
    outbound.set_baggage_item("user", "alice");
    let outbound_cx = outbound.span_context();

    let mut carrier: HashMap<String, String> = HashMap::new();
    client_tracer
        .inject(&outbound_cx, &mut carrier)
        .expect("inject");

    let mut inbound = join_or_new(&server_tracer, Some(&carrier), "server.read").expect("join");
    inbound.finish();
    outbound.finish();

    let spans = server_recorder.finished_spans();
    assert_eq!(spans.len(), 1);
    let inbound = &spans[0];

    // Continuation, not a fresh trace.
    assert_eq!(inbound.context.trace_id(), outbound_cx.trace_id());
    assert_eq!(inbound.parent_span_id, outbound_cx.span_id());

    // Inbound baggage propagates and also becomes a searchable tag.
    assert_eq!(inbound.context.baggage_item("user"), Some("alice"));
    assert!(inbound
        .tags
        .contains(&KeyValue::new("user".to_owned(), "alice".to_owned())));

    // One event named after the operation.
    assert_eq!(inbound.logs.len(), 1);
    assert_eq!(inbound.logs[0].name, "server.read");
}

fn snowball_collector() -> (Arc<Mutex<Vec<RawSpan>>>, impl Fn(RawSpan) + Send + Sync) {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink = collected.clone();
    (collected, move |span| {
        if let Ok(mut spans) = sink.lock() {
            spans.push(span);
        }
    })
}

#[test]
fn snowball_flag_is_inherited_transitively_across_joins() {
    let (_collected, callback) = snowball_collector();
    let root = join_or_new_snowball("debug", None, callback).expect("snowball root");
    assert_eq!(root.baggage_item(SNOWBALL_BAGGAGE_KEY).as_deref(), Some("1"));

    // Hop one: root -> carrier -> child on another node's tracer.
    let mut carrier: HashMap<String, String> = HashMap::new();
    root.tracer()
        .inject(&root.span_context(), &mut carrier)
        .expect("inject root");
    let (node_tracer, _) = recording_tracer(Sampler::AlwaysOff);
    let child = join_or_new(&node_tracer, Some(&carrier), "node.scan").expect("join child");
    assert_eq!(
        child.baggage_item(SNOWBALL_BAGGAGE_KEY).as_deref(),
        Some("1")
    );
    assert!(child.span_context().is_sampled());

    // Hop two: child -> carrier -> grandchild.
    let mut carrier: HashMap<String, String> = HashMap::new();
    node_tracer
        .inject(&child.span_context(), &mut carrier)
        .expect("inject child");
    let (leaf_tracer, _) = recording_tracer(Sampler::AlwaysOff);
    let grandchild = join_or_new(&leaf_tracer, Some(&carrier), "leaf.get").expect("join leaf");
    assert_eq!(
        grandchild.baggage_item(SNOWBALL_BAGGAGE_KEY).as_deref(),
        Some("1")
    );
}

#[test]
fn fork_of_snowball_span_suppresses_descendant_tracing() {
    let (collected, callback) = snowball_collector();
    let root = join_or_new_snowball("debug", None, callback).expect("snowball root");

    let cx = Context::new().with_span(root);
    let (forked, closer) = fork_span(&cx, "async cleanup");

    // The snowball tracer may be gone by the time the detached task runs,
    // so the fork carries no span at all.
    assert!(!forked.has_active_span());

    // The closer is a true no-op, callable any number of times.
    closer.close();
    closer.close();
    closer.close();
    assert!(collected.lock().expect("collector").is_empty());
}

#[test]
fn fork_follows_from_parent_and_closes_exactly_once() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);

    let parent = tracer.start("request");
    let parent_cx = parent.span_context();
    let cx = Context::new().with_span(parent);

    let (forked, closer) = fork_span(&cx, "flush");
    let forked_span_cx = forked.span().expect("forked span").span_context();
    assert_eq!(forked_span_cx.trace_id(), parent_cx.trace_id());
    assert_ne!(forked_span_cx.span_id(), parent_cx.span_id());

    closer.close();
    closer.close();

    let spans = recorder.finished_spans();
    assert_eq!(spans.len(), 1, "close finishes the fork span exactly once");
    assert_eq!(spans[0].operation_name, "flush");
    assert_eq!(spans[0].parent_span_id, parent_cx.span_id());
}

#[test]
fn forked_context_is_usable_from_another_thread() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);
    let cx = Context::new().with_span(tracer.start("request"));

    let (forked, closer) = fork_span(&cx, "background");
    let handle = std::thread::spawn(move || {
        if let Some(span) = forked.span() {
            span.add_event("working".to_owned(), Vec::new());
        }
        closer.close();
    });
    handle.join().expect("forked task");

    let spans = recorder.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].logs[0].name, "working");
}

#[test]
fn wire_codec_round_trips_recorded_spans() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);

    let mut span = tracer.start("node.batch");
    span.set_baggage_item("sb", "1");
    span.set_tag(KeyValue::new("node", 3i64));
    span.add_event("batch started".to_owned(), Vec::new());
    span.finish();

    let recorded = recorder.finished_spans().remove(0);
    let encoded = encode_span(&recorded, Vec::new()).expect("encode");
    let decoded = decode_span(&encoded).expect("decode");
    assert_eq!(decoded, recorded);

    assert!(decode_span(&encoded[..encoded.len() - 1]).is_err());
}

#[test]
fn tee_records_to_every_backend_and_injects_via_the_first() {
    let (first, first_recorder) = recording_tracer(Sampler::AlwaysOn);
    let (second, second_recorder) = recording_tracer(Sampler::AlwaysOn);
    let tee = TeeTracer::new(vec![Arc::new(first.clone()), Arc::new(second)]);

    let mut span = tee.start("request");
    span.set_tag(KeyValue::new("k", "v"));
    span.add_event("handling".to_owned(), Vec::new());
    let span_cx = span.span_context();
    span.finish();

    for recorder in [&first_recorder, &second_recorder] {
        let spans = recorder.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].operation_name, "request");
        assert!(spans[0].tags.contains(&KeyValue::new("k", "v")));
    }

    // The composite's wire format is exactly the first backend's.
    let mut via_tee: HashMap<String, String> = HashMap::new();
    let mut via_first: HashMap<String, String> = HashMap::new();
    tee.inject(&span_cx, &mut via_tee).expect("tee inject");
    first
        .inject(&span_cx, &mut via_first)
        .expect("first inject");
    assert_eq!(via_tee, via_first);

    // And extraction through the tee continues the first backend's trace.
    let extracted = tee.extract(&via_tee).expect("tee extract");
    assert_eq!(extracted, span_cx);
}

#[test]
fn ensure_span_is_idempotent() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);
    let cx = Context::new();

    let (cx, closer) = ensure_span(&cx, &tracer, "request");
    let first_cx = cx.span().expect("ensured span").span_context();

    let (cx, second_closer) = ensure_span(&cx, &tracer, "request");
    let second_cx = cx.span().expect("still the same span").span_context();
    assert_eq!(first_cx.span_id(), second_cx.span_id());

    second_closer.close();
    assert!(recorder.finished_spans().is_empty(), "second close is a no-op");

    closer.close();
    assert_eq!(recorder.finished_spans().len(), 1);
}

#[test]
fn bound_tracer_is_reachable_from_nested_layers() {
    let (tracer, recorder) = recording_tracer(Sampler::AlwaysOn);
    let tracer: Arc<dyn Tracer> = Arc::new(tracer);
    let cx = Context::new().with_tracer(tracer);

    fn nested_operation(cx: &Context) {
        let tracer = cx.tracer().expect("tracer bound for this request");
        let mut span = join_or_new(&*tracer, None, "nested").expect("span");
        span.finish();
    }
    nested_operation(&cx);

    assert_eq!(recorder.finished_spans().len(), 1);

    // A context without a binding reports absence rather than a default.
    assert!(Context::new().tracer().is_none());
}

#[test]
fn malformed_carrier_is_a_hard_error() {
    let (tracer, _) = recording_tracer(Sampler::AlwaysOn);

    let mut carrier: HashMap<String, String> = HashMap::new();
    carrier.insert(
        snowtrace_sdk::trace::TRACE_ID_FIELD.to_owned(),
        "not-hex".to_owned(),
    );

    let result = join_or_new(&tracer, Some(&carrier), "read");
    assert!(matches!(
        result,
        Err(snowtrace::propagation::PropagationError::Malformed(_))
    ));
}

#[test]
fn snowball_spans_keep_full_detail() {
    let (collected, callback) = snowball_collector();

    let mut root = join_or_new_snowball("debug", None, callback).expect("snowball root");
    root.set_tag(KeyValue::new("statement", "SELECT 1".to_owned()));
    root.add_event("planning".to_owned(), Vec::new());

    // Descendant joined through a carrier, as on an intra-trace hop.
    let tracer = root.tracer();
    let mut carrier: HashMap<String, String> = HashMap::new();
    tracer
        .inject(&root.span_context(), &mut carrier)
        .expect("inject root");
    let mut child = join_or_new(&*tracer, Some(&carrier), "exec").expect("child");
    child.finish();
    root.finish();

    let spans = collected.lock().expect("collector");
    assert_eq!(spans.len(), 2);
    let root_record = spans
        .iter()
        .find(|span| span.operation_name == "debug")
        .expect("root record");
    assert!(root_record
        .tags
        .contains(&KeyValue::new("statement", "SELECT 1".to_owned())));
    assert_eq!(root_record.logs.len(), 1);
}
