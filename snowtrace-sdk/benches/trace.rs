use criterion::{criterion_group, criterion_main, Criterion};
use snowtrace::trace::{Span, Tracer};
use snowtrace::KeyValue;
use snowtrace_sdk::trace::{disable, new_tracer, BasicTracer, Sampler};

fn criterion_benchmark(c: &mut Criterion) {
    trace_benchmark_group(c, "start-finish-span", |tracer| tracer.start("foo").finish());

    trace_benchmark_group(c, "start-finish-span-4-tags", |tracer| {
        let mut span = tracer.start("foo");
        span.set_tag(KeyValue::new("key1", false));
        span.set_tag(KeyValue::new("key2", "hello"));
        span.set_tag(KeyValue::new("key3", 123i64));
        span.set_tag(KeyValue::new("key4", 123.456));
        span.finish();
    });

    c.bench_function("disabled-provider/start-finish-span", |b| {
        let restore = disable();
        let tracer = new_tracer();
        b.iter(|| tracer.start("foo").finish());
        restore();
    });
}

fn trace_benchmark_group<F: Fn(&BasicTracer)>(c: &mut Criterion, name: &str, f: F) {
    let mut group = c.benchmark_group(name);

    group.bench_function("always-sample", |b| {
        let tracer = BasicTracer::builder()
            .with_sampler(Sampler::AlwaysOn)
            .build();
        b.iter(|| f(&tracer));
    });

    group.bench_function("never-sample", |b| {
        let tracer = BasicTracer::builder()
            .with_sampler(Sampler::AlwaysOff)
            .build();
        b.iter(|| f(&tracer));
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
