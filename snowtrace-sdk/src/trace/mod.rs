//! The recording side of tracing: the base span engine, sampling,
//! recorders, snowball tracer construction, process-wide tracer selection,
//! and the span wire codec.
//!
//! The [`BasicTracer`] implements the `snowtrace` [`Tracer`] interface and
//! is the engine behind both the default local backend and the isolated
//! tracers built for snowball traces. Finished spans become immutable
//! [`RawSpan`] records delivered to a [`SpanRecorder`]; records that must
//! cross a process boundary are serialized with [`encode_span`] and
//! [`decode_span`].
//!
//! [`Tracer`]: snowtrace::trace::Tracer
mod id_generator;
mod in_memory_recorder;
mod provider;
mod record;
mod sampler;
mod snowball;
mod span;
mod tracer;
mod wire;

pub use self::{
    id_generator::RandomIdGenerator,
    in_memory_recorder::InMemoryRecorder,
    provider::{
        disable, new_tracer, set_remote_tracer_factory, ACCESS_TOKEN_ENV, REMOTE_ONLY_ENV,
    },
    record::{CallbackRecorder, DropRecorder, RawSpan, SpanRecorder},
    sampler::Sampler,
    snowball::{join_or_new_snowball, new_callback_tracer},
    span::BasicSpan,
    tracer::{
        BasicTracer, Builder, BAGGAGE_FIELD_PREFIX, SAMPLED_FIELD, SPAN_ID_FIELD, TRACE_ID_FIELD,
    },
    wire::{decode_span, encode_span, CodecError},
};
