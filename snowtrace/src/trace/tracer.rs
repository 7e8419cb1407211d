use crate::propagation::{Extractor, Injector, PropagationError};
use crate::trace::{BoxedSpan, SpanContext};
use crate::KeyValue;
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

/// A causal reference from a new span to a prior span context.
#[derive(Clone, Debug, PartialEq)]
pub enum SpanReference {
    /// The new span is a child of the referenced span, which waits for it.
    ChildOf(SpanContext),
    /// The referenced span causally precedes the new span but does not wait
    /// for it. Appropriate for cross-process hops and detached work.
    FollowsFrom(SpanContext),
}

impl SpanReference {
    /// The referenced span context.
    pub fn span_context(&self) -> &SpanContext {
        match self {
            SpanReference::ChildOf(cx) => cx,
            SpanReference::FollowsFrom(cx) => cx,
        }
    }
}

/// `SpanBuilder` allows span attributes to be configured before the span
/// has started.
///
/// ```
/// use snowtrace::trace::{NoopTracer, Span, SpanBuilder, Tracer};
///
/// let tracer = NoopTracer::new();
///
/// // specify span attributes via the builder
/// let mut span = tracer.build(
///     SpanBuilder::from_name("node.batch")
///         .with_tag(snowtrace::KeyValue::new("node", 3i64)),
/// );
/// span.finish();
/// ```
#[derive(Clone, Debug, Default)]
pub struct SpanBuilder {
    /// Span operation name
    pub name: Cow<'static, str>,
    /// Reference to a prior span context, if any
    pub reference: Option<SpanReference>,
    /// Tags set at span start
    pub tags: Vec<KeyValue>,
    /// Span start time, defaulting to now
    pub start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// Create a builder with the given operation name.
    pub fn from_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        SpanBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Make the new span a child of the given span context.
    pub fn with_child_of(self, parent: SpanContext) -> Self {
        SpanBuilder {
            reference: Some(SpanReference::ChildOf(parent)),
            ..self
        }
    }

    /// Make the new span follow from the given span context.
    pub fn with_follows_from(self, reference: SpanContext) -> Self {
        SpanBuilder {
            reference: Some(SpanReference::FollowsFrom(reference)),
            ..self
        }
    }

    /// Add a tag to be set when the span starts.
    pub fn with_tag(mut self, tag: KeyValue) -> Self {
        self.tags.push(tag);
        self
    }

    /// Assign an explicit span start time.
    pub fn with_start_time(self, start_time: SystemTime) -> Self {
        SpanBuilder {
            start_time: Some(start_time),
            ..self
        }
    }
}

/// Interface for constructing [`Span`]s and for moving span contexts in and
/// out of [carriers].
///
/// Implementations are cheap-to-clone handles; the trait is object safe so
/// that heterogeneous backends can be composed and selected at runtime.
/// There is no mandated process-global tracer: callers thread a tracer (or
/// a [`Context`] it is bound into) explicitly.
///
/// [`Span`]: crate::trace::Span
/// [carriers]: crate::propagation
/// [`Context`]: crate::Context
pub trait Tracer: fmt::Debug + Send + Sync {
    /// Start a new span from the given builder.
    fn build(&self, builder: SpanBuilder) -> BoxedSpan;

    /// Write the given span context into the carrier.
    fn inject(
        &self,
        span_context: &SpanContext,
        carrier: &mut dyn Injector,
    ) -> Result<(), PropagationError>;

    /// Read a span context back out of the carrier.
    ///
    /// A carrier holding no span context at all reports
    /// [`PropagationError::SpanContextNotFound`], which callers treat as
    /// "start fresh"; carriers holding an undecodable context report
    /// [`PropagationError::Malformed`].
    fn extract(&self, carrier: &dyn Extractor) -> Result<SpanContext, PropagationError>;

    /// Start a new root span with the given operation name.
    fn start(&self, name: &str) -> BoxedSpan {
        self.build(SpanBuilder::from_name(name.to_owned()))
    }
}
