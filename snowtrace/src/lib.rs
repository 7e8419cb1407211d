//! Snowtrace is a span propagation layer for distributed tracing.
//!
//! A trace is a tree of [`Span`](trace::Span)s describing the work done on behalf of one
//! request as it crosses components and processes. This crate contains the
//! propagation half of the problem: deciding whether an operation continues
//! an inbound trace or starts a fresh one ([`trace::join_or_new`]), carrying
//! the active span and tracer through call layers without globals
//! ([`Context`]), handing trace context to detached work that may outlive
//! its parent operation ([`trace::fork_span`]), and fanning span events out
//! to several backends at once ([`trace::TeeTracer`]).
//!
//! The crate defines the [`trace::Tracer`] and [`trace::Span`] capability
//! traits but deliberately contains no recording engine; the `snowtrace-sdk`
//! crate provides the reference implementation together with the wire codec
//! for finished spans.
//!
//! # Getting started
//!
//! ```
//! use snowtrace::trace::{join_or_new, NoopTracer, Span};
//!
//! # fn main() -> Result<(), snowtrace::propagation::PropagationError> {
//! let tracer = NoopTracer::new();
//!
//! // No inbound carrier: a fresh root span is started.
//! let mut span = join_or_new(&tracer, None, "request.read")?;
//! span.finish();
//! # Ok(())
//! # }
//! ```
//!
//! # Propagating across tasks
//!
//! Contexts are immutable; binding a span or tracer produces a new context
//! value, so concurrent readers never need a lock. The [`FutureExt`]
//! extension trait attaches a context to a future so the binding follows
//! the work across `.await` points.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![allow(clippy::needless_doctest_main)]

mod common;
mod context;

pub mod propagation;
pub mod trace;

pub use common::{Key, KeyValue, Value};
pub use context::{Context, ContextGuard, FutureExt, WithContext};
