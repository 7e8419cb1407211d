//! # Snowtrace SDK
//!
//! The recording engine behind the `snowtrace` propagation API. The SDK
//! decides which spans carry full detail through [`trace::Sampler`]s,
//! delivers every finished span to a [`trace::SpanRecorder`], builds the
//! isolated full-capture tracers used for snowball traces, selects the
//! process-wide backend composition, and provides the wire codec that ships
//! finished spans between processes.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

pub mod trace;
