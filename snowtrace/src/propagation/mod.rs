//! Carrier interfaces for moving span contexts between processes.
//!
//! A carrier is the transport-level object a span context is written into
//! on the way out (an RPC header map, for example) and read back out of on
//! the way in. Carriers are split into their two capabilities: [`Injector`]
//! for the outbound write and [`Extractor`] for the inbound read; a
//! bidirectional carrier is any type implementing both. The wire
//! representation of the entries is owned by the tracer doing the
//! injecting, not by this module.
use std::collections::HashMap;
use thiserror::Error;

/// Injector provides an interface for adding fields to an underlying
/// struct like `HashMap`.
pub trait Injector {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);
}

/// Extractor provides an interface for reading fields from an underlying
/// struct like `HashMap`.
pub trait Extractor {
    /// Get a value for a key from the underlying data.
    fn get(&self, key: &str) -> Option<&str>;

    /// Collect all the keys from the underlying data.
    fn keys(&self) -> Vec<&str>;
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    /// Set a key and value in the HashMap.
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    /// Get a value for a key from the HashMap.
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    /// Collect all the keys from the HashMap.
    fn keys(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect::<Vec<_>>()
    }
}

/// Errors returned by carrier injection and extraction.
///
/// [`PropagationError::SpanContextNotFound`] is an expected condition, not
/// a failure: it reports that the carrier holds no span context at all, and
/// callers such as [`join_or_new`] respond by starting a fresh trace. Every
/// other variant is a hard error.
///
/// [`join_or_new`]: crate::trace::join_or_new
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PropagationError {
    /// The carrier contains no span context.
    #[error("no span context found in carrier")]
    SpanContextNotFound,

    /// The carrier contains a span context that could not be decoded.
    #[error("malformed span context in carrier: {0}")]
    Malformed(&'static str),
}
