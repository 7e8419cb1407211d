use rand::Rng;
use snowtrace::trace::{SpanId, TraceId};

/// Generates trace and span ids from the thread-local rng.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl RandomIdGenerator {
    /// Create a new id generator.
    pub fn new() -> Self {
        RandomIdGenerator { _private: () }
    }

    /// Generate a new, valid trace id.
    pub fn new_trace_id(&self) -> TraceId {
        let mut rng = rand::rng();
        loop {
            let id = rng.random::<u128>();
            if id != 0 {
                return TraceId::from(id);
            }
        }
    }

    /// Generate a new, valid span id.
    pub fn new_span_id(&self) -> SpanId {
        let mut rng = rand::rng();
        loop {
            let id = rng.random::<u64>();
            if id != 0 {
                return SpanId::from(id);
            }
        }
    }
}
