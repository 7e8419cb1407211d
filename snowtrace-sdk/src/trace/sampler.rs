use snowtrace::trace::TraceId;

/// The sampling decision applied to root spans of new traces.
///
/// Sampling controls how much detail a span retains, not whether it is
/// recorded: an unsampled span still reaches the recorder at finish, with
/// its tags and logs trimmed when the tracer is configured to do so.
/// Referenced spans inherit the sampling decision from their reference
/// rather than consulting the sampler.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub enum Sampler {
    /// Always sample new traces.
    AlwaysOn,
    /// Never sample new traces.
    ///
    /// This is the default: traces of interest are marked explicitly via
    /// the sampling priority tag rather than statistically.
    #[default]
    AlwaysOff,
    /// Sample a given fraction of new traces, decided from the trace id so
    /// all participants agree.
    TraceIdRatioBased(f64),
}

impl Sampler {
    /// The sampling decision for a new trace with the given id.
    pub fn should_sample(&self, trace_id: TraceId) -> bool {
        match self {
            Sampler::AlwaysOn => true,
            Sampler::AlwaysOff => false,
            Sampler::TraceIdRatioBased(fraction) => {
                if *fraction >= 1.0 {
                    return true;
                }
                if *fraction <= 0.0 {
                    return false;
                }
                let bytes = trace_id.to_bytes();
                let mut low = [0u8; 8];
                low.copy_from_slice(&bytes[8..16]);
                let x = u64::from_be_bytes(low);
                (x as f64) < (*fraction * (u64::MAX as f64))
            }
        }
    }
}
