//! Process-wide tracer selection.
use crate::trace::BasicTracer;
use snowtrace::trace::{NoopTracer, TeeTracer, Tracer};
use std::env;
use std::mem;
use std::sync::{Arc, OnceLock, RwLock};

/// Environment variable holding the access token for the remote tracing
/// backend. When unset or empty, only the local backend is used.
pub const ACCESS_TOKEN_ENV: &str = "SNOWTRACE_ACCESS_TOKEN";

/// Environment variable selecting remote-only tracing (`"true"`/`"1"`).
/// When unset, a configured remote backend is teed with the local backend.
pub const REMOTE_ONLY_ENV: &str = "SNOWTRACE_REMOTE_ONLY";

type TracerFactory = Box<dyn Fn() -> Arc<dyn Tracer> + Send + Sync>;
type RemoteTracerFactory = Box<dyn Fn(&str) -> Arc<dyn Tracer> + Send + Sync>;

static TRACER_FACTORY: OnceLock<RwLock<TracerFactory>> = OnceLock::new();
static REMOTE_TRACER_FACTORY: OnceLock<RwLock<Option<RemoteTracerFactory>>> = OnceLock::new();

fn tracer_factory() -> &'static RwLock<TracerFactory> {
    TRACER_FACTORY.get_or_init(|| RwLock::new(Box::new(default_tracer)))
}

fn remote_tracer_factory() -> &'static RwLock<Option<RemoteTracerFactory>> {
    REMOTE_TRACER_FACTORY.get_or_init(|| RwLock::new(None))
}

fn noop_tracer() -> Arc<dyn Tracer> {
    Arc::new(NoopTracer::new())
}

fn local_tracer() -> Arc<dyn Tracer> {
    Arc::new(BasicTracer::default())
}

fn remote_only() -> bool {
    env::var(REMOTE_ONLY_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn default_tracer() -> Arc<dyn Tracer> {
    let token = match env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => token,
        _ => return local_tracer(),
    };

    let remote = remote_tracer_factory()
        .read()
        .ok()
        .and_then(|factory| factory.as_ref().map(|factory| factory(&token)));

    match remote {
        Some(remote) if remote_only() => remote,
        Some(remote) => {
            // The remote backend must come first: the tee uses its first
            // tracer for span context serialization, and the remote backend
            // is the one correlating spans between nodes.
            Arc::new(TeeTracer::new(vec![remote, local_tracer()]))
        }
        None => {
            tracing::warn!(
                "{} is set but no remote tracer factory is registered, tracing locally only",
                ACCESS_TOKEN_ENV
            );
            local_tracer()
        }
    }
}

/// Registers the constructor for the remote tracing backend.
///
/// The factory receives the configured access token and is consulted by
/// [`new_tracer`] whenever [`ACCESS_TOKEN_ENV`] is set. The backend client
/// itself lives outside this crate; without a registered factory a token
/// falls back to local-only tracing with a warning, so tracing stays
/// best-effort.
pub fn set_remote_tracer_factory<F>(factory: F)
where
    F: Fn(&str) -> Arc<dyn Tracer> + Send + Sync + 'static,
{
    if let Ok(mut slot) = remote_tracer_factory().write() {
        *slot = Some(Box::new(factory));
    }
}

/// Builds the process's configured tracer composition.
///
/// Configuration is read from the environment on every call: with no
/// access token, a local [`BasicTracer`]; with a token and a registered
/// remote backend, the remote tracer, teed with a local tracer unless
/// [`REMOTE_ONLY_ENV`] is set.
pub fn new_tracer() -> Arc<dyn Tracer> {
    tracer_factory()
        .read()
        .map(|factory| (*factory)())
        .unwrap_or_else(|_| noop_tracer())
}

/// Causes all future [`new_tracer`] calls to return no-op tracers, for
/// benchmarking and test harness use. Calling the returned closure undoes
/// this effect.
///
/// There is no synchronization: no other thread may construct tracers
/// while `disable` or the returned closure runs.
#[must_use = "dropping the closure leaves tracing disabled"]
pub fn disable() -> impl FnOnce() {
    let previous = tracer_factory().write().ok().map(|mut factory| {
        let noop_factory: TracerFactory = Box::new(noop_tracer);
        mem::replace(&mut *factory, noop_factory)
    });

    move || {
        if let Some(previous) = previous {
            if let Ok(mut factory) = tracer_factory().write() {
                *factory = previous;
            }
        }
    }
}
