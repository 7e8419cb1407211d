use crate::KeyValue;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::SystemTime;

/// A timed log record attached to a [`Span`].
///
/// Events carry the time at which they were added to the span.
///
/// [`Span`]: crate::trace::Span
#[cfg_attr(feature = "serialize", derive(Deserialize, Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name
    pub name: Cow<'static, str>,
    /// Event timestamp
    pub timestamp: SystemTime,
    /// Event attributes
    pub attributes: Vec<KeyValue>,
}

impl Event {
    /// Create new `Event`.
    pub fn new<T: Into<Cow<'static, str>>>(
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
        }
    }

    /// Create new `Event` with a given name, timestamped now.
    pub fn with_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        Event {
            name: name.into(),
            timestamp: SystemTime::now(),
            attributes: Vec::new(),
        }
    }
}
