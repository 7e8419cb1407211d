//! Byte encoding of finished spans for cross-process transport.
//!
//! The encoding round-trips every field of a [`RawSpan`] and is compatible
//! only between instances of this crate; it carries no version tag and is
//! opaque to transports, which typically embed it in an RPC response
//! header.
use crate::trace::RawSpan;
use thiserror::Error;

/// Errors returned by the span wire codec.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// The span could not be encoded.
    #[error("failed to encode span: {0}")]
    Encode(#[source] bincode::Error),

    /// The input is not a complete, well-formed span encoding.
    #[error("malformed span encoding: {0}")]
    Decode(#[source] bincode::Error),
}

/// Encodes a raw span into bytes, reusing `dest` as the output buffer.
///
/// Any existing contents of `dest` are discarded.
pub fn encode_span(span: &RawSpan, mut dest: Vec<u8>) -> Result<Vec<u8>, CodecError> {
    dest.clear();
    bincode::serialize_into(&mut dest, span).map_err(CodecError::Encode)?;
    Ok(dest)
}

/// Decodes a raw span from bytes produced by [`encode_span`].
///
/// Truncated or otherwise malformed input is rejected with
/// [`CodecError::Decode`].
pub fn decode_span(encoded: &[u8]) -> Result<RawSpan, CodecError> {
    bincode::deserialize(encoded).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowtrace::trace::{Event, SpanContext, SpanId, TraceFlags, TraceId};
    use snowtrace::KeyValue;
    use std::collections::HashMap;
    use std::time::SystemTime;

    fn sample_span() -> RawSpan {
        let mut baggage = HashMap::new();
        baggage.insert("sb".to_owned(), "1".to_owned());

        let start_time = SystemTime::now();
        RawSpan {
            context: SpanContext::new(
                TraceId::from(7u128),
                SpanId::from(11u64),
                TraceFlags::SAMPLED,
                baggage,
            ),
            parent_span_id: SpanId::from(3u64),
            operation_name: "node.scan".into(),
            start_time,
            end_time: start_time + std::time::Duration::from_millis(5),
            tags: vec![
                KeyValue::new("node", 3i64),
                KeyValue::new("success", true),
            ],
            logs: vec![Event::new("node.scan", start_time, Vec::new())],
        }
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let span = sample_span();
        let encoded = encode_span(&span, Vec::new()).expect("encode");
        let decoded = decode_span(&encoded).expect("decode");
        assert_eq!(decoded, span);
    }

    #[test]
    fn encode_discards_existing_buffer_contents() {
        let span = sample_span();
        let reference = encode_span(&span, Vec::new()).expect("encode");

        let dirty = vec![0xFFu8; 64];
        let reused = encode_span(&span, dirty).expect("encode into dirty buffer");
        assert_eq!(reused, reference);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let span = sample_span();
        let encoded = encode_span(&span, Vec::new()).expect("encode");

        let err = decode_span(&encoded[..encoded.len() / 2]).expect_err("truncated");
        assert!(matches!(err, CodecError::Decode(_)));

        assert!(matches!(
            decode_span(b"not a span"),
            Err(CodecError::Decode(_))
        ));
    }
}
