/*!
The OTLP metrics data model.

[`build_payload`] converts a [`metrix_core::MetricBatch`] into an owned [`Envelope`]. The envelope
is encoded by streaming borrowed views over it through `sval`, so the same views produce both
the JSON and the binary protobuf wire formats. Field labels are used by JSON and field indexes
by protobuf.
*/

use std::fmt;

use bytes::{Buf, Bytes};
use sval_derive::Value;

use crate::Error;

pub mod metrics;

mod any_value;
mod instrumentation_scope;
mod resource;

#[cfg(test)]
pub(crate) mod generated;

pub use self::{any_value::*, instrumentation_scope::*, metrics::*, resource::*};

/**
A wire format for OTLP payloads.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /**
    The OTLP/HTTP JSON format.
    */
    #[default]
    Json,
    /**
    The OTLP/HTTP binary protobuf format.
    */
    Proto,
}

impl Encoding {
    /**
    The value of the `Content-Type` header for payloads in this format.
    */
    pub fn content_type(&self) -> &'static str {
        match self {
            Encoding::Json => "application/json",
            Encoding::Proto => "application/x-protobuf",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Json => f.write_str("json"),
            Encoding::Proto => f.write_str("protobuf"),
        }
    }
}

pub(crate) trait RawEncoder {
    type UnixNano: From<u64> + sval::Value;

    fn encode<V: sval::Value>(value: V) -> Result<EncodedPayload, Error>;
}

pub(crate) struct Proto;

#[derive(Value)]
#[sval(tag = "sval_protobuf::tags::PROTOBUF_I64")]
pub(crate) struct BinaryUnixNano(u64);

impl From<u64> for BinaryUnixNano {
    fn from(nanos: u64) -> BinaryUnixNano {
        BinaryUnixNano(nanos)
    }
}

impl RawEncoder for Proto {
    type UnixNano = BinaryUnixNano;

    fn encode<V: sval::Value>(value: V) -> Result<EncodedPayload, Error> {
        let mut cursor = sval_protobuf::stream_to_protobuf(value).into_cursor();
        let body = cursor.copy_to_bytes(cursor.remaining());

        Ok(EncodedPayload {
            encoding: Encoding::Proto,
            body,
        })
    }
}

pub(crate) struct Json;

/**
A nanosecond timestamp written as a decimal string.

JSON numbers can't carry the full range of a `u64` exactly.
*/
pub(crate) struct TextUnixNano(u64);

impl From<u64> for TextUnixNano {
    fn from(nanos: u64) -> TextUnixNano {
        TextUnixNano(nanos)
    }
}

impl sval::Value for TextUnixNano {
    fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(&'sval self, stream: &mut S) -> sval::Result {
        stream.value_computed(&sval::Display::new(&self.0))
    }
}

impl RawEncoder for Json {
    type UnixNano = TextUnixNano;

    fn encode<V: sval::Value>(value: V) -> Result<EncodedPayload, Error> {
        let json = sval_json::stream_to_string(value)
            .map_err(|e| Error::msg(format_args!("failed to encode payload as JSON: {e}")))?;

        Ok(EncodedPayload {
            encoding: Encoding::Json,
            body: Bytes::from(json),
        })
    }
}

/**
An envelope encoded in a particular wire format, ready to send.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    encoding: Encoding,
    body: Bytes,
}

impl EncodedPayload {
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn content_type(&self) -> &'static str {
        self.encoding.content_type()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    /**
    Get the payload as text, if it was encoded as JSON.
    */
    pub fn as_str(&self) -> Option<&str> {
        match self.encoding {
            Encoding::Json => std::str::from_utf8(&self.body).ok(),
            Encoding::Proto => None,
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}

pub(crate) fn stream_field<'sval, S: sval::Stream<'sval> + ?Sized>(
    stream: &mut S,
    label: &sval::Label,
    index: &sval::Index,
    field: impl FnOnce(&mut S) -> sval::Result,
) -> sval::Result {
    stream.record_tuple_value_begin(None, label, index)?;
    field(&mut *stream)?;
    stream.record_tuple_value_end(None, label, index)
}
