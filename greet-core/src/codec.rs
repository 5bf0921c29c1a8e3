//! # Message codecs
//!
//! A [`Codec`] turns messages into bytes and back. Two adapters exist:
//!
//! * [`ProtoCodec`]: binary protobuf, used by the native and gRPC bindings.
//! * [`JsonCodec`]: JSON, used by the JSON binding.
//!
//! Decoding failures are always reported as `InvalidArgument`; a codec never falls back
//! to another encoding.
use crate::error::Error;
use bytes::{Buf, BufMut};
use serde::{Serialize, de::DeserializeOwned};

/// Messages that can travel through every codec.
pub trait WireMessage:
    prost::Message + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> WireMessage for T where
    T: prost::Message + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

pub trait Codec: Copy + Default + Send + Sync + 'static {
    /// Short codec name, as used in `application/grpc+<name>`.
    const NAME: &'static str;

    /// Content type of a Connect unary body encoded with this codec.
    const CONTENT_TYPE: &'static str;

    fn encode<M: WireMessage>(&self, message: &M, dst: &mut impl BufMut) -> Result<(), Error>;

    fn decode<M: WireMessage>(&self, src: impl Buf) -> Result<M, Error>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoCodec;

impl Codec for ProtoCodec {
    const NAME: &'static str = "proto";
    const CONTENT_TYPE: &'static str = crate::protocol::CONTENT_TYPE_PROTO;

    fn encode<M: WireMessage>(&self, message: &M, dst: &mut impl BufMut) -> Result<(), Error> {
        message
            .encode(dst)
            .map_err(|e| Error::internal(format!("Failed to encode Protobuf message: {e}")))
    }

    fn decode<M: WireMessage>(&self, src: impl Buf) -> Result<M, Error> {
        M::decode(src).map_err(|e| {
            Error::invalid_argument(format!("Failed to decode Protobuf message: {e}"))
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    const NAME: &'static str = "json";
    const CONTENT_TYPE: &'static str = crate::protocol::CONTENT_TYPE_JSON;

    fn encode<M: WireMessage>(&self, message: &M, dst: &mut impl BufMut) -> Result<(), Error> {
        serde_json::to_writer(dst.writer(), message)
            .map_err(|e| Error::internal(format!("Failed to encode JSON message: {e}")))
    }

    fn decode<M: WireMessage>(&self, src: impl Buf) -> Result<M, Error> {
        serde_json::from_reader(src.reader())
            .map_err(|e| Error::invalid_argument(format!("Failed to decode JSON message: {e}")))
    }
}
