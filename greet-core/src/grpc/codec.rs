//! # gRPC codec adapter
//!
//! Implements `tonic::codec::Codec` on top of any [`crate::codec::Codec`], so `tonic`
//! handles framing, compression flags and trailers while message encoding stays in the
//! codec shared with the Connect bindings.
//!
//! Unlike `tonic`'s stock protobuf codec, undecodable messages are reported as
//! `InvalidArgument` instead of `Internal`.
use crate::codec::{Codec as MessageCodec, WireMessage};
use bytes::Buf;
use std::marker::PhantomData;
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A `tonic` codec encoding `E` and decoding `D` with the message codec `C`.
pub struct GrpcCodec<C, E, D> {
    codec: C,
    _marker: PhantomData<fn(E) -> D>,
}

impl<C: MessageCodec, E, D> GrpcCodec<C, E, D> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            _marker: PhantomData,
        }
    }
}

impl<C: MessageCodec, E, D> Default for GrpcCodec<C, E, D> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C, E, D> Codec for GrpcCodec<C, E, D>
where
    C: MessageCodec,
    E: WireMessage,
    D: WireMessage,
{
    type Encode = E;
    type Decode = D;

    type Encoder = GrpcEncoder<C, E>;
    type Decoder = GrpcDecoder<C, D>;

    fn encoder(&mut self) -> Self::Encoder {
        GrpcEncoder(self.codec, PhantomData)
    }

    fn decoder(&mut self) -> Self::Decoder {
        GrpcDecoder(self.codec, PhantomData)
    }
}

pub struct GrpcEncoder<C, T>(C, PhantomData<fn(T)>);

impl<C: MessageCodec, T: WireMessage> Encoder for GrpcEncoder<C, T> {
    type Item = T;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        self.0.encode(&item, dst).map_err(Status::from)
    }
}

pub struct GrpcDecoder<C, T>(C, PhantomData<fn() -> T>);

impl<C: MessageCodec, T: WireMessage> Decoder for GrpcDecoder<C, T> {
    type Item = T;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        // The decode buffer is limited to the current frame.
        let frame = src.copy_to_bytes(src.remaining());
        self.0.decode(frame).map(Some).map_err(Status::from)
    }
}
