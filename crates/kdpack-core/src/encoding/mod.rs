//! Byte-level encodings shared by every stream header

pub mod varint;

pub use varint::{decode_varint, encode_varint, zigzag_decode, zigzag_encode};
