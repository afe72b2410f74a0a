use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;

/// Frame header: magic (2) + length (4) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Magic bytes: "TD" (0x54 0x44).
pub const MAGIC: [u8; 2] = [0x54, 0x44];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Configuration for the transport layer.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Length-prefixed frame codec.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Payload          │
/// │ 0x54 0x44    │ (4B LE)  │ (Length bytes)   │
/// │ "TD"         │          │                  │
/// └──────────────┴───────────┴─────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload_size: usize,
}

impl FrameCodec {
    /// Create a codec with the default payload limit.
    pub fn new() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Create a codec with an explicit payload limit.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    /// Current maximum payload size.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, TransportError> {
        if src.len() < HEADER_SIZE {
            return Ok(None); // Need more data
        }

        // Check magic
        if src[0..2] != MAGIC {
            return Err(TransportError::InvalidMagic);
        }

        let payload_len = u32::from_le_bytes(src[2..6].try_into().unwrap()) as usize;

        if payload_len > self.max_payload_size {
            return Err(TransportError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload_size,
            });
        }

        let total = HEADER_SIZE + payload_len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None); // Need more data
        }

        src.advance(HEADER_SIZE);
        Ok(Some(src.split_to(payload_len).freeze()))
    }
}

impl<'a> Encoder<&'a [u8]> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), TransportError> {
        if payload.len() > self.max_payload_size {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }

        dst.reserve(HEADER_SIZE + payload.len());
        dst.put_slice(&MAGIC);
        dst.put_u32_le(payload.len() as u32);
        dst.put_slice(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_one(payload: &[u8]) -> BytesMut {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn encode_decode_roundtrip() {
        let payload = b"hello, tandem!";
        let mut buf = encode_one(payload);
        assert_eq!(buf.len(), HEADER_SIZE + payload.len());

        let mut codec = FrameCodec::new();
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x54, 0x44, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = encode_one(b"hello");
        buf.truncate(HEADER_SIZE + 2);

        let mut codec = FrameCodec::new();
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_invalid_magic() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::InvalidMagic)
        ));
    }

    #[test]
    fn decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le(1024 * 1024 * 32); // 32 MiB

        let mut codec = FrameCodec::new();
        assert!(matches!(
            codec.decode(&mut buf),
            Err(TransportError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let mut codec = FrameCodec::with_max_payload(8);
        let mut buf = BytesMut::new();
        let result = codec.encode(&[0u8; 16][..], &mut buf);
        assert!(matches!(result, Err(TransportError::PayloadTooLarge { .. })));
    }

    #[test]
    fn multiple_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(b"first".as_ref(), &mut buf).unwrap();
        codec.encode(b"second".as_ref(), &mut buf).unwrap();

        let f1 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f1.as_ref(), b"first");
        let f2 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_payload() {
        let mut buf = encode_one(b"");
        let mut codec = FrameCodec::new();
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert!(frame.is_empty());
    }
}
