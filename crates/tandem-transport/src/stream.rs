use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{FrameCodec, TransportConfig};
use crate::error::{Result, TransportError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Frame reader over a TCP read half.
pub type TcpFrameReader = FrameReader<OwnedReadHalf>;

/// Frame writer over a TCP write half.
pub type TcpFrameWriter = FrameWriter<OwnedWriteHalf>;

/// Reads complete frames from any async byte stream.
///
/// Handles partial reads internally — callers always get complete frames.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    codec: FrameCodec,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, TransportConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: R, config: TransportConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec: FrameCodec::with_max_payload(config.max_payload_size),
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns `Ok(None)` on clean end of stream (between frames).
    /// A stream that ends mid-frame yields `Err(TransportError::ConnectionClosed)`.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buf)? {
                return Ok(Some(frame));
            }

            let read = self.inner.read_buf(&mut self.buf).await?;
            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed);
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes complete frames to any async byte stream.
pub struct FrameWriter<W> {
    inner: W,
    buf: BytesMut,
    codec: FrameCodec,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, TransportConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: W, config: TransportConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec: FrameCodec::with_max_payload(config.max_payload_size),
        }
    }

    /// Frame and send one binary payload.
    pub async fn send_binary(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        self.codec.encode(payload, &mut self.buf)?;
        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream.
    ///
    /// The peer observes end-of-stream after all buffered frames are delivered.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Connect to a listening transport endpoint.
pub async fn connect(addr: &str) -> Result<(TcpFrameReader, TcpFrameWriter)> {
    connect_with_config(addr, TransportConfig::default()).await
}

/// Connect with explicit configuration.
pub async fn connect_with_config(
    addr: &str,
    config: TransportConfig,
) -> Result<(TcpFrameReader, TcpFrameWriter)> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| TransportError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    stream.set_nodelay(true)?;
    debug!(addr, "connected");

    let (read_half, write_half) = stream.into_split();
    Ok((
        FrameReader::with_config(read_half, config.clone()),
        FrameWriter::with_config(write_half, config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{HEADER_SIZE, MAGIC};
    use bytes::BufMut;

    #[tokio::test]
    async fn roundtrip_over_duplex_pipe() {
        let (left, right) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_binary(b"ping").await.unwrap();
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.as_ref(), b"ping");
    }

    #[tokio::test]
    async fn multiple_frames_in_order() {
        let (left, right) = tokio::io::duplex(4096);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_binary(b"one").await.unwrap();
        writer.send_binary(b"two").await.unwrap();
        writer.send_binary(b"three").await.unwrap();

        assert_eq!(reader.next_frame().await.unwrap().unwrap().as_ref(), b"one");
        assert_eq!(reader.next_frame().await.unwrap().unwrap().as_ref(), b"two");
        assert_eq!(
            reader.next_frame().await.unwrap().unwrap().as_ref(),
            b"three"
        );
    }

    #[tokio::test]
    async fn clean_eof_yields_none() {
        let (left, right) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send_binary(b"last").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        assert_eq!(reader.next_frame().await.unwrap().unwrap().as_ref(), b"last");
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_mid_frame_is_error() {
        let (mut left, right) = tokio::io::duplex(1024);
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(16);
        partial.put_slice(b"only-part");
        tokio::io::AsyncWriteExt::write_all(&mut left, &partial)
            .await
            .unwrap();
        drop(left);

        let mut reader = FrameReader::new(right);
        let err = reader.next_frame().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[tokio::test]
    async fn invalid_magic_in_stream() {
        let (mut left, right) = tokio::io::duplex(1024);
        tokio::io::AsyncWriteExt::write_all(&mut left, &[0x00u8; HEADER_SIZE])
            .await
            .unwrap();

        let mut reader = FrameReader::new(right);
        let err = reader.next_frame().await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidMagic));
    }

    #[tokio::test]
    async fn large_payload_roundtrip() {
        let (left, right) = tokio::io::duplex(8 * 1024);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        let payload = vec![0xAB; 64 * 1024];
        let send = async {
            writer.send_binary(&payload).await.unwrap();
        };
        let recv = async { reader.next_frame().await.unwrap().unwrap() };
        let (_, frame) = tokio::join!(send, recv);
        assert_eq!(frame.len(), payload.len());
        assert_eq!(frame.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn config_limits_apply_to_reader() {
        let (left, right) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::with_config(
            right,
            TransportConfig {
                max_payload_size: 8,
            },
        );

        writer.send_binary(&[0u8; 64]).await.unwrap();
        let err = reader.next_frame().await.unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge { .. }));
    }
}
