use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::codec::TransportConfig;
use crate::error::{Result, TransportError};
use crate::stream::{FrameReader, FrameWriter, TcpFrameReader, TcpFrameWriter};

/// Listens for and accepts framed transport connections.
pub struct TransportListener {
    listener: TcpListener,
    config: TransportConfig,
}

impl TransportListener {
    /// Bind to a TCP address.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr, "listening");
        Ok(Self {
            listener,
            config: TransportConfig::default(),
        })
    }

    /// Override transport config for accepted connections.
    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(TcpFrameReader, TcpFrameWriter, SocketAddr)> {
        let (stream, peer_addr) = self.listener.accept().await.map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%peer_addr, "accepted connection");

        let (read_half, write_half) = stream.into_split();
        Ok((
            FrameReader::with_config(read_half, self.config.clone()),
            FrameWriter::with_config(write_half, self.config.clone()),
            peer_addr,
        ))
    }

    /// Bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::connect;

    #[tokio::test]
    async fn accept_and_exchange_frames() {
        let listener = TransportListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut reader, mut writer, _peer) = listener.accept().await.unwrap();
            let frame = reader.next_frame().await.unwrap().unwrap();
            writer.send_binary(frame.as_ref()).await.unwrap();
        });

        let (mut reader, mut writer) = connect(&addr).await.unwrap();
        writer.send_binary(b"hello").await.unwrap();
        let echoed = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(echoed.as_ref(), b"hello");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_to_unbound_port_fails() {
        // Bind and immediately drop to obtain a (very likely) dead port.
        let listener = TransportListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = connect(&addr).await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[tokio::test]
    async fn accepts_multiple_sequential_connections() {
        let listener = TransportListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (mut reader, mut writer, _peer) = listener.accept().await.unwrap();
                let frame = reader.next_frame().await.unwrap().unwrap();
                writer.send_binary(frame.as_ref()).await.unwrap();
            }
        });

        for tag in [b"one".as_ref(), b"two".as_ref()] {
            let (mut reader, mut writer) = connect(&addr).await.unwrap();
            writer.send_binary(tag).await.unwrap();
            assert_eq!(reader.next_frame().await.unwrap().unwrap().as_ref(), tag);
        }

        server.await.unwrap();
    }
}
