//! Duplex TCP transport with length-prefixed binary framing.
//!
//! Every message is framed with:
//! - A 2-byte magic number ("TD") for stream synchronization
//! - A 4-byte little-endian payload length
//!
//! One decoded frame delivers exactly the bytes of one sent payload.
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod listener;
pub mod stream;

pub use codec::{FrameCodec, TransportConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC};
pub use error::{Result, TransportError};
pub use listener::TransportListener;
pub use stream::{connect, connect_with_config, FrameReader, FrameWriter, TcpFrameReader, TcpFrameWriter};
