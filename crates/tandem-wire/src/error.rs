/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame is empty. Peers never send zero-length frames.
    #[error("empty frame")]
    EmptyFrame,

    /// The envelope bytes are truncated or otherwise malformed.
    #[error("malformed envelope: {0}")]
    Malformed(&'static str),

    /// The envelope content tag names no known variant.
    #[error("unknown envelope content tag {0}")]
    UnknownContent(u8),

    /// The handler name exceeds the wire limit.
    #[error("handler name too long ({len} bytes, max {max})")]
    NameTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
