//! Binary envelope format for tandem frames.
//!
//! Every transport frame carries exactly one [`Wrapper`]: a tagged union of
//! `Message` (reserved), `Request`, or `Response`. Decoding an empty frame,
//! a truncated envelope, or an unrecognized content tag is a framing fault
//! and fatal to the connection that produced it.

pub mod envelope;
pub mod error;

pub use envelope::{decode, encode, DataType, Request, Response, Wrapper, MAX_NAME_LEN};
pub use error::{Result, WireError};
