//! Bidirectional request/response peers over a framed duplex transport.
//!
//! Either side of a connection can send a named request and wait for the
//! correlated response, with two interchangeable payload encodings: a
//! schemaless JSON encoding and a schema'd binary encoding. Both share the
//! same correlation and dispatch machinery.

pub mod client;
pub mod codec;
pub mod connection;
mod correlation;
pub mod error;
pub mod info;
mod registry;
pub mod server;

pub use client::Client;
pub use codec::{BinCodec, Codec, JsonCodec};
pub use connection::{Connection, RequestContext};
pub use error::{
    HandlerError, Result, RpcError, DEFAULT_PUBLIC_ERROR_MESSAGE, MISSING_HANDLER_MESSAGE,
};
pub use info::Info;
pub use server::Server;
