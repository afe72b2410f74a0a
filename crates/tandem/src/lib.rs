//! Bidirectional RPC over a single persistent duplex socket connection.
//!
//! Either peer — client or server — can initiate a named request over the
//! connection and receive a correlated response, with two interchangeable
//! payload encodings (schemaless JSON and schema'd binary).
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP transport with length-prefixed binary framing
//! - [`wire`] — The envelope format uniting requests and responses
//! - [`peer`] — Connections, correlation, handler dispatch, client/server

/// Re-export transport types.
pub mod transport {
    pub use tandem_transport::*;
}

/// Re-export wire envelope types.
pub mod wire {
    pub use tandem_wire::*;
}

/// Re-export peer types.
pub mod peer {
    pub use tandem_peer::*;
}
