//! Minimal echo server — answers "Echo" requests from any connection.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --example echo-client

use serde::{Deserialize, Serialize};
use tandem::peer::Server;

#[derive(Deserialize)]
struct EchoParams {
    text: String,
}

#[derive(Serialize)]
struct EchoResponse {
    text: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let server = Server::new();
    server.on_json("Echo", |_ctx, params: EchoParams| async move {
        Ok(EchoResponse { text: params.text })
    });
    server.on_connect(|conn| eprintln!("Peer connected: {}", conn.id()));
    server.on_disconnect(|conn| eprintln!("Peer disconnected: {}", conn.id()));

    let listener = server.bind("127.0.0.1:8087").await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    server.serve(listener).await?;
    Ok(())
}
