//! Sends one "Echo" request to the example server and prints the reply.
//!
//! Run the server first:
//!   cargo run --example echo-server

use serde::{Deserialize, Serialize};
use tandem::peer::Client;

#[derive(Serialize)]
struct EchoParams {
    text: String,
}

#[derive(Deserialize)]
struct EchoResponse {
    text: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let client = Client::connect("127.0.0.1:8087").await?;

    let params = EchoParams {
        text: "Hi!".to_string(),
    };
    println!("Send: {}", params.text);

    let mut result = EchoResponse {
        text: String::new(),
    };
    client
        .send_json_request("Echo", &params, Some(&mut result))
        .await?;
    println!("Received: {}", result.text);

    Ok(())
}
