//! End-to-end echo through the facade's public surface.

use serde::{Deserialize, Serialize};
use tandem::peer::{Client, Server};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EchoParams {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EchoResponse {
    text: String,
}

#[tokio::test]
async fn json_echo_through_facade() {
    let server = Server::new();
    server.on_json("Echo", |_ctx, params: EchoParams| async move {
        Ok(EchoResponse { text: params.text })
    });

    let listener = server.bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let serve = server.clone();
    tokio::spawn(async move {
        let _ = serve.serve(listener).await;
    });

    let client = Client::connect(&addr).await.unwrap();
    let mut result = EchoResponse {
        text: String::new(),
    };
    client
        .send_json_request(
            "Echo",
            &EchoParams {
                text: "Hi!".to_string(),
            },
            Some(&mut result),
        )
        .await
        .unwrap();
    assert_eq!(result.text, "Hi!");
}

#[tokio::test]
async fn schema_echo_through_facade() {
    let server = Server::new();
    server.on_schema("Echo", |_ctx, params: EchoParams| async move {
        Ok(EchoResponse { text: params.text })
    });

    let listener = server.bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let serve = server.clone();
    tokio::spawn(async move {
        let _ = serve.serve(listener).await;
    });

    let client = Client::connect(&addr).await.unwrap();
    let mut result = EchoResponse {
        text: String::new(),
    };
    client
        .send_schema_request(
            "Echo",
            &EchoParams {
                text: "Hi!".to_string(),
            },
            Some(&mut result),
        )
        .await
        .unwrap();
    assert_eq!(result.text, "Hi!");
}
