use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use tandem_transport as transport;

use crate::connection::{Connection, RequestContext};
use crate::error::{HandlerError, Result};
use crate::registry::Registries;

type DisconnectHook = Box<dyn FnOnce() + Send>;

/// The single-connection peer: actively connects to a listening server.
///
/// Handlers registered on the client serve requests the server initiates
/// over the same connection. There is no automatic reconnection; the
/// disconnect hook fires once and the client is then spent.
pub struct Client {
    conn: Connection,
    disconnect_hook: Arc<Mutex<Option<DisconnectHook>>>,
}

impl Client {
    /// Connect to a server at `addr` and start the connection's read loop.
    pub async fn connect(addr: &str) -> Result<Client> {
        let registries = Arc::new(Registries::new());
        let (reader, writer) = transport::connect(addr).await?;
        let conn = Connection::new(0, writer, registries);
        debug!(addr, "client connected");

        let disconnect_hook: Arc<Mutex<Option<DisconnectHook>>> = Arc::new(Mutex::new(None));

        let loop_conn = conn.clone();
        let loop_hook = Arc::clone(&disconnect_hook);
        tokio::spawn(async move {
            if let Err(err) = loop_conn.run_read_loop(reader).await {
                warn!(conn = loop_conn.id(), %err, "connection terminated");
            }
            loop_conn.abort_pending();
            let hook = loop_hook.lock().expect("disconnect hook lock poisoned").take();
            if let Some(hook) = hook {
                hook();
            }
        });

        Ok(Client {
            conn,
            disconnect_hook,
        })
    }

    /// The client's one connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `hook` once when the connection drops.
    pub fn on_disconnect(&self, hook: impl FnOnce() + Send + 'static) {
        *self
            .disconnect_hook
            .lock()
            .expect("disconnect hook lock poisoned") = Some(Box::new(hook));
    }

    /// Register a JSON handler for requests initiated by the server.
    pub fn on_json<P, R, F, Fut>(&self, name: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
    {
        self.conn.on_json(name, handler);
    }

    /// Register a binary-encoded handler for requests initiated by the server.
    pub fn on_schema<P, R, F, Fut>(&self, name: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
    {
        self.conn.on_schema(name, handler);
    }

    /// Send a JSON-encoded request to the server.
    pub async fn send_json_request<P, R>(
        &self,
        name: &str,
        params: &P,
        result: Option<&mut R>,
    ) -> Result<()>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.conn.send_json_request(name, params, result).await
    }

    /// Send a binary-encoded request to the server.
    pub async fn send_schema_request<P, R>(
        &self,
        name: &str,
        params: &P,
        result: Option<&mut R>,
    ) -> Result<()>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.conn.send_schema_request(name, params, result).await
    }

    /// Close the connection's write half.
    pub async fn close(&self) -> Result<()> {
        self.conn.close().await
    }
}
