use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use tandem_transport::{TcpFrameReader, TcpFrameWriter, TransportListener};

use crate::connection::{Connection, RequestContext};
use crate::error::{HandlerError, Result};
use crate::registry::Registries;

type ConnHook = Arc<dyn Fn(&Connection) + Send + Sync>;

struct ServerInner {
    registries: Arc<Registries>,
    connections: Mutex<HashMap<u64, Connection>>,
    next_conn_id: AtomicU64,
    connect_hook: Mutex<Option<ConnHook>>,
    disconnect_hook: Mutex<Option<ConnHook>>,
}

/// Accepts connections and shares one handler-registry pair across them.
///
/// Cheaply cloneable; all clones address the same connection set and
/// registries.
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ServerInner {
                registries: Arc::new(Registries::new()),
                connections: Mutex::new(HashMap::new()),
                next_conn_id: AtomicU64::new(1),
                connect_hook: Mutex::new(None),
                disconnect_hook: Mutex::new(None),
            }),
        }
    }

    /// Register a JSON handler shared by every accepted connection.
    pub fn on_json<P, R, F, Fut>(&self, name: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
    {
        self.inner
            .registries
            .json
            .register::<crate::codec::JsonCodec, P, R, F, Fut>(name, handler);
    }

    /// Register a binary-encoded handler shared by every accepted connection.
    pub fn on_schema<P, R, F, Fut>(&self, name: &str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
    {
        self.inner
            .registries
            .schema
            .register::<crate::codec::BinCodec, P, R, F, Fut>(name, handler);
    }

    /// Run `hook` for every newly accepted connection.
    pub fn on_connect(&self, hook: impl Fn(&Connection) + Send + Sync + 'static) {
        *self
            .inner
            .connect_hook
            .lock()
            .expect("connect hook lock poisoned") = Some(Arc::new(hook));
    }

    /// Run `hook` for every connection that drops.
    pub fn on_disconnect(&self, hook: impl Fn(&Connection) + Send + Sync + 'static) {
        *self
            .inner
            .disconnect_hook
            .lock()
            .expect("disconnect hook lock poisoned") = Some(Arc::new(hook));
    }

    /// Bind the listening transport.
    pub async fn bind(&self, addr: &str) -> Result<TransportListener> {
        Ok(TransportListener::bind(addr).await?)
    }

    /// Accept connections until the listener fails.
    ///
    /// Callers typically spawn this; a fatal accept error ends it with `Err`.
    pub async fn serve(&self, listener: TransportListener) -> Result<()> {
        loop {
            let (reader, writer, peer_addr) = listener.accept().await?;
            self.start_connection(reader, writer, peer_addr);
        }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.inner
            .connections
            .lock()
            .expect("connection map lock poisoned")
            .len()
    }

    /// Snapshot of all live connections.
    pub fn connections(&self) -> Vec<Connection> {
        self.inner
            .connections
            .lock()
            .expect("connection map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Look up a live connection. `None` when racing a disconnect.
    pub fn connection(&self, id: u64) -> Option<Connection> {
        self.inner
            .connections
            .lock()
            .expect("connection map lock poisoned")
            .get(&id)
            .cloned()
    }

    fn start_connection(&self, reader: TcpFrameReader, writer: TcpFrameWriter, peer_addr: SocketAddr) {
        let id = self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let conn = Connection::new(id, writer, Arc::clone(&self.inner.registries));
        debug!(conn = id, %peer_addr, "peer connected");

        self.inner
            .connections
            .lock()
            .expect("connection map lock poisoned")
            .insert(id, conn.clone());

        let connect_hook = self
            .inner
            .connect_hook
            .lock()
            .expect("connect hook lock poisoned")
            .clone();
        if let Some(hook) = connect_hook {
            hook(&conn);
        }

        let server = self.clone();
        tokio::spawn(async move {
            if let Err(err) = conn.run_read_loop(reader).await {
                warn!(conn = conn.id(), %err, "connection terminated");
            }
            conn.abort_pending();
            server.deregister(conn.id());
        });
    }

    fn deregister(&self, id: u64) {
        let removed = self
            .inner
            .connections
            .lock()
            .expect("connection map lock poisoned")
            .remove(&id);
        let Some(conn) = removed else {
            return;
        };
        debug!(conn = id, "peer disconnected");

        let disconnect_hook = self
            .inner
            .disconnect_hook
            .lock()
            .expect("disconnect hook lock poisoned")
            .clone();
        if let Some(hook) = disconnect_hook {
            hook(&conn);
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}
