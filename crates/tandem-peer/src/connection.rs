use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, trace, warn};

use tandem_transport::{TcpFrameReader, TcpFrameWriter};
use tandem_wire::{self as wire, DataType, Request, Response, Wrapper};

use crate::codec::{BinCodec, Codec, JsonCodec};
use crate::correlation::Correlation;
use crate::error::{HandlerError, Result, RpcError, MISSING_HANDLER_MESSAGE};
use crate::info::Info;
use crate::registry::Registries;

struct ConnectionInner {
    id: u64,
    writer: Mutex<TcpFrameWriter>,
    correlation: Correlation,
    registries: Arc<Registries>,
    info: Info,
}

/// One live duplex connection.
///
/// Either peer can send named requests over it and receive correlated
/// responses; inbound requests are dispatched to the shared handler
/// registries, one task per request.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn new(id: u64, writer: TcpFrameWriter, registries: Arc<Registries>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                writer: Mutex::new(writer),
                correlation: Correlation::new(),
                registries,
                info: Info::new(),
            }),
        }
    }

    /// Connection id, unique within its server (0 for client connections).
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Application data attached to this connection.
    pub fn info(&self) -> &Info {
        &self.inner.info
    }

    /// Send a JSON-encoded request and wait for its correlated response.
    ///
    /// A non-empty successful response is decoded into `result`; pass `None`
    /// when the handler is not expected to return a value.
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
        self.send_request::<JsonCodec, P, R>(name, params, result)
            .await
    }

    /// Send a binary-encoded request and wait for its correlated response.
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
        self.send_request::<BinCodec, P, R>(name, params, result)
            .await
    }

    /// Register a JSON handler on the registries this connection shares.
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
            .register::<JsonCodec, P, R, F, Fut>(name, handler);
    }

    /// Register a binary-encoded handler on the shared registries.
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
            .register::<BinCodec, P, R, F, Fut>(name, handler);
    }

    /// Close the write half; the peer observes end-of-stream.
    pub async fn close(&self) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }

    async fn send_request<C, P, R>(
        &self,
        name: &str,
        params: &P,
        result: Option<&mut R>,
    ) -> Result<()>
    where
        C: Codec,
        P: Serialize,
        R: DeserializeOwned,
    {
        let data = C::encode(params)?;
        let req_id = self.inner.correlation.allocate();
        // The guard releases the waiter entry on every exit path.
        let (rx, _guard) = self.inner.correlation.register(req_id)?;

        trace!(
            conn = self.inner.id,
            req_id,
            name,
            len = data.len(),
            "sending request"
        );
        let wrapper = Wrapper::Request(Request {
            data_type: C::DATA_TYPE,
            name: name.to_string(),
            req_id,
            data: Bytes::from(data),
        });
        self.send_wrapper(&wrapper).await?;

        let response = rx.await.map_err(|_| RpcError::ConnectionClosed)?;
        trace!(
            conn = self.inner.id,
            req_id,
            is_error = response.is_error,
            len = response.data.len(),
            "received response"
        );

        if response.is_error {
            return Err(RpcError::Remote(
                String::from_utf8_lossy(&response.data).into_owned(),
            ));
        }
        if response.data.is_empty() {
            return Ok(());
        }
        let Some(slot) = result else {
            return Err(RpcError::UnexpectedResult {
                len: response.data.len(),
            });
        };
        if response.data_type != C::DATA_TYPE {
            return Err(RpcError::DecodeMismatch {
                expected: C::DATA_TYPE,
                got: response.data_type,
            });
        }
        *slot = C::decode(&response.data)?;
        Ok(())
    }

    async fn send_wrapper(&self, wrapper: &Wrapper) -> Result<()> {
        let bytes = wire::encode(wrapper)?;
        let mut writer = self.inner.writer.lock().await;
        writer.send_binary(&bytes).await?;
        Ok(())
    }

    /// Release all outstanding waiters. Called once the read loop has exited.
    pub(crate) fn abort_pending(&self) {
        self.inner.correlation.abort_all();
    }

    /// Consume inbound frames until end-of-stream or a fatal fault.
    ///
    /// The sole consumer of this connection's inbound frames: responses are
    /// resolved synchronously, requests fan out to one task each.
    pub(crate) async fn run_read_loop(&self, mut reader: TcpFrameReader) -> Result<()> {
        while let Some(frame) = reader.next_frame().await? {
            match wire::decode(&frame)? {
                Wrapper::Message(_) => {
                    // Reserved branch: fail loudly rather than drop silently.
                    return Err(RpcError::MessageUnsupported);
                }
                Wrapper::Request(req) => self.dispatch_request(req).await,
                Wrapper::Response(res) => self.inner.correlation.resolve(res),
            }
        }
        Ok(())
    }

    async fn dispatch_request(&self, req: Request) {
        trace!(
            conn = self.inner.id,
            req_id = req.req_id,
            name = %req.name,
            encoding = %req.data_type,
            "inbound request"
        );
        match req.data_type {
            DataType::Json => self.spawn_handler::<JsonCodec>(req),
            DataType::Schema => self.spawn_handler::<BinCodec>(req),
            other => {
                warn!(
                    conn = self.inner.id,
                    req_id = req.req_id,
                    encoding = %other,
                    "request with unsupported encoding"
                );
                self.send_error_message(req.req_id, &format!("unsupported request encoding: {other}"))
                    .await;
            }
        }
    }

    fn spawn_handler<C: Codec>(&self, req: Request) {
        let conn = self.clone();
        tokio::spawn(async move {
            let handler = conn.inner.registries.of::<C>().get(&req.name);
            let Some(handler) = handler else {
                debug!(conn = conn.inner.id, name = %req.name, "missing request handler");
                conn.send_error_message(req.req_id, MISSING_HANDLER_MESSAGE)
                    .await;
                return;
            };

            let ctx = RequestContext { conn: conn.clone() };
            // The inner spawn is the fault containment boundary: a panicking
            // handler surfaces here as a join error instead of killing the
            // dispatch path.
            let outcome = match tokio::spawn(handler(ctx, req.data.clone())).await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    let detail = panic_detail(join_err);
                    error!(
                        conn = conn.inner.id,
                        name = %req.name,
                        %detail,
                        "handler panicked"
                    );
                    Err(HandlerError::internal(detail))
                }
            };

            match outcome {
                Ok(result) => conn.send_result(req.req_id, C::DATA_TYPE, result).await,
                Err(err) => {
                    debug!(
                        conn = conn.inner.id,
                        name = %req.name,
                        detail = err.detail(),
                        "handler failed"
                    );
                    conn.send_error_message(req.req_id, err.public_message())
                        .await;
                }
            }
        });
    }

    async fn send_result(&self, req_id: u32, data_type: DataType, data: Vec<u8>) {
        let response = Wrapper::Response(Response {
            req_id,
            data_type,
            is_error: false,
            data: Bytes::from(data),
        });
        if let Err(err) = self.send_wrapper(&response).await {
            warn!(conn = self.inner.id, req_id, %err, "failed to send response");
        }
    }

    async fn send_error_message(&self, req_id: u32, public_message: &str) {
        let response = Wrapper::Response(Response {
            req_id,
            data_type: DataType::Text,
            is_error: true,
            data: Bytes::copy_from_slice(public_message.as_bytes()),
        });
        if let Err(err) = self.send_wrapper(&response).await {
            warn!(conn = self.inner.id, req_id, %err, "failed to send error response");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.inner.id).finish()
    }
}

/// Handed to every handler invocation.
#[derive(Clone)]
pub struct RequestContext {
    pub(crate) conn: Connection,
}

impl RequestContext {
    /// The connection the request arrived on (nested calls, info bag).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn panic_detail(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "handler task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else {
        "handler panicked".to_string()
    }
}
