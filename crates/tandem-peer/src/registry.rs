use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use tandem_wire::DataType;

use crate::codec::Codec;
use crate::connection::RequestContext;
use crate::error::HandlerError;

pub(crate) type HandlerFuture =
    Pin<Box<dyn Future<Output = std::result::Result<Vec<u8>, HandlerError>> + Send>>;

pub(crate) type BoxedHandler = Arc<dyn Fn(RequestContext, Bytes) -> HandlerFuture + Send + Sync>;

/// Named handlers for one payload encoding.
///
/// Registration overwrites. A server shares one registry pair by reference
/// across every connection it accepts; a client owns a private pair.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<HashMap<String, BoxedHandler>>,
}

impl HandlerRegistry {
    /// Register a typed handler under `name`, overwriting any prior one.
    ///
    /// Parameter and result types are fixed here: params are decoded with
    /// the codec before the handler runs and the result is encoded after it
    /// returns, so a decode failure fails only that one request.
    pub fn register<C, P, R, F, Fut>(&self, name: &str, handler: F)
    where
        C: Codec,
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(RequestContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, HandlerError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: BoxedHandler =
            Arc::new(move |ctx: RequestContext, data: Bytes| -> HandlerFuture {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let params: P =
                        C::decode(&data).map_err(|err| HandlerError::internal(err.to_string()))?;
                    let result = handler(ctx, params).await?;
                    C::encode(&result).map_err(|err| HandlerError::internal(err.to_string()))
                })
            });
        self.handlers
            .write()
            .expect("handler registry lock poisoned")
            .insert(name.to_string(), erased);
    }

    pub fn get(&self, name: &str) -> Option<BoxedHandler> {
        self.handlers
            .read()
            .expect("handler registry lock poisoned")
            .get(name)
            .cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handlers.read().unwrap().len()
    }
}

/// The per-encoding registry pair a connection dispatches against.
#[derive(Default)]
pub(crate) struct Registries {
    pub json: HandlerRegistry,
    pub schema: HandlerRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of<C: Codec>(&self) -> &HandlerRegistry {
        match C::DATA_TYPE {
            DataType::Json => &self.json,
            DataType::Schema => &self.schema,
            DataType::Text | DataType::Unknown(_) => {
                unreachable!("codec data types are json or schema")
            }
        }
    }
}
