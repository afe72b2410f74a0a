use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use tandem_wire::Response;

use crate::error::{Result, RpcError};

type PendingMap = Mutex<HashMap<u32, oneshot::Sender<Response>>>;

/// Pairs outbound requests with their eventual responses.
///
/// The pending map is touched by two actors: tasks registering and releasing
/// waiters, and the connection's single read loop resolving them. Both go
/// through the mutex; ids are recycled once the response is delivered or the
/// wait abandoned.
#[derive(Default)]
pub(crate) struct Correlation {
    next_req_id: AtomicU32,
    pending: Arc<PendingMap>,
}

impl Correlation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next request id (atomic post-increment).
    pub fn allocate(&self) -> u32 {
        self.next_req_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a single-use waiter for `req_id`.
    ///
    /// Fails if the id is still outstanding: the 32-bit counter has wrapped
    /// onto a live request and reusing the slot would misdeliver responses.
    pub fn register(&self, req_id: u32) -> Result<(oneshot::Receiver<Response>, WaiterGuard)> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().expect("pending map lock poisoned");
        if pending.contains_key(&req_id) {
            return Err(RpcError::RequestIdInFlight { req_id });
        }
        pending.insert(req_id, tx);
        Ok((
            rx,
            WaiterGuard {
                pending: Arc::clone(&self.pending),
                req_id,
            },
        ))
    }

    /// Deliver a response to its waiter. Called only from the read loop.
    ///
    /// A response with no matching waiter (late arrival after abandonment,
    /// or a protocol fault from the peer) is dropped, never fatal.
    pub fn resolve(&self, response: Response) {
        let req_id = response.req_id;
        let waiter = self
            .pending
            .lock()
            .expect("pending map lock poisoned")
            .remove(&req_id);
        match waiter {
            Some(tx) => {
                if tx.send(response).is_err() {
                    debug!(req_id, "waiter abandoned before delivery");
                }
            }
            None => warn!(req_id, "response with no matching waiter, dropping"),
        }
    }

    /// Release every outstanding waiter.
    ///
    /// Dropping the senders wakes each waiting task with a closed channel,
    /// which the send path surfaces as a connection-closed error.
    pub fn abort_all(&self) {
        self.pending
            .lock()
            .expect("pending map lock poisoned")
            .clear();
    }

    #[cfg(test)]
    pub fn outstanding(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// Removes the waiter entry when the awaiting scope exits by any path.
pub(crate) struct WaiterGuard {
    pending: Arc<PendingMap>,
    req_id: u32,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.req_id);
        }
    }
}
