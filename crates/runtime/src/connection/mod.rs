//! Connection - the server-side router of the dispatch protocol.
//!
//! The connection owns the guid registry and the outbound message queue. It
//! handles:
//! - Routing inbound requests to dispatchers by guid
//! - Validating params against the `(type, method)` scheme
//! - Running the dispatcher's handler and answering `{id, result}` / `{id, error}`
//! - Encoding dispatcher references as `{guid}` tokens
//! - Queueing unsolicited events, `__create__` and `__dispose__`
//!
//! # Message Flow
//!
//! 1. Transport delivers a JSON request `{id, guid, method, params}`
//! 2. [`Connection::dispatch`] looks up the target and validates params
//!    synchronously, in arrival order
//! 3. The handler future is spawned; several may be in flight at once
//! 4. The response is queued when the handler finishes, so responses can
//!    complete out of order and clients match them by id
//! 5. A single writer task drains the queue into the transport (FIFO)

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use pw_dispatch_protocol::{DEBUG_SCOPE_STATE_METHOD, Event, Message, ROOT_GUID, Request, RequestId, Response};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::dispatcher::{Dispatcher, create_root};
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::transport::{Transport, TransportParts};
use crate::validator::{ChannelResolver, Schema};

mod object_store;

pub use object_store::ObjectKey;
pub(crate) use object_store::ObjectStore;

pub struct Connection {
    /// Live dispatchers by guid and by wrapped object
    store: ObjectStore,
    /// Params schemes by `<Type><Method>Params`
    schema: Schema,
    /// Outbound queue drained by the writer task
    outbound_tx: mpsc::UnboundedSender<Value>,
    /// Receiver half of the queue (taken by run() or by tests)
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl Connection {
    /// Creates a connection and its root scope.
    pub fn new(schema: Schema) -> Arc<Self> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            store: ObjectStore::new(),
            schema,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        });
        create_root(&connection);
        connection
    }

    pub(crate) fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Takes the outbound message queue; `None` once taken.
    ///
    /// [`Connection::run`] takes it to feed the transport. Embedders driving
    /// their own transport take it instead of calling `run`.
    pub fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.outbound_rx.lock().take()
    }

    /// The root scope, until [`Connection::close`].
    pub fn root(&self) -> Result<Arc<Dispatcher>> {
        self.store.get(ROOT_GUID).ok_or(Error::TargetClosed)
    }

    /// Live dispatcher registered under `guid`.
    pub fn lookup(&self, guid: &str) -> Option<Arc<Dispatcher>> {
        self.store.get(guid)
    }

    pub fn is_registered(&self, guid: &str) -> bool {
        self.store.contains(guid)
    }

    /// Number of live dispatchers, root included.
    pub fn dispatcher_count(&self) -> usize {
        self.store.len()
    }

    /// Dispatcher currently wrapping `object`, if any.
    pub fn existing_dispatcher<T: ?Sized>(&self, object: &Arc<T>) -> Option<Arc<Dispatcher>> {
        self.store.dispatcher_for(ObjectKey::of(object))
    }

    /// Dispatcher wrapping `object`; a missing one is [`Error::NoDispatcher`].
    pub fn lookup_dispatcher<T: ?Sized>(&self, object: &Arc<T>) -> Result<Arc<Dispatcher>> {
        self.existing_dispatcher(object).ok_or(Error::NoDispatcher)
    }

    pub fn lookup_nullable_dispatcher<T: ?Sized>(
        &self,
        object: Option<&Arc<T>>,
    ) -> Result<Option<Arc<Dispatcher>>> {
        object.map(|o| self.lookup_dispatcher(o)).transpose()
    }

    /// Encodes `params` and queues `{guid, method, params}` for the client.
    ///
    /// With `disallow_node_refs` any embedded dispatcher fails with
    /// [`Error::NodeRefNotAllowed`].
    pub fn send_message_to_client(
        &self,
        guid: &str,
        method: &str,
        params: &Payload,
        disallow_node_refs: bool,
    ) -> Result<()> {
        let params = params.encode(!disallow_node_refs)?;
        self.send_event(guid, method, params)
    }

    /// Queues an already-encoded event.
    pub(crate) fn send_event(&self, guid: &str, method: &str, params: Value) -> Result<()> {
        let event = Message::Event(Event {
            guid: Arc::from(guid),
            method: method.to_string(),
            params,
        });
        self.post(serde_json::to_value(event)?)
    }

    fn post(&self, message: Value) -> Result<()> {
        self.outbound_tx
            .send(message)
            .map_err(|_| Error::ChannelClosed)
    }

    fn respond(&self, response: Response) {
        let id = response.id;
        let sent = serde_json::to_value(Message::Response(response))
            .map_err(Error::from)
            .and_then(|value| self.post(value));
        match sent {
            Ok(()) => {}
            Err(Error::ChannelClosed) => tracing::debug!(id, "response dropped, transport closed"),
            Err(e) => tracing::error!(id, "Failed to queue response: {}", e),
        }
    }

    fn respond_error(&self, id: RequestId, error: &Error) {
        tracing::debug!(id, "request failed: {}", error);
        self.respond(Response::failure(id, error.to_payload()));
    }

    /// Tree dump rooted at the root scope; `null` after close.
    pub fn debug_scope_state(&self) -> Value {
        self.root()
            .map(|root| root.debug_state())
            .unwrap_or(Value::Null)
    }

    /// Routes one request.
    ///
    /// Lookup, `debugScopeState` and validation run before this returns; the
    /// returned future runs the handler and queues the response. Errors are
    /// always answered as `{id, error}` and never escape.
    pub fn dispatch(self: &Arc<Self>, request: Request) -> BoxFuture<'static, ()> {
        let Request {
            id,
            guid,
            method,
            params,
            ..
        } = request;
        tracing::debug!(id, guid = %guid, method = %method, "dispatching request");

        let Some(target) = self.store.get(&guid) else {
            self.respond_error(id, &Error::TargetClosed);
            return future::ready(()).boxed();
        };

        if method == DEBUG_SCOPE_STATE_METHOD {
            self.respond(Response::success(id, Some(self.debug_scope_state())));
            return future::ready(()).boxed();
        }

        let resolver: &Connection = self;
        let call = self
            .schema
            .validate_params(target.type_name(), &method, &params, resolver)
            .map_err(Error::from)
            .and_then(|validated| target.invoke(&method, validated));
        let call = match call {
            Ok(call) => call,
            Err(e) => {
                self.respond_error(id, &e);
                return future::ready(()).boxed();
            }
        };

        let connection = Arc::clone(self);
        async move {
            let outcome = call.await.and_then(|result| encode_result(&result));
            match outcome {
                Ok(result) => connection.respond(Response::success(id, result)),
                Err(e) => connection.respond_error(id, &e),
            }
        }
        .boxed()
    }

    /// Parses a raw inbound message and routes it.
    ///
    /// Malformed messages are logged; if they carry a numeric `id` the
    /// client also gets an error response.
    pub fn handle_message(self: &Arc<Self>, message: Value) -> Option<BoxFuture<'static, ()>> {
        let id = message
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|id| RequestId::try_from(id).ok());
        match serde_json::from_value::<Request>(message) {
            Ok(request) => Some(self.dispatch(request)),
            Err(e) => {
                tracing::error!("Failed to parse request: {}", e);
                if let Some(id) = id {
                    self.respond_error(id, &Error::ProtocolError(e.to_string()));
                }
                None
            }
        }
    }

    /// Pumps messages between the transport and the router until the
    /// transport closes.
    pub async fn run(self: &Arc<Self>, parts: TransportParts) {
        let TransportParts {
            sender,
            receiver,
            mut message_rx,
        } = parts;

        let Some(outbound_rx) = self.take_outbound() else {
            tracing::error!("run() can only be called once - outbound receiver already taken");
            return;
        };

        let reader_handle = tokio::spawn(async move {
            if let Err(e) = receiver.run().await {
                tracing::error!("Transport read error: {}", e);
            }
        });

        let (stop_tx, stop_rx) = oneshot::channel();
        let writer_handle = tokio::spawn(write_outbound(sender, outbound_rx, stop_rx));

        while let Some(message) = message_rx.recv().await {
            if let Some(call) = self.handle_message(message) {
                tokio::spawn(call);
            }
        }

        let _ = reader_handle.await;
        // Responses already queued still reach the client.
        let _ = stop_tx.send(());
        let _ = writer_handle.await;
        tracing::debug!("transport closed");
    }

    /// Drops every dispatcher without announcing anything.
    ///
    /// Used once the transport is gone; later requests see a closed target.
    pub fn close(&self) {
        let dropped = self.store.clear();
        tracing::debug!(dropped, "connection closed");
    }
}

impl ChannelResolver for Connection {
    fn resolve(&self, guid: &str) -> Option<Arc<Dispatcher>> {
        self.store.get(guid)
    }
}

/// Writes queued messages in order until the queue or the transport closes.
///
/// Once `stop_rx` fires the queue stops accepting messages and whatever is
/// already in it is flushed before returning.
async fn write_outbound(
    mut sender: Box<dyn Transport>,
    mut outbound_rx: mpsc::UnboundedReceiver<Value>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        let message = tokio::select! {
            biased;
            message = outbound_rx.recv() => message,
            _ = &mut stop_rx => break,
        };
        let Some(message) = message else {
            return;
        };
        if let Err(e) = sender.send(message).await {
            tracing::error!("Transport write error: {}", e);
            return;
        }
    }

    outbound_rx.close();
    while let Some(message) = outbound_rx.recv().await {
        if let Err(e) = sender.send(message).await {
            tracing::error!("Transport write error: {}", e);
            return;
        }
    }
}

/// `Null` results are omitted from the response.
fn encode_result(result: &Payload) -> Result<Option<Value>> {
    if result.is_null() {
        Ok(None)
    } else {
        result.encode(true).map(Some)
    }
}
