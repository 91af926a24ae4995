//! Capability contract for real-time message transports.
//!
//! A transport opens a connection, sends messages over it and tells its
//! observers when the connection opens, closes, reconnects or delivers a
//! message. This module defines the call surface and the observer slots;
//! concrete transports (socket based, polling based, ...) implement
//! [`Transport`] and fire the callbacks from their own event loop.
//! Reconnection policy, framing and threading are theirs to define.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Observer for open, close and reconnect events.
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Observer for inbound messages.
pub type MessageCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Completion handler for a single `send`, invoked with the server's reply.
pub type InvocationCallback = Box<dyn FnOnce(&Value) + Send>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The operation has no implementation on this transport.
    #[error("{0} is not implemented by this transport")]
    NotImplemented(&'static str),
}

fn on_open_not_defined() {
    tracing::info!("on_connect not defined");
}

fn on_close_not_defined() {
    tracing::info!("on_disconnect not defined");
}

fn on_reconnect_not_defined() {
    tracing::info!("on_reconnect not defined");
}

/// The observers a transport notifies.
///
/// Open, close and reconnect always hold a callback; unless one is supplied
/// they log that the event went unhandled. The message observer is optional
/// and has no default.
#[derive(Clone)]
pub struct TransportCallbacks {
    on_open: LifecycleCallback,
    on_close: LifecycleCallback,
    on_reconnect: LifecycleCallback,
    on_message: Option<MessageCallback>,
}

impl Default for TransportCallbacks {
    fn default() -> Self {
        Self {
            on_open: Arc::new(on_open_not_defined),
            on_close: Arc::new(on_close_not_defined),
            on_reconnect: Arc::new(on_reconnect_not_defined),
            on_message: None,
        }
    }
}

impl fmt::Debug for TransportCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportCallbacks")
            .field("on_message", &self.on_message.is_some())
            .finish_non_exhaustive()
    }
}

impl TransportCallbacks {
    /// Callbacks from optional observers; any `None` keeps its default.
    pub fn new(
        on_message: Option<MessageCallback>,
        on_close: Option<LifecycleCallback>,
        on_open: Option<LifecycleCallback>,
    ) -> Self {
        let mut callbacks = Self::default();
        callbacks.on_message = on_message;
        if let Some(cb) = on_close {
            callbacks.on_close = cb;
        }
        if let Some(cb) = on_open {
            callbacks.on_open = cb;
        }
        callbacks
    }

    /// Replaces the open observer.
    ///
    /// # Arguments
    /// * `callback`: Invoked on every subsequent `fire_open`
    pub fn set_on_open(&mut self, callback: LifecycleCallback) {
        self.on_open = callback;
    }

    /// Replaces the close observer.
    ///
    /// # Arguments
    /// * `callback`: Invoked on every subsequent `fire_close`
    pub fn set_on_close(&mut self, callback: LifecycleCallback) {
        self.on_close = callback;
    }

    /// Replaces the reconnect observer.
    ///
    /// # Arguments
    /// * `callback`: Invoked on every subsequent `fire_reconnect`
    pub fn set_on_reconnect(&mut self, callback: LifecycleCallback) {
        self.on_reconnect = callback;
    }

    /// Registers the message observer, replacing any previous one.
    ///
    /// # Arguments
    /// * `callback`: Receives each message passed to `dispatch_message`
    pub fn set_on_message(&mut self, callback: MessageCallback) {
        self.on_message = Some(callback);
    }

    /// Notifies the open observer that the connection is up.
    pub fn fire_open(&self) {
        (self.on_open)();
    }

    /// Notifies the close observer that the connection went away.
    pub fn fire_close(&self) {
        (self.on_close)();
    }

    /// Notifies the reconnect observer that the connection was re-established.
    pub fn fire_reconnect(&self) {
        (self.on_reconnect)();
    }

    /// Hands a message to the message observer. Returns `false` when none is
    /// registered.
    pub fn dispatch_message(&self, message: &Value) -> bool {
        match &self.on_message {
            Some(cb) => {
                cb(message);
                true
            }
            None => false,
        }
    }
}

/// What every real-time transport provides.
///
/// Implementors supply the callback storage; registration is provided.
/// The lifecycle methods fail with [`TransportError::NotImplemented`] until
/// a transport overrides them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The observers this transport notifies.
    fn callbacks(&self) -> &TransportCallbacks;

    fn callbacks_mut(&mut self) -> &mut TransportCallbacks;

    /// Replaces the open observer; the next open event reaches `callback`.
    fn on_open_callback(&mut self, callback: LifecycleCallback) {
        self.callbacks_mut().set_on_open(callback);
    }

    /// Replaces the close observer; the next close event reaches `callback`.
    fn on_close_callback(&mut self, callback: LifecycleCallback) {
        self.callbacks_mut().set_on_close(callback);
    }

    /// Replaces the reconnect observer.
    fn on_reconnect_callback(&mut self, callback: LifecycleCallback) {
        self.callbacks_mut().set_on_reconnect(callback);
    }

    /// Registers the message observer.
    fn on_message_callback(&mut self, callback: MessageCallback) {
        self.callbacks_mut().set_on_message(callback);
    }

    /// Opens the connection, passing `connection_data` to the server if given.
    async fn start(&mut self, _connection_data: Option<&str>) -> Result<(), TransportError> {
        Err(TransportError::NotImplemented("start"))
    }

    /// Closes the connection.
    async fn stop(&mut self) -> Result<(), TransportError> {
        Err(TransportError::NotImplemented("stop"))
    }

    /// Whether the connection is currently open.
    fn is_running(&self) -> Result<bool, TransportError> {
        Err(TransportError::NotImplemented("is_running"))
    }

    /// Sends `message`; `on_invocation` receives the reply to this message.
    async fn send(
        &self,
        _message: Value,
        _on_invocation: Option<InvocationCallback>,
    ) -> Result<(), TransportError> {
        Err(TransportError::NotImplemented("send"))
    }
}

/// A transport with callback storage and nothing else. Every lifecycle call
/// reports `NotImplemented`.
#[derive(Debug, Default)]
pub struct BaseTransport {
    callbacks: TransportCallbacks,
}

impl BaseTransport {
    /// Creates a transport holding the given observers.
    ///
    /// # Arguments
    /// * `on_message`: Message observer, none if `None`
    /// * `on_close`: Close observer, the logging default if `None`
    /// * `on_open`: Open observer, the logging default if `None`
    ///
    /// # Returns
    /// A `BaseTransport` whose reconnect observer is the logging default
    pub fn new(
        on_message: Option<MessageCallback>,
        on_close: Option<LifecycleCallback>,
        on_open: Option<LifecycleCallback>,
    ) -> Self {
        Self {
            callbacks: TransportCallbacks::new(on_message, on_close, on_open),
        }
    }
}

impl Transport for BaseTransport {
    fn callbacks(&self) -> &TransportCallbacks {
        &self.callbacks
    }

    fn callbacks_mut(&mut self) -> &mut TransportCallbacks {
        &mut self.callbacks
    }
}
