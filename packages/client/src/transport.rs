//! Transport seam between the chat session and the pub/sub library.
//!
//! The session only needs four primitives: connect, subscribe, send and
//! disconnect. Asynchronous notifications come back as [`TransportEvent`]s
//! pulled with [`Connection::next_event`] instead of callbacks.

use async_trait::async_trait;

use crate::error::TransportError;

/// Event delivered by an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A message arrived on a subscribed topic
    Message { destination: String, body: String },
    /// The broker reported an error; the connection is unusable afterwards
    Error(String),
    /// The socket was closed
    Closed,
}

/// Opens connections to the broker.
///
/// One connector is shared for the lifetime of the client; every
/// (re)connect produces a fresh [`Connection`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection and complete the protocol handshake
    async fn connect(&self) -> Result<Box<dyn Connection>, TransportError>;
}

/// An open, handshaken broker connection
#[async_trait]
pub trait Connection: Send {
    /// Subscribe to a topic; returns the subscription id
    async fn subscribe(&mut self, topic: &str) -> Result<String, TransportError>;

    /// Publish a JSON body to a destination
    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError>;

    /// Wait for the next inbound event
    async fn next_event(&mut self) -> TransportEvent;

    /// Close the connection, best effort
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
