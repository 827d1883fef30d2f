//! Error types for the DentalChat client.

use thiserror::Error;

/// Input rejected before any connection is attempted.
///
/// The `Display` text is the prompt shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Username or room id is empty
    #[error("Please enter both your name and the room ID.")]
    MissingField,

    /// Username is shorter than the minimum length
    #[error("Your name must be at least {min} characters.")]
    UsernameTooShort { min: usize },
}

/// Errors raised by the STOMP/WebSocket transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket could not be opened or broke mid-session
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The endpoint URL could not be parsed
    #[error("Invalid endpoint URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The broker answered the handshake with an ERROR frame
    #[error("Broker rejected the connection: {0}")]
    Rejected(String),

    /// A frame could not be decoded
    #[error("Malformed STOMP frame: {0}")]
    MalformedFrame(String),

    /// The handshake or a receipt did not arrive in time
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// The socket was closed by the peer
    #[error("Connection closed")]
    Closed,
}

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Join input did not pass validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    /// An operation needs a session but none has been joined
    #[error("No active session; join a room first")]
    NoSession,

    /// Outbound content exceeds what the server accepts
    #[error("Message is too long ({len} characters, max {max})")]
    ContentTooLong { len: usize, max: usize },

    /// An inbound payload could not be parsed as an envelope
    #[error("Malformed message from server: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// An outbound envelope could not be serialized
    #[error("Failed to serialize message: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Reconnection was abandoned under the configured retry cap
    #[error("Gave up after {attempts} failed connection attempts")]
    RetriesExhausted { attempts: u32 },

    /// Reading user input failed
    #[error("Input error: {0}")]
    Input(String),

    /// Writing rendered output failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Host identity file could not be read or parsed
    #[error("Failed to load authenticated user: {0}")]
    Identity(String),
}
