//! STOMP over WebSocket implementation of the transport seam.

mod connection;
pub mod frame;

pub use connection::{StompConnection, StompConnector};
pub use frame::{Command, Frame};
