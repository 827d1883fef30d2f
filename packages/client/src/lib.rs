//! Terminal chat client for DentalChat consultation rooms.
//!
//! Joins a room over STOMP/WebSocket, publishes the user's messages and
//! renders everything broadcast to the room.

pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
pub mod setup;
pub mod stomp;
pub mod transport;
pub mod ui;

pub use runner::run_client;
