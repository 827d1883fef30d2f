//! UI utilities for the client.

use std::io::Write;

use crate::{formatter::RenderedMessage, session::ConnectionState};

/// Connection status indicator, room label and send affordance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub state: ConnectionState,
    pub label: &'static str,
    /// `Room: <id>` while connected, empty otherwise
    pub room_label: String,
    pub send_enabled: bool,
}

impl StatusIndicator {
    pub fn connecting() -> Self {
        Self::without_room(ConnectionState::Connecting, "connecting...")
    }

    pub fn connected(room_id: &str) -> Self {
        Self {
            state: ConnectionState::Connected,
            label: "connected",
            room_label: if room_id.is_empty() {
                String::new()
            } else {
                format!("Room: {}", room_id)
            },
            send_enabled: true,
        }
    }

    /// A connect attempt failed
    pub fn failed() -> Self {
        Self::without_room(ConnectionState::Disconnected, "connection failed")
    }

    /// An established connection dropped
    pub fn lost() -> Self {
        Self::without_room(ConnectionState::Disconnected, "connection lost")
    }

    /// The user left
    pub fn disconnected() -> Self {
        Self::without_room(ConnectionState::Disconnected, "disconnected")
    }

    fn without_room(state: ConnectionState, label: &'static str) -> Self {
        Self {
            state,
            label,
            room_label: String::new(),
            send_enabled: false,
        }
    }

    /// One-line rendering, e.g. `* connected | Room: room1`
    pub fn to_line(&self) -> String {
        let dot = if self.state == ConnectionState::Connected {
            '*'
        } else {
            'o'
        };
        if self.room_label.is_empty() {
            format!("{} {}", dot, self.label)
        } else {
            format!("{} {} | {}", dot, self.label, self.room_label)
        }
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::without_room(ConnectionState::Disconnected, "not connected")
    }
}

/// Rendered messages inside the viewport, pinned to the newest one.
///
/// Messages that scroll out of the viewport are dropped, so the list never
/// holds more than `viewport` entries.
#[derive(Debug, Clone)]
pub struct MessageList {
    items: Vec<RenderedMessage>,
    viewport: usize,
    total: usize,
}

impl MessageList {
    /// `viewport` is how many messages fit on screen (at least one)
    pub fn new(viewport: usize) -> Self {
        let viewport = viewport.max(1);
        Self {
            items: Vec::with_capacity(viewport),
            viewport,
            total: 0,
        }
    }

    /// Append a message, dropping the oldest one once the viewport is full
    pub fn push(&mut self, message: RenderedMessage) -> &RenderedMessage {
        if self.items.len() == self.viewport {
            self.items.remove(0);
        }
        self.items.push(message);
        self.total += 1;
        &self.items[self.items.len() - 1]
    }

    /// Messages currently inside the viewport, oldest first
    pub fn visible(&self) -> &[RenderedMessage] {
        &self.items
    }

    /// Messages pushed since the list was created
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Prompt shown in front of the input line
pub fn prompt(username: &str) -> String {
    format!("{}> ", username)
}

/// Redisplay the prompt after output
pub fn redisplay_prompt(out: &mut dyn Write, username: &str) -> std::io::Result<()> {
    write!(out, "{}", prompt(username))?;
    out.flush()
}
