//! Message rendering for client display.
//!
//! Sender and content are untrusted. HTML output escapes them; terminal
//! output strips control characters so they cannot carry escape sequences.

use std::sync::Arc;

use chrono::FixedOffset;

use dentalchat_shared::time::{Clock, SystemClock, timestamp_to_time_of_day};

use crate::envelope::{Envelope, MessageType, Role};

/// Escape text for insertion into HTML element content or attributes.
///
/// The result contains no raw `<`, `>` or `"`, and every `&` begins an entity.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

/// Drop control characters other than newline and tab.
pub fn sanitize_terminal(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// A message ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedMessage {
    /// Centered system notice (room joins)
    SystemNotice { content: String },
    /// Chat bubble
    Bubble {
        sender: String,
        role: Role,
        /// Sent by the local user
        own: bool,
        /// Upper-cased first character of the sender
        avatar: String,
        /// `HH:MM`
        time: String,
        content: String,
    },
}

impl RenderedMessage {
    /// HTML fragment matching the chat widget's message list markup
    pub fn to_html(&self) -> String {
        match self {
            RenderedMessage::SystemNotice { content } => format!(
                "<div class=\"system-message\"><div class=\"message-bubble\">{}</div></div>",
                escape_html(content)
            ),
            RenderedMessage::Bubble {
                sender,
                role,
                own,
                avatar,
                time,
                content,
            } => format!(
                "<div class=\"message{}\">\
                 <div class=\"message-avatar {}\">{}</div>\
                 <div class=\"message-content\">\
                 <div class=\"message-bubble\">{}</div>\
                 <div class=\"message-info\">\
                 <span class=\"message-sender\">{}</span>\
                 <span class=\"message-time\">{}</span>\
                 </div></div></div>",
                if *own { " own" } else { "" },
                role.class_name(),
                escape_html(avatar),
                escape_html(content),
                escape_html(sender),
                escape_html(time),
            ),
        }
    }

    /// Plain text block for the terminal
    pub fn to_terminal(&self) -> String {
        match self {
            RenderedMessage::SystemNotice { content } => {
                format!("\n-- {} --\n", sanitize_terminal(content))
            }
            RenderedMessage::Bubble {
                sender,
                role,
                own,
                avatar,
                time,
                content,
            } => {
                let me_suffix = if *own { " (me)" } else { "" };
                let body = sanitize_terminal(content)
                    .lines()
                    .map(|line| format!("    {}", line))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "\n[{}] @{}{} <{}> {}\n{}\n",
                    sanitize_terminal(avatar),
                    sanitize_terminal(sender),
                    me_suffix,
                    role.class_name(),
                    time,
                    body
                )
            }
        }
    }
}

/// Turns envelopes into [`RenderedMessage`]s for one local user
pub struct MessageRenderer {
    current_username: String,
    utc_offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl MessageRenderer {
    pub fn new(current_username: impl Into<String>, utc_offset: FixedOffset) -> Self {
        Self::with_clock(current_username, utc_offset, Arc::new(SystemClock))
    }

    /// Renderer with an injected clock, used when an envelope has no timestamp
    pub fn with_clock(
        current_username: impl Into<String>,
        utc_offset: FixedOffset,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            current_username: current_username.into(),
            utc_offset,
            clock,
        }
    }

    pub fn render(&self, envelope: &Envelope) -> RenderedMessage {
        match envelope.r#type {
            MessageType::Join => RenderedMessage::SystemNotice {
                content: envelope.content.clone(),
            },
            MessageType::Chat | MessageType::Leave | MessageType::Other => {
                let millis = envelope
                    .timestamp
                    .as_ref()
                    .and_then(|ts| ts.to_millis(self.utc_offset))
                    .unwrap_or_else(|| self.clock.now_millis());

                RenderedMessage::Bubble {
                    sender: envelope.sender.clone(),
                    role: envelope.sender_role,
                    own: envelope.sender == self.current_username,
                    avatar: avatar_glyph(&envelope.sender),
                    time: timestamp_to_time_of_day(millis, self.utc_offset),
                    content: envelope.content.clone(),
                }
            }
        }
    }
}

fn avatar_glyph(sender: &str) -> String {
    match sender.chars().next() {
        Some(first) => first.to_uppercase().collect(),
        None => "?".to_string(),
    }
}
