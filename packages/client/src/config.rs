//! Client configuration: endpoint, destinations, retry policy, display.

use std::path::Path;

use chrono::FixedOffset;
use serde::Deserialize;

use dentalchat_shared::time::{DEFAULT_UTC_OFFSET_HOURS, offset_from_hours};

use crate::{domain::RetryPolicy, envelope::Role, error::ClientError};

/// Default raw-WebSocket transport of the server's `/chat` endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8080/chat/websocket";

/// Environment variable holding the host-supplied identity JSON
pub const AUTH_USER_ENV: &str = "DENTALCHAT_AUTH_USER";

/// STOMP destinations, each parameterized by room id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destinations {
    pub join_prefix: String,
    pub send_prefix: String,
    pub topic_prefix: String,
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            join_prefix: "/app/chat.joinRoom/".to_string(),
            send_prefix: "/app/chat.sendMessage/".to_string(),
            topic_prefix: "/topic/room/".to_string(),
        }
    }
}

impl Destinations {
    pub fn join(&self, room_id: &str) -> String {
        format!("{}{}", self.join_prefix, room_id)
    }

    pub fn send(&self, room_id: &str) -> String {
        format!("{}{}", self.send_prefix, room_id)
    }

    pub fn topic(&self, room_id: &str) -> String {
        format!("{}{}", self.topic_prefix, room_id)
    }
}

/// How rendered messages are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain terminal text
    #[default]
    Terminal,
    /// HTML fragments, one per message
    Html,
}

/// Complete client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub destinations: Destinations,
    pub retry: RetryPolicy,
    pub utc_offset: FixedOffset,
    pub output: OutputFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            destinations: Destinations::default(),
            retry: RetryPolicy::default(),
            utc_offset: offset_from_hours(DEFAULT_UTC_OFFSET_HOURS),
            output: OutputFormat::default(),
        }
    }
}

/// Pre-authenticated identity supplied by the host (`{"username": .., "isAdmin": ..}`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Customer
        }
    }

    /// Parse the identity JSON. A blank username counts as absent.
    pub fn from_json(text: &str) -> Result<Option<Self>, ClientError> {
        let user: Self =
            serde_json::from_str(text).map_err(|e| ClientError::Identity(e.to_string()))?;
        if user.username.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Load from a file, if given, else from `DENTALCHAT_AUTH_USER`.
    pub fn load(path: Option<&Path>) -> Result<Option<Self>, ClientError> {
        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ClientError::Identity(format!("{}: {}", path.display(), e)))?;
            return Self::from_json(&text);
        }

        match std::env::var(AUTH_USER_ENV) {
            Ok(text) if !text.trim().is_empty() => Self::from_json(&text),
            _ => Ok(None),
        }
    }
}

/// Username and role for the setup form, after applying the host identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: Option<String>,
    pub role: Role,
    /// Both fields were supplied by the host and may not be edited
    pub locked: bool,
}

impl Identity {
    /// Pre-fill and lock from the host identity when present.
    pub fn resolve(
        authenticated: Option<AuthenticatedUser>,
        username: Option<String>,
        role: Option<Role>,
    ) -> Self {
        match authenticated {
            Some(user) => {
                let host_role = user.role();
                if username.as_deref().is_some_and(|name| name != user.username) {
                    tracing::warn!(
                        "Ignoring --username; signed in as '{}'",
                        user.username
                    );
                }
                if role.is_some_and(|r| r != host_role) {
                    tracing::warn!("Ignoring --role; role is fixed by the signed-in account");
                }
                Self {
                    username: Some(user.username),
                    role: host_role,
                    locked: true,
                }
            }
            None => Self {
                username,
                role: role.unwrap_or(Role::Customer),
                locked: false,
            },
        }
    }
}
