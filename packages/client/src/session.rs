//! Chat session management: join, send, receive, leave.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    config::Destinations,
    domain::{MAX_CONTENT_LENGTH, validate},
    envelope::{Envelope, Role},
    error::ClientError,
    transport::{Connection, Connector, TransportEvent},
    ui::StatusIndicator,
};

/// Connection lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Who is chatting, and where.
///
/// Created by [`ChatClient::join`], destroyed by [`ChatClient::leave`]. The
/// room never changes for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub room_id: String,
}

/// The chat client: owns the session and at most one connection.
pub struct ChatClient {
    connector: Arc<dyn Connector>,
    destinations: Destinations,
    session: Option<Session>,
    connection: Option<Box<dyn Connection>>,
    status: watch::Sender<StatusIndicator>,
}

impl ChatClient {
    pub fn new(connector: Arc<dyn Connector>, destinations: Destinations) -> Self {
        let (status, _) = watch::channel(StatusIndicator::default());
        Self {
            connector,
            destinations,
            session: None,
            connection: None,
            status,
        }
    }

    /// Observe status changes
    pub fn subscribe_status(&self) -> watch::Receiver<StatusIndicator> {
        self.status.subscribe()
    }

    pub fn status(&self) -> StatusIndicator {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Validate input, create the session and connect.
    ///
    /// Joining while a session is active leaves it first, so the room of a
    /// live connection never changes.
    ///
    /// # Errors
    ///
    /// * `ClientError::Validation` - input rejected; nothing was changed
    /// * `ClientError::Connection` - session created but the connection failed;
    ///   call [`ChatClient::connect`] to retry
    pub async fn join(
        &mut self,
        username: &str,
        role: Role,
        room_id: &str,
    ) -> Result<(), ClientError> {
        validate(username, room_id)?;

        if self.session.is_some() {
            self.leave().await;
        }

        let session = Session {
            username: username.trim().to_string(),
            role,
            room_id: room_id.trim().to_string(),
        };
        tracing::info!(
            "Joining room '{}' as '{}' ({:?})",
            session.room_id,
            session.username,
            session.role
        );
        self.session = Some(session);

        self.connect().await
    }

    /// (Re)connect the current session: open, subscribe, announce.
    ///
    /// Any previous connection is torn down first.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let session = self.session.clone().ok_or(ClientError::NoSession)?;

        if let Some(mut previous) = self.connection.take() {
            if let Err(e) = previous.disconnect().await {
                tracing::debug!("Closing previous connection: {}", e);
            }
        }

        self.status.send_replace(StatusIndicator::connecting());

        match open(self.connector.as_ref(), &self.destinations, &session).await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.status
                    .send_replace(StatusIndicator::connected(&session.room_id));
                tracing::info!("Connected to room '{}'", session.room_id);
                Ok(())
            }
            Err(e) => {
                self.status.send_replace(StatusIndicator::failed());
                tracing::warn!("Connection attempt failed: {}", e);
                Err(e)
            }
        }
    }

    /// Publish a chat message.
    ///
    /// Returns `Ok(true)` when an envelope was published and the input can be
    /// cleared. Blank content, or no active connection, is a silent no-op
    /// returning `Ok(false)`.
    pub async fn send(&mut self, content: &str) -> Result<bool, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(false);
        }

        let len = content.chars().count();
        if len > MAX_CONTENT_LENGTH {
            return Err(ClientError::ContentTooLong {
                len,
                max: MAX_CONTENT_LENGTH,
            });
        }

        let (Some(session), Some(connection)) = (self.session.as_ref(), self.connection.as_mut())
        else {
            tracing::debug!("Not connected; dropping outbound message");
            return Ok(false);
        };

        let body = Envelope::chat(&session.username, session.role, &session.room_id, content)
            .to_json()?;
        let result = connection
            .send(&self.destinations.send(&session.room_id), &body)
            .await;

        if let Err(e) = result {
            self.connection_lost();
            return Err(e.into());
        }
        Ok(true)
    }

    /// Wait for the next envelope on the room topic.
    ///
    /// Returns `Ok(None)` once the connection is gone (closed by the peer,
    /// broker error, or never opened); the state is then `Disconnected`.
    ///
    /// # Errors
    ///
    /// `ClientError::MalformedEnvelope` if a message body is not a valid
    /// envelope. This is not recoverable.
    pub async fn next_envelope(&mut self) -> Result<Option<Envelope>, ClientError> {
        let event = match self.connection.as_mut() {
            Some(connection) => connection.next_event().await,
            None => return Ok(None),
        };

        match event {
            TransportEvent::Message { destination, body } => {
                tracing::trace!("Message on {}: {}", destination, body);
                Envelope::from_json(&body).map(Some)
            }
            TransportEvent::Error(message) => {
                tracing::warn!("Broker error: {}", message);
                self.connection_lost();
                Ok(None)
            }
            TransportEvent::Closed => {
                tracing::warn!("Server closed the connection");
                self.connection_lost();
                Ok(None)
            }
        }
    }

    /// Close the connection and end the session. Idempotent.
    pub async fn leave(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.disconnect().await {
                tracing::debug!("Disconnect failed: {}", e);
            }
            self.status.send_replace(StatusIndicator::disconnected());
        }

        if let Some(session) = self.session.take() {
            tracing::info!("Left room '{}'", session.room_id);
        }
    }

    fn connection_lost(&mut self) {
        self.connection = None;
        self.status.send_replace(StatusIndicator::lost());
    }
}

// Connect, subscribe to the room topic and announce the join.
async fn open(
    connector: &dyn Connector,
    destinations: &Destinations,
    session: &Session,
) -> Result<Box<dyn Connection>, ClientError> {
    let mut connection = connector.connect().await?;

    connection
        .subscribe(&destinations.topic(&session.room_id))
        .await?;

    let join = Envelope::join(&session.username, session.role, &session.room_id).to_json()?;
    connection
        .send(&destinations.join(&session.room_id), &join)
        .await?;

    Ok(connection)
}
