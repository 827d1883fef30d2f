//! WebSocket-backed STOMP connector and connection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use url::Url;

use crate::{
    error::TransportError,
    transport::{Connection, Connector, TransportEvent},
};

use super::frame::{Command, Frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(2);
const DISCONNECT_RECEIPT_ID: &str = "disconnect-0";

/// Opens STOMP sessions against a WebSocket endpoint
#[derive(Debug, Clone)]
pub struct StompConnector {
    endpoint: String,
    host: String,
    handshake_timeout: Duration,
    receipt_timeout: Duration,
}

impl StompConnector {
    /// Create a connector for `endpoint` (e.g. `ws://127.0.0.1:8080/chat/websocket`)
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidUrl` if the endpoint is not a URL.
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let url = Url::parse(endpoint).map_err(|source| TransportError::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?;
        let host = url.host_str().unwrap_or("localhost").to_string();

        Ok(Self {
            endpoint: endpoint.to_string(),
            host,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl StompConnector {
    // TCP connect, WebSocket upgrade and STOMP CONNECT/CONNECTED
    async fn handshake(&self) -> Result<StompConnection, TransportError> {
        tracing::debug!("Opening WebSocket to {}", self.endpoint);
        let (mut ws, _response) = connect_async(self.endpoint.as_str()).await?;

        let connect = Frame::new(Command::Connect)
            .header("accept-version", "1.2,1.1")
            .header("host", self.host.as_str())
            .header("heart-beat", "0,0");
        ws.send(Message::Text(connect.encode().into())).await?;

        let reply = read_frame(&mut ws).await?;
        match reply.command {
            Command::Connected => {
                tracing::debug!(
                    "STOMP session established (version {})",
                    reply.get("version").unwrap_or("1.0")
                );
                Ok(StompConnection {
                    ws,
                    next_subscription: 0,
                    receipt_timeout: self.receipt_timeout,
                })
            }
            Command::Error => Err(TransportError::Rejected(error_message(&reply))),
            other => Err(TransportError::MalformedFrame(format!(
                "expected CONNECTED, got {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl Connector for StompConnector {
    /// The whole handshake is bounded by the handshake timeout, so a peer
    /// that accepts TCP but never answers still fails the attempt.
    async fn connect(&self) -> Result<Box<dyn Connection>, TransportError> {
        let connection = tokio::time::timeout(self.handshake_timeout, self.handshake())
            .await
            .map_err(|_| TransportError::Timeout("WebSocket and STOMP handshake"))??;
        Ok(Box::new(connection))
    }
}

/// An established STOMP session
pub struct StompConnection {
    ws: WsStream,
    next_subscription: u32,
    receipt_timeout: Duration,
}

impl StompConnection {
    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.ws.send(Message::Text(frame.encode().into())).await?;
        Ok(())
    }
}

#[async_trait]
impl Connection for StompConnection {
    async fn subscribe(&mut self, topic: &str) -> Result<String, TransportError> {
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;

        let frame = Frame::new(Command::Subscribe)
            .header("id", id.as_str())
            .header("destination", topic)
            .header("ack", "auto");
        self.write(frame).await?;

        tracing::debug!("Subscribed to {} as {}", topic, id);
        Ok(id)
    }

    async fn send(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .body(body);
        self.write(frame).await
    }

    async fn next_event(&mut self) -> TransportEvent {
        loop {
            match read_frame(&mut self.ws).await {
                Ok(frame) => match frame.command {
                    Command::Message => {
                        return TransportEvent::Message {
                            destination: frame.get("destination").unwrap_or_default().to_string(),
                            body: frame.body,
                        };
                    }
                    Command::Error => return TransportEvent::Error(error_message(&frame)),
                    other => tracing::debug!("Ignoring {} frame", other),
                },
                Err(TransportError::Closed) => return TransportEvent::Closed,
                Err(TransportError::MalformedFrame(reason)) => {
                    return TransportEvent::Error(format!("malformed frame: {}", reason));
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return TransportEvent::Closed;
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let frame = Frame::new(Command::Disconnect).header("receipt", DISCONNECT_RECEIPT_ID);
        self.write(frame).await?;

        let receipt_timeout = self.receipt_timeout;
        let ws = &mut self.ws;
        let wait_for_receipt = async move {
            loop {
                match read_frame(ws).await {
                    Ok(frame)
                        if frame.command == Command::Receipt
                            && frame.get("receipt-id") == Some(DISCONNECT_RECEIPT_ID) =>
                    {
                        return;
                    }
                    Ok(_) => continue,
                    Err(_) => return,
                }
            }
        };
        if tokio::time::timeout(receipt_timeout, wait_for_receipt)
            .await
            .is_err()
        {
            tracing::debug!("No DISCONNECT receipt within {:?}", receipt_timeout);
        }

        if let Err(e) = self.ws.close(None).await {
            tracing::debug!("WebSocket close: {}", e);
        }
        Ok(())
    }
}

/// Read the next non-heart-beat frame
async fn read_frame(ws: &mut WsStream) -> Result<Frame, TransportError> {
    while let Some(message) = ws.next().await {
        let text = match message? {
            Message::Text(text) => text.as_str().to_string(),
            Message::Binary(data) => String::from_utf8(data.to_vec())
                .map_err(|e| TransportError::MalformedFrame(e.to_string()))?,
            Message::Close(_) => return Err(TransportError::Closed),
            _ => continue,
        };

        if let Some(frame) = Frame::decode(&text)? {
            return Ok(frame);
        }
    }

    Err(TransportError::Closed)
}

fn error_message(frame: &Frame) -> String {
    frame
        .get("message")
        .map(str::to_string)
        .unwrap_or_else(|| frame.body.trim().to_string())
}
