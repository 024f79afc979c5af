//! Live alert push stream over `/ws/alerts`.
//!
//! The server pushes one JSON alert per text frame. On open the client
//! sends the literal frame `subscribed`. The connection is best-effort:
//! once it ends, [`PushStream::next_alert`] returns `None` and nothing
//! reconnects.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use safelink_core::Alert;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::ApiError;

const SUBSCRIBE_FRAME: &str = "subscribed";

pub struct PushStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
    /// Set once the server closed the connection or the stream ended.
    closed: bool,
}

impl PushStream {
    /// Open the push connection and send the subscribe frame.
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        info!(url = %url, "connecting to alert push stream");
        let (mut socket, _response) = tokio_tungstenite::connect_async(url).await?;
        socket.send(Message::Text(SUBSCRIBE_FRAME.into())).await?;
        Ok(Self {
            socket,
            url: url.to_string(),
            closed: false,
        })
    }

    /// [`connect`](Self::connect), giving up after `timeout`.
    pub async fn connect_within(url: &str, timeout: Duration) -> Result<Self, ApiError> {
        match tokio::time::timeout(timeout, Self::connect(url)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::ConnectTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next pushed alert, in arrival order.
    ///
    /// `Some(Err(MalformedPush))` means one bad frame; the stream is still
    /// usable. `None` means the connection is gone.
    pub async fn next_alert(&mut self) -> Option<Result<Alert, ApiError>> {
        if self.closed {
            return None;
        }
        loop {
            let message = match self.socket.next().await {
                None => {
                    self.closed = true;
                    return None;
                }
                Some(Ok(message)) => message,
                Some(Err(e)) if is_closed_error(&e) => {
                    debug!(url = %self.url, error = %e, "alert push stream already closed");
                    self.closed = true;
                    return None;
                }
                Some(Err(e)) => {
                    warn!(url = %self.url, error = %e, "alert push stream failed");
                    return Some(Err(e.into()));
                }
            };
            match message {
                Message::Text(text) => return Some(parse_push(&text)),
                Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => return Some(parse_push(text)),
                    Err(_) => {
                        return Some(Err(ApiError::MalformedPush {
                            reason: "binary frame is not UTF-8".into(),
                            payload: String::new(),
                        }));
                    }
                },
                Message::Close(frame) => {
                    info!(url = %self.url, ?frame, "alert push stream closed by server");
                    self.closed = true;
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    /// Close the connection. A socket the server already closed is left
    /// alone, and errors reporting it as closed are ignored.
    pub async fn close(mut self) -> Result<(), ApiError> {
        if self.closed {
            debug!(url = %self.url, "alert push stream already closed");
            return Ok(());
        }
        debug!(url = %self.url, "closing alert push stream");
        match self.socket.close(None).await {
            Ok(()) => Ok(()),
            Err(e) if is_closed_error(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_closed_error(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::SendAfterClosing)
    )
}

/// Parse one push payload into an alert.
pub fn parse_push(payload: &str) -> Result<Alert, ApiError> {
    serde_json::from_str(payload).map_err(|e| ApiError::MalformedPush {
        reason: e.to_string(),
        payload: payload.to_string(),
    })
}
