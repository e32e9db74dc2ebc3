//! WebSocket client for the Godot Editor plugin.
//!
//! Owns the single outbound connection: connect, disconnect, the serialized
//! send/await-reply round trip, and a background receive loop for
//! out-of-band messages. The protocol carries no reply correlation, so at
//! most one command may be in flight per connection; `&mut self` on
//! [`EditorClient::send_command`] enforces that at the type level.

use forge_common::protocol::{Command, Response};
use forge_common::Config;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, sleep, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callback invoked synchronously for every decoded out-of-band message.
/// Handlers must not block the receive loop for long.
pub type MessageHandler = Box<dyn Fn(&Value) + Send>;

/// Handle returned by [`EditorClient::add_message_handler`]; closures have
/// no identity, so removal goes through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

/// Manages the WebSocket connection to the Godot Editor plugin.
pub struct EditorClient {
    config: Config,
    socket: Option<WsStream>,
    connected: bool,
    handlers: Vec<(HandlerId, MessageHandler)>,
    next_handler_id: u64,
}

impl EditorClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            socket: None,
            connected: false,
            handlers: Vec::new(),
            next_handler_id: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Establish the WebSocket connection.
    ///
    /// Failure is logged and swallowed; callers must check the return
    /// value rather than expect an error.
    pub async fn connect(&mut self) -> bool {
        let url = self.config.url();
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                self.socket = Some(socket);
                self.connected = true;
                info!("Connected to Godot Editor at {}", url);
                true
            }
            Err(e) => {
                error!("Failed to connect to Godot Editor: {}", e);
                self.socket = None;
                self.connected = false;
                false
            }
        }
    }

    /// Close the connection. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
        self.connected = false;
        info!("Disconnected from Godot Editor");
    }

    /// Send a command and wait for the next reply.
    ///
    /// Returns `None` when not connected, on any transport error, or when
    /// no reply arrives within the configured response timeout. The reply
    /// is whatever text frame arrives next; the plugin answers commands
    /// strictly in order.
    pub async fn send_command(&mut self, command: &Command) -> Option<Response> {
        if !self.connected {
            error!("Not connected to Godot Editor");
            return None;
        }
        let socket = self.socket.as_mut()?;

        let payload = match command.encode() {
            Ok(wire) => wire.to_string(),
            Err(e) => {
                error!("Refusing to send '{}': {}", command.action, e);
                return None;
            }
        };

        if let Err(e) = socket.send(Message::Text(payload)).await {
            error!("Error sending command: {}", e);
            self.connected = false;
            return None;
        }
        debug!("Sent command: {}", command.action);

        match timeout(self.config.response_timeout(), next_text_frame(socket)).await {
            Ok(Some(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(wire) => {
                    let response = Response::decode(&wire);
                    debug!("Received response: {}", response.status.as_str());
                    Some(response)
                }
                Err(e) => {
                    error!("Invalid JSON response: {}", e);
                    None
                }
            },
            Ok(None) => {
                warn!("Connection to Godot closed");
                self.connected = false;
                None
            }
            Err(_) => {
                error!("Timeout waiting for response");
                None
            }
        }
    }

    /// Continuously receive out-of-band messages and fan them out to the
    /// registered handlers. Also owns the keep-alive ping schedule; the
    /// loop exits when the peer closes, the transport fails, or the editor
    /// stops answering pings.
    pub async fn receive_messages(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        let (mut sink, mut stream) = socket.split();

        let mut ping = interval(Duration::from_secs(self.config.ping_interval_secs));
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let pong_grace = Duration::from_secs(self.config.ping_timeout_secs);
        let mut last_heard = Instant::now();

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    if last_heard.elapsed() >= pong_grace {
                        warn!("Keep-alive timed out, dropping connection");
                        break;
                    }
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        warn!("Keep-alive ping failed");
                        break;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        last_heard = Instant::now();
                        match serde_json::from_str::<Value>(&text) {
                            Ok(message) => {
                                for (_, handler) in &self.handlers {
                                    handler(&message);
                                }
                            }
                            Err(_) => warn!("Invalid JSON received: {}", text),
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_heard = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("Connection to Godot closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Receive error: {}", e);
                        break;
                    }
                }
            }
        }

        self.connected = false;
    }

    pub fn add_message_handler(&mut self, handler: impl Fn(&Value) + Send + 'static) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn remove_message_handler(&mut self, id: HandlerId) {
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
    }

    /// Keep trying to connect until it works. No attempt cap; teardown
    /// happens externally.
    pub async fn reconnect_loop(&mut self) {
        let delay = self.config.reconnect_delay();
        while !self.connected {
            info!("Attempting to reconnect to Godot...");
            if self.connect().await {
                break;
            }
            sleep(delay).await;
        }
    }
}

async fn next_text_frame(socket: &mut WsStream) -> Option<String> {
    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) => return None,
            // ping/pong/binary frames are not replies; keep waiting
            Ok(_) => {}
            Err(e) => {
                error!("Error receiving response: {}", e);
                return None;
            }
        }
    }
    None
}

impl Transport for EditorClient {
    async fn send_command(&mut self, command: &Command) -> Option<Response> {
        EditorClient::send_command(self, command).await
    }
}
