use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::lifecycle::ConnectionLifecycle;
use super::messages::{ClientFrame, ServerFrame};

/// Largest inbound frame accepted on the socket
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// How often the server pings
    pub interval: Duration,
    /// Silence after which the client is considered gone
    pub client_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            client_timeout: Duration::from_secs(30),
        }
    }
}

/// WebSocket actor for one client connection.
///
/// Inbound frames drive the lifecycle; outbound events arrive through the
/// connection's channel and are written as text frames.
pub struct WsSession {
    lifecycle: ConnectionLifecycle,
    outbound: Option<UnboundedReceiver<ServerFrame>>,
    heartbeat: HeartbeatConfig,
    hb: Instant,
}

impl WsSession {
    pub fn new(
        lifecycle: ConnectionLifecycle,
        outbound: UnboundedReceiver<ServerFrame>,
        heartbeat: HeartbeatConfig,
    ) -> Self {
        Self {
            lifecycle,
            outbound: Some(outbound),
            heartbeat,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.heartbeat.client_timeout;
        ctx.run_interval(self.heartbeat.interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::warn!(
                    connection_id = %act.lifecycle.connection_id(),
                    "websocket heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send(&self, frame: &ServerFrame, ctx: &mut ws::WebsocketContext<Self>) {
        match frame.to_json() {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!(event = %frame.event, error = %e, "failed to encode frame"),
        }
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let connection_id = self.lifecycle.connection_id();
        match ClientFrame::parse(text) {
            Ok(ClientFrame::RegisterUser(user_id)) => match self.lifecycle.register(user_id.clone()) {
                Ok(_) => {
                    tracing::info!(user_id = %user_id, connection_id = %connection_id, "user registered");
                    self.send(&ServerFrame::registered(&user_id), ctx);
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "register after close ignored");
                }
            },
            Ok(ClientFrame::Ping) => {
                self.hb = Instant::now();
                self.send(&ServerFrame::pong(), ctx);
            }
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "rejected client frame");
                self.send(&ServerFrame::error(e.code(), e.to_string()), ctx);
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let connection_id = self.lifecycle.connection_id();
        tracing::info!(connection_id = %connection_id, "websocket session started");

        if let Some(rx) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }
        self.hb(ctx);
        self.send(&ServerFrame::connected(connection_id), ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        let user_id = self.lifecycle.close();
        tracing::info!(
            connection_id = %self.lifecycle.connection_id(),
            user_id = ?user_id.as_ref().map(|u| u.as_str()),
            "websocket session stopped"
        );
    }
}

// Outbound events from the presence layer
impl StreamHandler<ServerFrame> for WsSession {
    fn handle(&mut self, frame: ServerFrame, ctx: &mut Self::Context) {
        self.send(&frame, ctx);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // Channel closing does not end the socket
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.send(
                    &ServerFrame::error("UNSUPPORTED_FRAME", "binary frames are not supported"),
                    ctx,
                );
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(reason = ?reason, "websocket close frame received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.lifecycle.connection_id(),
                    error = %e,
                    "websocket protocol error"
                );
                ctx.stop();
            }
        }
    }
}
