use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use crate::presence::ConnectionHandle;
use crate::state::AppState;
use crate::websocket::{ConnectionLifecycle, WsSession, MAX_FRAME_SIZE};

/// Endpoint: GET /ws
///
/// Upgrades to a WebSocket. The connection is anonymous until the client
/// sends `register-user`.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (handle, outbound) = ConnectionHandle::channel();
    let lifecycle = ConnectionLifecycle::open(handle, state.registry.clone());
    let session = WsSession::new(lifecycle, outbound, state.config.heartbeat());

    ws::WsResponseBuilder::new(session, &req, stream)
        .frame_size(MAX_FRAME_SIZE)
        .start()
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect));
}
