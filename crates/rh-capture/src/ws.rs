use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use rh_fabric::FanOut;
use rh_types::{EventKind, RequestEvent};

use crate::params;
use crate::source::CaptureSource;

/// WebSocket endpoint: records the handshake, every inbound frame, and how
/// the connection ended.
#[derive(Clone, Debug)]
pub struct WsCapture {
    address: String,
    port: u16,
}

impl WsCapture {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl CaptureSource for WsCapture {
    fn protocol(&self) -> &'static str {
        "ws"
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Upgrade on any path, from any origin.
    fn router(&self, fan_out: FanOut) -> Router {
        Router::new()
            .route("/", get(upgrade))
            .route("/*path", get(upgrade))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(fan_out)
    }
}

/// Record the handshake and hand the socket to the read loop.
///
/// A request that cannot be upgraded is recorded as a WS error and answered
/// with the rejection.
async fn upgrade(
    State(fan_out): State<FanOut>,
    method: Method,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let url = params::request_uri(&uri);
    match ws {
        Ok(ws) => {
            fan_out.publish(RequestEvent::request(
                EventKind::WsConnect,
                method.as_str(),
                url.as_str(),
                params::headers_of(&headers),
                params::extract(&headers, &uri, &Default::default()).await,
            ));
            ws.on_upgrade(move |socket| read_loop(socket, url, fan_out))
        }
        Err(rejection) => {
            warn!(%rejection, %url, "websocket upgrade failed");
            fan_out.publish(RequestEvent::ws_activity(
                EventKind::WsError,
                &url,
                rejection.to_string(),
            ));
            rejection.into_response()
        }
    }
}

/// Publish every inbound frame until the connection ends, then publish how it ended.
async fn read_loop(mut socket: WebSocket, url: String, fan_out: FanOut) {
    debug!(%url, "websocket connected");
    let (kind, reason) = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                fan_out.publish(RequestEvent::ws_activity(EventKind::WsMessage, &url, text));
            }
            Some(Ok(Message::Binary(bytes))) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                fan_out.publish(RequestEvent::ws_activity(EventKind::WsMessage, &url, text));
            }
            // Pings are answered by the socket itself.
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => break describe_close(frame.as_ref()),
            Some(Err(err)) => break (EventKind::WsError, err.to_string()),
            None => break (EventKind::WsError, "connection closed without a close frame".to_string()),
        }
    };

    debug!(%url, %kind, %reason, "websocket finished");
    fan_out.publish(RequestEvent::ws_activity(kind, &url, reason));

    // Drives the close reply out before the socket is dropped.
    let _ = socket.recv().await;
}

/// A normal closure is a disconnect; every other close is an error.
fn describe_close(frame: Option<&CloseFrame<'_>>) -> (EventKind, String) {
    match frame {
        Some(frame) if frame.code == close_code::NORMAL => (
            EventKind::WsDisconnect,
            format!("close {} (normal): {}", frame.code, frame.reason),
        ),
        Some(frame) => (
            EventKind::WsError,
            format!("close {}: {}", frame.code, frame.reason),
        ),
        None => (EventKind::WsError, "close 1005 (no status)".to_string()),
    }
}
