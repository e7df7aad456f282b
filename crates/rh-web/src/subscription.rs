//! `graphql-transport-ws` over the `/graphql` WebSocket.
//!
//! One socket can carry several operations, each keyed by the client's id.
//! Queries and mutations answer with a single `next` followed by `complete`.
//! A `request` subscription registers with the store and streams one `next`
//! per captured event until the client sends `complete` or goes away.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WebError;
use crate::graphql::{GraphQlRequest, Operation};
use crate::routes::WebState;
use crate::store::Subscription;

pub const SUBPROTOCOL: &str = "graphql-transport-ws";

const OUTBOUND_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ConnectionInit,
    Ping {
        #[serde(default)]
        payload: Option<Value>,
    },
    Pong,
    Subscribe {
        id: String,
        payload: GraphQlRequest,
    },
    Complete {
        id: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck,
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Next {
        id: String,
        payload: Value,
    },
    Error {
        id: String,
        payload: Vec<Value>,
    },
    Complete {
        id: String,
    },
}

/// A running `request` subscription on this socket.
struct Active {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Active {
    async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

/// Serve one upgraded socket until the client leaves.
pub async fn serve_socket(socket: WebSocket, state: WebState) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "cannot encode subscription message");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut active: HashMap<String, Active> = HashMap::new();
    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let msg: ClientMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(%err, "ignoring malformed subscription message");
                continue;
            }
        };

        let sent = match msg {
            ClientMessage::ConnectionInit => out_tx.send(ServerMessage::ConnectionAck).await,
            ClientMessage::Ping { payload } => out_tx.send(ServerMessage::Pong { payload }).await,
            ClientMessage::Pong => Ok(()),
            ClientMessage::Subscribe { id, payload } => {
                start(id, payload, &state, &out_tx, &mut active).await
            }
            ClientMessage::Complete { id } => {
                if let Some(op) = active.remove(&id) {
                    op.stop().await;
                }
                Ok(())
            }
        };
        if sent.is_err() {
            break;
        }
    }

    for (_, op) in active.drain() {
        op.stop().await;
    }
    drop(out_tx);
    let _ = writer.await;
    debug!("subscription socket closed");
}

async fn start(
    id: String,
    request: GraphQlRequest,
    state: &WebState,
    out: &mpsc::Sender<ServerMessage>,
    active: &mut HashMap<String, Active>,
) -> Result<(), mpsc::error::SendError<ServerMessage>> {
    if active.contains_key(&id) {
        let err = WebError::Query(format!("subscriber for {id} already exists"));
        return out.send(error_message(id, &err)).await;
    }

    let op = match Operation::parse(&request.query, request.operation_name.as_deref()) {
        Ok(op) => op,
        Err(err) => return out.send(error_message(id, &err)).await,
    };

    if op.is_subscription() {
        let subscription = state.store.subscribe().await;
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(forward(subscription, id.clone(), out.clone(), stop_rx));
        active.insert(id, Active { stop: stop_tx, task });
        return Ok(());
    }

    match op.execute(&state.store, &state.info).await {
        Ok(data) => {
            out.send(ServerMessage::Next {
                id: id.clone(),
                payload: json!({ "data": data }),
            })
            .await?;
            out.send(ServerMessage::Complete { id }).await
        }
        Err(err) => out.send(error_message(id, &err)).await,
    }
}

/// Stream store events to the socket until stopped, then deregister.
async fn forward(
    mut subscription: Subscription,
    id: String,
    out: mpsc::Sender<ServerMessage>,
    mut stop: oneshot::Receiver<()>,
) {
    debug!(%id, subscriber = %subscription.id(), "subscription started");
    loop {
        let event = tokio::select! {
            _ = &mut stop => break,
            event = subscription.next() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let payload = match serde_json::to_value(event.as_ref()) {
            Ok(request) => json!({ "data": { "request": request } }),
            Err(err) => {
                warn!(%err, "cannot encode event for subscriber");
                continue;
            }
        };
        let next = ServerMessage::Next {
            id: id.clone(),
            payload,
        };
        if out.send(next).await.is_err() {
            break;
        }
    }
    subscription.close().await;
    debug!(%id, "subscription finished");
}

fn error_message(id: String, err: &WebError) -> ServerMessage {
    ServerMessage::Error {
        id,
        payload: vec![json!({ "message": err.to_string() })],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::store::RequestStore;
    use rh_types::{BuildInfo, EventKind, RequestEvent, ServerInfo};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message as ClientFrame;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn spawn_web() -> (String, RequestStore) {
        let store = RequestStore::new();
        let info = ServerInfo {
            address: "localhost".into(),
            port: 8080,
            protocol: "ws".into(),
            response_code: 200,
            details: false,
            log_file: None,
            web_address: "127.0.0.1".into(),
            web_port: 0,
            build_info: BuildInfo::current(),
        };
        let app = build_router(WebState::new(store.clone(), info));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("ws://{addr}/graphql"), store)
    }

    async fn send(client: &mut Client, msg: Value) {
        client.send(ClientFrame::Text(msg.to_string())).await.unwrap();
    }

    async fn recv(client: &mut Client) -> Value {
        loop {
            match client.next().await.unwrap().unwrap() {
                ClientFrame::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    async fn connect(url: &str) -> Client {
        let (mut client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        send(&mut client, json!({ "type": "connection_init" })).await;
        assert_eq!(recv(&mut client).await["type"], "connection_ack");
        client
    }

    #[tokio::test]
    async fn ping_pong() {
        let (url, _store) = spawn_web().await;
        let mut client = connect(&url).await;
        send(&mut client, json!({ "type": "ping" })).await;
        assert_eq!(recv(&mut client).await["type"], "pong");
    }

    #[tokio::test]
    async fn subscription_streams_new_events() {
        let (url, store) = spawn_web().await;
        let mut client = connect(&url).await;
        send(
            &mut client,
            json!({
                "id": "1",
                "type": "subscribe",
                "payload": { "query": "subscription { request { id url } }" }
            }),
        )
        .await;
        while store.subscriber_count().await == 0 {
            tokio::task::yield_now().await;
        }

        for url in ["/a", "/b"] {
            let event = RequestEvent::request(EventKind::HttpRequest, "POST", url, Default::default(), Default::default());
            store.incoming_request(event.into_shared()).await;
        }

        let first = recv(&mut client).await;
        assert_eq!(first["type"], "next");
        assert_eq!(first["id"], "1");
        assert_eq!(first["payload"]["data"]["request"]["url"], "/a");
        let second = recv(&mut client).await;
        assert_eq!(second["payload"]["data"]["request"]["url"], "/b");

        send(&mut client, json!({ "id": "1", "type": "complete" })).await;
        while store.subscriber_count().await != 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn disconnect_deregisters_subscriber() {
        let (url, store) = spawn_web().await;
        let mut client = connect(&url).await;
        send(
            &mut client,
            json!({
                "id": "live",
                "type": "subscribe",
                "payload": { "query": "subscription { request { id } }" }
            }),
        )
        .await;
        while store.subscriber_count().await == 0 {
            tokio::task::yield_now().await;
        }

        drop(client);
        while store.subscriber_count().await != 0 {
            tokio::task::yield_now().await;
        }
        let event = RequestEvent::ws_activity(EventKind::WsMessage, "/", "after");
        store.incoming_request(event.into_shared()).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn query_over_socket_completes() {
        let (url, store) = spawn_web().await;
        let event = RequestEvent::ws_activity(EventKind::WsMessage, "/", "kept");
        store.incoming_request(event.into_shared()).await;

        let mut client = connect(&url).await;
        send(
            &mut client,
            json!({ "id": "q", "type": "subscribe", "payload": { "query": "{ requests { message } }" } }),
        )
        .await;
        let next = recv(&mut client).await;
        assert_eq!(next["type"], "next");
        assert_eq!(next["payload"]["data"]["requests"][0]["message"], "kept");
        let done = recv(&mut client).await;
        assert_eq!(done["type"], "complete");
        assert_eq!(done["id"], "q");
    }

    #[tokio::test]
    async fn unknown_operation_is_error() {
        let (url, _store) = spawn_web().await;
        let mut client = connect(&url).await;
        send(
            &mut client,
            json!({ "id": "x", "type": "subscribe", "payload": { "query": "subscription { users }" } }),
        )
        .await;
        let msg = recv(&mut client).await;
        assert_eq!(msg["type"], "error");
        assert_eq!(msg["id"], "x");
    }
}
