use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use rh_types::ServerInfo;

use crate::error::WebError;
use crate::graphql::{self, GraphQlRequest, Operation};
use crate::store::RequestStore;
use crate::subscription::{self, SUBPROTOCOL};

/// Shared state of the web surface.
#[derive(Clone)]
pub struct WebState {
    pub store: RequestStore,
    pub info: Arc<ServerInfo>,
}

impl WebState {
    pub fn new(store: RequestStore, info: ServerInfo) -> Self {
        Self {
            store,
            info: Arc::new(info),
        }
    }
}

/// Build the web store router.
///
/// - `GET /requests`: the history as a JSON array
/// - `POST /graphql`: queries and mutations
/// - `GET /graphql`: WebSocket subscriptions
/// - `GET /health`: liveness
pub fn build_router(state: WebState) -> Router {
    Router::new()
        .route("/requests", get(list_requests))
        .route("/graphql", get(graphql_socket).post(graphql_http))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_requests(State(state): State<WebState>) -> Response {
    Json(state.store.requests().await).into_response()
}

async fn graphql_http(
    State(state): State<WebState>,
    body: Result<Json<GraphQlRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = WebError::Query(rejection.body_text());
            return (StatusCode::BAD_REQUEST, Json(graphql::error_response(&err))).into_response();
        }
    };

    let result = match Operation::parse(&request.query, request.operation_name.as_deref()) {
        Ok(op) if op.is_subscription() => Err(WebError::Query(
            "subscriptions are only served over the websocket endpoint".into(),
        )),
        Ok(op) => {
            debug!(?op, "graphql over http");
            op.execute(&state.store, &state.info).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(data) => Json(json!({ "data": data })).into_response(),
        Err(err) => {
            warn!(%err, "graphql request rejected");
            (StatusCode::BAD_REQUEST, Json(graphql::error_response(&err))).into_response()
        }
    }
}

async fn graphql_socket(State(state): State<WebState>, ws: WebSocketUpgrade) -> Response {
    ws.protocols([SUBPROTOCOL])
        .on_upgrade(move |socket| subscription::serve_socket(socket, state))
}

async fn health(State(state): State<WebState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": state.info.build_info.version,
        "requests": state.store.len().await,
        "subscribers": state.store.subscriber_count().await,
    }))
}
