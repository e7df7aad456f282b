use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::headers::Headers;
use crate::params::Params;

/// Unique identifier of a captured event, assigned once at capture.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of captured inbound work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// One plain HTTP request.
    HttpRequest,
    /// The handshake request of a WebSocket connection.
    WsConnect,
    /// One inbound WebSocket frame.
    WsMessage,
    /// A WebSocket connection closed with a normal closure.
    WsDisconnect,
    /// A WebSocket connection ended any other way.
    WsError,
}

impl EventKind {
    /// Method label used for events that have no HTTP method of their own.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::HttpRequest | Self::WsConnect => None,
            Self::WsMessage => Some("RECEIVE"),
            Self::WsDisconnect => Some("DISCONNECTED"),
            Self::WsError => Some("ERROR"),
        }
    }

    /// Whether the event was produced by a request (as opposed to a frame or close).
    pub fn is_request(&self) -> bool {
        matches!(self, Self::HttpRequest | Self::WsConnect)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HttpRequest => "HTTP_REQUEST",
            Self::WsConnect => "WS_CONNECT",
            Self::WsMessage => "WS_MESSAGE",
            Self::WsDisconnect => "WS_DISCONNECT",
            Self::WsError => "WS_ERROR",
        };
        write!(f, "{s}")
    }
}

/// Read-only handle every sink receives.
pub type SharedEvent = Arc<RequestEvent>;

/// Normalized record of one captured unit of inbound work.
///
/// Fields are private: an event is never modified after a capture source
/// builds it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    id: EventId,
    created_at: DateTime<Utc>,
    kind: EventKind,
    method: String,
    url: String,
    headers: Headers,
    params: String,
    param_fields: Params,
    message: String,
}

impl RequestEvent {
    /// An HTTP request, or the handshake of a WebSocket connection.
    pub fn request(
        kind: EventKind,
        method: impl Into<String>,
        url: impl Into<String>,
        headers: Headers,
        params: Params,
    ) -> Self {
        Self {
            id: EventId::generate(),
            created_at: Utc::now(),
            kind,
            method: method.into(),
            url: url.into(),
            headers,
            params: params.to_string(),
            param_fields: params,
            message: String::new(),
        }
    }

    /// A WebSocket frame or termination on the connection opened at `url`.
    ///
    /// The method is the kind's label (`RECEIVE`, `DISCONNECTED`, `ERROR`).
    pub fn ws_activity(kind: EventKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: EventId::generate(),
            created_at: Utc::now(),
            kind,
            method: kind.label().unwrap_or_default().to_string(),
            url: url.into(),
            headers: Headers::new(),
            params: String::new(),
            param_fields: Params::new(),
            message: message.into(),
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Parameters in their `{"k" => "v"}` form.
    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn param_fields(&self) -> &Params {
        &self.param_fields
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Text rendered after the URL: parameters for requests, the message otherwise.
    pub fn detail(&self) -> &str {
        if self.kind.is_request() {
            &self.params
        } else {
            &self.message
        }
    }

    pub fn into_shared(self) -> SharedEvent {
        Arc::new(self)
    }
}
