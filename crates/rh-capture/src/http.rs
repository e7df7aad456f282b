use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::warn;

use rh_fabric::FanOut;
use rh_types::{EventKind, RequestEvent};

use crate::error::{CaptureError, CaptureResult};
use crate::params::{self, MAX_BODY_BYTES};
use crate::source::CaptureSource;

/// Plain HTTP endpoint: records every request and answers with a fixed status.
#[derive(Clone, Debug)]
pub struct HttpCapture {
    address: String,
    port: u16,
    response_code: StatusCode,
}

impl HttpCapture {
    pub fn new(address: impl Into<String>, port: u16, response_code: u16) -> CaptureResult<Self> {
        let response_code = StatusCode::from_u16(response_code)
            .map_err(|_| CaptureError::InvalidStatus(response_code))?;
        Ok(Self {
            address: address.into(),
            port,
            response_code,
        })
    }

    pub fn response_code(&self) -> StatusCode {
        self.response_code
    }
}

impl CaptureSource for HttpCapture {
    fn protocol(&self) -> &'static str {
        "http"
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Any path, any method.
    fn router(&self, fan_out: FanOut) -> Router {
        let status = self.response_code;
        let respond = move || async move { status };
        Router::new()
            .route("/", any(respond.clone()))
            .route("/*path", any(respond))
            .layer(middleware::from_fn_with_state(fan_out, record_request))
            .layer(TraceLayer::new_for_http())
    }
}

/// Record the request before the handler writes its status.
async fn record_request(State(fan_out): State<FanOut>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "request body unreadable, recording without it");
            Default::default()
        }
    };

    let params = params::extract(&parts.headers, &parts.uri, &body).await;
    let event = RequestEvent::request(
        EventKind::HttpRequest,
        parts.method.as_str(),
        params::request_uri(&parts.uri),
        params::headers_of(&parts.headers),
        params,
    );
    fan_out.publish(event);

    next.run(Request::from_parts(parts, Body::from(body))).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use rh_fabric::allocate;
    use tower::util::ServiceExt;

    fn capture(code: u16) -> HttpCapture {
        HttpCapture::new("127.0.0.1", 0, code).unwrap()
    }

    async fn send(app: Router, method: Method, uri: &str, content_type: Option<&str>, body: &'static str) -> StatusCode {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        app.oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn responds_with_configured_status_for_any_path_and_method() {
        for code in [200u16, 404, 201, 500] {
            let (_ends, fan_out, _control) = allocate(&["printer"], 16).unwrap();
            let app = capture(code).router(fan_out);
            for (method, uri) in [
                (Method::GET, "/"),
                (Method::POST, "/foo/bar"),
                (Method::DELETE, "/foo/1"),
                (Method::PATCH, "/a/b/c?x=1"),
            ] {
                let status = send(app.clone(), method, uri, None, "").await;
                assert_eq!(status.as_u16(), code);
            }
        }
    }

    #[test]
    fn invalid_status_rejected() {
        assert!(matches!(
            HttpCapture::new("localhost", 8080, 42),
            Err(CaptureError::InvalidStatus(42))
        ));
    }

    #[tokio::test]
    async fn records_method_url_params_and_headers() {
        let (mut ends, fan_out, _control) = allocate(&["printer"], 16).unwrap();
        let app = capture(200).router(fan_out);

        send(app.clone(), Method::GET, "/foo", None, "").await;
        send(app.clone(), Method::POST, "/foo/bar", Some("application/json"), r#"{"foo": "bar"}"#).await;
        send(app, Method::GET, "/foo/bar?hello=world", None, "").await;

        let first = ends[0].next().await.unwrap();
        assert_eq!(first.method(), "GET");
        assert_eq!(first.url(), "/foo");
        assert_eq!(first.params(), "");
        assert_eq!(first.kind(), EventKind::HttpRequest);

        let second = ends[0].next().await.unwrap();
        assert_eq!(second.method(), "POST");
        assert_eq!(second.params(), r#"{"foo" => "bar"}"#);
        assert_eq!(
            second.headers().get("content-type").unwrap(),
            &["application/json".to_string()]
        );

        let third = ends[0].next().await.unwrap();
        assert_eq!(third.url(), "/foo/bar?hello=world");
        assert_eq!(third.params(), r#"{"hello" => "world"}"#);
    }

    #[tokio::test]
    async fn every_sink_receives_each_request() {
        let (mut ends, fan_out, _control) = allocate(&["printer", "logger"], 16).unwrap();
        let app = capture(200).router(fan_out);
        send(app, Method::DELETE, "/foo/1", None, "").await;

        let a = ends[0].next().await.unwrap();
        let b = ends[1].next().await.unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.method(), "DELETE");
        assert_eq!(b.url(), "/foo/1");
    }
}
