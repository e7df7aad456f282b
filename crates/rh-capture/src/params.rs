//! Extraction of headers and parameters from an inbound request.

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, HeaderMap, Uri};
use serde_json::Value;
use tracing::debug;

use rh_types::{Headers, Params};

/// Largest body read while extracting parameters.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Copy every header into a [`Headers`] multimap, values decoded lossily.
pub fn headers_of(map: &HeaderMap) -> Headers {
    map.iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Path plus query string, as the client sent it.
pub fn request_uri(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

/// Collect parameters from the query string and a form, multipart or JSON body.
pub async fn extract(headers: &HeaderMap, uri: &Uri, body: &Bytes) -> Params {
    let mut params = Params::new();

    if let Some(query) = uri.query() {
        push_urlencoded(&mut params, query.as_bytes());
    }

    if body.is_empty() {
        return params;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        push_urlencoded(&mut params, body);
    } else if content_type.starts_with("multipart/form-data") {
        push_multipart(&mut params, content_type, body.clone()).await;
    } else if content_type.contains("json") {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => params.extend_from_json(&object),
            Ok(_) => debug!("json body is not an object, no params taken"),
            Err(err) => debug!(%err, "json body did not parse"),
        }
    }

    params
}

fn push_urlencoded(params: &mut Params, raw: &[u8]) {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(raw) {
        Ok(pairs) => {
            for (name, value) in pairs {
                params.push(name, value);
            }
        }
        Err(err) => debug!(%err, "urlencoded params did not parse"),
    }
}

/// Text fields only; file parts are skipped.
async fn push_multipart(params: &mut Params, content_type: &str, body: Bytes) {
    let request = match Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
    {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, "cannot rebuild multipart request");
            return;
        }
    };
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(err) => {
            debug!(%err, "multipart body rejected");
            return;
        }
    };

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.file_name().is_some() {
                    continue;
                }
                let name = field.name().unwrap_or_default().to_string();
                match field.text().await {
                    Ok(value) => params.push(name, value),
                    Err(err) => {
                        debug!(%err, "multipart field unreadable");
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                debug!(%err, "multipart body malformed");
                break;
            }
        }
    }
}
