//! A deliberately small GraphQL front.
//!
//! Only the four root fields the web UI uses are understood: `requests`,
//! `serverInfo`, `clearRequests`, and the `request` subscription. A document
//! is scanned for its operations and the first root field of the chosen one
//! picks the [`Operation`]. Selection sets are not applied: resolvers return
//! whole objects.

use serde::Deserialize;
use serde_json::{json, Value};

use rh_types::ServerInfo;

use crate::error::{WebError, WebResult};
use crate::store::RequestStore;

/// Body of a query request, as posted over HTTP or carried in a `subscribe`
/// message. `variables` is accepted and ignored: no root field takes
/// arguments.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

/// A resolved root field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `query { requests }`
    Requests,
    /// `query { serverInfo }`
    ServerInfo,
    /// `mutation { clearRequests }`
    ClearRequests,
    /// `subscription { request }`
    RequestSubscription,
}

impl Operation {
    /// Resolve the operation named by `operation_name`, or the only one.
    pub fn parse(query: &str, operation_name: Option<&str>) -> WebResult<Self> {
        let definitions = scan(query)?;
        let chosen = match operation_name {
            Some(name) => definitions
                .iter()
                .find(|def| def.name.as_deref() == Some(name))
                .ok_or_else(|| WebError::Query(format!("unknown operation named \"{name}\"")))?,
            None => match definitions.as_slice() {
                [only] => only,
                [] => return Err(WebError::Query("no operation provided".into())),
                _ => {
                    return Err(WebError::Query(
                        "operationName is required for documents with several operations".into(),
                    ))
                }
            },
        };
        Self::resolve(chosen.kind, &chosen.root_field)
    }

    fn resolve(kind: OperationType, field: &str) -> WebResult<Self> {
        match (kind, field) {
            (OperationType::Query, "requests") => Ok(Self::Requests),
            (OperationType::Query, "serverInfo") => Ok(Self::ServerInfo),
            (OperationType::Mutation, "clearRequests") => Ok(Self::ClearRequests),
            (OperationType::Subscription, "request") => Ok(Self::RequestSubscription),
            (kind, field) => Err(WebError::Query(format!(
                "cannot query field \"{field}\" on type \"{}\"",
                match kind {
                    OperationType::Query => "Query",
                    OperationType::Mutation => "Mutation",
                    OperationType::Subscription => "Subscription",
                }
            ))),
        }
    }

    pub fn is_subscription(self) -> bool {
        self == Self::RequestSubscription
    }

    /// Run a query or mutation and return its `data` object.
    ///
    /// Subscriptions are streamed by the socket layer, not executed here.
    pub async fn execute(self, store: &RequestStore, info: &ServerInfo) -> WebResult<Value> {
        match self {
            Self::Requests => Ok(json!({ "requests": store.requests().await })),
            Self::ServerInfo => Ok(json!({ "serverInfo": info })),
            Self::ClearRequests => {
                store.clear_requests().await;
                Ok(json!({ "clearRequests": true }))
            }
            Self::RequestSubscription => Err(WebError::Query(
                "subscriptions are only served over the websocket endpoint".into(),
            )),
        }
    }
}

/// `{"errors": [{"message": ...}]}`
pub fn error_response(err: &WebError) -> Value {
    json!({ "errors": [{ "message": err.to_string() }] })
}

#[derive(Debug)]
struct Definition {
    kind: OperationType,
    name: Option<String>,
    root_field: String,
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Name(&'a str),
    Punct(char),
    Literal,
}

fn tokenize(source: &str) -> WebResult<Vec<Token<'_>>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' | b',' => i += 1,
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(WebError::Query("unterminated string".into()));
                }
                i += 1;
                tokens.push(Token::Literal);
            }
            b'.' if bytes[i..].starts_with(b"...") => {
                tokens.push(Token::Punct('.'));
                i += 3;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token::Name(&source[start..i]));
            }
            c if c.is_ascii_digit() || c == b'-' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'.' | b'-' | b'+'))
                {
                    i += 1;
                }
                tokens.push(Token::Literal);
            }
            b'{' | b'}' | b'(' | b')' | b'[' | b']' | b':' | b'$' | b'@' | b'!' | b'=' | b'|'
            | b'&' => {
                tokens.push(Token::Punct(c as char));
                i += 1;
            }
            other => {
                return Err(WebError::Query(format!(
                    "unexpected character '{}'",
                    other as char
                )))
            }
        }
    }
    Ok(tokens)
}

/// Collect the operation definitions of a document. Fragments are skipped.
fn scan(source: &str) -> WebResult<Vec<Definition>> {
    let tokens = tokenize(source)?;
    let mut pos = 0;
    let mut definitions = Vec::new();

    while pos < tokens.len() {
        let kind = match tokens[pos] {
            Token::Punct('{') => OperationType::Query,
            Token::Name("query") => OperationType::Query,
            Token::Name("mutation") => OperationType::Mutation,
            Token::Name("subscription") => OperationType::Subscription,
            Token::Name("fragment") => {
                pos = skip_to_block_end(&tokens, pos)?;
                continue;
            }
            ref other => {
                return Err(WebError::Query(format!(
                    "expected an operation, found {other:?}"
                )))
            }
        };

        let mut name = None;
        if tokens[pos] != Token::Punct('{') {
            pos += 1;
            if let Some(Token::Name(n)) = tokens.get(pos) {
                name = Some((*n).to_string());
                pos += 1;
            }
            // Variable definitions and directives.
            while let Some(token) = tokens.get(pos) {
                match token {
                    Token::Punct('{') => break,
                    Token::Punct('(') => pos = skip_balanced(&tokens, pos, '(', ')')?,
                    _ => pos += 1,
                }
            }
        }

        let root_field = first_field(&tokens, pos)?;
        pos = skip_balanced(&tokens, pos, '{', '}')?;
        definitions.push(Definition {
            kind,
            name,
            root_field,
        });
    }
    Ok(definitions)
}

/// The first field of the selection set opening at `pos`, alias removed.
fn first_field(tokens: &[Token<'_>], pos: usize) -> WebResult<String> {
    match (tokens.get(pos + 1), tokens.get(pos + 2), tokens.get(pos + 3)) {
        (Some(Token::Name(_)), Some(Token::Punct(':')), Some(Token::Name(field))) => {
            Ok((*field).to_string())
        }
        (Some(Token::Name(field)), _, _) => Ok((*field).to_string()),
        _ => Err(WebError::Query("selection set has no fields".into())),
    }
}

fn skip_to_block_end(tokens: &[Token<'_>], mut pos: usize) -> WebResult<usize> {
    while pos < tokens.len() && tokens[pos] != Token::Punct('{') {
        pos += 1;
    }
    skip_balanced(tokens, pos, '{', '}')
}

/// Index just past the bracket that closes the one opening at `pos`.
fn skip_balanced(tokens: &[Token<'_>], pos: usize, open: char, close: char) -> WebResult<usize> {
    if tokens.get(pos) != Some(&Token::Punct(open)) {
        return Err(WebError::Query(format!("expected '{open}'")));
    }
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(pos) {
        match token {
            Token::Punct(c) if *c == open => depth += 1,
            Token::Punct(c) if *c == close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
    }
    Err(WebError::Query(format!("missing closing '{close}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_types::{BuildInfo, EventKind, RequestEvent};

    #[test]
    fn shorthand_query() {
        assert_eq!(Operation::parse("{ requests { id url } }", None).unwrap(), Operation::Requests);
    }

    #[test]
    fn named_operations_with_variables_and_aliases() {
        let query = r#"
            # history for the sidebar
            query Sidebar($limit: Int = 10) @cached {
                info: serverInfo { port protocol }
            }
        "#;
        assert_eq!(Operation::parse(query, None).unwrap(), Operation::ServerInfo);
        assert_eq!(
            Operation::parse("mutation Clear { clearRequests }", None).unwrap(),
            Operation::ClearRequests
        );
        assert_eq!(
            Operation::parse("subscription OnRequest { request { id method } }", None).unwrap(),
            Operation::RequestSubscription
        );
    }

    #[test]
    fn operation_name_selects_among_several() {
        let doc = r#"
            query A { requests { id } }
            fragment F on Request { id }
            mutation B { clearRequests }
        "#;
        assert_eq!(Operation::parse(doc, Some("B")).unwrap(), Operation::ClearRequests);
        assert_eq!(Operation::parse(doc, Some("A")).unwrap(), Operation::Requests);
        assert!(Operation::parse(doc, None).is_err());
        assert!(Operation::parse(doc, Some("C")).is_err());
    }

    #[test]
    fn unknown_fields_and_bad_documents_rejected() {
        let err = Operation::parse("{ users }", None).unwrap_err();
        assert!(err.to_string().contains("\"users\""));
        // A query root field is not a mutation.
        assert!(Operation::parse("mutation { requests }", None).is_err());
        assert!(Operation::parse("{ requests ", None).is_err());
        assert!(Operation::parse("", None).is_err());
        assert!(Operation::parse("{ }", None).is_err());
    }

    #[tokio::test]
    async fn execute_reads_and_clears_history() {
        let store = RequestStore::new();
        store
            .incoming_request(RequestEvent::ws_activity(EventKind::WsMessage, "/", "hi").into_shared())
            .await;
        let info = ServerInfo {
            address: "localhost".into(),
            port: 8080,
            protocol: "http".into(),
            response_code: 200,
            details: false,
            log_file: None,
            web_address: "localhost".into(),
            web_port: 8081,
            build_info: BuildInfo::current(),
        };

        let data = Operation::Requests.execute(&store, &info).await.unwrap();
        assert_eq!(data["requests"][0]["message"], "hi");

        let data = Operation::ServerInfo.execute(&store, &info).await.unwrap();
        assert_eq!(data["serverInfo"]["port"], 8080);
        assert_eq!(data["serverInfo"]["responseCode"], 200);

        let data = Operation::ClearRequests.execute(&store, &info).await.unwrap();
        assert_eq!(data["clearRequests"], true);
        assert!(store.is_empty().await);

        assert!(Operation::RequestSubscription.execute(&store, &info).await.is_err());
    }
}
