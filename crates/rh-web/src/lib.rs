//! Web store sink for Request Hole.
//!
//! Keeps the ordered history of captured events and a registry of live
//! subscribers behind one lock ([`RequestStore`]), and serves both over HTTP:
//! a history endpoint, a small query endpoint, and a WebSocket subscription
//! endpoint that pushes every new event to the browser.

pub mod error;
pub mod graphql;
pub mod routes;
pub mod sink;
pub mod store;
pub mod subscription;

pub use error::{WebError, WebResult};
pub use graphql::{GraphQlRequest, Operation};
pub use routes::{build_router, WebState};
pub use sink::{StoreState, WebStore};
pub use store::{History, RequestStore, Subscription, SUBSCRIBER_BUFFER};
