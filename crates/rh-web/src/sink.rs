use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use rh_fabric::{print_fatal, Sink, SinkEnds, SinkFault};
use rh_types::ServerInfo;

use crate::error::WebError;
use crate::routes::{build_router, WebState};
use crate::store::RequestStore;

/// Lifecycle of the web store sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreState {
    /// Binding the web listener.
    Initializing,
    /// Listener up, ingesting events.
    Serving,
    /// Quit received. History stays readable, nothing new is ingested.
    Draining,
}

/// Sink that keeps captured events for the browser.
pub struct WebStore {
    info: ServerInfo,
    store: RequestStore,
    state: watch::Sender<StoreState>,
}

impl WebStore {
    pub fn new(info: ServerInfo) -> Self {
        let (state, _) = watch::channel(StoreState::Initializing);
        Self {
            info,
            store: RequestStore::new(),
            state,
        }
    }

    /// Handle on the history and subscriber registry.
    pub fn store(&self) -> RequestStore {
        self.store.clone()
    }

    pub fn state(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.info.web_address, self.info.web_port)
    }

    /// Serve on an already bound listener and ingest until quit.
    ///
    /// The listener outlives the ingestion loop: the history stays
    /// browsable after the run is told to quit.
    pub async fn run_on(self, listener: TcpListener, mut ends: SinkEnds) {
        let local = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.bind_addr());
        let app = build_router(WebState::new(self.store.clone(), self.info.clone()));
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(%err, "web store listener stopped");
            }
        });

        self.state.send_replace(StoreState::Serving);
        info!(addr = %local, "web store serving");

        while let Some(event) = ends.next().await {
            self.store.incoming_request(event).await;
        }

        self.state.send_replace(StoreState::Draining);
        let requests = self.store.len().await;
        info!(requests, "web store draining");
        ends.close();
    }
}

#[async_trait]
impl Sink for WebStore {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn run(self: Box<Self>, mut ends: SinkEnds) {
        let addr = self.bind_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = WebError::Bind { addr, source };
                print_fatal(&err);
                ends.fail(SinkFault::new(self.name(), &err));
                ends.close();
                return;
            }
        };
        (*self).run_on(listener, ends).await;
    }
}
