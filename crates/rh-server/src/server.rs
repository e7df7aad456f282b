use std::future::Future;

use tracing::info;

use rh_capture::{CaptureSource, HttpCapture, WsCapture};
use rh_fabric::Sink;
use rh_sinks::{Logger, Printer};
use rh_types::ServerInfo;
use rh_web::WebStore;

use crate::banner;
use crate::config::{Protocol, RunConfig};
use crate::coordinator::{Coordinator, RunReport};
use crate::error::ServerResult;

/// One configured Request Hole run.
pub struct RequestHole {
    config: RunConfig,
    protocol: Protocol,
}

impl RequestHole {
    /// Validates the configuration; nothing is bound yet.
    pub fn new(config: RunConfig, protocol: Protocol) -> ServerResult<Self> {
        config.validate()?;
        Ok(Self { config, protocol })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn info(&self) -> ServerInfo {
        self.config.server_info(self.protocol)
    }

    pub fn banner(&self) -> String {
        banner::render(&self.info(), self.config.web.enabled)
    }

    /// The web store replaces the printer; the logger comes on top of either.
    pub fn sinks(&self) -> Vec<Box<dyn Sink>> {
        let info = self.info();
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        if self.config.web.enabled {
            sinks.push(Box::new(WebStore::new(info.clone())));
        } else {
            sinks.push(Box::new(Printer::new(self.config.details)));
        }
        if let Some(path) = &self.config.log.file {
            sinks.push(Box::new(Logger::new(
                path,
                self.config.details,
                info.listen_url(),
            )));
        }
        sinks
    }

    pub fn capture(&self) -> ServerResult<Box<dyn CaptureSource>> {
        let RunConfig { address, port, .. } = &self.config;
        let capture: Box<dyn CaptureSource> = match self.protocol {
            Protocol::Http => Box::new(HttpCapture::new(
                address.clone(),
                *port,
                self.config.response_code,
            )?),
            Protocol::Ws => Box::new(WsCapture::new(address.clone(), *port)),
        };
        Ok(capture)
    }

    /// Run until a fatal fault, or until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> ServerResult<RunReport>
    where
        F: Future<Output = ()> + Send,
    {
        let capture = self.capture()?;
        let sinks = self.sinks();
        info!(protocol = %self.protocol, url = %self.info().listen_url(), "request hole starting");
        Coordinator::new(self.config.channel_capacity)
            .run(sinks, capture, shutdown)
            .await
    }
}
