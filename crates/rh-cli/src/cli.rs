use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rh_server::{RunConfig, ServerResult};

#[derive(Parser)]
#[command(
    name = "rh",
    about = "Request Hole: an ephemeral endpoint that shows every request sent to it",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Port to capture on [default: 8080]
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Address to capture on [default: localhost]
    #[arg(short, long, global = true)]
    pub address: Option<String>,

    /// Status returned to every HTTP request [default: 200]
    #[arg(short, long = "response_code", global = true)]
    pub response_code: Option<u16>,

    /// Show request headers
    #[arg(long, global = true)]
    pub details: bool,

    /// Append every request to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Show requests in the browser instead of the terminal
    #[arg(long, global = true)]
    pub web: bool,

    /// Port of the web UI [default: 8081]
    #[arg(long = "web_port", global = true)]
    pub web_port: Option<u16>,

    /// Address of the web UI [default: localhost]
    #[arg(long = "web_address", global = true)]
    pub web_address: Option<String>,

    /// Events buffered per output before new ones are dropped [default: 1024]
    #[arg(long = "channel_capacity", global = true)]
    pub channel_capacity: Option<usize>,

    /// Read settings from a TOML file; flags win over it
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Capture HTTP requests
    Http,
    /// Capture WebSocket connections and messages
    Ws,
    /// Print version and build information
    Version,
}

impl Cli {
    /// The config file (or defaults) with every given flag applied on top.
    pub fn run_config(&self) -> ServerResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(code) = self.response_code {
            config.response_code = code;
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
        config.details |= self.details;
        config.web.enabled |= self.web;
        if let Some(port) = self.web_port {
            config.web.port = port;
        }
        if let Some(address) = &self.web_address {
            config.web.address = address.clone();
        }
        if let Some(log) = &self.log {
            config.log.file = Some(log.clone());
        }
        Ok(config)
    }
}
