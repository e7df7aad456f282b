use std::io::{self, Write};

use async_trait::async_trait;
use colored::{ColoredString, Colorize};
use tracing::{error, warn};

use rh_fabric::{Sink, SinkEnds};
use rh_types::{EventKind, RequestEvent};

use crate::table::header_table;

/// Terminal sink: one summary line per event, plus a header table when
/// details are enabled.
pub struct Printer {
    details: bool,
    out: Box<dyn Write + Send>,
}

impl Printer {
    /// Printer writing to stdout.
    pub fn new(details: bool) -> Self {
        Self::with_writer(details, Box::new(io::stdout()))
    }

    pub fn with_writer(details: bool, out: Box<dyn Write + Send>) -> Self {
        Self { details, out }
    }

    fn render(&mut self, event: &RequestEvent) -> io::Result<()> {
        writeln!(self.out, "{}", summary_line(event))?;
        if self.details {
            let table = header_table(event.headers());
            if !table.is_empty() {
                writeln!(self.out, "{table}\n")?;
            }
        }
        self.out.flush()
    }
}

#[async_trait]
impl Sink for Printer {
    fn name(&self) -> &'static str {
        "printer"
    }

    /// Rendering blocks on the terminal, so it runs on the blocking pool.
    async fn run(self: Box<Self>, mut ends: SinkEnds) {
        let mut printer = self;
        while let Some(event) = ends.next().await {
            let rendered = tokio::task::spawn_blocking(move || {
                let result = printer.render(&event);
                (printer, event, result)
            })
            .await;
            match rendered {
                Ok((back, event, result)) => {
                    printer = back;
                    if let Err(err) = result {
                        warn!(%err, id = %event.id(), "printer could not render event");
                    }
                }
                Err(err) => {
                    error!(%err, "printer task failed");
                    break;
                }
            }
        }
        ends.close();
    }
}

/// `<METHOD> <url> <detail>`, styled for the terminal.
pub fn summary_line(event: &RequestEvent) -> String {
    let detail = event.detail();
    let mut line = format!("{} {}", method_tag(event), event.url().white());
    if !detail.is_empty() {
        line.push(' ');
        line.push_str(&detail.dimmed().to_string());
    }
    line
}

fn method_tag(event: &RequestEvent) -> ColoredString {
    let tag = format!(" {} ", event.method());
    match event.kind() {
        EventKind::HttpRequest | EventKind::WsConnect => tag.white().on_bright_black(),
        EventKind::WsMessage => tag.black().on_cyan(),
        EventKind::WsDisconnect => tag.black().on_yellow(),
        EventKind::WsError => tag.white().on_red(),
    }
}
