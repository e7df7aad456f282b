use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use rh_fabric::{print_fatal, Sink, SinkEnds, SinkFault};
use rh_types::RequestEvent;

use crate::error::{SinkError, SinkResult};

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Append-only log file sink.
pub struct Logger {
    path: PathBuf,
    details: bool,
    /// Capture endpoint, written once when the log opens.
    listen_url: String,
}

impl Logger {
    pub fn new(path: impl Into<PathBuf>, details: bool, listen_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            details,
            listen_url: listen_url.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> SinkResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| SinkError::Open {
                path: self.path.clone(),
                source,
            })
    }

    async fn append(&self, file: &mut File, event: &RequestEvent) -> SinkResult<()> {
        let at = event.created_at().with_timezone(&Local);
        let mut text = String::new();
        for line in event_lines(event, self.details) {
            text.push_str(&stamp(&at, &line));
        }
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for Logger {
    fn name(&self) -> &'static str {
        "logger"
    }

    async fn run(self: Box<Self>, mut ends: SinkEnds) {
        let mut file = match self.open().await {
            Ok(file) => file,
            Err(err) => {
                print_fatal(&err);
                ends.fail(SinkFault::new(self.name(), &err));
                ends.close();
                return;
            }
        };

        let start = stamp(&Local::now(), &format!("Listening on {}", self.listen_url));
        if let Err(err) = file.write_all(start.as_bytes()).await {
            error!(%err, path = %self.path.display(), "cannot write log start line");
        }
        debug!(path = %self.path.display(), "log file open");

        while let Some(event) = ends.next().await {
            if let Err(err) = self.append(&mut file, &event).await {
                error!(%err, path = %self.path.display(), id = %event.id(), "cannot append event to log");
            }
        }
        if let Err(err) = file.flush().await {
            error!(%err, path = %self.path.display(), "cannot flush log");
        }
        ends.close();
    }
}

/// Lines logged for one event, without timestamps: the request line, then one
/// `Name: values` line per header in alphabetical order when `details` is set.
pub fn event_lines(event: &RequestEvent, details: bool) -> Vec<String> {
    let mut lines = vec![format!("{} {} {}", event.method(), event.url(), event.detail())];
    if details {
        lines.extend(
            event
                .headers()
                .sorted()
                .into_iter()
                .map(|(name, value)| format!("{name}: {value}")),
        );
    }
    lines
}

fn stamp<Tz: TimeZone>(at: &DateTime<Tz>, line: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}: {line}\n", at.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_fabric::{allocate, QuitReason};
    use rh_types::{EventKind, Headers, Params};

    fn request() -> RequestEvent {
        let headers: Headers = [("hello", "world"), ("foo", "bar"), ("hello", "foobar")]
            .into_iter()
            .collect();
        let params: Params = [("foo", "bar")].into_iter().collect();
        RequestEvent::request(EventKind::HttpRequest, "POST", "/foo/bar", headers, params)
    }

    #[test]
    fn request_line_format() {
        let lines = event_lines(&request(), false);
        assert_eq!(lines, vec![r#"POST /foo/bar {"foo" => "bar"}"#.to_string()]);
    }

    #[test]
    fn detail_lines_sorted_and_joined() {
        let lines = event_lines(&request(), true);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "foo: bar");
        assert_eq!(lines[2], "hello: world,foobar");
    }

    #[test]
    fn stamp_prefixes_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(stamp(&at, "GET / "), "2024/03/09 14:05:07: GET / \n");
    }

    #[tokio::test]
    async fn appends_every_event_until_quit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rh.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let (mut ends, fan_out, control) = allocate(&["logger"], 8).unwrap();
        let logger = Box::new(Logger::new(&path, true, "http://localhost:8080"));
        let handle = tokio::spawn(logger.run(ends.remove(0)));

        fan_out.publish(request());
        fan_out.publish(RequestEvent::ws_activity(EventKind::WsMessage, "/chat", "hi"));
        while std::fs::read_to_string(&path).unwrap().lines().count() < 6 {
            tokio::task::yield_now().await;
        }
        control.quit_switch().trip(QuitReason::CaptureStopped);
        handle.await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "previous run");
        assert!(lines[1].ends_with(": Listening on http://localhost:8080"));
        assert!(lines[2].ends_with(r#": POST /foo/bar {"foo" => "bar"}"#));
        assert!(lines[3].ends_with(": foo: bar"));
        assert!(lines[4].ends_with(": hello: world,foobar"));
        assert!(lines[5].ends_with(": RECEIVE /chat hi"));
    }

    #[tokio::test]
    async fn unopenable_file_raises_fault_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("rh.log");

        let (mut ends, _fan_out, control) = allocate(&["printer", "logger"], 8).unwrap();
        let logger = Box::new(Logger::new(&path, false, "http://localhost:8080"));
        let logger_ends = ends.remove(1);
        tokio::spawn(logger.run(logger_ends));

        let reason = control.supervise().await;
        match reason {
            Some(QuitReason::SinkFault(fault)) => {
                assert_eq!(fault.sink, "logger");
                assert!(fault.reason.contains("cannot open log file"));
            }
            other => panic!("unexpected quit reason: {other:?}"),
        }
        // The printer got its quit token.
        assert!(ends[0].next().await.is_none());
    }
}
