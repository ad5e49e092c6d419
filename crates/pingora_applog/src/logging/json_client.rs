use async_trait::async_trait;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::AppLogError;
use crate::logging::client::{log_name, validate_log_name};
use crate::logging::entry::Timestamp;
use crate::logging::{LogClient, LogEntry, LogStream, MonitoredResource, Severity};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Writes entries as one JSON object per line, in the structured format
/// log agents pick up from stdout.
///
/// ```text
/// {"timestamp":{"seconds":1,"nanos":0},"severity":"INFO","message":"hello! /",
///  "logging.googleapis.com/trace":"projects/p/traces/105445aa...","logName":"projects/p/logs/app_log",
///  "resource":{"type":"gae_app","labels":{...}}}
/// ```
#[derive(Clone)]
pub struct JsonLogClient {
    out: SharedWriter,
}

impl JsonLogClient {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Append to the file at `path`, creating it if needed.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, AppLogError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

#[async_trait]
impl LogClient for JsonLogClient {
    async fn open_stream(
        &self,
        parent: &str,
        name: &str,
        resource: MonitoredResource,
    ) -> Result<Arc<dyn LogStream>, AppLogError> {
        validate_log_name(name)?;
        Ok(Arc::new(JsonLogStream {
            log_name: log_name(parent, name),
            resource,
            out: Arc::clone(&self.out),
        }))
    }
}

pub struct JsonLogStream {
    log_name: String,
    resource: MonitoredResource,
    out: SharedWriter,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: Timestamp,
    severity: Severity,
    message: &'a str,
    #[serde(
        rename = "logging.googleapis.com/trace",
        skip_serializing_if = "Option::is_none"
    )]
    trace: Option<&'a str>,
    #[serde(rename = "logName")]
    log_name: &'a str,
    resource: &'a MonitoredResource,
}

impl JsonLogStream {
    fn render(&self, entry: &LogEntry) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(&JsonLine {
            timestamp: entry.timestamp.into(),
            severity: entry.severity,
            message: &entry.payload,
            trace: entry.trace.as_deref(),
            log_name: &self.log_name,
            resource: &self.resource,
        })?;
        line.push(b'\n');
        Ok(line)
    }
}

impl LogStream for JsonLogStream {
    fn log(&self, entry: LogEntry) {
        let line = match self.render(&entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(log_name = self.log_name.as_str(), error = %e, "dropping unserializable log entry");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = out.write_all(&line).and_then(|_| out.flush()) {
            tracing::warn!(log_name = self.log_name.as_str(), error = %e, "failed to write log entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::{Duration, UNIX_EPOCH};

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn lines(sink: &Sink) -> Vec<serde_json::Value> {
        let buf = sink.0.lock().unwrap();
        std::str::from_utf8(&buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn writes_one_json_object_per_entry() {
        let sink = Sink::default();
        let client = JsonLogClient::new(sink.clone());
        let labels = BTreeMap::from([("project_id".to_string(), "my-proj".to_string())]);
        let stream = client
            .open_stream("projects/my-proj", "app_log", MonitoredResource::new("gae_app", labels))
            .await
            .unwrap();

        let mut entry = LogEntry::new(Severity::Warning, "disk at 91%")
            .with_trace(Some("projects/my-proj/traces/abc".into()));
        entry.timestamp = UNIX_EPOCH + Duration::new(1_760_000_000, 42);
        stream.log(entry);
        stream.log(LogEntry::new(Severity::Debug, "no trace"));

        let got = lines(&sink);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0]["severity"], "WARNING");
        assert_eq!(got[0]["message"], "disk at 91%");
        assert_eq!(got[0]["timestamp"]["seconds"], 1_760_000_000u64);
        assert_eq!(got[0]["timestamp"]["nanos"], 42);
        assert_eq!(got[0]["logging.googleapis.com/trace"], "projects/my-proj/traces/abc");
        assert_eq!(got[0]["logName"], "projects/my-proj/logs/app_log");
        assert_eq!(got[0]["resource"]["type"], "gae_app");
        assert_eq!(got[0]["resource"]["labels"]["project_id"], "my-proj");

        assert_eq!(got[1]["severity"], "DEBUG");
        assert!(got[1].get("logging.googleapis.com/trace").is_none());
    }

    #[tokio::test]
    async fn appends_to_a_file() {
        let path = std::env::temp_dir().join(format!("applog-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let client = JsonLogClient::append_to(&path).unwrap();
        let stream = client
            .open_stream("projects/p", "app_log", MonitoredResource::new("gae_app", BTreeMap::new()))
            .await
            .unwrap();
        stream.log(LogEntry::new(Severity::Info, "one"));
        stream.log(LogEntry::new(Severity::Error, "two"));

        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let severities: Vec<String> = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["severity"].to_string())
            .collect();
        assert_eq!(severities, vec!["\"INFO\"", "\"ERROR\""]);
    }

    #[test]
    fn unopenable_path_is_an_io_error() {
        let dir = std::env::temp_dir();
        assert!(matches!(JsonLogClient::append_to(&dir), Err(AppLogError::Io(_))));
    }
}
