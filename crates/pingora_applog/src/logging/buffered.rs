use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;

use crate::error::AppLogError;
use crate::logging::{LogClient, LogEntry, LogStream, MonitoredResource};

/// Moves delivery off the request path: `log` only enqueues, and a dedicated
/// thread feeds the inner stream in order.
///
/// The drain thread does not belong to any Tokio runtime, so a stream opened
/// on a short-lived setup runtime keeps delivering after that runtime is gone.
/// It exits once the stream is dropped and the queue is empty.
pub struct BufferedLogStream {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl BufferedLogStream {
    pub fn spawn(inner: Arc<dyn LogStream>) -> io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogEntry>();
        thread::Builder::new()
            .name("applog-drain".to_string())
            .spawn(move || {
                while let Some(entry) = rx.blocking_recv() {
                    inner.log(entry);
                }
            })?;
        Ok(Self { tx })
    }
}

impl LogStream for BufferedLogStream {
    fn log(&self, entry: LogEntry) {
        if self.tx.send(entry).is_err() {
            tracing::warn!("log drain thread has stopped; entry dropped");
        }
    }
}

/// Wraps every stream opened by `inner` in a [`BufferedLogStream`].
#[derive(Clone)]
pub struct BufferedLogClient<C> {
    inner: C,
}

impl<C: LogClient> BufferedLogClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: LogClient> LogClient for BufferedLogClient<C> {
    async fn open_stream(
        &self,
        parent: &str,
        name: &str,
        resource: MonitoredResource,
    ) -> Result<Arc<dyn LogStream>, AppLogError> {
        let inner = self.inner.open_stream(parent, name, resource).await?;
        let stream = BufferedLogStream::spawn(inner).map_err(|e| AppLogError::connect(name, e))?;
        Ok(Arc::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{MemoryLogClient, MemoryLogStream, Severity};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn resource() -> MonitoredResource {
        MonitoredResource::new("gae_app", BTreeMap::new())
    }

    fn wait_for(stream: &MemoryLogStream, n: usize) {
        for _ in 0..200 {
            if stream.entries().len() >= n {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[tokio::test]
    async fn entries_reach_inner_stream_in_order() {
        let memory = MemoryLogClient::new();
        let client = BufferedLogClient::new(memory.clone());
        let stream = client
            .open_stream("projects/p", "app_log", resource())
            .await
            .unwrap();

        for i in 0..50 {
            stream.log(LogEntry::new(Severity::Info, format!("{i}")));
        }

        let inner = memory.streams().pop().unwrap();
        wait_for(&inner, 50);
        let payloads: Vec<String> = inner.entries().into_iter().map(|e| e.payload).collect();
        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(payloads, expected);
    }

    #[tokio::test]
    async fn open_errors_pass_through() {
        let client = BufferedLogClient::new(MemoryLogClient::failing("boom"));
        let res = client.open_stream("projects/p", "app_log", resource()).await;
        assert!(matches!(res, Err(AppLogError::Connect { .. })));
    }

    #[test]
    fn stream_outlives_the_runtime_that_opened_it() {
        let memory = MemoryLogClient::new();
        let client = BufferedLogClient::new(memory.clone());

        let setup = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let stream = setup
            .block_on(client.open_stream("projects/p", "app_log", resource()))
            .unwrap();
        drop(setup);

        let serving = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let logged = Arc::clone(&stream);
        serving
            .block_on(tokio::spawn(async move {
                logged.log(LogEntry::new(Severity::Info, "after setup"));
            }))
            .unwrap();

        let inner = memory.streams().pop().unwrap();
        wait_for(&inner, 1);
        assert_eq!(inner.entries().len(), 1);
        assert_eq!(inner.entries()[0].payload, "after setup");
    }

    #[test]
    fn opens_without_a_tokio_runtime() {
        let memory = MemoryLogClient::new();
        let client = BufferedLogClient::new(memory.clone());
        let stream = futures::executor::block_on(client.open_stream("projects/p", "audit", resource()))
            .unwrap();
        stream.log(LogEntry::new(Severity::Error, "no runtime"));

        let inner = memory.streams().pop().unwrap();
        wait_for(&inner, 1);
        assert_eq!(inner.entries()[0].severity, Severity::Error);
    }
}
