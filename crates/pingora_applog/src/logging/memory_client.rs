use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AppLogError;
use crate::logging::client::{log_name, validate_log_name};
use crate::logging::{LogClient, LogEntry, LogStream, MonitoredResource};

/// In-process log client that keeps every entry in memory.
///
/// Each `open_stream` call yields a fresh stream, even for a name that was
/// opened before, mirroring a backend where every logger has its own buffer.
#[derive(Clone, Default)]
pub struct MemoryLogClient {
    streams: Arc<Mutex<Vec<Arc<MemoryLogStream>>>>,
    fail_with: Option<String>,
}

impl MemoryLogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose `open_stream` always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Open a stream without a resource descriptor.
    pub fn open(&self, parent: &str, name: &str) -> Arc<MemoryLogStream> {
        self.register(parent, name, None)
    }

    /// Every stream opened so far, in open order.
    pub fn streams(&self) -> Vec<Arc<MemoryLogStream>> {
        lock(&self.streams).clone()
    }

    /// Entries across all streams, in stream order.
    pub fn all_entries(&self) -> Vec<LogEntry> {
        self.streams()
            .iter()
            .flat_map(|s| s.entries())
            .collect()
    }

    fn register(
        &self,
        parent: &str,
        name: &str,
        resource: Option<MonitoredResource>,
    ) -> Arc<MemoryLogStream> {
        let stream = Arc::new(MemoryLogStream {
            log_name: log_name(parent, name),
            resource,
            entries: Mutex::new(Vec::new()),
        });
        lock(&self.streams).push(Arc::clone(&stream));
        stream
    }
}

#[async_trait]
impl LogClient for MemoryLogClient {
    async fn open_stream(
        &self,
        parent: &str,
        name: &str,
        resource: MonitoredResource,
    ) -> Result<Arc<dyn LogStream>, AppLogError> {
        if let Some(reason) = &self.fail_with {
            return Err(AppLogError::connect(name, reason.clone()));
        }
        validate_log_name(name)?;
        Ok(self.register(parent, name, Some(resource)))
    }
}

pub struct MemoryLogStream {
    log_name: String,
    resource: Option<MonitoredResource>,
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogStream {
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    pub fn resource(&self) -> Option<&MonitoredResource> {
        self.resource.as_ref()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).clone()
    }
}

impl LogStream for MemoryLogStream {
    fn log(&self, entry: LogEntry) {
        lock(&self.entries).push(entry);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
