use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::AppLogError;
use crate::logging::client::{log_name, validate_log_name};
use crate::logging::{LogClient, LogEntry, LogStream, MonitoredResource, Severity};

/// A log client that re-emits entries as `tracing` events
#[derive(Debug, Clone, Default)]
pub struct TracingLogClient;

impl TracingLogClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogClient for TracingLogClient {
    async fn open_stream(
        &self,
        parent: &str,
        name: &str,
        _resource: MonitoredResource,
    ) -> Result<Arc<dyn LogStream>, AppLogError> {
        validate_log_name(name)?;
        Ok(Arc::new(TracingLogStream {
            log_name: log_name(parent, name),
        }))
    }
}

#[derive(Debug)]
pub struct TracingLogStream {
    log_name: String,
}

impl LogStream for TracingLogStream {
    fn log(&self, entry: LogEntry) {
        let log_name = self.log_name.as_str();
        let trace = entry.trace.as_deref().unwrap_or("");
        let msg = entry.payload;
        match entry.severity {
            Severity::Critical => error!(log_name, trace, critical = true, "{}", msg),
            Severity::Error => error!(log_name, trace, "{}", msg),
            Severity::Warning => warn!(log_name, trace, "{}", msg),
            Severity::Info => info!(log_name, trace, "{}", msg),
            Severity::Debug => debug!(log_name, trace, "{}", msg),
        }
    }
}
