use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{AppLogConfig, RESOURCE_KIND};
use crate::error::AppLogError;
use crate::logging::LogEntry;

const MAX_LOG_NAME_LEN: usize = 512;

/// The deployment a log stream describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub labels: BTreeMap<String, String>,
}

impl MonitoredResource {
    pub fn new(kind: impl Into<String>, labels: BTreeMap<String, String>) -> Self {
        Self {
            kind: kind.into(),
            labels,
        }
    }

    /// `gae_app` resource labelled with the configured service, version and project.
    pub fn from_config(config: &AppLogConfig) -> Self {
        Self::new(RESOURCE_KIND, config.labels())
    }
}

/// A named remote log stream. Shared by every request that passes through
/// one wrapped handler, so implementations must tolerate concurrent calls.
pub trait LogStream: Send + Sync + 'static {
    /// Hand off one entry. Must not block on the network.
    fn log(&self, entry: LogEntry);
}

/// Opens log streams on a logging backend.
#[async_trait]
pub trait LogClient: Send + Sync {
    async fn open_stream(
        &self,
        parent: &str,
        name: &str,
        resource: MonitoredResource,
    ) -> Result<Arc<dyn LogStream>, AppLogError>;
}

/// Full resource name of a stream, `<parent>/logs/<name>`, with `/` in
/// `name` percent-encoded as the log id requires.
pub fn log_name(parent: &str, name: &str) -> String {
    format!("{parent}/logs/{}", name.replace('/', "%2F"))
}

/// Reject stream names a logging backend would refuse.
pub fn validate_log_name(name: &str) -> Result<(), AppLogError> {
    if name.is_empty() || name.len() > MAX_LOG_NAME_LEN {
        return Err(AppLogError::connect(
            name,
            format!("log name must be 1..={MAX_LOG_NAME_LEN} bytes"),
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '/' | '_' | '-' | '.')))
    {
        return Err(AppLogError::connect(
            name,
            format!("invalid character {c:?} in log name"),
        ));
    }
    Ok(())
}
