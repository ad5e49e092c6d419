pub mod buffered;
pub mod client;
pub mod context;
pub mod emit;
pub mod entry;
pub mod json_client;
pub mod memory_client;
pub mod tracing_client;

pub use buffered::{BufferedLogClient, BufferedLogStream};
pub use client::{LogClient, LogStream, MonitoredResource};
pub use context::{LogContext, RequestLog, TRACE_CONTEXT_HEADER, trace_from_header};
pub use emit::{critical, debug, error, info, log, warning};
pub use entry::{LogEntry, Severity, Timestamp};
pub use json_client::{JsonLogClient, JsonLogStream};
pub use memory_client::{MemoryLogClient, MemoryLogStream};
pub use tracing_client::{TracingLogClient, TracingLogStream};
