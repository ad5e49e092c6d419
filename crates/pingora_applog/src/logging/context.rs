use http::{HeaderMap, HeaderValue};
use std::fmt;
use std::sync::Arc;

use crate::core::Request;
use crate::logging::{LogEntry, LogStream, Severity};

/// Distributed-tracing header, `<trace-id>/<span-id>;o=<options>`.
pub const TRACE_CONTEXT_HEADER: &str = "x-cloud-trace-context";

/// Logging state attached to a single in-flight request.
///
/// Built by [`AppLog`](crate::AppLog) for every request it sees and stored in
/// the request's share data. It holds the stream opened at wrap time, the
/// project prefix and the request's trace header, so a clone can be moved into
/// tasks spawned on behalf of the request.
#[derive(Clone)]
pub struct RequestLog {
    parent: Arc<str>,
    stream: Arc<dyn LogStream>,
    trace_header: Option<HeaderValue>,
}

impl RequestLog {
    pub fn new(parent: Arc<str>, stream: Arc<dyn LogStream>, headers: &HeaderMap) -> Self {
        Self {
            parent,
            stream,
            trace_header: headers.get(TRACE_CONTEXT_HEADER).cloned(),
        }
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn stream(&self) -> &Arc<dyn LogStream> {
        &self.stream
    }

    /// Trace name for entries of this request, if the request carried one.
    pub fn trace(&self) -> Option<String> {
        trace_from_header(&self.parent, self.trace_header.as_ref()?.as_bytes())
    }

    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) {
        let entry = LogEntry::new(severity, args.to_string()).with_trace(self.trace());
        self.stream.log(entry);
    }
}

impl fmt::Debug for RequestLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLog")
            .field("parent", &self.parent)
            .field("trace_header", &self.trace_header)
            .finish_non_exhaustive()
    }
}

/// `<parent>/traces/<id>`, where `<id>` is everything before the first `/`.
///
/// A header without `/` is used whole; an empty header yields no trace.
/// Bytes are not validated: anything that is not UTF-8 is replaced with U+FFFD.
pub fn trace_from_header(parent: &str, header: impl AsRef<[u8]>) -> Option<String> {
    let header = header.as_ref();
    if header.is_empty() {
        return None;
    }
    let end = header.iter().position(|&b| b == b'/').unwrap_or(header.len());
    let trace_id = String::from_utf8_lossy(&header[..end]);
    Some(format!("{parent}/traces/{trace_id}"))
}

/// Anything a [`RequestLog`] can be resolved from.
pub trait LogContext {
    /// `None` when no logging middleware ran for this context.
    fn request_log(&self) -> Option<&RequestLog>;
}

impl LogContext for Request {
    fn request_log(&self) -> Option<&RequestLog> {
        self.request_share_data_ref::<RequestLog>()
    }
}

impl LogContext for RequestLog {
    fn request_log(&self) -> Option<&RequestLog> {
        Some(self)
    }
}

impl LogContext for Arc<RequestLog> {
    fn request_log(&self) -> Option<&RequestLog> {
        Some(self.as_ref())
    }
}

impl<T: LogContext> LogContext for Option<T> {
    fn request_log(&self) -> Option<&RequestLog> {
        self.as_ref().and_then(LogContext::request_log)
    }
}

impl<T: LogContext + ?Sized> LogContext for &T {
    fn request_log(&self) -> Option<&RequestLog> {
        (**self).request_log()
    }
}
