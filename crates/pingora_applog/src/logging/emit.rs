//! Severity-keyed entry points.
//!
//! Each function resolves the [`RequestLog`](super::RequestLog) from `ctx` and
//! hands one entry to its stream. Without a request log they return at once,
//! before `args` is rendered, so calls are safe in code that may run outside a
//! wrapped handler (tests, background jobs).

use std::fmt;

use super::{LogContext, Severity};

pub fn critical<C: LogContext + ?Sized>(ctx: &C, args: fmt::Arguments<'_>) {
    log(ctx, Severity::Critical, args)
}

pub fn error<C: LogContext + ?Sized>(ctx: &C, args: fmt::Arguments<'_>) {
    log(ctx, Severity::Error, args)
}

pub fn warning<C: LogContext + ?Sized>(ctx: &C, args: fmt::Arguments<'_>) {
    log(ctx, Severity::Warning, args)
}

pub fn info<C: LogContext + ?Sized>(ctx: &C, args: fmt::Arguments<'_>) {
    log(ctx, Severity::Info, args)
}

pub fn debug<C: LogContext + ?Sized>(ctx: &C, args: fmt::Arguments<'_>) {
    log(ctx, Severity::Debug, args)
}

pub fn log<C: LogContext + ?Sized>(ctx: &C, severity: Severity, args: fmt::Arguments<'_>) {
    if let Some(request_log) = ctx.request_log() {
        request_log.log(severity, args);
    }
}

/// `log_critical!(req, "db down: {}", err)`
#[macro_export]
macro_rules! log_critical {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::logging::critical(&$ctx, ::std::format_args!($($arg)+))
    };
}

/// `log_error!(req, "lookup failed: {}", err)`
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::logging::error(&$ctx, ::std::format_args!($($arg)+))
    };
}

/// `log_warning!(req, "slow upstream: {}ms", ms)`
#[macro_export]
macro_rules! log_warning {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::logging::warning(&$ctx, ::std::format_args!($($arg)+))
    };
}

/// `log_info!(req, "hello! {}", req.path())`
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::logging::info(&$ctx, ::std::format_args!($($arg)+))
    };
}

/// `log_debug!(req, "cache miss for {}", key)`
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::logging::debug(&$ctx, ::std::format_args!($($arg)+))
    };
}
