#![allow(clippy::module_inception)]
pub mod applog_middleware;
pub mod middleware;

pub use applog_middleware::{AppLog, wrap, wrap_with_config};
pub use middleware::{Middleware, compose};
