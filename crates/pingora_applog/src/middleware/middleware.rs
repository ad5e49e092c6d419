use async_trait::async_trait;
use std::sync::Arc;

use crate::core::{Handler, Request, Response};

/// Middleware trait for processing requests
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Process the request, optionally calling the next handler
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Response;
}

/// Adapts a middleware plus its successor into a plain handler
struct MiddlewareHandler {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for MiddlewareHandler {
    async fn handle(&self, req: Request) -> Response {
        self.middleware.handle(req, Arc::clone(&self.next)).await
    }
}

/// Compose multiple middlewares around a final handler.
/// The first registered middleware ends up outermost.
pub fn compose(
    middlewares: &[Arc<dyn Middleware>],
    final_handler: Arc<dyn Handler>,
) -> Arc<dyn Handler> {
    middlewares
        .iter()
        .rev()
        .fold(final_handler, |next, middleware| {
            Arc::new(MiddlewareHandler {
                middleware: Arc::clone(middleware),
                next,
            }) as Arc<dyn Handler>
        })
}
