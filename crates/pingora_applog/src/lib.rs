//! Request-scoped application logging for Pingora servers.
//!
//! [`AppLog`] opens one log stream when the server starts and attaches a
//! [`RequestLog`] to every request it sees. Handlers then log through
//! [`log_info!`] and friends; entries carry the request's
//! `X-Cloud-Trace-Context` trace so a logging backend can group them by
//! request.
//!
//! ```no_run
//! use pingora_applog::{BufferedLogClient, JsonLogClient, Request, Response, Router, log_info, wrap};
//! use std::sync::Arc;
//!
//! # async fn setup() -> Result<(), pingora_applog::AppLogError> {
//! let mut router = Router::new();
//! router.get_fn("/", |req: Request| {
//!     log_info!(req, "hello! {}", req.path());
//!     Response::text(200, "ok")
//! });
//! let app = pingora_applog::App::new(router);
//! let client = BufferedLogClient::new(JsonLogClient::stdout());
//! let handler = wrap(Arc::new(app), "app_log", &client).await?;
//! # drop(handler);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod middleware;

// Re-export commonly used types at the crate root
pub use crate::core::*;
pub use config::AppLogConfig;
pub use error::AppLogError;
pub use http::StatusCode;
pub use logging::{
    BufferedLogClient, JsonLogClient, LogClient, LogContext, LogEntry, LogStream,
    MemoryLogClient, MonitoredResource, RequestLog, Severity, TRACE_CONTEXT_HEADER,
    TracingLogClient,
};
pub use middleware::*;

use async_trait::async_trait;
use futures::StreamExt;
use http::Response as HttpResponse;
use pingora::protocols::http::ServerSession;
use pingora::server::ShutdownWatch;
use pingora_core::apps::{
    HttpPersistentSettings, HttpServerApp, HttpServerOptions, ReusedHttpStream,
};
use pingora_core::services::listening::Service;
use pingora_http::ResponseHeader;
use std::collections::HashMap;
use std::sync::Arc;

/// The main application: holds router and middleware.
pub struct App {
    router: Router,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
}

/// Default 404 handler
struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, _req: Request) -> Response {
        Response::text(404, "Not Found")
    }
}

impl App {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            middlewares: Vec::new(),
        }
    }

    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Handle a request end-to-end through middlewares and the router.
    pub async fn handle(&self, req: Request) -> Response {
        let find_result = self.router.find(req.method(), req.path());
        let (handler, params): (Arc<dyn Handler>, HashMap<String, String>) = match find_result {
            Some(found) => found,
            None => {
                let mut allowed = self.router.allowed_methods(req.path());
                if *req.method() == Method::OPTIONS {
                    allowed.push("OPTIONS".to_string());
                    allowed.sort();
                    allowed.dedup();
                    return Response::empty(204).header(http::header::ALLOW, allowed.join(", "));
                }
                if !allowed.is_empty() {
                    return Response::text(405, "Method Not Allowed")
                        .header(http::header::ALLOW, allowed.join(", "));
                }
                (Arc::new(NotFoundHandler), HashMap::new())
            }
        };

        // Compose middlewares (onion model) around the route handler
        let entry = compose(&self.middlewares, handler);
        let mut response = entry.handle(req.with_params(params)).await;

        self.finalize_response_headers(&mut response);
        response
    }

    /// Set content-length or transfer-encoding unless the handler already did
    fn finalize_response_headers(&self, response: &mut Response) {
        if response.headers.contains_key(http::header::CONTENT_LENGTH)
            || response
                .headers
                .contains_key(http::header::TRANSFER_ENCODING)
        {
            return;
        }

        match &response.body {
            Body::Bytes(bytes) => {
                response
                    .headers
                    .insert(http::header::CONTENT_LENGTH, http::HeaderValue::from(bytes.len()));
            }
            Body::Stream(_) => {
                response.headers.insert(
                    http::header::TRANSFER_ENCODING,
                    http::HeaderValue::from_static("chunked"),
                );
            }
        }
    }

    /// Turn the app into a Pingora listening service.
    pub fn to_service(self, name: &str) -> Service<App> {
        Service::new(name.to_string(), self)
    }
}

/// Lets a whole app be passed to [`wrap`] like any other handler.
#[async_trait]
impl Handler for App {
    async fn handle(&self, req: Request) -> Response {
        App::handle(self, req).await
    }
}

#[async_trait]
impl HttpServerApp for App {
    async fn process_new_http(
        self: &Arc<Self>,
        mut http: ServerSession,
        shutdown: &ShutdownWatch,
    ) -> Option<ReusedHttpStream> {
        if !(http.read_request().await.ok()?) {
            return None;
        }
        if *shutdown.borrow() {
            http.set_keepalive(None);
        } else {
            http.set_keepalive(Some(60));
        }

        let reqh = http.req_header();
        let path = String::from_utf8_lossy(reqh.raw_path()).to_string();
        let is_head = reqh.method == Method::HEAD;

        let mut req = Request::new(reqh.method.clone(), path);
        for (name, value) in reqh.headers.iter() {
            req.headers_mut().append(name.clone(), value.clone());
        }

        // Read the body only when headers announce one
        if !is_head {
            let has_te = req.headers().contains_key("transfer-encoding");
            let has_len = req
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0)
                > 0;
            if (has_te || has_len)
                && let Ok(Some(bytes)) = http.read_request_body().await
            {
                req = req.with_body(bytes);
            }
        }

        let res = self.handle(req).await;

        let mut builder = HttpResponse::builder().status(res.status);
        for (k, v) in res.headers.iter() {
            builder = builder.header(k, v);
        }
        let (parts, _) = builder.body(()).ok()?.into_parts();
        let resp_header: ResponseHeader = parts.into();
        if http
            .write_response_header(Box::new(resp_header))
            .await
            .is_err()
        {
            return None;
        }

        // HEAD responses carry no body
        if !is_head {
            match res.body {
                Body::Bytes(bytes) => {
                    let _ = http.write_response_body(bytes, true).await;
                }
                Body::Stream(mut s) => {
                    while let Some(chunk) = s.next().await {
                        if http.write_response_body(chunk, false).await.is_err() {
                            break;
                        }
                    }
                    let _ = http.write_response_body(bytes::Bytes::new(), true).await;
                }
            }
        }

        let persistent_settings = HttpPersistentSettings::for_session(&http);
        match http.finish().await {
            Ok(c) => c.map(|s| ReusedHttpStream::new(s, Some(persistent_settings))),
            Err(_) => None,
        }
    }

    fn h2_options(&self) -> Option<pingora::protocols::http::v2::server::H2Options> {
        None
    }

    fn server_options(&self) -> Option<&HttpServerOptions> {
        None
    }
}
