use async_trait::async_trait;
use pingora::server::Server;
use pingora_applog::{
    App, AppLog, BufferedLogClient, Handler, JsonLogClient, LogContext, Request, Response,
    Router, log_debug, log_info, log_warning,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct HomeHandler;

#[async_trait]
impl Handler for HomeHandler {
    async fn handle(&self, req: Request) -> Response {
        log_info!(req, "hello! {}", req.path());
        Response::text(200, "ok")
    }
}

/// Echoes the trace name entries of this request are filed under.
struct TraceHandler;

#[async_trait]
impl Handler for TraceHandler {
    async fn handle(&self, req: Request) -> Response {
        let trace = req.request_log().and_then(|log| log.trace());
        if trace.is_none() {
            log_warning!(req, "request without X-Cloud-Trace-Context");
        }
        Response::json(200, serde_json::json!({ "trace": trace }))
    }
}

fn main() {
    // Diagnostics go to stderr; application entries go to stdout as JSON lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut router = Router::new();
    router.get("/", Arc::new(HomeHandler));
    router.get("/trace", Arc::new(TraceHandler));
    router.get_fn("/items/{id}", |req| {
        let id = req.param("id").unwrap_or_default().to_string();
        log_debug!(req, "looking up item {}", id);
        Response::text(200, format!("item {id}"))
    });

    let applog = match open_applog() {
        Ok(applog) => applog,
        Err(e) => {
            tracing::error!(error = %e, "request logging unavailable");
            std::process::exit(1);
        }
    };

    let mut app = App::new(router);
    app.use_middleware(applog);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = addr.as_str(), "starting applog example");

    if let Err(e) = run_server(app, &addr) {
        tracing::error!(error = %e, "server error");
    }
}

fn open_applog() -> Result<AppLog, Box<dyn std::error::Error>> {
    // Stream setup is the only async step; run it before Pingora takes over.
    // The buffered stream drains on its own thread, so this runtime can go.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let client = BufferedLogClient::new(JsonLogClient::stdout());
    Ok(rt.block_on(AppLog::open("app_log", &client))?)
}

fn run_server(app: App, addr: &str) -> std::io::Result<()> {
    let mut server = Server::new(None).map_err(|e| std::io::Error::other(e.to_string()))?;
    server.bootstrap();

    let mut service = app.to_service("applog example");
    service.add_tcp(addr);
    server.add_service(service);

    server.run_forever()
}
