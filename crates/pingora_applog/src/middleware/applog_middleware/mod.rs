use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{AppLogConfig, stream_name_or_default};
use crate::core::{Handler, Request, Response};
use crate::error::AppLogError;
use crate::logging::{LogClient, LogStream, MonitoredResource, RequestLog};
use crate::middleware::{Middleware, compose};


/// Request logging middleware.
///
/// Holds the one log stream opened at setup and, for each request passing
/// through, attaches a [`RequestLog`] to the request before calling the next
/// handler. The response is passed back untouched.
#[derive(Clone)]
pub struct AppLog {
    parent: Arc<str>,
    stream: Arc<dyn LogStream>,
}

impl AppLog {
    /// Open `stream_name` on `client`, reading the deployment from the
    /// environment.
    pub async fn open<C>(stream_name: &str, client: &C) -> Result<Self, AppLogError>
    where
        C: LogClient + ?Sized,
    {
        Self::open_with_config(stream_name, &AppLogConfig::from_env(), client).await
    }

    pub async fn open_with_config<C>(
        stream_name: &str,
        config: &AppLogConfig,
        client: &C,
    ) -> Result<Self, AppLogError>
    where
        C: LogClient + ?Sized,
    {
        let parent = config.parent()?;
        let name = stream_name_or_default(stream_name);
        let stream = client
            .open_stream(&parent, name, MonitoredResource::from_config(config))
            .await?;

        tracing::info!(
            parent = parent.as_str(),
            log_name = name,
            service = config.service.as_str(),
            version = config.version.as_str(),
            "application log stream opened"
        );

        Ok(Self {
            parent: parent.into(),
            stream,
        })
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn stream(&self) -> &Arc<dyn LogStream> {
        &self.stream
    }

    /// Attach this binding's request log to `req`.
    pub fn attach(&self, req: &mut Request) {
        let request_log = RequestLog::new(
            Arc::clone(&self.parent),
            Arc::clone(&self.stream),
            req.headers(),
        );
        req.set_request_share_data(Arc::new(request_log));
    }

    /// Put `handler` behind this middleware.
    pub fn wrap_handler(self, handler: Arc<dyn Handler>) -> Arc<dyn Handler> {
        compose(&[Arc::new(self) as Arc<dyn Middleware>], handler)
    }
}

#[async_trait]
impl Middleware for AppLog {
    async fn handle(&self, mut req: Request, next: Arc<dyn Handler>) -> Response {
        self.attach(&mut req);
        next.handle(req).await
    }
}

/// Wrap `handler` so every request it serves carries a [`RequestLog`] for
/// stream `stream_name` (`app_log` when empty).
///
/// Fails when `GOOGLE_CLOUD_PROJECT` is unset or `client` cannot open the
/// stream; the handler is not wrapped in that case.
pub async fn wrap<C>(
    handler: Arc<dyn Handler>,
    stream_name: &str,
    client: &C,
) -> Result<Arc<dyn Handler>, AppLogError>
where
    C: LogClient + ?Sized,
{
    wrap_with_config(handler, stream_name, &AppLogConfig::from_env(), client).await
}

/// Like [`wrap`], with the deployment given explicitly.
pub async fn wrap_with_config<C>(
    handler: Arc<dyn Handler>,
    stream_name: &str,
    config: &AppLogConfig,
    client: &C,
) -> Result<Arc<dyn Handler>, AppLogError>
where
    C: LogClient + ?Sized,
{
    let applog = AppLog::open_with_config(stream_name, config, client).await?;
    Ok(applog.wrap_handler(handler))
}
