use crate::core::{Method, Request, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: Request) -> Response;
}

/// Wrapper for simple closure-based handlers
pub struct FnHandler<F>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    closure: F,
}

impl<F> FnHandler<F>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    pub fn new(closure: F) -> Self {
        Self { closure }
    }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    async fn handle(&self, req: Request) -> Response {
        (self.closure)(req)
    }
}

pub struct Router {
    by_method: HashMap<String, matchit::Router<Arc<dyn Handler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            by_method: HashMap::new(),
        }
    }

    /// Register a route. Panics on a conflicting or malformed pattern, since
    /// routes are fixed at startup.
    pub fn add<S: Into<String>>(&mut self, method: Method, path: S, handler: Arc<dyn Handler>) {
        let key = method.as_str().to_string();
        let r = self.by_method.entry(key).or_default();
        r.insert(path.into(), handler).expect("valid route");
    }

    pub fn get<S: Into<String>>(&mut self, path: S, handler: Arc<dyn Handler>) {
        self.add(Method::GET, path, handler)
    }

    /// Add a GET route with a simple closure handler
    pub fn get_fn<S, F>(&mut self, path: S, handler: F)
    where
        S: Into<String>,
        F: Fn(Request) -> Response + Send + Sync + 'static,
    {
        self.add(Method::GET, path, Arc::new(FnHandler::new(handler)))
    }

    pub fn find(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<dyn Handler>, HashMap<String, String>)> {
        if let Some(r) = self.by_method.get(method.as_str())
            && let Ok(m) = r.at(path)
        {
            let params = m
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            return Some((Arc::clone(m.value), params));
        }

        // HEAD falls back to GET when no explicit HEAD route is present
        if *method == Method::HEAD
            && let Some(rget) = self.by_method.get(Method::GET.as_str())
            && let Ok(m) = rget.at(path)
        {
            let params = m
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            return Some((Arc::clone(m.value), params));
        }

        None
    }

    /// Methods with a route matching `path` (for 405 responses)
    pub fn allowed_methods(&self, path: &str) -> Vec<String> {
        let mut methods: Vec<String> = self
            .by_method
            .iter()
            .filter(|(_, r)| r.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();
        methods.sort();
        methods
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HelloHandler;

    #[async_trait]
    impl Handler for HelloHandler {
        async fn handle(&self, req: Request) -> Response {
            let name = req.param("name").unwrap_or("world");
            Response::text(200, format!("hi {}", name))
        }
    }

    #[tokio::test]
    async fn matchit_basic_param() {
        let mut r = Router::new();
        r.get("/hi/{name}", Arc::new(HelloHandler));

        let (h, params) = r.find(&Method::GET, "/hi/alice").expect("found");
        let req = Request::new(Method::GET, "/hi/alice").with_params(params);
        let res = h.handle(req).await;
        match res.body {
            crate::core::response::Body::Bytes(b) => {
                assert_eq!(std::str::from_utf8(&b).unwrap(), "hi alice");
            }
            _ => panic!("unexpected streaming body"),
        }
    }

    #[test]
    fn head_falls_back_to_get() {
        let mut r = Router::new();
        r.get_fn("/ping", |_req| Response::text(200, "pong"));
        assert!(r.find(&Method::HEAD, "/ping").is_some());
        assert!(r.find(&Method::POST, "/ping").is_none());
        assert_eq!(r.allowed_methods("/ping"), vec!["GET".to_string()]);
    }
}
