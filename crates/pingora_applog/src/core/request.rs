use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri};

/// An inbound request plus its route params and request-scoped data.
#[derive(Debug)]
pub struct Request {
    pub inner: http::Request<Bytes>,
    pub params: HashMap<String, String>,
    pub extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>, // request-level data
}

impl Request {
    pub fn new<M: Into<Method>, S: AsRef<str>>(method: M, path: S) -> Self {
        let inner = http::Request::builder()
            .method(method.into())
            .uri(path.as_ref())
            .body(Bytes::new())
            .unwrap_or_else(|_| http::Request::new(Bytes::new()));

        Self {
            inner,
            params: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    pub fn header<K, V>(mut self, k: K, v: V) -> Self
    where
        K: TryInto<http::HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: std::fmt::Debug,
        V::Error: std::fmt::Debug,
    {
        if let (Ok(key), Ok(value)) = (k.try_into(), v.try_into()) {
            self.inner.headers_mut().insert(key, value);
        }
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        *self.inner.body_mut() = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap<HeaderValue> {
        self.inner.headers_mut()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    // --- Request-level shared data (extensions) ---
    pub fn set_request_share_data<T: Send + Sync + 'static>(
        &mut self,
        value: Arc<T>,
    ) -> Option<Arc<T>> {
        let prev = self
            .extensions
            .insert(TypeId::of::<T>(), value as Arc<dyn Any + Send + Sync>);
        prev.and_then(|prev_any| prev_any.downcast::<T>().ok())
    }

    pub fn get_request_share_data<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.extensions
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|stored| stored.downcast::<T>().ok())
    }

    /// Borrow request-level data without bumping its refcount.
    pub fn request_share_data_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|stored| stored.downcast_ref::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_data_round_trips_by_type() {
        let mut req = Request::new(Method::GET, "/n");
        assert!(req.set_request_share_data(Arc::new(7u32)).is_none());
        let prev = req.set_request_share_data(Arc::new(8u32));
        assert_eq!(prev.as_deref(), Some(&7));

        assert_eq!(req.request_share_data_ref::<u32>(), Some(&8));
        assert_eq!(req.get_request_share_data::<u32>().as_deref(), Some(&8));
        assert!(req.request_share_data_ref::<u64>().is_none());
    }

    #[test]
    fn header_builder_skips_invalid_values() {
        let req = Request::new(Method::GET, "/")
            .header("x-ok", "yes")
            .header("x-bad", "line\nbreak");
        assert_eq!(req.headers().get("x-ok").unwrap(), "yes");
        assert!(!req.headers().contains_key("x-bad"));
    }
}
