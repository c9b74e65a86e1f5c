#![forbid(unsafe_code)]

//! Transports: the live collaborator seam, replay in front of it, and
//! capture behind it.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::{RequestCache, Snapshot};
use crate::error::{SnapshotError, TransportError};
use crate::request::{Request, RequestRecord, Response};

/// Something that can carry a request to a server.
pub trait HttpBackend {
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<B: HttpBackend + ?Sized> HttpBackend for &B {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<B: HttpBackend + ?Sized> HttpBackend for Box<B> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type CompletionHook = Box<dyn Fn() + Send + Sync>;

/// Serves captured records first and falls through to `inner` once an
/// identity is exhausted.
pub struct CachedBackend<B> {
    inner: B,
    cache: Mutex<RequestCache>,
    on_complete: Option<CompletionHook>,
}

impl<B: HttpBackend> CachedBackend<B> {
    pub fn new(inner: B, cache: RequestCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
            on_complete: None,
        }
    }

    /// Run `hook` after every completed request, cached or live.
    #[must_use]
    pub fn with_completion_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    /// Unconsumed cached records for `identity`.
    #[must_use]
    pub fn remaining(&self, identity: &str) -> usize {
        lock(&self.cache).remaining(identity)
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: HttpBackend> HttpBackend for CachedBackend<B> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let identity = request.identity();
        let cached = lock(&self.cache).lookup(&identity);
        let result = match cached {
            Some(record) => {
                tracing::debug!(identity = %identity, "request served from snapshot");
                record.into_result()
            }
            None => {
                tracing::debug!(identity = %identity, "request sent to live transport");
                self.inner.send(request)
            }
        };
        if let Some(hook) = &self.on_complete {
            hook();
        }
        result
    }
}

impl<B> fmt::Debug for CachedBackend<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedBackend")
            .field("cached", &lock(&self.cache).total_remaining())
            .field("has_hook", &self.on_complete.is_some())
            .finish_non_exhaustive()
    }
}

/// Captures every exchange through `inner` so it can be embedded in the
/// rendered page.
pub struct RecordingBackend<B> {
    inner: B,
    log: Mutex<Snapshot>,
}

impl<B: HttpBackend> RecordingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            log: Mutex::new(Snapshot::new()),
        }
    }

    /// Everything captured so far.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        lock(&self.log).clone()
    }

    /// Captured exchanges in the format [`RequestCache::from_snapshot`] reads.
    pub fn snapshot_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&*lock(&self.log))?)
    }

    /// A cache that replays what was captured.
    #[must_use]
    pub fn to_cache(&self) -> RequestCache {
        RequestCache::from_records(self.snapshot())
    }
}

impl<B: HttpBackend> HttpBackend for RecordingBackend<B> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let result = self.inner.send(request);
        let identity = request.identity();
        tracing::trace!(identity = %identity, ok = result.is_ok(), "exchange recorded");
        lock(&self.log)
            .entry(identity)
            .or_default()
            .push(RequestRecord::from_result(&result));
        result
    }
}

impl<B> fmt::Debug for RecordingBackend<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingBackend")
            .field("identities", &lock(&self.log).len())
            .finish_non_exhaustive()
    }
}

/// Live transport over a blocking `reqwest` client.
#[cfg(feature = "live")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestBackend {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "live")]
impl ReqwestBackend {
    #[must_use]
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "live")]
impl HttpBackend for ReqwestBackend {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|err| TransportError::failed(err.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .map_err(|err| TransportError::failed(err.to_string()))?;
        let status = response.status().as_u16();
        let mut headers = crate::request::Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
        let body = response
            .text()
            .map_err(|err| TransportError::failed(err.to_string()))?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
