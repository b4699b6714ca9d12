//! Tower middleware enforcing admission verdicts at the request boundary.
//!
//! This is the adapter seam around the core: the caller supplies an extractor
//! that resolves a [`ClientIdentity`] from its own request type, and the
//! service consults a shared [`AdmissionPolicy`] before forwarding. The core
//! stays transport-agnostic; turning a deny into a response (status code,
//! body) is the caller's concern.

use crate::engine::{AdmissionPolicy, Verdict};
use crate::error::AdmissionError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Client identity resolved by the caller before admission is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Canonical client key, typically a resolved IP address. Treated as an
    /// opaque string; blank means "no identity".
    pub key: String,
    /// Free-text behavioral signal, typically a User-Agent value.
    pub signal: Option<String>,
}

/// Resolve the canonical client key from a forwarded-for chain and the
/// transport-level peer address.
///
/// When a non-blank chain is present the leftmost entry wins, trimmed;
/// otherwise the peer address is used as-is. The result is an opaque string:
/// no IP syntax validation happens here or anywhere in the core.
pub fn resolve_client_key(forwarded_for: Option<&str>, peer_addr: &str) -> String {
    match forwarded_for {
        Some(chain) if !chain.trim().is_empty() => {
            chain.split(',').next().unwrap_or_default().trim().to_string()
        }
        _ => peer_addr.to_string(),
    }
}

/// Layer that wraps a service with admission control.
#[derive(Clone, Debug)]
pub struct AdmissionLayer<F> {
    policy: AdmissionPolicy,
    extractor: Arc<F>,
    enabled: bool,
}

impl<F> AdmissionLayer<F> {
    /// Create an enabled layer with the given identity extractor.
    pub fn new(policy: AdmissionPolicy, extractor: F) -> Self {
        Self { policy, extractor: Arc::new(extractor), enabled: true }
    }

    /// Toggle enforcement. A disabled layer forwards every request without
    /// consulting the decision engine at all.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl<S, F> Layer<S> for AdmissionLayer<F> {
    type Service = AdmissionService<S, F>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService {
            inner: service,
            policy: self.policy.clone(),
            extractor: self.extractor.clone(),
            enabled: self.enabled,
        }
    }
}

/// Middleware service that enforces admission verdicts.
#[derive(Clone, Debug)]
pub struct AdmissionService<S, F> {
    inner: S,
    policy: AdmissionPolicy,
    extractor: Arc<F>,
    enabled: bool,
}

impl<S, F, Req> Service<Req> for AdmissionService<S, F>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    F: Fn(&Req) -> ClientIdentity + Send + Sync + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = AdmissionError<S::Error>;
    // Boxed future, as classification resolves before any awaiting happens.
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AdmissionError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if self.enabled {
            let identity = (self.extractor)(&req);
            let verdict = self.policy.classify(&identity.key, identity.signal.as_deref());
            if let Verdict::Blocked { reason } = verdict {
                return Box::pin(async move { Err(AdmissionError::Denied { reason }) });
            }
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await.map_err(AdmissionError::Inner) })
    }
}
