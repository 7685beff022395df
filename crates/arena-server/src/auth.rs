use anyhow::{Context, Result};
use arena::identity::Identity;
use axum::http::{HeaderMap, HeaderName};
use std::sync::Arc;

use crate::configuration::AuthSettings;

/// Works out who is calling. Authentication itself happens outside this server.
pub trait IdentityResolver: Send + Sync {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Every caller is the anonymous identity.
pub struct AnonymousResolver;

impl IdentityResolver for AnonymousResolver {
    fn current_identity(&self, _headers: &HeaderMap) -> Option<Identity> {
        Some(Identity::anonymous())
    }
}

/// Trusts a header set by an authenticating reverse proxy.
pub struct HeaderIdentityResolver {
    header: HeaderName,
}

impl HeaderIdentityResolver {
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header.trim().as_bytes())
            .with_context(|| format!("Invalid identity header name: {:?}", header))?;
        Ok(Self { header })
    }
}

impl IdentityResolver for HeaderIdentityResolver {
    fn current_identity(&self, headers: &HeaderMap) -> Option<Identity> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Identity::new)
    }
}

pub fn from_settings(settings: &AuthSettings) -> Result<Arc<dyn IdentityResolver>> {
    match settings.identity_header.as_deref() {
        Some(header) => Ok(Arc::new(HeaderIdentityResolver::new(header)?)),
        None => Ok(Arc::new(AnonymousResolver)),
    }
}

/// The caller's identity, or the anonymous one when the resolver has none.
pub fn resolve_identity(resolver: &dyn IdentityResolver, headers: &HeaderMap) -> Identity {
    resolver
        .current_identity(headers)
        .unwrap_or_else(Identity::anonymous)
}
