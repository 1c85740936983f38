//! Resolution of the caller behind an HTTP request.

use std::fmt;

use axum::http::HeaderMap;

/// Header carrying the caller identity for [`HeaderIdentityProvider`].
pub const IDENTITY_HEADER: &str = "x-user-id";

const MAX_IDENTITY_LEN: usize = 128;

/// Opaque identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Wrap a raw identifier, rejecting blank or oversized values.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_IDENTITY_LEN {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of caller identities; authentication itself happens upstream.
pub trait IdentityProvider: Send + Sync {
    /// Identity of the caller, or `None` when the request is anonymous.
    fn identify(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Trusts the identity forwarded by the gateway in [`IDENTITY_HEADER`].
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentityProvider;

impl IdentityProvider for HeaderIdentityProvider {
    fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Identity::parse)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn header_identity_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(IDENTITY_HEADER, HeaderValue::from_static("  host-1 "));
        let identity = HeaderIdentityProvider.identify(&headers).unwrap();
        assert_eq!(identity.as_str(), "host-1");
    }

    #[test]
    fn missing_or_blank_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        assert!(HeaderIdentityProvider.identify(&headers).is_none());
        headers.insert(IDENTITY_HEADER, HeaderValue::from_static("   "));
        assert!(HeaderIdentityProvider.identify(&headers).is_none());
    }
}
