//! Client address derivation for request logging.
//!
//! The address is informational only and never used for access control.
//! Priority order:
//!
//! 1. `X-Real-Ip`
//! 2. first entry of `X-Forwarded-For`
//! 3. peer address of the connection, without its port

use std::fmt;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Strip the trailing `:port` from a `host:port` string.
///
/// Splits at the last colon, so `[::1]:8080` yields `[::1]`. A string without
/// a colon is returned unchanged.
pub fn host_from_remote_addr(addr: &str) -> &str {
    match addr.rfind(':') {
        Some(idx) => &addr[..idx],
        None => addr,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Derive the client address from proxy headers or the peer address.
pub fn client_ip(headers: &HeaderMap, remote_addr: &str) -> String {
    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        return real_ip.to_string();
    }

    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        return forwarded
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    host_from_remote_addr(remote_addr).to_string()
}

/// Axum extractor for the client address.
///
/// Never rejects. Without proxy headers or `ConnectInfo` (for instance when a
/// router is driven directly in tests) the address is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();

        Ok(ClientIp(client_ip(&parts.headers, &remote)))
    }
}
